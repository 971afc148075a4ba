//! Session engine: the surface the messaging layer talks to.
//!
//! All state sits behind one `tokio::sync::Mutex`. Every operation takes
//! the lock once, validates, mutates and releases it, so a timeout firing
//! concurrently with a shot sees either the state before the shot or the
//! state after it. Nothing awaits while holding the lock; bot pacing
//! sleeps with it released. A bot turn runs in a spawned task, so a caller
//! that stops waiting on `shoot` never leaves the session on the bot's turn.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use crate::ai::{Difficulty, Feedback};
use crate::board::Board;
use crate::common::{BoardError, Coord, GuessResult};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::results::{MatchResult, ResultKind};
use crate::session::{
    GameMode, IdleWatch, JoinError, OpenSession, PlayerId, SessionId, SessionKind, SessionRegistry,
    SessionStatus,
};
use crate::watchers;

/// State shared by the engine handle and its watcher tasks.
pub(crate) struct Shared {
    pub(crate) registry: Mutex<SessionRegistry>,
    pub(crate) config: EngineConfig,
    events: mpsc::UnboundedSender<MatchResult>,
}

impl Shared {
    /// Remove a session and publish its result.
    pub(crate) fn finish(
        &self,
        registry: &mut SessionRegistry,
        id: &SessionId,
        winner: PlayerId,
        kind: ResultKind,
    ) -> Option<MatchResult> {
        let mut session = registry.delete_session(id)?;
        let Some(result) = session.conclude(winner, kind) else {
            error!("session {}: winner {} has no opponent, dropping", id, winner);
            return None;
        };
        info!(
            "session {} finished ({:?}): {} beat {}",
            id, result.kind, result.winner, result.loser
        );
        if self.events.send(result.clone()).is_err() {
            warn!("result receiver is gone, session {} will not be recorded", id);
        }
        Some(result)
    }

    /// Drop a session that can no longer make progress.
    pub(crate) fn abandon(&self, registry: &mut SessionRegistry, id: &SessionId, why: &str) -> EngineError {
        error!("abandoning session {}: {}", id, why);
        registry.delete_session(id);
        EngineError::Inconsistent(id.clone())
    }

    /// Let the bot fire until it misses, wins, or the session goes away.
    async fn run_bot_turn(self: Arc<Self>, id: SessionId) -> Vec<BotShot> {
        let mut volley = Vec::new();
        loop {
            let step = {
                let mut reg = self.registry.lock().await;
                self.bot_step(&mut reg, &id)
            };
            match step {
                BotStep::Fired { shot, again } => {
                    volley.push(shot);
                    if !again {
                        break;
                    }
                    let pacing = self.config.bot_pacing;
                    if !pacing.is_zero() {
                        tokio::time::sleep(pacing).await;
                    }
                }
                BotStep::Retry => continue,
                BotStep::Stop => break,
            }
        }
        volley
    }

    fn bot_step(&self, reg: &mut SessionRegistry, id: &SessionId) -> BotStep {
        let Some((session, rng)) = reg.session_and_rng(id) else {
            return BotStep::Stop;
        };
        if session.status() != SessionStatus::Active {
            return BotStep::Stop;
        }
        let Some(bot) = session.bot_player() else {
            return BotStep::Stop;
        };
        if session.turn() != bot {
            return BotStep::Stop;
        }
        let human = session.player1().player();
        let Some((ai, board)) = session.bot_parts_mut() else {
            return BotStep::Stop;
        };

        let Some(at) = ai.choose_shot(rng) else {
            self.abandon(reg, id, "bot has no cell left to fire at");
            return BotStep::Stop;
        };
        let result = match board.apply_shot(at) {
            Ok(res) => res,
            Err(BoardError::AlreadyGuessed) => {
                debug!("session {}: bot shot at {} was already resolved, retrying", id, at);
                ai.process_result(at, Feedback::Rejected);
                return BotStep::Retry;
            }
            Err(e) => {
                self.abandon(reg, id, &e.to_string());
                return BotStep::Stop;
            }
        };
        ai.process_result(at, result.into());
        let victory = board.check_victory();
        debug!("session {}: bot fired at {}: {:?}", id, at, result);

        if victory {
            self.finish(reg, id, bot, ResultKind::Normal);
            return BotStep::Fired {
                shot: BotShot {
                    at,
                    outcome: ShotOutcome::Victory { winner: bot },
                },
                again: false,
            };
        }
        if result == GuessResult::Miss {
            session.turn = human;
        }
        BotStep::Fired {
            shot: BotShot {
                at,
                outcome: result.into(),
            },
            again: result.is_hit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { player1: PlayerId, player2: PlayerId },
    /// No such session, or it already has two players.
    NotFound,
    SameGame,
    AlreadyInActiveGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOutcome {
    Started,
    AlreadyActive,
    /// It is the complainer's own turn, so nobody is idling on them.
    NotYourOpponentsTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotOutcome {
    Miss,
    Hit,
    Sunk,
    Victory { winner: PlayerId },
}

impl From<GuessResult> for ShotOutcome {
    fn from(res: GuessResult) -> Self {
        match res {
            GuessResult::Miss => ShotOutcome::Miss,
            GuessResult::Hit => ShotOutcome::Hit,
            GuessResult::Sunk => ShotOutcome::Sunk,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BotShot {
    pub at: Coord,
    pub outcome: ShotOutcome,
}

/// Result of a human shot, plus the bot's reply when the turn passed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShotReport {
    pub outcome: ShotOutcome,
    pub bot_volley: Vec<BotShot>,
}

/// Read-only copy of a session.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub id: SessionId,
    pub status: SessionStatus,
    pub mode: GameMode,
    pub difficulty: Option<Difficulty>,
    pub turn: PlayerId,
    /// `(player, display name, board)` per seat.
    pub seats: Vec<(PlayerId, String, Board)>,
    pub idle_watch_armed: bool,
}

enum BotStep {
    Fired { shot: BotShot, again: bool },
    Retry,
    Stop,
}

/// Cloneable handle to the session engine.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Build an engine plus the receiving end of its result stream.
    pub fn new(config: EngineConfig) -> (Self, mpsc::UnboundedReceiver<MatchResult>) {
        let (events, rx) = mpsc::unbounded_channel();
        let shared = Shared {
            registry: Mutex::new(SessionRegistry::new(config.seed)),
            config,
            events,
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Open a PvP session and wait for someone to join it.
    pub async fn create(&self, player: PlayerId, name: &str) -> Result<SessionId, EngineError> {
        let mut reg = self.shared.registry.lock().await;
        if let Some(existing) = reg.find_by_player(player) {
            debug!("{} tried to create a game while in {}", player, existing.id());
            return Err(EngineError::AlreadyInGame);
        }
        let id = reg.create_session(player, name)?;
        let timer = watchers::spawn_join_watcher(
            Arc::downgrade(&self.shared),
            id.clone(),
            self.shared.config.join_timeout,
        );
        if let Some(session) = reg.get_mut(&id) {
            session.join_timer = Some(timer);
        }
        info!("{} ({}) created session {}", name, player, id);
        Ok(id)
    }

    /// Take the free seat in a waiting session.
    ///
    /// Any session the joiner is still waiting in is discarded first.
    pub async fn join(&self, id: &SessionId, player: PlayerId, name: &str) -> Result<JoinOutcome, EngineError> {
        let mut reg = self.shared.registry.lock().await;
        let Some(session) = reg.get(id) else {
            return Ok(JoinOutcome::NotFound);
        };
        if session.player1().player() == player {
            return Ok(JoinOutcome::SameGame);
        }
        if session.status() != SessionStatus::WaitingForOpponent {
            return Ok(JoinOutcome::NotFound);
        }
        let creator = session.player1().player();
        if reg
            .iter()
            .any(|s| s.status() == SessionStatus::Active && s.is_participant(player))
        {
            return Ok(JoinOutcome::AlreadyInActiveGame);
        }
        discard_pending(&mut reg, player);

        match reg.join_session(id, player, name) {
            Ok(()) => {}
            Err(JoinError::NotFound | JoinError::Full) => return Ok(JoinOutcome::NotFound),
            Err(JoinError::SameGame) => return Ok(JoinOutcome::SameGame),
            Err(JoinError::Board(e)) => return Err(e.into()),
        }
        info!("{} ({}) joined session {}", name, player, id);
        Ok(JoinOutcome::Joined {
            player1: creator,
            player2: player,
        })
    }

    /// Start a game against a bot. The human moves first.
    pub async fn create_vs_bot(
        &self,
        player: PlayerId,
        name: &str,
        difficulty: Difficulty,
    ) -> Result<SessionId, EngineError> {
        let mut reg = self.shared.registry.lock().await;
        if reg
            .iter()
            .any(|s| s.status() == SessionStatus::Active && s.is_participant(player))
        {
            return Err(EngineError::AlreadyInGame);
        }
        discard_pending(&mut reg, player);
        let id = reg.create_bot_session(player, name, difficulty, self.shared.config.hard_tuning)?;
        info!("{} ({}) started {} bot session {}", name, player, difficulty, id);
        Ok(id)
    }

    /// Fire at `(x, y)` on the opponent's board.
    ///
    /// In a bot game a miss hands the turn to the bot, which then fires until
    /// it misses or wins; its shots come back in `bot_volley`.
    pub async fn shoot(&self, id: &SessionId, player: PlayerId, x: usize, y: usize) -> Result<ShotReport, EngineError> {
        let at = Coord::new(x, y)?;
        let (outcome, bot_turn) = {
            let mut reg = self.shared.registry.lock().await;
            let session = reg.get_mut(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
            let volley = match session.fire(player, at) {
                Ok(v) => v,
                Err(EngineError::Inconsistent(_)) => {
                    return Err(self.shared.abandon(&mut reg, id, "seat missing during shot"));
                }
                Err(e) => return Err(e),
            };
            session.clear_idle_watch_after_move(player);
            debug!("session {}: {} fired at {}: {:?}", id, player, at, volley.result);

            if volley.victory {
                self.shared.finish(&mut reg, id, player, ResultKind::Normal);
                return Ok(ShotReport {
                    outcome: ShotOutcome::Victory { winner: player },
                    bot_volley: Vec::new(),
                });
            }
            let bot_turn = session.bot_player() == Some(session.turn());
            (ShotOutcome::from(volley.result), bot_turn)
        };

        let bot_volley = if bot_turn {
            // The bot's turn runs in its own task so it completes even if
            // this future is dropped halfway through a paced volley.
            let task = tokio::spawn(Arc::clone(&self.shared).run_bot_turn(id.clone()));
            match task.await {
                Ok(volley) => volley,
                Err(e) => {
                    error!("session {}: bot turn task failed: {}", id, e);
                    return Err(EngineError::Inconsistent(id.clone()));
                }
            }
        } else {
            Vec::new()
        };
        Ok(ShotReport { outcome, bot_volley })
    }

    /// Concede an active game. The opponent wins.
    pub async fn surrender(&self, id: &SessionId, player: PlayerId) -> Result<MatchResult, EngineError> {
        let mut reg = self.shared.registry.lock().await;
        let session = reg.get(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if !session.is_participant(player) {
            return Err(EngineError::NotParticipant);
        }
        if session.status() != SessionStatus::Active {
            return Err(EngineError::NotActive);
        }
        let Some(winner) = session.opponent_of(player) else {
            return Err(self.shared.abandon(&mut reg, id, "active session without an opponent"));
        };
        info!("session {}: {} surrendered", id, player);
        self.shared
            .finish(&mut reg, id, winner, ResultKind::Surrender)
            .ok_or_else(|| EngineError::Inconsistent(id.clone()))
    }

    /// Complain that the opponent is taking too long. If they do not move
    /// within the idle timeout they forfeit.
    pub async fn flag_idle_opponent(&self, id: &SessionId, player: PlayerId) -> Result<FlagOutcome, EngineError> {
        let mut reg = self.shared.registry.lock().await;
        let watch_id = reg.next_watch_id();
        let session = reg.get_mut(id).ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if !session.is_participant(player) {
            return Err(EngineError::NotParticipant);
        }
        if session.status() != SessionStatus::Active {
            return Err(EngineError::NotActive);
        }
        if session.turn() == player {
            return Ok(FlagOutcome::NotYourOpponentsTurn);
        }
        let SessionKind::Pvp(pvp) = &mut session.kind else {
            return Err(EngineError::NotPvp);
        };
        if pvp.idle_watch.is_some() {
            return Ok(FlagOutcome::AlreadyActive);
        }
        let timer = watchers::spawn_idle_watcher(
            Arc::downgrade(&self.shared),
            id.clone(),
            watch_id,
            self.shared.config.idle_timeout,
        );
        pvp.idle_watch = Some(IdleWatch {
            id: watch_id,
            flagged_by: player,
            timer,
        });
        info!("session {}: {} flagged an idle opponent (watch {})", id, player, watch_id);
        Ok(FlagOutcome::Started)
    }

    /// Replace `player`'s board before the first shot. Used to start games
    /// from a known layout.
    pub async fn set_board(&self, id: &SessionId, player: PlayerId, board: Board) -> Result<(), EngineError> {
        let mut reg = self.shared.registry.lock().await;
        reg.set_board(id, player, board)
    }

    pub async fn snapshot(&self, id: &SessionId) -> Option<SessionView> {
        let reg = self.shared.registry.lock().await;
        let session = reg.get(id)?;
        let seats = std::iter::once(session.player1())
            .chain(session.player2())
            .map(|s| (s.player(), s.name().to_owned(), s.board().clone()))
            .collect();
        Some(SessionView {
            id: session.id().clone(),
            status: session.status(),
            mode: session.mode(),
            difficulty: session.difficulty(),
            turn: session.turn(),
            seats,
            idle_watch_armed: session.idle_watch_armed(),
        })
    }

    /// The unfinished session `player` is seated in.
    pub async fn session_of(&self, player: PlayerId) -> Option<SessionId> {
        let reg = self.shared.registry.lock().await;
        reg.find_by_player(player).map(|s| s.id().clone())
    }

    pub async fn open_sessions(&self) -> Vec<OpenSession> {
        self.shared.registry.lock().await.open_sessions()
    }

    pub async fn session_count(&self) -> usize {
        self.shared.registry.lock().await.len()
    }
}

/// Drop every session `player` created that is still waiting for an opponent.
fn discard_pending(reg: &mut SessionRegistry, player: PlayerId) {
    let pending: Vec<SessionId> = reg
        .iter()
        .filter(|s| s.status() == SessionStatus::WaitingForOpponent && s.player1().player() == player)
        .map(|s| s.id().clone())
        .collect();
    for id in pending {
        info!("discarding {}'s pending session {}", player, id);
        reg.delete_session(&id);
    }
}
