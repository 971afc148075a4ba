//! Session records and the in-memory registry that owns them.
//!
//! The registry is a plain map guarded by the engine's lock; nothing in
//! here is async. Timers are tokio tasks referenced through
//! [`TimerHandle`], which aborts the task when the owning record is
//! dropped, so deleting a session cancels every watcher attached to it.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;

use crate::ai::{BotOpponent, Difficulty, HardTuning};
use crate::board::Board;
use crate::common::BoardError;
use crate::config::{SESSION_ID_ALPHABET, SESSION_ID_LEN};
use crate::error::EngineError;

/// Opaque participant id supplied by the messaging layer. Bots get
/// negative ids, humans are expected to use non-negative ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl PlayerId {
    pub fn is_bot(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Six uppercase alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an id typed by a user. Surrounding whitespace is dropped and
    /// letters are uppercased; no other validation happens.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let id = (0..SESSION_ID_LEN)
            .map(|_| SESSION_ID_ALPHABET[rng.random_range(0..SESSION_ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    WaitingForOpponent,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Pvp,
    VsBot,
}

/// Aborts the referenced task on drop.
#[derive(Debug)]
pub(crate) struct TimerHandle(Option<AbortHandle>);

impl TimerHandle {
    pub(crate) fn new(handle: AbortHandle) -> Self {
        Self(Some(handle))
    }

    /// Release the handle without aborting. Used by a watcher that is
    /// finalizing its own session.
    pub(crate) fn disarm(mut self) {
        self.0.take();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// One side of a session.
#[derive(Debug)]
pub struct Seat {
    pub(crate) player: PlayerId,
    pub(crate) name: String,
    pub(crate) board: Board,
}

impl Seat {
    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn board(&self) -> &Board {
        &self.board
    }
}

/// Countdown armed by one player against an idle opponent.
#[derive(Debug)]
pub(crate) struct IdleWatch {
    pub(crate) id: u64,
    pub(crate) flagged_by: PlayerId,
    pub(crate) timer: TimerHandle,
}

#[derive(Debug, Default)]
pub(crate) struct PvpState {
    pub(crate) idle_watch: Option<IdleWatch>,
}

#[derive(Debug)]
pub(crate) struct BotState {
    pub(crate) difficulty: Difficulty,
    pub(crate) ai: BotOpponent,
}

#[derive(Debug)]
pub(crate) enum SessionKind {
    Pvp(PvpState),
    VsBot(BotState),
}

/// A single match between two participants.
///
/// `player2` is `None` only while the session waits for an opponent. Bot
/// sessions are created `Active` with the bot in seat two.
#[derive(Debug)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) player1: Seat,
    pub(crate) player2: Option<Seat>,
    pub(crate) turn: PlayerId,
    pub(crate) status: SessionStatus,
    pub(crate) kind: SessionKind,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) joined_at: Option<DateTime<Utc>>,
    pub(crate) join_timer: Option<TimerHandle>,
}

impl Session {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn mode(&self) -> GameMode {
        match self.kind {
            SessionKind::Pvp(_) => GameMode::Pvp,
            SessionKind::VsBot(_) => GameMode::VsBot,
        }
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        match &self.kind {
            SessionKind::VsBot(bot) => Some(bot.difficulty),
            SessionKind::Pvp(_) => None,
        }
    }

    pub fn player1(&self) -> &Seat {
        &self.player1
    }

    pub fn player2(&self) -> Option<&Seat> {
        self.player2.as_ref()
    }

    pub fn turn(&self) -> PlayerId {
        self.turn
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn joined_at(&self) -> Option<DateTime<Utc>> {
        self.joined_at
    }

    pub fn is_participant(&self, player: PlayerId) -> bool {
        self.seat(player).is_some()
    }

    /// The other participant, if `player` is seated and the session is full.
    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        let p2 = self.player2.as_ref()?.player;
        if self.player1.player == player {
            Some(p2)
        } else if p2 == player {
            Some(self.player1.player)
        } else {
            None
        }
    }

    pub fn seat(&self, player: PlayerId) -> Option<&Seat> {
        if self.player1.player == player {
            return Some(&self.player1);
        }
        self.player2.as_ref().filter(|s| s.player == player)
    }

    pub(crate) fn seat_mut(&mut self, player: PlayerId) -> Option<&mut Seat> {
        if self.player1.player == player {
            return Some(&mut self.player1);
        }
        self.player2.as_mut().filter(|s| s.player == player)
    }

    pub fn board_of(&self, player: PlayerId) -> Option<&Board> {
        self.seat(player).map(|s| &s.board)
    }

    /// Seat two's id in a bot session.
    pub fn bot_player(&self) -> Option<PlayerId> {
        match self.kind {
            SessionKind::VsBot(_) => self.player2.as_ref().map(|s| s.player),
            SessionKind::Pvp(_) => None,
        }
    }

    /// `true` while a complaint against an idle opponent is counting down.
    pub fn idle_watch_armed(&self) -> bool {
        matches!(&self.kind, SessionKind::Pvp(PvpState { idle_watch: Some(_) }))
    }

    /// Split borrow of the bot's state and the human board it fires at.
    pub(crate) fn bot_parts_mut(&mut self) -> Option<(&mut BotOpponent, &mut Board)> {
        match &mut self.kind {
            SessionKind::VsBot(bot) => Some((&mut bot.ai, &mut self.player1.board)),
            SessionKind::Pvp(_) => None,
        }
    }

    /// Drop a pending idle watch unless it was armed by `player`. Any move by
    /// the flagged player clears it.
    pub(crate) fn clear_idle_watch_after_move(&mut self, player: PlayerId) {
        if let SessionKind::Pvp(pvp) = &mut self.kind {
            if let Some(watch) = pvp.idle_watch.take_if(|w| w.flagged_by != player) {
                log::info!(
                    "session {}: {} moved, cancelling idle watch {}",
                    self.id,
                    player,
                    watch.id
                );
            }
        }
    }

    /// Hand the turn to the other participant.
    pub fn switch_turn(&mut self) -> Option<PlayerId> {
        let next = self.opponent_of(self.turn)?;
        self.turn = next;
        Some(next)
    }
}

/// Waiting session as listed to players looking for a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenSession {
    pub id: SessionId,
    pub creator: PlayerId,
    pub creator_name: String,
    pub created_at: DateTime<Utc>,
}

/// Low-level join failures. The engine folds these into its own outcomes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("no such session")]
    NotFound,
    #[error("player created this session")]
    SameGame,
    #[error("session already has two players")]
    Full,
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// All live sessions, keyed by id.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    rng: SmallRng,
    next_bot: i64,
    next_watch: u64,
}

impl SessionRegistry {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Self {
            sessions: HashMap::new(),
            rng,
            next_bot: -1,
            next_watch: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Session plus the shared RNG, for callers that need both mutably.
    pub(crate) fn session_and_rng(&mut self, id: &SessionId) -> Option<(&mut Session, &mut SmallRng)> {
        let session = self.sessions.get_mut(id)?;
        Some((session, &mut self.rng))
    }

    pub(crate) fn next_watch_id(&mut self) -> u64 {
        self.next_watch += 1;
        self.next_watch
    }

    fn fresh_id(&mut self) -> SessionId {
        loop {
            let id = SessionId::generate(&mut self.rng);
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_bot_id(&mut self) -> PlayerId {
        let id = PlayerId(self.next_bot);
        self.next_bot -= 1;
        id
    }

    /// New waiting session with a random board for the creator, who moves first.
    pub fn create_session(&mut self, creator: PlayerId, name: &str) -> Result<SessionId, BoardError> {
        let board = Board::random(&mut self.rng)?;
        let id = self.fresh_id();
        let session = Session {
            id: id.clone(),
            player1: Seat {
                player: creator,
                name: name.to_owned(),
                board,
            },
            player2: None,
            turn: creator,
            status: SessionStatus::WaitingForOpponent,
            kind: SessionKind::Pvp(PvpState::default()),
            created_at: Utc::now(),
            joined_at: None,
            join_timer: None,
        };
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    /// Seat `joiner` in a waiting session and activate it. Cancels the join timer.
    pub fn join_session(&mut self, id: &SessionId, joiner: PlayerId, name: &str) -> Result<(), JoinError> {
        let session = self.sessions.get(id).ok_or(JoinError::NotFound)?;
        if session.player1.player == joiner {
            return Err(JoinError::SameGame);
        }
        if session.player2.is_some() || session.status != SessionStatus::WaitingForOpponent {
            return Err(JoinError::Full);
        }
        let board = Board::random(&mut self.rng)?;
        let session = self.sessions.get_mut(id).ok_or(JoinError::NotFound)?;
        session.player2 = Some(Seat {
            player: joiner,
            name: name.to_owned(),
            board,
        });
        session.status = SessionStatus::Active;
        session.joined_at = Some(Utc::now());
        session.join_timer = None;
        Ok(())
    }

    /// New active session against a bot of `difficulty`. The human moves first.
    pub fn create_bot_session(
        &mut self,
        player: PlayerId,
        name: &str,
        difficulty: Difficulty,
        tuning: HardTuning,
    ) -> Result<SessionId, BoardError> {
        let human_board = Board::random(&mut self.rng)?;
        let bot_board = Board::random(&mut self.rng)?;
        let ai = BotOpponent::new(difficulty, &mut self.rng, &human_board).with_tuning(tuning);
        let bot = self.fresh_bot_id();
        let id = self.fresh_id();
        let now = Utc::now();
        let session = Session {
            id: id.clone(),
            player1: Seat {
                player,
                name: name.to_owned(),
                board: human_board,
            },
            player2: Some(Seat {
                player: bot,
                name: format!("{} bot", difficulty),
                board: bot_board,
            }),
            turn: player,
            status: SessionStatus::Active,
            kind: SessionKind::VsBot(BotState { difficulty, ai }),
            created_at: now,
            joined_at: Some(now),
            join_timer: None,
        };
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    pub fn get_turn(&self, id: &SessionId) -> Option<PlayerId> {
        self.sessions.get(id).map(|s| s.turn)
    }

    pub fn switch_turn(&mut self, id: &SessionId) -> Option<PlayerId> {
        self.sessions.get_mut(id)?.switch_turn()
    }

    /// Remove a session. Dropping it aborts any timers it still owns.
    pub fn delete_session(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    /// The unfinished session `player` is seated in, if any.
    pub fn find_by_player(&self, player: PlayerId) -> Option<&Session> {
        self.sessions
            .values()
            .find(|s| s.status != SessionStatus::Finished && s.is_participant(player))
    }

    /// Waiting sessions, oldest first.
    pub fn open_sessions(&self) -> Vec<OpenSession> {
        let mut open: Vec<OpenSession> = self
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::WaitingForOpponent)
            .map(|s| OpenSession {
                id: s.id.clone(),
                creator: s.player1.player,
                creator_name: s.player1.name.clone(),
                created_at: s.created_at,
            })
            .collect();
        open.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        open
    }

    /// Replace `player`'s board before any shot has been fired in the session.
    pub fn set_board(&mut self, id: &SessionId, player: PlayerId, board: Board) -> Result<(), EngineError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        if session.player1.board.is_pristine()
            && session.player2.as_ref().map_or(true, |s| s.board.is_pristine())
        {
            let is_vs_bot = matches!(session.kind, SessionKind::VsBot(_));
            let is_human_seat = session.player1.player == player;
            let seat = session.seat_mut(player).ok_or(EngineError::NotParticipant)?;
            seat.board = board;
            // The hard bot's snapshot must follow the human board it targets.
            if is_vs_bot && is_human_seat {
                if let SessionKind::VsBot(bot) = &mut session.kind {
                    let tuning = bot.ai.tuning();
                    bot.ai = BotOpponent::new(bot.difficulty, &mut self.rng, &session.player1.board)
                        .with_tuning(tuning);
                }
            }
            Ok(())
        } else {
            Err(EngineError::BoardInUse)
        }
    }
}
