use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::time::Duration;

use seabattle::{
    Board, Coord, CoordError, Difficulty, Engine, EngineConfig, EngineError, FlagOutcome,
    GameMode, HardTuning, JoinOutcome, MatchResult, Orientation, PlayerId, ResultKind,
    SessionId, SessionRegistry, SessionStatus, ShotOutcome,
};
use tokio::sync::mpsc::UnboundedReceiver;

const A: PlayerId = PlayerId(100);
const B: PlayerId = PlayerId(200);
const C: PlayerId = PlayerId(300);
const D: PlayerId = PlayerId(400);

fn c(x: usize, y: usize) -> Coord {
    Coord::new(x, y).unwrap()
}

fn engine() -> (Engine, UnboundedReceiver<MatchResult>) {
    Engine::new(EngineConfig::unpaced(7))
}

/// A single one-cell ship at `at`.
fn lone_ship(at: Coord) -> Board {
    Board::from_layout(&[(at, 1, Orientation::Horizontal)]).unwrap()
}

/// Active A-vs-B session with A's lone ship at (4,4) and B's two-cell ship at (0,0)-(0,1).
async fn fixture_game(engine: &Engine) -> SessionId {
    let id = engine.create(A, "alice").await.unwrap();
    let joined = engine.join(&id, B, "bob").await.unwrap();
    assert_eq!(joined, JoinOutcome::Joined { player1: A, player2: B });
    engine.set_board(&id, A, lone_ship(c(4, 4))).await.unwrap();
    engine
        .set_board(
            &id,
            B,
            Board::from_layout(&[(c(0, 0), 2, Orientation::Horizontal)]).unwrap(),
        )
        .await
        .unwrap();
    id
}

#[test]
fn test_registry_ids_and_turns() {
    let mut reg = SessionRegistry::new(Some(1));
    let id = reg.create_session(A, "alice").unwrap();
    assert_eq!(id.as_str().len(), 6);
    assert!(id
        .as_str()
        .chars()
        .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit()));
    assert_eq!(reg.get_turn(&id), Some(A));
    // No opponent yet, nothing to switch to.
    assert_eq!(reg.switch_turn(&id), None);

    reg.join_session(&id, B, "bob").unwrap();
    assert_eq!(reg.get(&id).unwrap().status(), SessionStatus::Active);
    assert_eq!(reg.switch_turn(&id), Some(B));
    assert_eq!(reg.switch_turn(&id), Some(A));

    assert!(reg.delete_session(&id).is_some());
    assert!(reg.is_empty());
}

#[test]
fn test_session_id_normalization() {
    assert_eq!(SessionId::new(" ab12cd ").as_str(), "AB12CD");
}

#[tokio::test]
async fn test_create_rejects_second_session() {
    let (engine, _rx) = engine();
    engine.create(A, "alice").await.unwrap();
    assert_eq!(engine.create(A, "alice").await, Err(EngineError::AlreadyInGame));
}

#[tokio::test]
async fn test_end_to_end_pvp() {
    let (engine, mut rx) = engine();
    let id = engine.create(A, "alice").await.unwrap();
    assert_eq!(engine.open_sessions().await.len(), 1);
    assert_eq!(engine.join(&id, A, "alice").await.unwrap(), JoinOutcome::SameGame);
    assert_eq!(
        engine.join(&id, B, "bob").await.unwrap(),
        JoinOutcome::Joined { player1: A, player2: B }
    );

    let view = engine.snapshot(&id).await.unwrap();
    assert_eq!(view.status, SessionStatus::Active);
    assert_eq!(view.mode, GameMode::Pvp);
    assert_eq!(view.seats.len(), 2);
    assert_eq!(view.turn, A);
    assert!(engine.open_sessions().await.is_empty());

    engine.set_board(&id, A, lone_ship(c(4, 4))).await.unwrap();
    engine.set_board(&id, B, lone_ship(c(0, 0))).await.unwrap();

    // A misses, handing the turn to B, who sinks A's only ship.
    let report = engine.shoot(&id, A, 9, 9).await.unwrap();
    assert_eq!(report.outcome, ShotOutcome::Miss);
    assert!(report.bot_volley.is_empty());
    let report = engine.shoot(&id, B, 4, 4).await.unwrap();
    assert_eq!(report.outcome, ShotOutcome::Victory { winner: B });

    assert!(engine.snapshot(&id).await.is_none());
    let result = rx.recv().await.unwrap();
    assert_eq!(result.session_id, id);
    assert_eq!(result.winner, B);
    assert_eq!(result.loser, A);
    assert_eq!(result.kind, ResultKind::Normal);
    assert_eq!(result.mode, GameMode::Pvp);
    assert_eq!(result.difficulty, None);
    assert!(result.ended_at >= result.started_at);
}

#[tokio::test]
async fn test_turn_alternation() {
    let (engine, _rx) = engine();
    let id = fixture_game(&engine).await;

    assert_eq!(engine.shoot(&id, B, 4, 4).await, Err(EngineError::NotYourTurn));

    // A hit keeps the turn.
    let report = engine.shoot(&id, A, 0, 0).await.unwrap();
    assert_eq!(report.outcome, ShotOutcome::Hit);
    assert_eq!(engine.snapshot(&id).await.unwrap().turn, A);

    // A miss passes it.
    let report = engine.shoot(&id, A, 9, 9).await.unwrap();
    assert_eq!(report.outcome, ShotOutcome::Miss);
    assert_eq!(engine.snapshot(&id).await.unwrap().turn, B);
    assert_eq!(engine.shoot(&id, A, 8, 8).await, Err(EngineError::NotYourTurn));
}

#[tokio::test]
async fn test_sink_keeps_turn() {
    let (engine, _rx) = engine();
    let id = fixture_game(&engine).await;
    engine.shoot(&id, A, 0, 0).await.unwrap();
    let report = engine.shoot(&id, A, 0, 1).await.unwrap();
    // B's only ship is gone.
    assert_eq!(report.outcome, ShotOutcome::Victory { winner: A });
}

#[tokio::test]
async fn test_repeat_shot_keeps_turn() {
    let (engine, _rx) = engine();
    let id = fixture_game(&engine).await;
    engine.shoot(&id, A, 9, 9).await.unwrap();
    engine.shoot(&id, B, 8, 8).await.unwrap();
    assert_eq!(
        engine.shoot(&id, A, 9, 9).await,
        Err(EngineError::AlreadyShot(c(9, 9)))
    );
    assert_eq!(engine.snapshot(&id).await.unwrap().turn, A);
}

#[tokio::test]
async fn test_shot_validation() {
    let (engine, _rx) = engine();
    let id = fixture_game(&engine).await;
    assert_eq!(
        engine.shoot(&id, A, 10, 0).await,
        Err(EngineError::InvalidCoordinate(CoordError::OutOfRange { x: 10, y: 0 }))
    );
    assert_eq!(engine.shoot(&id, C, 0, 0).await, Err(EngineError::NotParticipant));
    let missing = SessionId::new("ZZZZZZ");
    assert_eq!(
        engine.shoot(&missing, A, 0, 0).await,
        Err(EngineError::NotFound(missing.clone()))
    );
}

#[tokio::test]
async fn test_set_board_only_before_first_shot() {
    let (engine, _rx) = engine();
    let id = fixture_game(&engine).await;
    engine.shoot(&id, A, 9, 9).await.unwrap();
    assert_eq!(
        engine.set_board(&id, B, lone_ship(c(5, 5))).await,
        Err(EngineError::BoardInUse)
    );
}

#[tokio::test]
async fn test_join_outcomes() {
    let (engine, _rx) = engine();
    assert_eq!(
        engine.join(&SessionId::new("NOPE00"), B, "bob").await.unwrap(),
        JoinOutcome::NotFound
    );

    let id = engine.create(A, "alice").await.unwrap();
    engine.join(&id, B, "bob").await.unwrap();
    // Full sessions look the same as missing ones.
    assert_eq!(engine.join(&id, C, "carol").await.unwrap(), JoinOutcome::NotFound);

    let other = engine.create(C, "carol").await.unwrap();
    assert_eq!(
        engine.join(&other, B, "bob").await.unwrap(),
        JoinOutcome::AlreadyInActiveGame
    );
    assert_eq!(
        engine.join(&other, D, "dave").await.unwrap(),
        JoinOutcome::Joined { player1: C, player2: D }
    );
}

#[tokio::test]
async fn test_join_discards_pending_creation() {
    let (engine, _rx) = engine();
    let mine = engine.create(B, "bob").await.unwrap();
    let theirs = engine.create(A, "alice").await.unwrap();
    engine.join(&theirs, B, "bob").await.unwrap();
    assert!(engine.snapshot(&mine).await.is_none());
    assert_eq!(engine.session_of(B).await, Some(theirs));
    assert_eq!(engine.session_count().await, 1);
}

#[tokio::test]
async fn test_surrender() {
    let (engine, mut rx) = engine();
    let waiting = engine.create(C, "carol").await.unwrap();
    assert_eq!(engine.surrender(&waiting, C).await, Err(EngineError::NotActive));

    let id = fixture_game(&engine).await;
    assert_eq!(engine.surrender(&id, D).await, Err(EngineError::NotParticipant));
    let result = engine.surrender(&id, A).await.unwrap();
    assert_eq!(result.winner, B);
    assert_eq!(result.loser, A);
    assert_eq!(result.kind, ResultKind::Surrender);
    assert_eq!(rx.recv().await.unwrap(), result);
    assert!(engine.session_of(A).await.is_none());
    assert!(engine.session_of(B).await.is_none());
}

#[tokio::test]
async fn test_flag_outcomes() {
    let (engine, _rx) = engine();
    let id = fixture_game(&engine).await;
    assert_eq!(
        engine.flag_idle_opponent(&id, A).await.unwrap(),
        FlagOutcome::NotYourOpponentsTurn
    );
    assert_eq!(engine.flag_idle_opponent(&id, B).await.unwrap(), FlagOutcome::Started);
    assert!(engine.snapshot(&id).await.unwrap().idle_watch_armed);
    assert_eq!(engine.flag_idle_opponent(&id, B).await.unwrap(), FlagOutcome::AlreadyActive);

    // Any move by the flagged player disarms it.
    engine.shoot(&id, A, 0, 0).await.unwrap();
    assert!(!engine.snapshot(&id).await.unwrap().idle_watch_armed);
}

#[tokio::test]
async fn test_bot_game_reply_and_victory() {
    let (engine, mut rx) = engine();
    let id = engine.create_vs_bot(A, "alice", Difficulty::Easy).await.unwrap();
    assert_eq!(engine.create(A, "alice").await, Err(EngineError::AlreadyInGame));
    assert_eq!(
        engine.create_vs_bot(A, "alice", Difficulty::Hard).await,
        Err(EngineError::AlreadyInGame)
    );

    let view = engine.snapshot(&id).await.unwrap();
    assert_eq!(view.mode, GameMode::VsBot);
    assert_eq!(view.difficulty, Some(Difficulty::Easy));
    assert_eq!(view.turn, A);
    let bot = view.seats.iter().map(|s| s.0).find(|p| p.is_bot()).unwrap();
    assert_eq!(engine.flag_idle_opponent(&id, A).await, Err(EngineError::NotPvp));

    engine.set_board(&id, bot, lone_ship(c(0, 0))).await.unwrap();

    let report = engine.shoot(&id, A, 9, 9).await.unwrap();
    assert_eq!(report.outcome, ShotOutcome::Miss);
    let last = report.bot_volley.last().unwrap();
    match last.outcome {
        ShotOutcome::Miss => assert_eq!(engine.snapshot(&id).await.unwrap().turn, A),
        ShotOutcome::Victory { winner } => {
            assert_eq!(winner, bot);
            return;
        }
        other => panic!("volley ended on {:?}", other),
    }
    // Everything before the final miss was a hit.
    for shot in &report.bot_volley[..report.bot_volley.len() - 1] {
        assert!(matches!(shot.outcome, ShotOutcome::Hit | ShotOutcome::Sunk));
    }

    let report = engine.shoot(&id, A, 0, 0).await.unwrap();
    assert_eq!(report.outcome, ShotOutcome::Victory { winner: A });
    let result = rx.recv().await.unwrap();
    assert_eq!(result.mode, GameMode::VsBot);
    assert_eq!(result.difficulty, Some(Difficulty::Easy));
    assert_eq!(result.human(), Some(A));
    assert_eq!(result.loser, bot);
}

#[tokio::test]
async fn test_bot_game_replaces_pending_creation() {
    let (engine, _rx) = engine();
    let pending = engine.create(A, "alice").await.unwrap();
    let id = engine.create_vs_bot(A, "alice", Difficulty::Medium).await.unwrap();
    assert!(engine.snapshot(&pending).await.is_none());
    assert_eq!(engine.session_of(A).await, Some(id));
}

#[tokio::test]
async fn test_bot_plays_until_someone_wins() {
    let (engine, mut rx) = engine();
    let id = engine.create_vs_bot(A, "alice", Difficulty::Hard).await.unwrap();
    let mut rng = SmallRng::seed_from_u64(12);
    let mut order: Vec<Coord> = Coord::all().collect();
    rand::seq::SliceRandom::shuffle(order.as_mut_slice(), &mut rng);

    for at in order {
        match engine.shoot(&id, A, at.x(), at.y()).await {
            Ok(report) => {
                let over = matches!(report.outcome, ShotOutcome::Victory { .. })
                    || report
                        .bot_volley
                        .iter()
                        .any(|s| matches!(s.outcome, ShotOutcome::Victory { .. }));
                if over {
                    break;
                }
            }
            Err(EngineError::AlreadyShot(_)) => continue,
            Err(e) => panic!("unexpected rejection {e}"),
        }
    }
    let result = rx.recv().await.unwrap();
    assert_eq!(result.session_id, id);
    assert!(engine.snapshot(&id).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_bot_turn_finishes_when_caller_gives_up() {
    // The hard bot always knows a ship cell, so its first shot hits and the
    // volley pauses for pacing before the next one.
    let config = EngineConfig {
        bot_pacing: Duration::from_secs(3),
        hard_tuning: HardTuning {
            foreknowledge: 1.0,
            checkerboard: 0.0,
            random: 0.0,
        },
        ..EngineConfig::unpaced(7)
    };
    let (engine, mut rx) = Engine::new(config);
    let id = engine.create_vs_bot(A, "alice", Difficulty::Hard).await.unwrap();
    let view = engine.snapshot(&id).await.unwrap();
    let bot = view.seats.iter().map(|s| s.0).find(|p| p.is_bot()).unwrap();
    engine.set_board(&id, bot, lone_ship(c(0, 0))).await.unwrap();

    let gave_up = tokio::time::timeout(Duration::from_millis(500), engine.shoot(&id, A, 9, 9)).await;
    assert!(gave_up.is_err());

    tokio::time::sleep(Duration::from_secs(3600)).await;
    match engine.snapshot(&id).await {
        Some(view) => {
            assert_eq!(view.status, SessionStatus::Active);
            assert_eq!(view.turn, A);
            assert!(engine.shoot(&id, A, 0, 0).await.is_ok());
        }
        None => {
            let result = rx.try_recv().unwrap();
            assert_eq!(result.winner, bot);
        }
    }
}
