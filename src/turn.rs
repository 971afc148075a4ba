//! Turn arbitration: who may fire, and whether the turn passes.

use crate::common::{BoardError, Coord, GuessResult};
use crate::error::EngineError;
use crate::session::{PlayerId, Session, SessionStatus};

/// Resolved shot inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volley {
    /// Owner of the board that was fired at.
    pub target: PlayerId,
    pub result: GuessResult,
    /// The shot destroyed the target's last ship segment.
    pub victory: bool,
}

impl Session {
    /// Fire at `at` on behalf of `actor`.
    ///
    /// Only the turn holder of an active session may fire. A miss hands the
    /// turn over; hits and sinks keep it. A rejected shot changes nothing,
    /// including the turn.
    pub fn fire(&mut self, actor: PlayerId, at: Coord) -> Result<Volley, EngineError> {
        if self.status != SessionStatus::Active {
            return Err(EngineError::NotActive);
        }
        if !self.is_participant(actor) {
            return Err(EngineError::NotParticipant);
        }
        if self.turn != actor {
            return Err(EngineError::NotYourTurn);
        }
        let target = self
            .opponent_of(actor)
            .ok_or_else(|| EngineError::Inconsistent(self.id.clone()))?;
        let id = self.id.clone();
        let board = &mut self
            .seat_mut(target)
            .ok_or(EngineError::Inconsistent(id))?
            .board;

        let result = board.apply_shot(at).map_err(|e| match e {
            BoardError::AlreadyGuessed => EngineError::AlreadyShot(at),
            other => EngineError::Board(other),
        })?;
        let victory = board.check_victory();

        if victory {
            self.status = SessionStatus::Finished;
        } else if result == GuessResult::Miss {
            self.turn = target;
        }
        Ok(Volley {
            target,
            result,
            victory,
        })
    }
}
