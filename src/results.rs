//! Finished-game records emitted to the persistence collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::Difficulty;
use crate::session::{GameMode, PlayerId, Session, SessionId, SessionStatus};

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    /// The winner sank the whole enemy fleet.
    Normal,
    Surrender,
    /// The loser let an idle complaint run out.
    Forfeiture,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub session_id: SessionId,
    pub winner: PlayerId,
    pub loser: PlayerId,
    pub kind: ResultKind,
    pub mode: GameMode,
    pub difficulty: Option<Difficulty>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl MatchResult {
    /// The human side of a bot game.
    pub fn human(&self) -> Option<PlayerId> {
        match self.mode {
            GameMode::VsBot => [self.winner, self.loser].into_iter().find(|p| !p.is_bot()),
            GameMode::Pvp => None,
        }
    }
}

impl Session {
    /// Close the session in favour of `winner`. `None` if `winner` has no
    /// seated opponent.
    pub(crate) fn conclude(&mut self, winner: PlayerId, kind: ResultKind) -> Option<MatchResult> {
        let loser = self.opponent_of(winner)?;
        self.status = SessionStatus::Finished;
        Some(MatchResult {
            session_id: self.id.clone(),
            winner,
            loser,
            kind,
            mode: self.mode(),
            difficulty: self.difficulty(),
            started_at: self.joined_at.unwrap_or(self.created_at),
            ended_at: Utc::now(),
        })
    }
}
