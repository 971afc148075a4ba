use crate::common::{BoardError, Coord, CoordError};
use crate::session::SessionId;

/// Rejections reported by the session engine. Every variant leaves the
/// session untouched except `Inconsistent`, which means the session was
/// abandoned and removed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("session {0} not found")]
    NotFound(SessionId),
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordError),
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("player is not part of this session")]
    NotParticipant,
    #[error("session is not in progress")]
    NotActive,
    #[error("{0} was already shot")]
    AlreadyShot(Coord),
    #[error("player already has a game in progress")]
    AlreadyInGame,
    #[error("idle complaints only apply to games between two players")]
    NotPvp,
    #[error("board can only be replaced before the first shot")]
    BoardInUse,
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("session {0} was abandoned after an internal inconsistency")]
    Inconsistent(SessionId),
}
