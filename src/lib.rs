#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod ai;
mod bitboard;
mod board;
mod common;
mod config;
mod ship;
mod shot;

#[cfg(feature = "std")]
pub mod engine;
#[cfg(feature = "std")]
mod error;
#[cfg(feature = "std")]
mod logging;
#[cfg(feature = "std")]
pub mod rating;
#[cfg(feature = "std")]
pub mod results;
#[cfg(feature = "std")]
pub mod session;
#[cfg(feature = "std")]
mod turn;
#[cfg(feature = "std")]
mod watchers;

pub use ai::*;
pub use bitboard::{BitBoard, Cells};
pub use board::*;
pub use common::*;
pub use config::*;
pub use ship::*;

#[cfg(feature = "std")]
pub use engine::{BotShot, Engine, FlagOutcome, JoinOutcome, SessionView, ShotOutcome, ShotReport};
#[cfg(feature = "std")]
pub use error::EngineError;
#[cfg(feature = "std")]
pub use logging::init_logging;
#[cfg(feature = "std")]
pub use results::{MatchResult, ResultKind};
#[cfg(feature = "std")]
pub use session::{GameMode, OpenSession, PlayerId, SessionId, SessionRegistry, SessionStatus};
#[cfg(feature = "std")]
pub use turn::Volley;
