//! Game constants and runtime engine configuration.

pub const BOARD_SIZE: usize = 10;

/// Fleet lengths, largest first. Placing long ships first keeps the
/// rejection sampler from stalling.
pub const FLEET: [usize; 10] = [4, 3, 3, 2, 2, 2, 1, 1, 1, 1];

/// Total number of ship segments in the fleet.
pub const TOTAL_SHIP_CELLS: usize = 4 + 3 + 3 + 2 + 2 + 2 + 1 + 1 + 1 + 1;

/// Longest ship in the fleet.
pub const MAX_SHIP_LEN: usize = 4;

/// Random origins tried for a single ship before the layout is restarted.
pub const PLACEMENT_ATTEMPTS_PER_SHIP: usize = 500;
/// Full layout restarts before giving up.
pub const PLACEMENT_RESTARTS: usize = 50;

pub const SESSION_ID_LEN: usize = 6;
pub const SESSION_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_BOT_PACING_MS: u64 = 3000;

#[cfg(feature = "std")]
pub use runtime::EngineConfig;

#[cfg(feature = "std")]
mod runtime {
    use super::*;
    use crate::ai::HardTuning;
    use std::env;
    use std::time::Duration;

    /// Runtime knobs for the session engine.
    #[derive(Debug, Clone)]
    pub struct EngineConfig {
        /// How long a created session waits for an opponent before it is discarded.
        pub join_timeout: Duration,
        /// Countdown armed by `flag_idle_opponent` before the idle player forfeits.
        pub idle_timeout: Duration,
        /// Pause between consecutive bot shots. Zero disables pacing.
        pub bot_pacing: Duration,
        /// Fixed seed for board layouts, session ids and the bots.
        pub seed: Option<u64>,
        pub hard_tuning: HardTuning,
    }

    impl Default for EngineConfig {
        fn default() -> Self {
            Self {
                join_timeout: Duration::from_secs(DEFAULT_JOIN_TIMEOUT_SECS),
                idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
                bot_pacing: Duration::from_millis(DEFAULT_BOT_PACING_MS),
                seed: None,
                hard_tuning: HardTuning::default(),
            }
        }
    }

    impl EngineConfig {
        /// Build a config from `SEABATTLE_*` environment variables, falling back
        /// to the defaults for anything unset or unparsable.
        pub fn from_env() -> Self {
            let mut config = Self::default();
            if let Some(secs) = env_u64("SEABATTLE_JOIN_TIMEOUT_SECS") {
                config.join_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = env_u64("SEABATTLE_IDLE_TIMEOUT_SECS") {
                config.idle_timeout = Duration::from_secs(secs);
            }
            if let Some(ms) = env_u64("SEABATTLE_BOT_PACING_MS") {
                config.bot_pacing = Duration::from_millis(ms);
            }
            config.seed = env_u64("SEABATTLE_SEED");
            config
        }

        /// Config suited to tests and simulations: no pacing, fixed seed.
        pub fn unpaced(seed: u64) -> Self {
            Self {
                bot_pacing: Duration::ZERO,
                seed: Some(seed),
                ..Self::default()
            }
        }
    }

    fn env_u64(key: &str) -> Option<u64> {
        let raw = env::var(key).ok()?;
        match raw.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("ignoring {}={:?}: not an unsigned integer", key, raw);
                None
            }
        }
    }
}
