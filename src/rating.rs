//! Elo ratings and win/loss bookkeeping folded from [`MatchResult`]s.
//!
//! Only PvP games move ratings. Bot games are tallied per player and
//! difficulty.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ai::Difficulty;
use crate::results::MatchResult;
use crate::session::{GameMode, PlayerId};

pub const BASE_RATING: i32 = 1000;
pub const K_FACTOR: f64 = 32.0;

/// Expected score of `a` against `b`.
pub fn expected_score(a: i32, b: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(b - a) / 400.0))
}

/// New `(winner, loser)` ratings after one game.
pub fn elo_update(winner: i32, loser: i32) -> (i32, i32) {
    let delta = K_FACTOR * (1.0 - expected_score(winner, loser));
    let delta = delta.round() as i32;
    (winner + delta, loser - delta)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayerRecord {
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
}

impl Default for PlayerRecord {
    fn default() -> Self {
        Self {
            rating: BASE_RATING,
            wins: 0,
            losses: 0,
        }
    }
}

impl PlayerRecord {
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BotRecord {
    pub wins: u32,
    pub losses: u32,
    pub last_played_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct Ledger {
    players: HashMap<PlayerId, PlayerRecord>,
    bot_games: HashMap<(PlayerId, Difficulty), BotRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &MatchResult) {
        match result.mode {
            GameMode::Pvp => self.record_pvp(result.winner, result.loser),
            GameMode::VsBot => {
                let (Some(human), Some(difficulty)) = (result.human(), result.difficulty) else {
                    log::warn!("bot result for {} without a human side or difficulty", result.session_id);
                    return;
                };
                let entry = self.bot_games.entry((human, difficulty)).or_default();
                if result.winner == human {
                    entry.wins += 1;
                } else {
                    entry.losses += 1;
                }
                entry.last_played_at = Some(result.ended_at);
            }
        }
    }

    fn record_pvp(&mut self, winner: PlayerId, loser: PlayerId) {
        let w = self.players.get(&winner).copied().unwrap_or_default();
        let l = self.players.get(&loser).copied().unwrap_or_default();
        let (w_rating, l_rating) = elo_update(w.rating, l.rating);
        log::debug!(
            "rating {}: {} -> {}, {}: {} -> {}",
            winner,
            w.rating,
            w_rating,
            loser,
            l.rating,
            l_rating
        );
        self.players.insert(
            winner,
            PlayerRecord {
                rating: w_rating,
                wins: w.wins + 1,
                ..w
            },
        );
        self.players.insert(
            loser,
            PlayerRecord {
                rating: l_rating,
                losses: l.losses + 1,
                ..l
            },
        );
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    pub fn bot_record(&self, id: PlayerId, difficulty: Difficulty) -> Option<&BotRecord> {
        self.bot_games.get(&(id, difficulty))
    }

    /// Top `limit` players by rating, ties broken by id.
    pub fn leaderboard(&self, limit: usize) -> Vec<(PlayerId, PlayerRecord)> {
        let mut rows: Vec<_> = self.players.iter().map(|(&id, &rec)| (id, rec)).collect();
        rows.sort_by(|a, b| b.1.rating.cmp(&a.1.rating).then(a.0.cmp(&b.0)));
        rows.truncate(limit);
        rows
    }
}
