//! Bot opponent with three difficulty tiers.
//!
//! - `Easy` fires uniformly at random and never hunts.
//! - `Medium` finishes damaged ships through a neighbour queue and otherwise
//!   searches a shuffled checkerboard, which is enough to find every ship of
//!   length two or more in half the shots.
//! - `Hard` hunts along the ship's axis once two hits line up, and when idle
//!   blends three independent proposals: a known ship cell from a snapshot of
//!   the opponent's layout, a checkerboard cell and a random cell.
//!
//! Every tier records a shot in its tried set as soon as it is chosen, so a
//! coordinate is never offered twice.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::bitboard::BitBoard;
use crate::board::Board;
use crate::common::{Coord, GuessResult};
use crate::config::MAX_SHIP_LEN;

/// Bot skill tier, fixed for the lifetime of a [`BotOpponent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "std",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty, expected easy, medium or hard")]
pub struct UnknownDifficulty;

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or(UnknownDifficulty)
    }
}

/// Probabilities of the three independent draws the hard tier makes when it
/// has nothing to hunt. Values outside `0.0..=1.0` are clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HardTuning {
    /// Chance of proposing an untried cell from the layout snapshot.
    pub foreknowledge: f64,
    /// Chance of proposing the next checkerboard cell.
    pub checkerboard: f64,
    /// Chance of proposing a uniformly random cell.
    pub random: f64,
}

impl Default for HardTuning {
    fn default() -> Self {
        Self {
            foreknowledge: 0.3,
            checkerboard: 0.65,
            random: 0.25,
        }
    }
}

/// What the bot learns about its last shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Miss,
    Hit,
    Sunk,
    /// The cell had already been resolved, e.g. by a sinking halo.
    Rejected,
}

impl From<GuessResult> for Feedback {
    fn from(res: GuessResult) -> Self {
        match res {
            GuessResult::Miss => Feedback::Miss,
            GuessResult::Hit => Feedback::Hit,
            GuessResult::Sunk => Feedback::Sunk,
        }
    }
}

/// Line through two hits on the same ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// Same `x`, extends along `y`.
    Row,
    /// Same `y`, extends along `x`.
    Column,
}

impl Axis {
    fn between(a: Coord, b: Coord) -> Option<Axis> {
        if a.x() == b.x() && a.y() != b.y() {
            Some(Axis::Row)
        } else if a.y() == b.y() && a.x() != b.x() {
            Some(Axis::Column)
        } else {
            None
        }
    }

    fn along(self, c: Coord) -> usize {
        match self {
            Axis::Row => c.y(),
            Axis::Column => c.x(),
        }
    }

    fn on_line(self, anchor: Coord, c: Coord) -> bool {
        match self {
            Axis::Row => anchor.x() == c.x(),
            Axis::Column => anchor.y() == c.y(),
        }
    }

    fn step(self, c: Coord, dir: isize) -> Option<Coord> {
        match self {
            Axis::Row => c.offset(0, dir),
            Axis::Column => c.offset(dir, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Low,
    High,
}

/// Per-session bot state.
#[derive(Debug, Clone)]
pub struct BotOpponent {
    difficulty: Difficulty,
    tried: BitBoard,
    targets: VecDeque<Coord>,
    hit_sequence: Vec<Coord>,
    /// Shuffled even-parity cells, consumed from the back.
    checkerboard: Vec<Coord>,
    /// Hard tier only: opponent ship cells captured when the game started.
    known_ships: BitBoard,
    tuning: HardTuning,
}

impl BotOpponent {
    /// Create a bot playing against `opponent`. Only the hard tier keeps a
    /// snapshot of the opponent's ship cells.
    pub fn new<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R, opponent: &Board) -> Self {
        let mut checkerboard: Vec<Coord> = Coord::all().filter(|c| (c.x() + c.y()) % 2 == 0).collect();
        checkerboard.shuffle(rng);
        let known_ships = match difficulty {
            Difficulty::Hard => opponent.ship_cells(),
            Difficulty::Easy | Difficulty::Medium => BitBoard::new(),
        };
        Self {
            difficulty,
            tried: BitBoard::new(),
            targets: VecDeque::new(),
            hit_sequence: Vec::new(),
            checkerboard,
            known_ships,
            tuning: HardTuning::default(),
        }
    }

    pub fn with_tuning(mut self, tuning: HardTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn tuning(&self) -> HardTuning {
        self.tuning
    }

    /// Every cell the bot has fired at.
    pub fn tried(&self) -> &BitBoard {
        &self.tried
    }

    /// Queued hunting targets, next first.
    pub fn targets(&self) -> impl Iterator<Item = Coord> + '_ {
        self.targets.iter().copied()
    }

    /// Hits on the ship currently being hunted, in order.
    pub fn hit_sequence(&self) -> &[Coord] {
        &self.hit_sequence
    }

    /// Pick the next coordinate to fire at. `None` only once every cell has
    /// been tried.
    pub fn choose_shot<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Coord> {
        let shot = match self.difficulty {
            Difficulty::Easy => self.random_untried(rng),
            Difficulty::Medium => self
                .next_target()
                .or_else(|| self.checkerboard_candidate())
                .or_else(|| self.random_untried(rng)),
            Difficulty::Hard => self.next_target().or_else(|| self.blended(rng)),
        }?;
        self.tried.insert(shot);
        Some(shot)
    }

    /// Update hunting state with the outcome of a shot at `at`.
    pub fn process_result(&mut self, at: Coord, feedback: Feedback) {
        self.tried.insert(at);
        if self.difficulty == Difficulty::Easy {
            return;
        }
        match feedback {
            Feedback::Sunk => self.reset_hunt(),
            Feedback::Hit => {
                self.hit_sequence.push(at);
                if self.difficulty == Difficulty::Hard && self.hit_sequence.len() >= 2 {
                    self.rebuild_along_axis(None);
                } else {
                    self.enqueue_neighbors(at);
                }
            }
            Feedback::Miss => {
                if self.difficulty == Difficulty::Hard && self.hit_sequence.len() >= 2 {
                    let exhausted = self.exhausted_end(at);
                    log::debug!("bot miss at {} closes {:?} end of hunt", at, exhausted);
                    self.rebuild_along_axis(exhausted);
                }
            }
            Feedback::Rejected => {}
        }
    }

    fn reset_hunt(&mut self) {
        self.targets.clear();
        self.hit_sequence.clear();
    }

    /// Pop queued targets, skipping ones that became tried since they were queued.
    fn next_target(&mut self) -> Option<Coord> {
        while let Some(c) = self.targets.pop_front() {
            if !self.tried.contains(c) {
                return Some(c);
            }
        }
        if !self.hit_sequence.is_empty() {
            log::debug!("bot hunt exhausted without a sink, dropping {} hits", self.hit_sequence.len());
            self.hit_sequence.clear();
        }
        None
    }

    fn enqueue_neighbors(&mut self, at: Coord) {
        for n in at.neighbors4() {
            if !self.tried.contains(n) && !self.targets.contains(&n) {
                self.targets.push_back(n);
            }
        }
    }

    /// Replace the queue with cells extending the current line of hits,
    /// each end stopping at the first tried cell. `exhausted` skips one end.
    fn rebuild_along_axis(&mut self, exhausted: Option<End>) {
        let first = self.hit_sequence[0];
        let Some(axis) = Axis::between(first, self.hit_sequence[1]) else {
            // Second hit is not on a line with the first; keep neighbour hunting.
            if let Some(&last) = self.hit_sequence.last() {
                self.enqueue_neighbors(last);
            }
            return;
        };
        let on_line = self.hit_sequence.iter().copied().filter(|&c| axis.on_line(first, c));
        let (Some(lo), Some(hi)) = (
            on_line.clone().min_by_key(|&c| axis.along(c)),
            on_line.max_by_key(|&c| axis.along(c)),
        ) else {
            return;
        };
        let span = axis.along(hi) - axis.along(lo) + 1;
        let reach = MAX_SHIP_LEN.saturating_sub(span);

        self.targets.clear();
        if exhausted != Some(End::High) {
            self.extend_end(axis, hi, 1, reach);
        }
        if exhausted != Some(End::Low) {
            self.extend_end(axis, lo, -1, reach);
        }
    }

    fn extend_end(&mut self, axis: Axis, from: Coord, dir: isize, reach: usize) {
        let mut cur = from;
        for _ in 0..reach {
            match axis.step(cur, dir) {
                Some(next) if !self.tried.contains(next) => {
                    self.targets.push_back(next);
                    cur = next;
                }
                _ => break,
            }
        }
    }

    /// Which end of the hit line a miss at `at` closes off, if it lies on the line.
    fn exhausted_end(&self, at: Coord) -> Option<End> {
        let first = self.hit_sequence[0];
        let axis = Axis::between(first, self.hit_sequence[1])?;
        if !axis.on_line(first, at) {
            return None;
        }
        let hits_above = self
            .hit_sequence
            .iter()
            .filter(|&&c| axis.on_line(first, c))
            .any(|&c| axis.along(c) > axis.along(at));
        Some(if hits_above { End::Low } else { End::High })
    }

    fn random_untried<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Coord> {
        let open: Vec<Coord> = (!self.tried).iter().collect();
        open.choose(rng).copied()
    }

    /// Next untried checkerboard cell, dropping tried ones from the pool.
    fn checkerboard_candidate(&mut self) -> Option<Coord> {
        while let Some(&c) = self.checkerboard.last() {
            if !self.tried.contains(c) {
                return Some(c);
            }
            self.checkerboard.pop();
        }
        None
    }

    fn known_candidate<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Coord> {
        let open: Vec<Coord> = (self.known_ships & !self.tried).iter().collect();
        open.choose(rng).copied()
    }

    /// Hard tier idle move: three independent draws, one winner among those that fired.
    fn blended<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Coord> {
        let tuning = self.tuning;
        let mut proposals: Vec<Coord> = Vec::with_capacity(3);
        if rng.random_bool(chance(tuning.foreknowledge)) {
            proposals.extend(self.known_candidate(rng));
        }
        if rng.random_bool(chance(tuning.checkerboard)) {
            proposals.extend(self.checkerboard_candidate());
        }
        if rng.random_bool(chance(tuning.random)) {
            proposals.extend(self.random_untried(rng));
        }
        proposals.choose(rng).copied().or_else(|| self.random_untried(rng))
    }
}

/// Clamp a tuning weight into a probability. NaN counts as never.
fn chance(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
