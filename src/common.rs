//! Common types for the game core: coordinates, shot results and board errors.

use core::fmt;
use core::str::FromStr;

use crate::config::BOARD_SIZE;

/// A validated cell on the 10×10 grid.
///
/// `x` is the row (rendered as a letter `A..J`), `y` the column (rendered
/// 1-based). Values are guaranteed in range, so anything holding a `Coord`
/// can index a board without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub struct Coord {
    x: u8,
    y: u8,
}

impl Coord {
    /// Validate `(x, y)` against the board bounds.
    pub fn new(x: usize, y: usize) -> Result<Self, CoordError> {
        if x >= BOARD_SIZE || y >= BOARD_SIZE {
            return Err(CoordError::OutOfRange { x, y });
        }
        Ok(Self {
            x: x as u8,
            y: y as u8,
        })
    }

    /// Row index.
    pub fn x(self) -> usize {
        self.x as usize
    }

    /// Column index.
    pub fn y(self) -> usize {
        self.y as usize
    }

    /// Offset by `(dx, dy)`, or `None` if that leaves the board.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Self> {
        let x = self.x() as isize + dx;
        let y = self.y() as isize + dy;
        if x < 0 || y < 0 {
            return None;
        }
        Self::new(x as usize, y as usize).ok()
    }

    /// In-bounds cardinal neighbours, in up/down/left/right order.
    pub fn neighbors4(self) -> impl Iterator<Item = Coord> {
        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .filter_map(move |(dx, dy)| self.offset(dx, dy))
    }

    /// In-bounds neighbours including diagonals.
    pub fn neighbors8(self) -> impl Iterator<Item = Coord> {
        [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ]
        .into_iter()
        .filter_map(move |(dx, dy)| self.offset(dx, dy))
    }

    /// Every cell on the board in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE * BOARD_SIZE).map(Self::from_index)
    }

    /// Row-major index in `0..100`.
    pub(crate) fn index(self) -> usize {
        self.x() * BOARD_SIZE + self.y()
    }

    pub(crate) fn from_index(idx: usize) -> Self {
        Self {
            x: (idx / BOARD_SIZE) as u8,
            y: (idx % BOARD_SIZE) as u8,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.x) as char, self.y + 1)
    }
}

/// Parses chat notation such as `"A1"` or `"j10"`.
impl FromStr for Coord {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or(CoordError::Malformed)?;
        if !letter.is_ascii_alphabetic() {
            return Err(CoordError::Malformed);
        }
        let x = (letter.to_ascii_uppercase() as u8 - b'A') as usize;
        let digits = chars.as_str();
        // `usize::from_str` would also take a leading `+`.
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoordError::Malformed);
        }
        let y: usize = digits.parse().map_err(|_| CoordError::Malformed)?;
        // Columns are written 1-based.
        let y = y.checked_sub(1).ok_or(CoordError::Malformed)?;
        Coord::new(x, y)
    }
}

/// Rejected coordinate input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoordError {
    #[error("coordinate ({x}, {y}) is outside the {size}x{size} board", size = BOARD_SIZE)]
    OutOfRange { x: usize, y: usize },
    #[error("coordinate must look like A1..J10")]
    Malformed,
}

/// Outcome of a shot that landed on an unresolved cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum GuessResult {
    /// Shot hit open water.
    Miss,
    /// Shot damaged a ship that still has intact segments.
    Hit,
    /// Shot destroyed the last intact segment of a ship.
    Sunk,
}

impl GuessResult {
    /// `true` for `Hit` and `Sunk`.
    pub fn is_hit(self) -> bool {
        !matches!(self, GuessResult::Miss)
    }
}

/// Errors returned by board operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The cell was already resolved to `Miss` or `Hit`; nothing changed.
    #[error("cell was already shot")]
    AlreadyGuessed,
    #[error("ship of length {0} is not part of the fleet")]
    InvalidLength(usize),
    #[error("ship placement is out of bounds")]
    ShipOutOfBounds,
    #[error("ship placement overlaps or touches another ship")]
    ShipOverlaps,
    #[error("unable to place the fleet")]
    UnableToPlaceShip,
}
