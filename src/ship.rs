//! Ship placements.
//!
//! Ships are not stored on the board as entities: once placed they are just
//! contiguous `Ship` cells. A [`Placement`] only exists while laying out a
//! fleet.

use core::fmt;

use rand::Rng;

use crate::bitboard::BitBoard;
use crate::common::{BoardError, Coord};
use crate::config::{BOARD_SIZE, MAX_SHIP_LEN};

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Ship extends along increasing `y`.
    Horizontal,
    /// Ship extends along increasing `x`.
    Vertical,
}

impl Orientation {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random() {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

/// A ship of `length` cells starting at `origin`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    origin: Coord,
    length: usize,
    orientation: Orientation,
}

impl Placement {
    /// Returns `ShipOutOfBounds` if any segment would fall off the board.
    pub fn new(origin: Coord, length: usize, orientation: Orientation) -> Result<Self, BoardError> {
        if length == 0 || length > MAX_SHIP_LEN {
            return Err(BoardError::InvalidLength(length));
        }
        let end = match orientation {
            Orientation::Horizontal => origin.y() + length,
            Orientation::Vertical => origin.x() + length,
        };
        if end > BOARD_SIZE {
            return Err(BoardError::ShipOutOfBounds);
        }
        Ok(Self {
            origin,
            length,
            orientation,
        })
    }

    pub fn origin(&self) -> Coord {
        self.origin
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Segments from the origin outward.
    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.length).filter_map(move |i| match self.orientation {
            Orientation::Horizontal => self.origin.offset(0, i as isize),
            Orientation::Vertical => self.origin.offset(i as isize, 0),
        })
    }

    /// Occupancy mask of the ship.
    pub fn mask(&self) -> BitBoard {
        self.cells().collect()
    }
}

impl fmt::Debug for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Placement {{ origin: {}, length: {}, orientation: {:?} }}",
            self.origin, self.length, self.orientation
        )
    }
}
