//! A fixed-size set of board cells packed into a `u128`.
//!
//! The 10×10 grid needs 100 bits, so every set operation is a single
//! integer operation. `no_std` friendly and allocation free.

use core::fmt;
use core::ops::{BitAnd, BitOr, Not};

use crate::common::Coord;
use crate::config::BOARD_SIZE;

const BOARD_BITS: usize = BOARD_SIZE * BOARD_SIZE;
const MASK: u128 = (1u128 << BOARD_BITS) - 1;

/// Set of cells on the 10×10 board.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BitBoard {
    bits: u128,
}

impl BitBoard {
    /// Empty set.
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Every cell on the board.
    pub const fn full() -> Self {
        Self { bits: MASK }
    }

    pub fn from_coords<I>(coords: I) -> Self
    where
        I: IntoIterator<Item = Coord>,
    {
        let mut board = Self::new();
        for c in coords {
            board.insert(c);
        }
        board
    }

    pub fn contains(&self, c: Coord) -> bool {
        (self.bits >> c.index()) & 1 == 1
    }

    /// Add `c`; returns `true` if it was not already present.
    pub fn insert(&mut self, c: Coord) -> bool {
        let fresh = !self.contains(c);
        self.bits |= 1u128 << c.index();
        fresh
    }

    /// Remove `c`; returns `true` if it was present.
    pub fn remove(&mut self, c: Coord) -> bool {
        let present = self.contains(c);
        self.bits &= !(1u128 << c.index());
        present
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn is_full(&self) -> bool {
        self.bits == MASK
    }

    /// Members in row-major order.
    pub fn iter(&self) -> Cells {
        Cells { bits: self.bits }
    }
}

/// Iterator over the members of a [`BitBoard`].
#[derive(Clone, Copy)]
pub struct Cells {
    bits: u128,
}

impl Iterator for Cells {
    type Item = Coord;

    fn next(&mut self) -> Option<Coord> {
        if self.bits == 0 {
            return None;
        }
        let idx = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some(Coord::from_index(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.bits.count_ones() as usize;
        (n, Some(n))
    }
}

impl<'a> IntoIterator for &'a BitBoard {
    type Item = Coord;
    type IntoIter = Cells;

    fn into_iter(self) -> Cells {
        self.iter()
    }
}

impl FromIterator<Coord> for BitBoard {
    fn from_iter<I: IntoIterator<Item = Coord>>(iter: I) -> Self {
        Self::from_coords(iter)
    }
}

impl BitAnd for BitBoard {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self {
            bits: self.bits & rhs.bits,
        }
    }
}

impl BitOr for BitBoard {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

/// Complement within the board bounds.
impl Not for BitBoard {
    type Output = Self;
    fn not(self) -> Self {
        Self {
            bits: !self.bits & MASK,
        }
    }
}

impl fmt::Debug for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitBoard ({} cells):", self.len())?;
        for idx in 0..BOARD_BITS {
            let bit = if (self.bits >> idx) & 1 == 1 { '■' } else { '□' };
            write!(f, "{} ", bit)?;
            if idx % BOARD_SIZE == BOARD_SIZE - 1 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
