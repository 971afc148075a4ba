//! Shot resolution: hits, misses, sinking detection and victory.
//!
//! The resolver knows nothing about turns. Callers validate whose turn it
//! is; `Coord` guarantees the target is on the board.

use alloc::vec::Vec;

use crate::bitboard::BitBoard;
use crate::board::{Board, CellState};
use crate::common::{BoardError, Coord, GuessResult};

impl Board {
    /// Fire at `at`.
    ///
    /// Re-shooting a resolved cell returns `AlreadyGuessed` and leaves the
    /// board untouched. Sinking a ship surrounds it with a halo of `Miss`
    /// cells.
    pub fn apply_shot(&mut self, at: Coord) -> Result<GuessResult, BoardError> {
        match self.cell(at) {
            CellState::Miss | CellState::Hit => Err(BoardError::AlreadyGuessed),
            CellState::Empty => {
                self.set(at, CellState::Miss);
                Ok(GuessResult::Miss)
            }
            CellState::Ship => {
                self.set(at, CellState::Hit);
                match self.sunk_ship_at(at) {
                    Some(ship) => {
                        self.mark_halo(&ship);
                        Ok(GuessResult::Sunk)
                    }
                    None => Ok(GuessResult::Hit),
                }
            }
        }
    }

    /// `true` once no intact ship segment remains.
    pub fn check_victory(&self) -> bool {
        self.remaining_ship_cells() == 0
    }

    /// Collect the ship through `start` by walking 4-connected `Hit`/`Ship`
    /// cells. Returns the ship's cells if none of them is still intact.
    fn sunk_ship_at(&self, start: Coord) -> Option<BitBoard> {
        let mut visited = BitBoard::new();
        let mut stack: Vec<Coord> = Vec::with_capacity(8);
        visited.insert(start);
        stack.push(start);
        while let Some(c) = stack.pop() {
            match self.cell(c) {
                CellState::Ship => return None,
                CellState::Hit => {}
                CellState::Empty | CellState::Miss => continue,
            }
            for n in c.neighbors4() {
                if matches!(self.cell(n), CellState::Hit | CellState::Ship) && visited.insert(n) {
                    stack.push(n);
                }
            }
        }
        Some(visited)
    }

    fn mark_halo(&mut self, ship: &BitBoard) {
        for c in ship {
            for n in c.neighbors8() {
                if self.cell(n) == CellState::Empty {
                    self.set(n, CellState::Miss);
                }
            }
        }
    }
}
