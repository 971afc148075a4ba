//! Game board: a 10×10 grid of cell states plus random fleet layout.

use core::fmt;

use rand::Rng;

use crate::bitboard::BitBoard;
use crate::common::{BoardError, Coord};
use crate::config::{BOARD_SIZE, FLEET, PLACEMENT_ATTEMPTS_PER_SHIP, PLACEMENT_RESTARTS};
use crate::ship::{Orientation, Placement};

/// State of a single cell.
///
/// The only legal transitions are `Empty -> Miss` and `Ship -> Hit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum CellState {
    #[default]
    Empty,
    Ship,
    Miss,
    Hit,
}

impl CellState {
    /// `true` once the cell has been shot (or haloed).
    pub fn is_resolved(self) -> bool {
        matches!(self, CellState::Miss | CellState::Hit)
    }
}

/// One participant's grid.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    cells: [CellState; BOARD_SIZE * BOARD_SIZE],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Empty board, no ships.
    pub fn new() -> Self {
        Self {
            cells: [CellState::Empty; BOARD_SIZE * BOARD_SIZE],
        }
    }

    /// Empty board with the standard fleet laid out at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Result<Self, BoardError> {
        let mut board = Self::new();
        board.place_all_ships(rng)?;
        Ok(board)
    }

    /// Board with ships at fixed positions, `(origin, length, orientation)` each.
    /// The no-touch rule still applies.
    pub fn from_layout(layout: &[(Coord, usize, Orientation)]) -> Result<Self, BoardError> {
        let mut board = Self::new();
        for &(origin, length, orientation) in layout {
            board.place_ship(origin, length, orientation)?;
        }
        Ok(board)
    }

    pub fn cell(&self, c: Coord) -> CellState {
        self.cells[c.index()]
    }

    pub(crate) fn set(&mut self, c: Coord, state: CellState) {
        self.cells[c.index()] = state;
    }

    /// Number of cells currently in `state`.
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&s| s == state).count()
    }

    /// Cells occupied by a ship segment, hit or not.
    pub fn ship_cells(&self) -> BitBoard {
        Coord::all()
            .filter(|&c| matches!(self.cell(c), CellState::Ship | CellState::Hit))
            .collect()
    }

    /// Intact ship segments left on the board.
    pub fn remaining_ship_cells(&self) -> usize {
        self.count(CellState::Ship)
    }

    /// `true` until the first shot lands on this board.
    pub fn is_pristine(&self) -> bool {
        !self.cells.iter().any(|s| s.is_resolved())
    }

    /// Every target cell is empty and none of them borders a ship, diagonals included.
    pub fn can_place(&self, placement: &Placement) -> bool {
        placement.cells().all(|c| {
            self.cell(c) == CellState::Empty
                && c.neighbors8().all(|n| self.cell(n) != CellState::Ship)
        })
    }

    /// Place a single ship, enforcing bounds and the no-touch rule.
    pub fn place_ship(
        &mut self,
        origin: Coord,
        length: usize,
        orientation: Orientation,
    ) -> Result<(), BoardError> {
        let placement = Placement::new(origin, length, orientation)?;
        if !self.can_place(&placement) {
            return Err(BoardError::ShipOverlaps);
        }
        for c in placement.cells() {
            self.set(c, CellState::Ship);
        }
        Ok(())
    }

    /// Rejection-sample a legal placement for a ship of `length`.
    /// Returns `None` after `PLACEMENT_ATTEMPTS_PER_SHIP` misses.
    pub fn random_placement<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        length: usize,
    ) -> Result<Option<Placement>, BoardError> {
        for _ in 0..PLACEMENT_ATTEMPTS_PER_SHIP {
            let orientation = Orientation::random(rng);
            let (max_x, max_y) = match orientation {
                Orientation::Horizontal => (BOARD_SIZE - 1, BOARD_SIZE - length),
                Orientation::Vertical => (BOARD_SIZE - length, BOARD_SIZE - 1),
            };
            let origin = Coord::new(rng.random_range(0..=max_x), rng.random_range(0..=max_y))
                .map_err(|_| BoardError::ShipOutOfBounds)?;
            let placement = Placement::new(origin, length, orientation)?;
            if self.can_place(&placement) {
                return Ok(Some(placement));
            }
        }
        Ok(None)
    }

    /// Lay out the whole fleet at random, replacing any existing content.
    ///
    /// A ship that cannot be fitted restarts the layout from an empty board;
    /// `UnableToPlaceShip` is only returned after `PLACEMENT_RESTARTS` of those.
    pub fn place_all_ships<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), BoardError> {
        'layout: for restart in 0..PLACEMENT_RESTARTS {
            *self = Self::new();
            for &length in FLEET.iter() {
                match self.random_placement(rng, length)? {
                    Some(placement) => {
                        for c in placement.cells() {
                            self.set(c, CellState::Ship);
                        }
                    }
                    None => {
                        log::debug!("fleet layout stalled on length {}, restart {}", length, restart);
                        continue 'layout;
                    }
                }
            }
            return Ok(());
        }
        Err(BoardError::UnableToPlaceShip)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {{")?;
        for x in 0..BOARD_SIZE {
            write!(f, "  ")?;
            for y in 0..BOARD_SIZE {
                let ch = match self.cells[x * BOARD_SIZE + y] {
                    CellState::Empty => '.',
                    CellState::Ship => '#',
                    CellState::Miss => 'o',
                    CellState::Hit => 'X',
                };
                write!(f, "{}", ch)?;
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}
