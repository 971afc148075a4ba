use rand::rngs::SmallRng;
use rand::SeedableRng;
use seabattle::{
    Board, BoardError, CellState, Coord, Orientation, Placement, BOARD_SIZE, TOTAL_SHIP_CELLS,
};

fn c(x: usize, y: usize) -> Coord {
    Coord::new(x, y).unwrap()
}

#[test]
fn test_coord_bounds() {
    assert!(Coord::new(9, 9).is_ok());
    assert!(Coord::new(10, 0).is_err());
    assert!(Coord::new(0, 10).is_err());
}

#[test]
fn test_coord_parse_and_display() {
    assert_eq!("A1".parse::<Coord>().unwrap(), c(0, 0));
    assert_eq!("j10".parse::<Coord>().unwrap(), c(9, 9));
    assert_eq!(c(1, 6).to_string(), "B7");
    assert!("A0".parse::<Coord>().is_err());
    assert!("K1".parse::<Coord>().is_err());
    assert!("A11".parse::<Coord>().is_err());
    assert!("".parse::<Coord>().is_err());
    assert!("11".parse::<Coord>().is_err());
    assert!("A+5".parse::<Coord>().is_err());
    assert!("A".parse::<Coord>().is_err());
    assert!("B 3".parse::<Coord>().is_err());
    assert_eq!(" c3 ".parse::<Coord>().unwrap(), c(2, 2));
}

#[test]
fn test_neighbors_at_corner() {
    assert_eq!(c(0, 0).neighbors4().count(), 2);
    assert_eq!(c(0, 0).neighbors8().count(), 3);
    assert_eq!(c(5, 5).neighbors8().count(), 8);
}

#[test]
fn test_placement_bounds() {
    assert!(Placement::new(c(0, 6), 4, Orientation::Horizontal).is_ok());
    assert_eq!(
        Placement::new(c(0, 7), 4, Orientation::Horizontal).unwrap_err(),
        BoardError::ShipOutOfBounds
    );
    assert_eq!(
        Placement::new(c(7, 0), 4, Orientation::Vertical).unwrap_err(),
        BoardError::ShipOutOfBounds
    );
    assert_eq!(
        Placement::new(c(0, 0), 5, Orientation::Vertical).unwrap_err(),
        BoardError::InvalidLength(5)
    );
}

#[test]
fn test_place_ship_rejects_touching() {
    let mut board = Board::new();
    board.place_ship(c(2, 2), 3, Orientation::Horizontal).unwrap();
    // Diagonal contact with (2,2).
    assert_eq!(
        board.place_ship(c(3, 1), 1, Orientation::Horizontal),
        Err(BoardError::ShipOverlaps)
    );
    // Direct overlap.
    assert_eq!(
        board.place_ship(c(0, 3), 3, Orientation::Vertical),
        Err(BoardError::ShipOverlaps)
    );
    // One empty cell in between is fine.
    board.place_ship(c(4, 2), 2, Orientation::Horizontal).unwrap();
    assert_eq!(board.count(CellState::Ship), 5);
}

#[test]
fn test_random_board_has_full_fleet() {
    let mut rng = SmallRng::seed_from_u64(42);
    let board = Board::random(&mut rng).unwrap();
    assert_eq!(board.count(CellState::Ship), TOTAL_SHIP_CELLS);
    assert_eq!(board.count(CellState::Empty), BOARD_SIZE * BOARD_SIZE - TOTAL_SHIP_CELLS);
    assert!(board.is_pristine());
}

#[test]
fn test_from_layout() {
    let board = Board::from_layout(&[
        (c(0, 0), 4, Orientation::Horizontal),
        (c(9, 9), 1, Orientation::Vertical),
    ])
    .unwrap();
    assert_eq!(board.remaining_ship_cells(), 5);
    assert_eq!(board.cell(c(0, 3)), CellState::Ship);
    assert_eq!(board.cell(c(0, 4)), CellState::Empty);
    assert_eq!(board.ship_cells().len(), 5);
}

#[test]
fn test_from_layout_rejects_touching() {
    let err = Board::from_layout(&[
        (c(0, 0), 2, Orientation::Horizontal),
        (c(1, 2), 1, Orientation::Horizontal),
    ])
    .unwrap_err();
    assert_eq!(err, BoardError::ShipOverlaps);
}

#[test]
fn test_seeded_layouts_are_reproducible() {
    let a = Board::random(&mut SmallRng::seed_from_u64(7)).unwrap();
    let b = Board::random(&mut SmallRng::seed_from_u64(7)).unwrap();
    assert_eq!(a, b);
}
