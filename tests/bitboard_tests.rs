use seabattle::{BitBoard, Coord, BOARD_SIZE};

fn c(x: usize, y: usize) -> Coord {
    Coord::new(x, y).unwrap()
}

#[test]
fn test_insert_remove_contains() {
    let mut bb = BitBoard::new();
    assert!(bb.is_empty());

    assert!(bb.insert(c(1, 1)));
    assert!(!bb.insert(c(1, 1)));
    assert!(bb.contains(c(1, 1)));
    assert_eq!(bb.len(), 1);

    assert!(bb.remove(c(1, 1)));
    assert!(!bb.remove(c(1, 1)));
    assert!(bb.is_empty());
}

#[test]
fn test_full_and_complement() {
    let full = BitBoard::full();
    assert!(full.is_full());
    assert_eq!(full.len(), BOARD_SIZE * BOARD_SIZE);

    let mut one = BitBoard::new();
    one.insert(c(9, 9));
    let rest = !one;
    assert_eq!(rest.len(), BOARD_SIZE * BOARD_SIZE - 1);
    assert!(!rest.contains(c(9, 9)));
    assert!((!BitBoard::full()).is_empty());
}

#[test]
fn test_set_ops() {
    let a = BitBoard::from_coords([c(0, 0), c(0, 1), c(0, 2)]);
    let b = BitBoard::from_coords([c(0, 2), c(5, 5)]);
    assert_eq!((a & b).iter().collect::<Vec<_>>(), vec![c(0, 2)]);
    assert_eq!((a | b).len(), 4);
}

#[test]
fn test_iter_in_row_major_order() {
    let coords = [c(3, 0), c(0, 9), c(9, 0), c(0, 0)];
    let bb: BitBoard = coords.into_iter().collect();
    let got: Vec<Coord> = (&bb).into_iter().collect();
    assert_eq!(got, vec![c(0, 0), c(0, 9), c(3, 0), c(9, 0)]);
}
