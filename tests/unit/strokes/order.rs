use super::*;
use crate::strokes::path::PathPoint;

fn path_from(x: u32, y: u32) -> DrawingPath {
    DrawingPath::new(vec![PathPoint::new(x, y), PathPoint::new(x + 1, y)]).unwrap()
}

#[test]
fn sorts_top_to_bottom_then_left_to_right() {
    let ordered = order_strokes(vec![
        path_from(5, 9),
        path_from(9, 1),
        path_from(2, 9),
        path_from(0, 4),
    ]);
    let firsts: Vec<_> = ordered.iter().map(|p| (p.first().x, p.first().y)).collect();
    assert_eq!(firsts, vec![(9, 1), (0, 4), (2, 9), (5, 9)]);
}

#[test]
fn equal_starts_keep_input_order() {
    let a = DrawingPath::new(vec![PathPoint::new(1, 1), PathPoint::new(2, 2)]).unwrap();
    let b = DrawingPath::new(vec![PathPoint::new(1, 1), PathPoint::new(0, 2)]).unwrap();
    let ordered = order_strokes(vec![a.clone(), b.clone()]);
    assert_eq!(ordered, vec![a, b]);
}

#[test]
fn empty_input_is_fine() {
    assert!(order_strokes(Vec::new()).is_empty());
}
