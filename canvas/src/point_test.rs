use super::*;

// =============================================================
// Point
// =============================================================

#[test]
fn point_serializes_as_pair() {
    let json = serde_json::to_string(&Point::new(3, -1)).unwrap();
    assert_eq!(json, "[3,-1]");
    let back: Point = serde_json::from_str("[7,2]").unwrap();
    assert_eq!(back, Point::new(7, 2));
}

#[test]
fn neighbors4_are_edge_adjacent() {
    let n = Point::new(5, 5).neighbors4();
    assert!(n.contains(&Point::new(4, 5)));
    assert!(n.contains(&Point::new(6, 5)));
    assert!(n.contains(&Point::new(5, 4)));
    assert!(n.contains(&Point::new(5, 6)));
}

#[test]
fn neighbors8_include_diagonals() {
    let n = Point::new(0, 0).neighbors8();
    assert_eq!(n.len(), 8);
    assert!(n.contains(&Point::new(-1, -1)));
    assert!(n.contains(&Point::new(1, 1)));
    assert!(!n.contains(&Point::new(0, 0)));
}

#[test]
fn point_display() {
    assert_eq!(Point::new(1, 2).to_string(), "(1, 2)");
}

// =============================================================
// PointContainer
// =============================================================

#[test]
fn set_get_has_delete() {
    let mut c = PointContainer::new();
    assert!(c.is_empty());
    c.set(Point::new(1, 1), 10);
    assert!(c.has(Point::new(1, 1)));
    assert_eq!(c.get(Point::new(1, 1)), Some(&10));
    assert_eq!(c.len(), 1);

    c.set(Point::new(1, 1), 11);
    assert_eq!(c.len(), 1);
    assert_eq!(c.get(Point::new(1, 1)), Some(&11));

    assert_eq!(c.delete(Point::new(1, 1)), Some(11));
    assert!(!c.has(Point::new(1, 1)));
    assert_eq!(c.delete(Point::new(1, 1)), None);
}

#[test]
fn set_if_absent_keeps_first_value() {
    let mut c = PointContainer::new();
    assert!(c.set_if_absent(Point::new(0, 0), "first"));
    assert!(!c.set_if_absent(Point::new(0, 0), "second"));
    assert_eq!(c.get(Point::new(0, 0)), Some(&"first"));
}

#[test]
fn filter_is_non_destructive() {
    let c: PointContainer<u8> = (0..5).map(|i| (Point::new(i, 0), u8::try_from(i).unwrap())).collect();
    let even = c.filter(|_, v| v % 2 == 0);
    assert_eq!(even.len(), 3);
    assert_eq!(c.len(), 5);
    assert!(even.has(Point::new(4, 0)));
    assert!(!even.has(Point::new(3, 0)));
}

#[test]
fn for_each_visits_every_entry() {
    let c: PointContainer<()> = [Point::new(0, 0), Point::new(2, 3), Point::new(-1, 4)]
        .into_iter()
        .collect();
    let mut seen = Vec::new();
    c.for_each(|p, ()| seen.push(p));
    seen.sort();
    assert_eq!(seen, vec![Point::new(-1, 4), Point::new(0, 0), Point::new(2, 3)]);
}

#[test]
fn first_is_lowest_row_major() {
    let c: PointContainer<()> = [Point::new(5, 1), Point::new(9, 0), Point::new(0, 2)]
        .into_iter()
        .collect();
    assert_eq!(c.first(), Some(Point::new(9, 0)));
    assert_eq!(PointContainer::<()>::new().first(), None);
}

#[test]
fn sorted_points_row_major() {
    let c: PointContainer<()> = [Point::new(1, 1), Point::new(0, 1), Point::new(3, 0)]
        .into_iter()
        .collect();
    assert_eq!(c.sorted_points(), vec![Point::new(3, 0), Point::new(0, 1), Point::new(1, 1)]);
}
