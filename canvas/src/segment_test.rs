#![allow(clippy::float_cmp)]

use super::*;
use crate::render::RgbaBuffer;

// =============================================================
// Helpers
// =============================================================

fn fill_rect(store: &mut SegmentStore, x0: i32, y0: i32, x1: i32, y1: i32, segment: SegmentId) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            store.set_segment(Point::new(x, y), Some(segment));
        }
    }
}

/// Erase `points` as one action and run split detection.
fn erase(store: &mut SegmentStore, points: &[Point], next: &mut SegmentId) -> (CanvasAction, Vec<Split>) {
    let mut action = CanvasAction::new();
    for p in points {
        store.paint(&mut action, *p, None);
    }
    let splits = store.recompute_segments(&mut action, next).unwrap();
    (action, splits)
}

fn count(store: &SegmentStore, segment: SegmentId) -> usize {
    store.cells().iter().filter(|c| **c == Some(segment)).count()
}

// =============================================================
// set_segment
// =============================================================

#[test]
fn new_store_is_unpainted() {
    let store = SegmentStore::new(4, 3);
    assert_eq!(store.cells().len(), 12);
    assert!(store.cells().iter().all(Option::is_none));
    assert!(store.live_segments().is_empty());
}

#[test]
fn set_segment_returns_previous_label() {
    let mut store = SegmentStore::new(4, 4);
    assert_eq!(store.set_segment(Point::new(1, 1), Some(3)), None);
    assert_eq!(store.set_segment(Point::new(1, 1), Some(5)), Some(3));
    assert_eq!(store.segment_at(Point::new(1, 1)), Some(5));
    assert!(store.segment_points(3).unwrap().is_empty());
}

#[test]
fn set_segment_to_same_label_changes_nothing() {
    let mut store = SegmentStore::new(4, 4);
    fill_rect(&mut store, 0, 0, 1, 0, 1);
    let before = store.segment_points(1).unwrap().get(Point::new(0, 0)).copied();
    store.set_segment(Point::new(0, 0), Some(1));
    let after = store.segment_points(1).unwrap().get(Point::new(0, 0)).copied();
    assert_eq!(before, after);
    assert_eq!(after, Some(Neighbors { num_neighbors: 1 }));
}

#[test]
fn set_segment_out_of_bounds_is_ignored() {
    let mut store = SegmentStore::new(2, 2);
    assert_eq!(store.set_segment(Point::new(-1, 0), Some(1)), None);
    assert_eq!(store.set_segment(Point::new(2, 0), Some(1)), None);
    assert!(store.live_segments().is_empty());
    assert_eq!(store.segment_at(Point::new(5, 5)), None);
}

#[test]
fn neighbor_counts_track_block() {
    let mut store = SegmentStore::new(5, 5);
    fill_rect(&mut store, 0, 0, 2, 2, 1);
    let points = store.segment_points(1).unwrap();
    assert_eq!(points.len(), 9);
    assert_eq!(points.get(Point::new(1, 1)).unwrap().num_neighbors, 4);
    assert_eq!(points.get(Point::new(0, 0)).unwrap().num_neighbors, 2);
    assert_eq!(points.get(Point::new(1, 0)).unwrap().num_neighbors, 3);
    assert_eq!(store.boundary(1).len(), 8);
    assert!(!store.boundary(1).has(Point::new(1, 1)));
}

#[test]
fn removing_pixel_exposes_neighbors() {
    let mut store = SegmentStore::new(5, 5);
    fill_rect(&mut store, 0, 0, 2, 2, 1);
    store.set_segment(Point::new(1, 0), None);
    let points = store.segment_points(1).unwrap();
    assert_eq!(points.get(Point::new(1, 1)).unwrap().num_neighbors, 3);
    assert_eq!(points.get(Point::new(0, 0)).unwrap().num_neighbors, 1);
    assert!(store.boundary(1).has(Point::new(1, 1)));
}

#[test]
fn relabel_moves_pixel_between_segments() {
    let mut store = SegmentStore::new(3, 1);
    fill_rect(&mut store, 0, 0, 2, 0, 1);
    store.set_segment(Point::new(2, 0), Some(2));
    assert_eq!(store.segment_points(1).unwrap().len(), 2);
    assert_eq!(store.segment_points(2).unwrap().len(), 1);
    assert_eq!(store.segment_points(2).unwrap().get(Point::new(2, 0)).unwrap().num_neighbors, 0);
    assert_eq!(store.segment_points(1).unwrap().get(Point::new(1, 0)).unwrap().num_neighbors, 1);
    assert_eq!(store.live_segments(), vec![1, 2]);
}

#[test]
fn segment_color_is_stable_and_never_assigned_by_lookup() {
    let mut store = SegmentStore::new(2, 2);
    assert_eq!(store.segment_color(9), None);
    let color = store.ensure_segment(9).color;
    assert_eq!(store.segment_color(9), Some(color));
    store.set_segment(Point::new(0, 0), Some(9));
    assert_eq!(store.segment_color(9), Some(color));
}

// =============================================================
// Sink writes
// =============================================================

#[test]
fn sink_receives_interior_and_boundary_alpha() {
    let buffer = RgbaBuffer::new(3, 3);
    let mut store = SegmentStore::new(3, 3).with_sink(buffer.clone());
    fill_rect(&mut store, 0, 0, 2, 2, 1);
    let color = store.segment_color(1).unwrap();

    let center = buffer.pixel(Point::new(1, 1)).unwrap();
    assert_eq!(center, [color.r, color.g, color.b, 128]);
    assert_eq!(buffer.pixel(Point::new(0, 0)).unwrap()[3], 255);

    store.set_segment(Point::new(1, 0), None);
    assert_eq!(buffer.pixel(Point::new(1, 0)).unwrap()[3], 0);
    assert_eq!(buffer.pixel(Point::new(1, 1)).unwrap()[3], 255);
}

// =============================================================
// Split detection
// =============================================================

#[test]
fn erasing_middle_of_row_splits_in_two() {
    let mut store = SegmentStore::new(4, 4);
    fill_rect(&mut store, 0, 0, 3, 0, 0);
    let mut next = 1;

    let (action, splits) = erase(&mut store, &[Point::new(1, 0), Point::new(2, 0)], &mut next);

    let left = store.segment_at(Point::new(0, 0)).unwrap();
    let right = store.segment_at(Point::new(3, 0)).unwrap();
    assert_ne!(left, right);
    assert_eq!(splits.len(), 1);
    assert_eq!(next, 2);
    for (p, id) in [(Point::new(0, 0), left), (Point::new(3, 0), right)] {
        assert_eq!(store.segment_points(id).unwrap().get(p).unwrap().num_neighbors, 0);
    }

    let relabeled = action.painted_points.get(Point::new(3, 0)).unwrap();
    assert_eq!(relabeled.old_segment, Some(0));
    assert_eq!(relabeled.new_segment, Some(1));
}

#[test]
fn split_into_three_conserves_pixels() {
    let mut store = SegmentStore::new(7, 1);
    fill_rect(&mut store, 0, 0, 6, 0, 0);
    let mut next = 1;

    let (_, splits) = erase(&mut store, &[Point::new(2, 0), Point::new(4, 0)], &mut next);

    assert_eq!(splits.len(), 2);
    assert_eq!(count(&store, 0) + count(&store, 1) + count(&store, 2), 5);
    let ids = [
        store.segment_at(Point::new(0, 0)),
        store.segment_at(Point::new(3, 0)),
        store.segment_at(Point::new(5, 0)),
    ];
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_ne!(ids[0], ids[2]);
    assert_eq!(store.segment_at(Point::new(1, 0)), ids[0]);
    assert_eq!(store.segment_at(Point::new(6, 0)), ids[2]);
    let relabeled: usize = splits.iter().map(|s| s.pixels).sum();
    assert_eq!(relabeled, count(&store, 1) + count(&store, 2));
}

#[test]
fn split_ids_are_allocated_in_order() {
    let mut store = SegmentStore::new(7, 1);
    fill_rect(&mut store, 0, 0, 6, 0, 0);
    let mut next = 10;

    let (_, splits) = erase(&mut store, &[Point::new(2, 0), Point::new(4, 0)], &mut next);

    assert_eq!(splits.iter().map(|s| s.segment).collect::<Vec<_>>(), vec![10, 11]);
    assert!(splits.iter().all(|s| s.from == 0));
    assert_eq!(next, 12);
}

#[test]
fn piece_with_hole_is_not_split() {
    let mut store = SegmentStore::new(9, 9);
    fill_rect(&mut store, 1, 1, 7, 7, 0);
    let mut next = 1;

    let (_, splits) = erase(&mut store, &[Point::new(4, 4)], &mut next);

    assert!(splits.is_empty());
    assert_eq!(next, 1);
    assert_eq!(count(&store, 0), 48);
}

#[test]
fn holed_piece_and_cut_off_piece_get_distinct_ids() {
    let mut store = SegmentStore::new(16, 16);
    fill_rect(&mut store, 0, 0, 15, 15, 0);
    let mut next = 1;
    erase(&mut store, &[Point::new(4, 4)], &mut next);

    let row: Vec<Point> = (0..16).map(|x| Point::new(x, 10)).collect();
    let (_, splits) = erase(&mut store, &row, &mut next);

    let top = store.segment_at(Point::new(0, 0));
    let bottom = store.segment_at(Point::new(0, 15));
    assert_eq!(splits.len(), 1);
    assert_ne!(top, bottom);
    assert_eq!(top, Some(0));
    assert_eq!(count(&store, 0), 16 * 10 - 1);
    assert_eq!(count(&store, splits[0].segment), 16 * 5);
    assert_eq!(store.segment_at(Point::new(4, 3)), top);
}

#[test]
fn erase_without_cut_keeps_one_segment() {
    let mut store = SegmentStore::new(5, 5);
    fill_rect(&mut store, 0, 0, 4, 1, 0);
    let mut next = 1;

    let (_, splits) = erase(&mut store, &[Point::new(2, 0)], &mut next);

    assert!(splits.is_empty());
    assert_eq!(store.live_segments(), vec![0]);
}

#[test]
fn erasing_whole_segment_leaves_nothing() {
    let mut store = SegmentStore::new(3, 1);
    fill_rect(&mut store, 0, 0, 2, 0, 4);
    let mut next = 5;

    let (action, splits) = erase(&mut store, &[Point::new(0, 0), Point::new(1, 0), Point::new(2, 0)], &mut next);

    assert!(splits.is_empty());
    assert!(store.live_segments().is_empty());
    assert_eq!(action.painted_points.len(), 3);
}

#[test]
fn draw_over_segment_splits_it() {
    let mut store = SegmentStore::new(5, 3);
    fill_rect(&mut store, 0, 1, 4, 1, 0);
    let mut next = 2;

    let mut action = CanvasAction::new();
    for y in 0..3 {
        store.paint(&mut action, Point::new(2, y), Some(1));
    }
    let splits = store.recompute_segments(&mut action, &mut next).unwrap();

    assert_eq!(splits.len(), 1);
    assert_eq!(splits[0].from, 0);
    assert_eq!(count(&store, 1), 3);
    assert_ne!(store.segment_at(Point::new(0, 1)), store.segment_at(Point::new(4, 1)));
}

// =============================================================
// Replay
// =============================================================

#[test]
fn flood_relabel_reproduces_split() {
    let mut authority = SegmentStore::new(7, 1);
    let mut replica = SegmentStore::new(7, 1);
    fill_rect(&mut authority, 0, 0, 6, 0, 0);
    fill_rect(&mut replica, 0, 0, 6, 0, 0);
    let mut next = 1;

    let cut = [Point::new(2, 0), Point::new(4, 0)];
    let (_, splits) = erase(&mut authority, &cut, &mut next);
    for p in cut {
        replica.set_segment(p, None);
    }
    for split in &splits {
        let n = replica.flood_relabel(split.seed, split.from, split.segment).unwrap();
        assert_eq!(n, split.pixels);
    }

    assert_eq!(authority.cells(), replica.cells());
}

#[test]
fn flood_relabel_rejects_wrong_seed() {
    let mut store = SegmentStore::new(3, 1);
    store.set_segment(Point::new(0, 0), Some(1));

    let err = store.flood_relabel(Point::new(2, 0), 1, 2).unwrap_err();
    assert_eq!(err, CanvasError::FillSeedMismatch { seed: Point::new(2, 0), expected: 1, found: None });
    assert_eq!(store.segment_at(Point::new(0, 0)), Some(1));
}

#[test]
fn flood_relabel_stays_four_connected() {
    let mut store = SegmentStore::new(2, 2);
    store.set_segment(Point::new(0, 0), Some(1));
    store.set_segment(Point::new(1, 1), Some(1));

    assert_eq!(store.flood_relabel(Point::new(0, 0), 1, 2).unwrap(), 1);
    assert_eq!(store.segment_at(Point::new(1, 1)), Some(1));
}
