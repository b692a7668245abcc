//! The undoable record of one stroke.

use std::collections::BTreeMap;

use crate::point::{Point, PointContainer};
use crate::segment::{SegmentId, SegmentStore};

/// Before/after labels of one pixel touched by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintedPoint {
    pub old_segment: Option<SegmentId>,
    pub new_segment: Option<SegmentId>,
}

/// One brush stroke's worth of mutation, including the splits it caused.
///
/// `painted_points` holds every pixel whose label changed, so undo and redo
/// are plain reassignment. `effected_segments` maps each segment that lost
/// pixels to the boundary points the stroke opened up in it; it drives split
/// detection and is not read by undo.
#[derive(Debug, Clone, Default)]
pub struct CanvasAction {
    pub painted_points: PointContainer<PaintedPoint>,
    pub effected_segments: BTreeMap<SegmentId, PointContainer<()>>,
}

impl CanvasAction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pixel change. A pixel recorded twice keeps its first
    /// `old_segment` and takes the latest `new_segment`, so undo restores the
    /// label the stroke found and redo lands on the final one. Returns `true`
    /// on the first record.
    pub fn record(&mut self, at: Point, old_segment: Option<SegmentId>, new_segment: Option<SegmentId>) -> bool {
        match self.painted_points.get(at).copied() {
            Some(first) => {
                self.painted_points
                    .set(at, PaintedPoint { old_segment: first.old_segment, new_segment });
                false
            }
            None => {
                self.painted_points
                    .set(at, PaintedPoint { old_segment, new_segment });
                true
            }
        }
    }

    /// Mark `at` as a new boundary point of `segment`.
    pub fn mark_boundary(&mut self, segment: SegmentId, at: Point) {
        self.effected_segments.entry(segment).or_default().set(at, ());
    }

    /// Put every recorded pixel back to the label the action found.
    pub fn revert(&self, store: &mut SegmentStore) {
        for (p, painted) in self.painted_points.iter() {
            store.set_segment(p, painted.old_segment);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.painted_points.is_empty()
    }
}
