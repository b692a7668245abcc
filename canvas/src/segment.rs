//! Segment store: the pixel→segment grid and per-segment boundary sets.
//!
//! DESIGN
//! ======
//! Every pixel carries at most one segment id. For each segment the store
//! keeps a [`PointContainer`] of its pixels annotated with `num_neighbors`,
//! the count of 4-neighbors sharing the id. A pixel is a boundary pixel iff
//! that count is below four. [`SegmentStore::set_segment`] keeps the counts
//! consistent with the grid in the same call that changes the grid, so the
//! boundary set of a segment is always exact.
//!
//! SPLIT DETECTION
//! ===============
//! After a stroke removes pixels from a segment, the segment may have fallen
//! apart. [`SegmentStore::recompute_segments`] walks the segment's boundary
//! with an 8-connected BFS restricted to boundary pixels: a single ring means
//! a single piece. Otherwise a 4-connected flood from the walk's seed finds
//! the piece that keeps the id, including any hole rings inside it. Each
//! boundary pixel outside that piece seeds another flood that finds one
//! detached piece exactly, and that piece is relabeled under a freshly
//! allocated id.
//!
//! The asymmetry is deliberate: a 4-connected erase line never leaves two
//! pieces touching only at a corner, so an 8-connected ring walk is enough
//! to decide connectivity, while relabeling must stay 4-connected so it
//! never bleeds across a diagonal gap into a neighbor.

#[cfg(test)]
#[path = "segment_test.rs"]
mod segment_test;

use std::collections::{HashMap, VecDeque};

use crate::action::CanvasAction;
use crate::consts::{BOUNDARY_ALPHA_BOOST, DRAW_ALPHA, ERASED_ALPHA, FULL_NEIGHBORS};
use crate::point::{Point, PointContainer};
use crate::render::{NullSink, PixelSink, Rgb};

/// Segment identifier. Allocated in strictly increasing order per room.
pub type SegmentId = u32;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanvasError {
    /// The frontier of a segment was non-empty but yielded no seed pixel.
    #[error("segment {segment} has a non-empty frontier with no extractable seed")]
    EmptyFrontier { segment: SegmentId },
    /// A replayed relabel started on a pixel that does not carry the expected id.
    #[error("fill seed {seed} expected segment {expected}, found {found:?}")]
    FillSeedMismatch { seed: Point, expected: SegmentId, found: Option<SegmentId> },
}

/// Boundary bookkeeping for one pixel of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighbors {
    /// Same-segment 4-neighbors, 0..=4.
    pub num_neighbors: u8,
}

impl Neighbors {
    #[must_use]
    pub fn is_boundary(self) -> bool {
        self.num_neighbors < FULL_NEIGHBORS
    }
}

/// Color and pixel set of one segment.
#[derive(Debug, Clone)]
pub struct SegmentRecord {
    pub color: Rgb,
    pub points: PointContainer<Neighbors>,
}

/// One relabel performed by split detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    /// The segment that fell apart.
    pub from: SegmentId,
    /// The id given to the detached piece.
    pub segment: SegmentId,
    /// A pixel of the detached piece; flooding from here over `from`
    /// reproduces the relabel.
    pub seed: Point,
    /// Number of pixels relabeled.
    pub pixels: usize,
}

/// Fixed-size row-major grid of optional segment ids.
#[derive(Debug, Clone)]
struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Option<SegmentId>>,
}

impl Grid {
    fn new(width: u32, height: u32) -> Self {
        Self { width, height, cells: vec![None; width as usize * height as usize] }
    }

    fn index(&self, p: Point) -> Option<usize> {
        let (Ok(x), Ok(y)) = (u32::try_from(p.x), u32::try_from(p.y)) else {
            return None;
        };
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Segment at `p`; out-of-bounds points read as unpainted.
    fn get(&self, p: Point) -> Option<SegmentId> {
        self.index(p).and_then(|i| self.cells[i])
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct SegmentStore {
    grid: Grid,
    segments: HashMap<SegmentId, SegmentRecord>,
    sink: Box<dyn PixelSink>,
}

impl SegmentStore {
    /// An unpainted store writing to a [`NullSink`].
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { grid: Grid::new(width, height), segments: HashMap::new(), sink: Box::new(NullSink) }
    }

    /// Replace the rendering sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl PixelSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.grid.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.grid.height
    }

    #[must_use]
    pub fn in_bounds(&self, p: Point) -> bool {
        self.grid.index(p).is_some()
    }

    #[must_use]
    pub fn segment_at(&self, p: Point) -> Option<SegmentId> {
        self.grid.get(p)
    }

    /// Row-major copy of every cell; two stores with equal cells have the
    /// same id partition.
    #[must_use]
    pub fn cells(&self) -> &[Option<SegmentId>] {
        &self.grid.cells
    }

    /// Make sure `segment` has a record, assigning its color on first use.
    pub fn ensure_segment(&mut self, segment: SegmentId) -> &SegmentRecord {
        self.segments
            .entry(segment)
            .or_insert_with(|| SegmentRecord { color: Rgb::random(), points: PointContainer::new() })
    }

    #[must_use]
    pub fn segment(&self, segment: SegmentId) -> Option<&SegmentRecord> {
        self.segments.get(&segment)
    }

    /// Color of `segment`, if it has ever been ensured. Never assigns.
    #[must_use]
    pub fn segment_color(&self, segment: SegmentId) -> Option<Rgb> {
        self.segments.get(&segment).map(|r| r.color)
    }

    #[must_use]
    pub fn segment_points(&self, segment: SegmentId) -> Option<&PointContainer<Neighbors>> {
        self.segments.get(&segment).map(|r| &r.points)
    }

    /// Boundary pixels of `segment` (empty if it has no pixels).
    #[must_use]
    pub fn boundary(&self, segment: SegmentId) -> PointContainer<Neighbors> {
        self.segments
            .get(&segment)
            .map(|r| r.points.filter(|_, n| n.is_boundary()))
            .unwrap_or_default()
    }

    /// Ids of every segment that currently owns at least one pixel, ascending.
    #[must_use]
    pub fn live_segments(&self) -> Vec<SegmentId> {
        let mut ids: Vec<SegmentId> = self
            .segments
            .iter()
            .filter(|(_, r)| !r.points.is_empty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    // =========================================================================
    // REASSIGNMENT
    // =========================================================================

    /// Reassign one pixel and update boundary bookkeeping for it and its
    /// 4-neighbors. Returns the previous label.
    ///
    /// Reassigning a pixel to the id it already carries changes nothing.
    /// Out-of-bounds points are ignored; strokes are clamped before they
    /// reach the store.
    pub fn set_segment(&mut self, p: Point, segment: Option<SegmentId>) -> Option<SegmentId> {
        let Some(index) = self.grid.index(p) else {
            return None;
        };
        let old = self.grid.cells[index];
        if old == segment {
            return old;
        }
        self.grid.cells[index] = segment;

        // Leave the old segment: every same-old neighbor loses one neighbor
        // and is now on the boundary.
        if let Some(old_id) = old {
            if let Some(record) = self.segments.get_mut(&old_id) {
                record.points.delete(p);
                for n in p.neighbors4() {
                    if self.grid.get(n) != Some(old_id) {
                        continue;
                    }
                    let count = record.points.get(n).map_or(0, |e| e.num_neighbors.saturating_sub(1));
                    record.points.set(n, Neighbors { num_neighbors: count });
                    self.sink.fill_pixel(n, record.color, DRAW_ALPHA + BOUNDARY_ALPHA_BOOST);
                }
            }
        }

        match segment {
            None => {
                self.sink.fill_pixel(p, Rgb::default(), ERASED_ALPHA);
            }
            Some(new_id) => {
                let record = self
                    .segments
                    .entry(new_id)
                    .or_insert_with(|| SegmentRecord { color: Rgb::random(), points: PointContainer::new() });
                let same: Vec<Point> = p
                    .neighbors4()
                    .into_iter()
                    .filter(|n| self.grid.get(*n) == Some(new_id))
                    .collect();
                #[allow(clippy::cast_possible_truncation)]
                let own = Neighbors { num_neighbors: same.len() as u8 };
                record.points.set(p, own);
                self.sink.fill_pixel(p, record.color, pixel_alpha(own));

                for n in same {
                    let count = record.points.get(n).map_or(0, |e| e.num_neighbors) + 1;
                    record.points.set(n, Neighbors { num_neighbors: count });
                    if count == FULL_NEIGHBORS {
                        self.sink.fill_pixel(n, record.color, DRAW_ALPHA);
                    }
                }
            }
        }
        old
    }

    /// Reassign `p` as part of `action`: record the change and mark the
    /// neighbors it exposes in the segment it leaves.
    pub fn paint(&mut self, action: &mut CanvasAction, p: Point, segment: Option<SegmentId>) {
        if !self.in_bounds(p) {
            return;
        }
        let old = self.grid.get(p);
        if old == segment {
            return;
        }
        if let Some(old_id) = old {
            for n in p.neighbors4() {
                if self.grid.get(n) == Some(old_id) {
                    action.mark_boundary(old_id, n);
                }
            }
        }
        action.record(p, old, segment);
        self.set_segment(p, segment);
    }

    // =========================================================================
    // SPLIT DETECTION
    // =========================================================================

    /// Detect and repair disconnection in every segment `action` took pixels
    /// from. Detached pieces are relabeled with ids drawn from
    /// `next_segment`, and every relabeled pixel is added to the action
    /// so undo restores it.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::EmptyFrontier`] if a non-empty frontier yields
    /// no seed, which means the store is corrupted.
    pub fn recompute_segments(
        &mut self,
        action: &mut CanvasAction,
        next_segment: &mut SegmentId,
    ) -> Result<Vec<Split>, CanvasError> {
        let mut splits = Vec::new();
        let effected: Vec<SegmentId> = action.effected_segments.keys().copied().collect();

        for segment in effected {
            let frontier = self.boundary(segment);
            let Some(seed) = frontier.first() else {
                continue;
            };
            // One ring means one piece.
            if ring_walk(&frontier, seed).len() == frontier.len() {
                continue;
            }

            // The piece holding the seed keeps the id, holes and all. Every
            // other piece left on the frontier is detached.
            let kept = self.flood_region(seed, segment);
            let mut rest = frontier.filter(|p, _| !kept.has(p));
            while !rest.is_empty() {
                let Some(start) = rest.first() else {
                    return Err(CanvasError::EmptyFrontier { segment });
                };
                let region = self.flood_region(start, segment);
                let new_id = *next_segment;
                *next_segment += 1;
                for p in region.points() {
                    action.record(p, Some(segment), Some(new_id));
                    self.set_segment(p, Some(new_id));
                }
                splits.push(Split { from: segment, segment: new_id, seed: start, pixels: region.len() });
                rest = rest.filter(|p, _| !region.has(p));
            }
        }
        Ok(splits)
    }

    /// Relabel the 4-connected region of `from` pixels containing `seed` to
    /// `to`. Replays a split performed elsewhere. Returns the pixel count.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::FillSeedMismatch`] if `seed` does not carry
    /// `from`.
    pub fn flood_relabel(&mut self, seed: Point, from: SegmentId, to: SegmentId) -> Result<usize, CanvasError> {
        let found = self.grid.get(seed);
        if found != Some(from) {
            return Err(CanvasError::FillSeedMismatch { seed, expected: from, found });
        }
        let region = self.flood_region(seed, from);
        for p in region.points() {
            self.set_segment(p, Some(to));
        }
        Ok(region.len())
    }

    /// 4-connected flood over grid pixels carrying `segment`, starting at `seed`.
    fn flood_region(&self, seed: Point, segment: SegmentId) -> PointContainer<()> {
        let mut visited = PointContainer::new();
        let mut queue = VecDeque::from([seed]);
        while let Some(current) = queue.pop_front() {
            if !visited.set_if_absent(current, ()) {
                continue;
            }
            for n in current.neighbors4() {
                if self.grid.get(n) == Some(segment) && !visited.has(n) {
                    queue.push_back(n);
                }
            }
        }
        visited
    }
}

/// 8-connected BFS from `seed` restricted to `frontier`.
fn ring_walk(frontier: &PointContainer<Neighbors>, seed: Point) -> PointContainer<()> {
    let mut visited = PointContainer::new();
    let mut queue = VecDeque::from([seed]);
    while let Some(current) = queue.pop_front() {
        if !visited.set_if_absent(current, ()) {
            continue;
        }
        for n in current.neighbors8() {
            if frontier.has(n) && !visited.has(n) {
                queue.push_back(n);
            }
        }
    }
    visited
}

fn pixel_alpha(n: Neighbors) -> f32 {
    if n.is_boundary() {
        DRAW_ALPHA + BOUNDARY_ALPHA_BOOST
    } else {
        DRAW_ALPHA
    }
}
