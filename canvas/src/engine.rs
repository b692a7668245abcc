use crate::action::CanvasAction;
use crate::history::ActionHistory;
use crate::point::Point;
use crate::render::PixelSink;
use crate::segment::{CanvasError, SegmentId, SegmentStore, Split};
use crate::stroke::{DrawEvent, DrawType};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Result of painting a stroke with split detection.
#[derive(Debug, Clone)]
pub struct StrokeOutcome {
    /// The label the stroke wrote (`None` for an erase).
    pub segment: Option<SegmentId>,
    /// Every pixel change, including relabels from splits.
    pub action: CanvasAction,
    /// Splits performed, in the order they were applied.
    pub splits: Vec<Split>,
}

/// A segment store plus its undo history.
///
/// Three ways in:
/// - [`Canvas::stroke`]: paint and split-detect, no history (the ordering
///   authority).
/// - [`Canvas::paint`]: the same, recorded in history (local editing).
/// - [`Canvas::apply_stroke`] + [`Canvas::apply_fill`]: replay a canonical
///   draw and its relabels exactly, with no split detection of its own.
pub struct Canvas {
    store: SegmentStore,
    history: ActionHistory,
}

impl Canvas {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { store: SegmentStore::new(width, height), history: ActionHistory::new() }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl PixelSink + 'static) -> Self {
        self.store = self.store.with_sink(sink);
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: ActionHistory) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    #[must_use]
    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.store.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.store.height()
    }

    /// The segment a stroke will paint with.
    ///
    /// A draw that starts on a painted pixel extends that segment; otherwise
    /// it takes the next id from `next_segment`. An erase paints no segment.
    pub fn stroke_segment(&self, event: &DrawEvent, next_segment: &mut SegmentId) -> Option<SegmentId> {
        match event.kind {
            DrawType::Erase => None,
            DrawType::Draw => Some(self.store.segment_at(event.from).unwrap_or_else(|| {
                let id = *next_segment;
                *next_segment += 1;
                id
            })),
        }
    }

    /// Paint `event` with `segment` and detect splits. Not recorded in history.
    ///
    /// A failed split check rolls the stroke back, so on error the grid and
    /// `next_segment` are as they were before the call.
    ///
    /// # Errors
    ///
    /// Propagates [`CanvasError`] from split detection.
    pub fn stroke(
        &mut self,
        event: &DrawEvent,
        segment: Option<SegmentId>,
        next_segment: &mut SegmentId,
    ) -> Result<StrokeOutcome, CanvasError> {
        let segment = event.kind.paint_value(segment);
        let first_unused = *next_segment;
        let mut action = self.apply_stroke(event, segment);
        match self.store.recompute_segments(&mut action, next_segment) {
            Ok(splits) => Ok(StrokeOutcome { segment, action, splits }),
            Err(e) => {
                self.rollback(&action);
                *next_segment = first_unused;
                Err(e)
            }
        }
    }

    fn rollback(&mut self, action: &CanvasAction) {
        action.revert(&mut self.store);
    }

    /// [`Canvas::stroke`], then push the action onto the history.
    ///
    /// # Errors
    ///
    /// Propagates [`CanvasError`] from split detection.
    pub fn paint(
        &mut self,
        event: &DrawEvent,
        segment: Option<SegmentId>,
        next_segment: &mut SegmentId,
    ) -> Result<StrokeOutcome, CanvasError> {
        let outcome = self.stroke(event, segment, next_segment)?;
        self.history.push(outcome.action.clone());
        Ok(outcome)
    }

    /// Paint the stroke's pixels only. No split detection, no history.
    pub fn apply_stroke(&mut self, event: &DrawEvent, segment: Option<SegmentId>) -> CanvasAction {
        let value = event.kind.paint_value(segment);
        let mut action = CanvasAction::new();
        for p in event.pixels(self.store.width(), self.store.height()) {
            self.store.paint(&mut action, p, value);
        }
        action
    }

    /// Replay one split relabel.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::FillSeedMismatch`] if the local grid disagrees
    /// with the relabel.
    pub fn apply_fill(&mut self, seed: Point, from: SegmentId, to: SegmentId) -> Result<usize, CanvasError> {
        self.store.flood_relabel(seed, from, to)
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.store)
    }

    /// Forget every undone action so it can never be redone.
    pub fn discard_redo(&mut self) {
        self.history.discard_forward();
    }
}
