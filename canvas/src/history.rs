//! Linear undo/redo over [`CanvasAction`]s.
//!
//! The history is a `Vec` of actions plus a cursor counting how many of them
//! are currently applied. Pushing after an undo drops the redo branch. An
//! optional retention limit drops the oldest actions once exceeded; they can
//! no longer be undone, but the canvas keeps their effect.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::action::CanvasAction;
use crate::segment::SegmentStore;

#[derive(Debug, Clone, Default)]
pub struct ActionHistory {
    actions: Vec<CanvasAction>,
    /// Number of applied actions; 0 is the origin.
    cursor: usize,
    limit: Option<usize>,
}

impl ActionHistory {
    /// Unbounded history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `limit` actions (minimum 1).
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { actions: Vec::new(), cursor: 0, limit: Some(limit.max(1)) }
    }

    /// Append `action` after the cursor, discarding any redo branch.
    pub fn push(&mut self, action: CanvasAction) {
        self.actions.truncate(self.cursor);
        self.actions.push(action);
        self.cursor = self.actions.len();

        if let Some(limit) = self.limit {
            if self.actions.len() > limit {
                let excess = self.actions.len() - limit;
                self.actions.drain(..excess);
                self.cursor -= excess;
            }
        }
    }

    /// Invert the current action and step back. Returns `false` at the origin.
    pub fn undo(&mut self, store: &mut SegmentStore) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.actions[self.cursor].revert(store);
        true
    }

    /// Step forward and reapply that action. Returns `false` at the newest.
    pub fn redo(&mut self, store: &mut SegmentStore) -> bool {
        if self.cursor == self.actions.len() {
            return false;
        }
        for (p, painted) in self.actions[self.cursor].painted_points.iter() {
            store.set_segment(p, painted.new_segment);
        }
        self.cursor += 1;
        true
    }

    /// Drop every action after the cursor.
    pub fn discard_forward(&mut self) {
        self.actions.truncate(self.cursor);
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.actions.len()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
