//! Client-side projection of one room.

use canvas::segment::SegmentId;

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

/// Where a session stands with its room.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// No socket, or the socket dropped.
    #[default]
    Disconnected,
    /// Socket open; `room:join` sent or about to be.
    Joining,
    /// Replaying the room log. Local strokes are rejected.
    Reconciling,
    /// Caught up: strokes are emitted and broadcasts applied as they arrive.
    Live,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientState {
    pub width: u32,
    pub height: u32,
    /// Lowest segment id no canonical record has used yet.
    pub next_segment: SegmentId,
    pub status: SessionStatus,
    /// Highest history index applied to the local canvas; 0 before any.
    pub last_applied: u64,
    /// Id the server gave this connection in `session:connected`.
    pub client_id: Option<String>,
}

impl ClientState {
    /// Advance the allocator past a segment id seen in a canonical record.
    pub fn observe_segment(&mut self, segment: SegmentId) {
        self.next_segment = self.next_segment.max(segment + 1);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status == SessionStatus::Live
    }
}
