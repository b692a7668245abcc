//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the configuration and a map of live rooms. Each room owns the
//! canonical canvas, the segment id allocator, the ordered log and the
//! outbound channels of its connected clients. The whole map sits behind one
//! `RwLock`; a draw holds the write lock from canvas mutation through log
//! append and fan-out, so the order draws are applied is the order every
//! client receives them.

use std::collections::HashMap;
use std::sync::Arc;

use canvas::engine::Canvas;
use canvas::segment::SegmentId;
use frames::Frame;
use frames::protocol::LogEntry;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::ServerConfig;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

// =============================================================================
// ROOM STATE
// =============================================================================

/// Per-room live state. Rooms live for the lifetime of the process.
pub struct RoomState {
    /// Canonical canvas. Never records history; undo is a client concern.
    pub canvas: Canvas,
    /// Next id to hand out for a new segment or a split.
    pub next_segment: SegmentId,
    /// Every record ever produced in this room. `log[i]` has history index `i + 1`.
    pub log: Vec<LogEntry>,
    /// Connected clients: `client_id` -> sender for outgoing frames.
    pub clients: HashMap<Uuid, mpsc::Sender<Frame>>,
}

impl RoomState {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { canvas: Canvas::new(width, height), next_segment: 0, log: Vec::new(), clients: HashMap::new() }
    }

    /// Latest history index; 0 for an empty log.
    #[must_use]
    pub fn head(&self) -> u64 {
        self.log.len() as u64
    }

    /// History index the next logged record will get.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.head() + 1
    }

    /// Records with history index strictly greater than `after`, ascending.
    /// A `limit` of 0 means no limit. A page never ends partway through a
    /// draw's relabels, so it may run past `limit`.
    #[must_use]
    pub fn entries_after(&self, after: u64, limit: usize) -> Vec<LogEntry> {
        let start = usize::try_from(after).unwrap_or(usize::MAX).min(self.log.len());
        let tail = &self.log[start..];
        let mut take = if limit == 0 { tail.len() } else { limit.min(tail.len()) };
        while take < tail.len() && matches!(tail[take], LogEntry::Fill(_)) {
            take += 1;
        }
        tail[..take].to_vec()
    }

    /// Send `frame` to every client except `exclude`. Best-effort: a client
    /// whose channel is full or closed misses the frame.
    pub fn fan_out(&self, frame: &Frame, exclude: Option<Uuid>) -> usize {
        let mut delivered = 0;
        for (client_id, tx) in &self.clients {
            if exclude == Some(*client_id) {
                continue;
            }
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(%client_id, error = %e, "room: dropped outbound frame"),
            }
        }
        delivered
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state. Clone is required by Axum; all fields are
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self { config: Arc::new(config), rooms: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// A fresh room sized from the configuration.
    #[must_use]
    pub fn new_room(&self) -> RoomState {
        RoomState::new(self.config.canvas_width, self.config.canvas_height)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
