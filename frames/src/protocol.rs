//! Paint room protocol: syscall names and the records carried in frame data.
//!
//! `history_index` is assigned by the server, starts at 1, and increases by
//! one for every logged record: each draw, then each relabel that draw
//! caused. A [`DrawBroadcast`] groups one draw with its relabels; clients
//! apply a broadcast as one update. The room log is the flat sequence of
//! [`LogEntry`] records, and [`batches`] regroups a slice of it.

use canvas::point::Point;
use canvas::segment::SegmentId;
use canvas::stroke::DrawEvent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frame::{Data, ErrorCode};

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;

// =============================================================================
// SYSCALLS
// =============================================================================

/// Server → client greeting after the socket upgrade.
pub const SESSION_CONNECTED: &str = "session:connected";
/// Join a room. Peers are notified with the same syscall.
pub const ROOM_JOIN: &str = "room:join";
/// Pushed to peers when a client leaves.
pub const ROOM_PART: &str = "room:part";
/// Submit a stroke; peers receive the canonical result.
pub const DRAW_STROKE: &str = "draw:stroke";
/// Fetch log records after a history index.
pub const LOG_FETCH: &str = "log:fetch";
/// Server-originated error not tied to a request (e.g. undecodable bytes).
pub const GATEWAY_ERROR: &str = "gateway:error";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not an object")]
    NotAnObject,
    #[error("relabel at history index {history_index} has no preceding draw")]
    OrphanFill { history_index: u64 },
}

impl ErrorCode for ProtocolError {
    fn error_code(&self) -> &'static str {
        "E_PAYLOAD"
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// The canonical form of one stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResponse {
    pub draw: DrawEvent,
    /// Segment the stroke painted with; absent for an erase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<SegmentId>,
    pub history_index: u64,
}

/// A relabel caused by a draw: the 4-connected region of `from` containing
/// `seed` now carries `segment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloodFillResponse {
    pub segment: SegmentId,
    pub from: SegmentId,
    pub seed: Point,
    pub history_index: u64,
}

/// One draw and the relabels it caused, in log order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawBroadcast {
    pub draw: DrawResponse,
    #[serde(default)]
    pub fills: Vec<FloodFillResponse>,
}

impl DrawBroadcast {
    #[must_use]
    pub fn first_index(&self) -> u64 {
        self.draw.history_index
    }

    /// Index of the last record in the batch.
    #[must_use]
    pub fn last_index(&self) -> u64 {
        self.fills
            .last()
            .map_or(self.draw.history_index, |f| f.history_index)
    }

    /// Highest segment id the batch mentions.
    #[must_use]
    pub fn max_segment(&self) -> Option<SegmentId> {
        self.fills
            .iter()
            .map(|f| f.segment)
            .chain(self.draw.segment)
            .max()
    }

    /// Flatten into log records.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        std::iter::once(LogEntry::Draw(self.draw))
            .chain(self.fills.iter().copied().map(LogEntry::Fill))
            .collect()
    }
}

/// One record of the room log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LogEntry {
    Draw(DrawResponse),
    Fill(FloodFillResponse),
}

impl LogEntry {
    #[must_use]
    pub fn history_index(&self) -> u64 {
        match self {
            Self::Draw(d) => d.history_index,
            Self::Fill(f) => f.history_index,
        }
    }
}

/// Regroup log records into broadcasts.
///
/// # Errors
///
/// Returns [`ProtocolError::OrphanFill`] if the slice starts with a relabel.
pub fn batches(entries: &[LogEntry]) -> Result<Vec<DrawBroadcast>, ProtocolError> {
    let mut out: Vec<DrawBroadcast> = Vec::new();
    for entry in entries {
        match entry {
            LogEntry::Draw(draw) => out.push(DrawBroadcast { draw: *draw, fills: Vec::new() }),
            LogEntry::Fill(fill) => {
                let Some(batch) = out.last_mut() else {
                    return Err(ProtocolError::OrphanFill { history_index: fill.history_index });
                };
                batch.fills.push(*fill);
            }
        }
    }
    Ok(out)
}

// =============================================================================
// REPLIES
// =============================================================================

/// Done payload of `room:join`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReply {
    pub room: String,
    pub width: u32,
    pub height: u32,
    /// Strokes wider than this are clamped by the server.
    pub max_brush_size: u32,
    /// Latest history index in the room; 0 for an empty log.
    pub head: u64,
}

/// Request payload of `log:fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequest {
    pub room: String,
    #[serde(default)]
    pub after: u64,
}

/// Done payload of `log:fetch` and body of `GET /api/log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogReply {
    pub room: String,
    pub entries: Vec<LogEntry>,
}

/// Body of `GET /api/rooms/{room}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room: String,
    pub width: u32,
    pub height: u32,
    pub head: u64,
    /// Segments currently owning at least one pixel.
    pub segments: usize,
    pub clients: usize,
}

// =============================================================================
// DATA HELPERS
// =============================================================================

/// Serialize a record into frame data.
///
/// # Errors
///
/// Returns [`ProtocolError::NotAnObject`] if `value` does not serialize to a
/// JSON object.
pub fn to_data<T: Serialize>(value: &T) -> Result<Data, ProtocolError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(ProtocolError::NotAnObject),
    }
}

/// Deserialize a record from frame data.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] if the data does not match `T`.
pub fn from_data<T: DeserializeOwned>(data: &Data) -> Result<T, ProtocolError> {
    Ok(serde_json::from_value(Value::Object(data.clone()))?)
}
