//! Room service: join/part, room lookup and broadcast.
//!
//! DESIGN
//! ======
//! Rooms are created on first join and sized from the server configuration.
//! They are never evicted: the log is the only record of a room and a client
//! may reconnect and catch up at any time.

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use frames::protocol::{JoinReply, RoomInfo};
use frames::{ErrorCode, Frame};

use crate::state::AppState;

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;

const MAX_ROOM_NAME_LEN: usize = 64;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room name required")]
    NameRequired,
    #[error("invalid room name: {0}")]
    InvalidName(String),
    #[error("room not found: {0}")]
    NotFound(String),
    #[error("must join a room first")]
    NotJoined,
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NameRequired | Self::InvalidName(_) => "E_ROOM_INVALID",
            Self::NotFound(_) => "E_ROOM_NOT_FOUND",
            Self::NotJoined => "E_NOT_JOINED",
        }
    }
}

/// Room names are 1 to 64 characters of ASCII letters, digits, `-` and `_`.
///
/// # Errors
///
/// Returns [`RoomError::NameRequired`] or [`RoomError::InvalidName`].
pub fn validate_room_name(room: &str) -> Result<(), RoomError> {
    if room.is_empty() {
        return Err(RoomError::NameRequired);
    }
    let valid = room.len() <= MAX_ROOM_NAME_LEN
        && room
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(RoomError::InvalidName(room.to_owned()));
    }
    Ok(())
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Join a room, creating it on first use.
///
/// # Errors
///
/// Returns [`RoomError`] if the room name is invalid.
pub async fn join_room(
    state: &AppState,
    room: &str,
    client_id: Uuid,
    tx: mpsc::Sender<Frame>,
) -> Result<JoinReply, RoomError> {
    validate_room_name(room)?;

    let mut rooms = state.rooms.write().await;
    let room_state = rooms.entry(room.to_owned()).or_insert_with(|| {
        info!(%room, "created room");
        state.new_room()
    });
    room_state.clients.insert(client_id, tx);

    info!(%room, %client_id, clients = room_state.clients.len(), head = room_state.head(), "client joined room");
    Ok(JoinReply {
        room: room.to_owned(),
        width: room_state.canvas.width(),
        height: room_state.canvas.height(),
        max_brush_size: state.config.max_brush_size,
        head: room_state.head(),
    })
}

/// Leave a room. The room itself stays.
pub async fn part_room(state: &AppState, room: &str, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room_state) = rooms.get_mut(room) else {
        return;
    };
    room_state.clients.remove(&client_id);
    info!(%room, %client_id, remaining = room_state.clients.len(), "client left room");
}

// =============================================================================
// QUERIES
// =============================================================================

/// Summary of one room.
///
/// # Errors
///
/// Returns [`RoomError::NotFound`] if nobody has joined `room` yet.
pub async fn room_info(state: &AppState, room: &str) -> Result<RoomInfo, RoomError> {
    let rooms = state.rooms.read().await;
    let Some(room_state) = rooms.get(room) else {
        return Err(RoomError::NotFound(room.to_owned()));
    };
    Ok(RoomInfo {
        room: room.to_owned(),
        width: room_state.canvas.width(),
        height: room_state.canvas.height(),
        head: room_state.head(),
        segments: room_state.canvas.store().live_segments().len(),
        clients: room_state.clients.len(),
    })
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast a frame to all clients in a room, optionally excluding one.
pub async fn broadcast(state: &AppState, room: &str, frame: &Frame, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room_state) = rooms.get(room) else {
        return;
    };
    room_state.fan_out(frame, exclude);
}
