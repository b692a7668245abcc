//! Log service: catch-up queries against a room's ordered log.

use frames::protocol::LogReply;

use crate::services::room::{RoomError, validate_room_name};
use crate::state::AppState;

#[cfg(test)]
#[path = "log_test.rs"]
mod tests;

/// Records of `room` with history index strictly greater than `after`, in
/// ascending order, capped by the configured fetch limit.
///
/// # Errors
///
/// Returns [`RoomError`] for an invalid name or a room nobody has joined.
pub async fn fetch_log(state: &AppState, room: &str, after: u64) -> Result<LogReply, RoomError> {
    validate_room_name(room)?;
    let rooms = state.rooms.read().await;
    let Some(room_state) = rooms.get(room) else {
        return Err(RoomError::NotFound(room.to_owned()));
    };
    let entries = room_state.entries_after(after, state.config.log_fetch_limit);
    tracing::debug!(%room, after, count = entries.len(), head = room_state.head(), "log: fetch");
    Ok(LogReply { room: room.to_owned(), entries })
}
