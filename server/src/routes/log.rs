//! HTTP catch-up and room lookup.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use frames::protocol::{LogReply, LogRequest, RoomInfo};

use crate::services::log::fetch_log;
use crate::services::room::{RoomError, room_info};
use crate::state::AppState;

#[cfg(test)]
#[path = "log_test.rs"]
mod tests;

/// `GET /api/log?room=R&after=N`
///
/// # Errors
///
/// `400` for an invalid room name, `404` for a room nobody has joined.
pub async fn get_log(
    State(state): State<AppState>,
    Query(query): Query<LogRequest>,
) -> Result<Json<LogReply>, StatusCode> {
    fetch_log(&state, &query.room, query.after)
        .await
        .map(Json)
        .map_err(room_error_to_status)
}

/// `GET /api/rooms/{room}`
///
/// # Errors
///
/// `404` for a room nobody has joined.
pub async fn get_room(State(state): State<AppState>, Path(room): Path<String>) -> Result<Json<RoomInfo>, StatusCode> {
    room_info(&state, &room)
        .await
        .map(Json)
        .map_err(room_error_to_status)
}

pub(crate) fn room_error_to_status(err: RoomError) -> StatusCode {
    match err {
        RoomError::NameRequired | RoomError::InvalidName(_) => StatusCode::BAD_REQUEST,
        RoomError::NotFound(_) => StatusCode::NOT_FOUND,
        RoomError::NotJoined => StatusCode::CONFLICT,
    }
}
