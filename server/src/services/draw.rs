//! Draw service: the room's ordering authority.
//!
//! DESIGN
//! ======
//! A stroke is clamped to the canvas, given its segment (the one under its
//! start pixel, or a fresh id), painted onto the canonical canvas and split
//! checked. The draw and every relabel it caused are appended to the log
//! with consecutive history indices and fanned out to the room's other
//! clients, all under the rooms write lock.
//!
//! ERROR HANDLING
//! ==============
//! A `CanvasError` means split detection broke an invariant partway through
//! a stroke. The canvas rolls the stroke back and the room's next segment id
//! is restored, so the canonical state is what it was before the request.
//! Nothing is logged or broadcast for that stroke and the sender gets
//! `E_CANVAS`.

use canvas::segment::CanvasError;
use canvas::stroke::DrawEvent;
use tracing::{error, info};
use uuid::Uuid;

use frames::protocol::{DRAW_STROKE, DrawBroadcast, DrawResponse, FloodFillResponse, to_data};
use frames::{ErrorCode, Frame};

use crate::services::room::RoomError;
use crate::state::AppState;

#[cfg(test)]
#[path = "draw_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error("canvas invariant violated: {0}")]
    Canvas(#[from] CanvasError),
}

impl ErrorCode for DrawError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Room(e) => e.error_code(),
            Self::Canvas(_) => "E_CANVAS",
        }
    }
}

/// Apply one stroke from `client_id` to `room` and broadcast the result to
/// the other clients. Returns the canonical batch for the sender's reply.
///
/// # Errors
///
/// Returns [`DrawError::Room`] if the room does not exist and
/// [`DrawError::Canvas`] if split detection fails.
pub async fn apply_draw(
    state: &AppState,
    room: &str,
    client_id: Uuid,
    event: DrawEvent,
) -> Result<DrawBroadcast, DrawError> {
    let mut rooms = state.rooms.write().await;
    let Some(room_state) = rooms.get_mut(room) else {
        return Err(RoomError::NotFound(room.to_owned()).into());
    };

    let event = event.clamped(room_state.canvas.width(), room_state.canvas.height(), state.config.max_brush_size);
    let first_unused = room_state.next_segment;
    let segment = room_state
        .canvas
        .stroke_segment(&event, &mut room_state.next_segment);
    let outcome = match room_state
        .canvas
        .stroke(&event, segment, &mut room_state.next_segment)
    {
        Ok(outcome) => outcome,
        Err(e) => {
            room_state.next_segment = first_unused;
            error!(%room, %client_id, error = %e, "draw: canvas invariant violated, stroke rolled back");
            return Err(e.into());
        }
    };

    let mut index = room_state.next_index();
    let draw = DrawResponse { draw: event, segment: outcome.segment, history_index: index };
    let fills: Vec<FloodFillResponse> = outcome
        .splits
        .iter()
        .map(|split| {
            index += 1;
            FloodFillResponse { segment: split.segment, from: split.from, seed: split.seed, history_index: index }
        })
        .collect();
    let batch = DrawBroadcast { draw, fills };
    room_state.log.extend(batch.entries());

    info!(
        %room,
        %client_id,
        history_index = batch.first_index(),
        segment = ?batch.draw.segment,
        pixels = outcome.action.painted_points.len(),
        splits = batch.fills.len(),
        "draw: applied stroke"
    );

    match to_data(&batch) {
        Ok(data) => {
            let frame = Frame::request(DRAW_STROKE, data)
                .with_room(room)
                .with_from(client_id.to_string());
            room_state.fan_out(&frame, Some(client_id));
        }
        Err(e) => error!(%room, error = %e, "draw: failed to encode broadcast"),
    }

    Ok(batch)
}
