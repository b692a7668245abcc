//! WebSocket handler: bidirectional frame relay for paint rooms.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming binary frames → decode + dispatch by syscall prefix
//! - Frames fanned out by room peers → forward to client
//!
//! Handler functions validate, call a service and return an `Outcome`. The
//! dispatch layer turns the outcome into the sender's reply and any peer
//! notification. `draw:stroke` is the exception: its broadcast happens inside
//! the draw service, under the same lock that assigned its history index.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `client_id`
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply / broadcast / both)
//! 4. Close → broadcast `room:part` → cleanup

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use canvas::stroke::DrawEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use frames::protocol::{GATEWAY_ERROR, ROOM_PART, SESSION_CONNECTED, from_data, to_data};
use frames::{Data, ErrorCode, Frame, Status, decode_frame, encode_frame};

use crate::services;
use crate::services::room::RoomError;
use crate::state::AppState;

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. Handlers never send frames directly.
enum Outcome {
    /// Send done+data to sender only.
    Reply(Data),
    /// Send empty done to sender only.
    Done,
    /// Reply to sender, and notify the room's other clients with `broadcast`.
    ReplyAndBroadcast { room: String, reply: Data, broadcast: Data },
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for frames fanned out by room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_channel_capacity);

    let welcome = Frame::request(SESSION_CONNECTED, Data::new()).with_data("client_id", client_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, "ws: client connected");

    let mut current_room: Option<String> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let replies = match msg {
                    Message::Binary(bytes) => {
                        process_inbound_bytes(&state, &mut current_room, client_id, &client_tx, &bytes).await
                    }
                    Message::Text(_) => vec![gateway_error("E_DECODE", "binary frames only")],
                    Message::Close(_) => break,
                    _ => continue,
                };
                if send_all(&mut socket, &replies).await.is_err() {
                    break;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(room) = current_room.take() {
        leave_room(&state, &room, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Decode and process one inbound binary frame and return frames for the
/// sender. Keeps transport concerns out of frame handling so tests can drive
/// dispatch with plain channels.
async fn process_inbound_bytes(
    state: &AppState,
    current_room: &mut Option<String>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    bytes: &[u8],
) -> Vec<Frame> {
    let mut req = match decode_frame(bytes) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return vec![gateway_error(e.error_code(), &e.to_string())];
        }
    };

    // The connection, not the payload, decides who sent a frame.
    req.from = Some(client_id.to_string());

    info!(%client_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");

    let result = match req.prefix() {
        "room" => handle_room(state, current_room, client_id, client_tx, &req).await,
        "draw" => handle_draw(state, current_room.as_deref(), client_id, &req).await,
        "log" => handle_log(state, current_room.as_deref(), &req).await,
        prefix => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::ReplyAndBroadcast { room, reply, broadcast }) => {
            let notif = Frame::request(&req.syscall, broadcast)
                .with_room(room.clone())
                .with_from(client_id.to_string());
            services::room::broadcast(state, &room, &notif, Some(client_id)).await;
            vec![req.done_with(reply).with_room(room)]
        }
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// ROOM HANDLERS
// =============================================================================

async fn handle_room(
    state: &AppState,
    current_room: &mut Option<String>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    match req.op() {
        "join" => {
            let Some(room) = req
                .data_str("room")
                .map(str::to_owned)
                .or_else(|| req.room.clone())
            else {
                return Err(req.error_from(&RoomError::NameRequired));
            };

            services::room::validate_room_name(&room).map_err(|e| req.error_from(&e))?;

            // Joining a new room leaves the current one.
            if let Some(old_room) = current_room.take() {
                leave_room(state, &old_room, client_id).await;
            }

            let joined = services::room::join_room(state, &room, client_id, client_tx.clone())
                .await
                .map_err(|e| req.error_from(&e))?;
            *current_room = Some(room.clone());

            let reply = to_data(&joined).map_err(|e| req.error_from(&e))?;
            let mut broadcast = Data::new();
            broadcast.insert("client_id".into(), client_id.to_string().into());
            Ok(Outcome::ReplyAndBroadcast { room, reply, broadcast })
        }
        "part" => {
            let Some(room) = current_room.take() else {
                return Err(req.error_from(&RoomError::NotJoined));
            };
            leave_room(state, &room, client_id).await;
            Ok(Outcome::Done)
        }
        op => Err(req.error(format!("unknown room op: {op}"))),
    }
}

/// Tell peers a client left, then drop it from the room.
async fn leave_room(state: &AppState, room: &str, client_id: Uuid) {
    let part = Frame::request(ROOM_PART, Data::new())
        .with_room(room)
        .with_from(client_id.to_string())
        .with_data("client_id", client_id.to_string());
    services::room::broadcast(state, room, &part, Some(client_id)).await;
    services::room::part_room(state, room, client_id).await;
}

// =============================================================================
// DRAW HANDLER
// =============================================================================

async fn handle_draw(
    state: &AppState,
    current_room: Option<&str>,
    client_id: Uuid,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(room) = current_room else {
        return Err(req.error_from(&RoomError::NotJoined));
    };

    match req.op() {
        "stroke" => {
            let event: DrawEvent = from_data(&req.data).map_err(|e| req.error_from(&e))?;
            let batch = services::draw::apply_draw(state, room, client_id, event)
                .await
                .map_err(|e| req.error_from(&e))?;
            let data = to_data(&batch).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(data))
        }
        op => Err(req.error(format!("unknown draw op: {op}"))),
    }
}

// =============================================================================
// LOG HANDLER
// =============================================================================

async fn handle_log(state: &AppState, current_room: Option<&str>, req: &Frame) -> Result<Outcome, Frame> {
    match req.op() {
        "fetch" => {
            let Some(room) = req
                .data_str("room")
                .or(req.room.as_deref())
                .or(current_room)
            else {
                return Err(req.error_from(&RoomError::NameRequired));
            };
            let after = req
                .data
                .get("after")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0);
            let reply = services::log::fetch_log(state, room, after)
                .await
                .map_err(|e| req.error_from(&e))?;
            let data = to_data(&reply).map_err(|e| req.error_from(&e))?;
            Ok(Outcome::Reply(data))
        }
        op => Err(req.error(format!("unknown log op: {op}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Server-originated error with no request to answer.
fn gateway_error(code: &str, message: &str) -> Frame {
    Frame::request(GATEWAY_ERROR, Data::new())
        .with_data(frames::FRAME_CODE, code)
        .with_data(frames::FRAME_MESSAGE, message)
}

async fn send_all(socket: &mut WebSocket, frames: &[Frame]) -> Result<(), axum::Error> {
    for frame in frames {
        send_frame(socket, frame).await?;
    }
    Ok(())
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), axum::Error> {
    if frame.status == Status::Error || frame.syscall == GATEWAY_ERROR {
        let (code, message) = frame.error_parts();
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send error frame");
    } else {
        debug!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Binary(encode_frame(frame).into())).await
}
