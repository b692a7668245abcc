//! Sans-IO room session.
//!
//! DESIGN
//! ======
//! `ClientSession` owns the local canvas and consumes server frames, returning
//! the frames to send back. It never touches a socket, so the net loop and
//! tests drive it the same way.
//!
//! Canonical records apply strictly in history-index order. A broadcast that
//! arrives early waits in a reorder buffer keyed by its first index, and the
//! session asks the log for the missing records right away while staying
//! live. The server drops broadcasts to slow clients, so a gap may never
//! close on its own. If the buffer outgrows [`REORDER_WINDOW`] before the log
//! answers, the session falls back to a full catch-up.
//!
//! Local strokes paint optimistically and are remembered as pending until the
//! server answers. Before any canonical batch lands, every pending stroke is
//! undone, so canonical records always apply to canonical state; the strokes
//! still pending are then painted again on top.
//!
//! ERROR HANDLING
//! ==============
//! A `CanvasError` means the local canvas no longer matches the server. The
//! session is poisoned: status drops to `Disconnected` and every later call
//! returns `SessionError::Poisoned` until the caller builds a new session.

use std::collections::BTreeMap;
use std::sync::Arc;

use canvas::engine::Canvas;
use canvas::render::PixelSink;
use canvas::segment::{CanvasError, SegmentId};
use canvas::stroke::DrawEvent;
use tracing::{debug, info, warn};

use frames::protocol::{
    DRAW_STROKE, DrawBroadcast, JoinReply, LOG_FETCH, LogReply, LogRequest, ProtocolError, ROOM_JOIN,
    SESSION_CONNECTED, batches, from_data, to_data,
};
use frames::{Data, Frame, Status};

use crate::state::{ClientState, SessionStatus};

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

/// Early broadcasts held before the session gives up on the gap and
/// catches up from the log.
pub const REORDER_WINDOW: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("strokes are only accepted while live, session is {0:?}")]
    NotLive(SessionStatus),
    #[error("local canvas diverged from the room: {0}")]
    Corrupted(#[from] CanvasError),
    #[error("session was corrupted and must be rebuilt")]
    Poisoned,
    #[error(transparent)]
    Payload(#[from] ProtocolError),
    #[error("server rejected {syscall}: {code} {message}")]
    Server { syscall: String, code: String, message: String },
}

/// Builds the pixel sink for a canvas of the given width and height. Called
/// each time the session sizes its canvas to the room.
pub type SinkFactory = Arc<dyn Fn(u32, u32) -> Box<dyn PixelSink> + Send + Sync>;

/// A local stroke the server has not answered yet.
#[derive(Debug, Clone)]
struct PendingStroke {
    request_id: String,
    event: DrawEvent,
}

/// A canonical batch waiting for its turn.
#[derive(Debug, Clone)]
struct Buffered {
    batch: DrawBroadcast,
    /// Set when the batch is the server's answer to one of our strokes.
    request_id: Option<String>,
}

pub struct ClientSession {
    room: String,
    canvas: Canvas,
    state: ClientState,
    max_brush_size: u32,
    pending: Vec<PendingStroke>,
    /// Next id a local stroke may assume, past every pending allocation.
    local_next: SegmentId,
    buffer: BTreeMap<u64, Buffered>,
    join_request: Option<String>,
    fetch_request: Option<String>,
    /// Room head reported on join; catch-up pages until it is reached.
    catch_up_target: u64,
    poisoned: bool,
    sink_factory: Option<SinkFactory>,
}

impl ClientSession {
    #[must_use]
    pub fn new(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            canvas: Canvas::new(0, 0),
            state: ClientState::default(),
            max_brush_size: u32::MAX,
            pending: Vec::new(),
            local_next: 0,
            buffer: BTreeMap::new(),
            join_request: None,
            fetch_request: None,
            catch_up_target: 0,
            poisoned: false,
            sink_factory: None,
        }
    }

    /// Render the canvas through sinks built by `factory`.
    #[must_use]
    pub fn with_sink_factory(mut self, factory: SinkFactory) -> Self {
        self.sink_factory = Some(factory);
        self
    }

    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    #[must_use]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    #[must_use]
    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Local strokes awaiting the server's answer.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Canonical batches held back by a gap.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// The socket is open. Returns the `room:join` request to send.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Poisoned`] after a corruption.
    pub fn on_connected(&mut self, client_id: Option<String>) -> Result<Frame, SessionError> {
        self.ensure_usable()?;
        self.state.client_id = client_id;
        self.state.status = SessionStatus::Joining;
        let req = Frame::request(ROOM_JOIN, Data::new())
            .with_room(self.room.clone())
            .with_data("room", self.room.clone());
        self.join_request = Some(req.id.clone());
        info!(room = %self.room, "session: joining");
        Ok(req)
    }

    /// The socket dropped. Pending strokes are rolled back and forgotten;
    /// canonical state and `last_applied` survive for the next catch-up.
    pub fn on_disconnected(&mut self) {
        if !self.poisoned {
            self.rollback();
        }
        self.pending.clear();
        self.buffer.clear();
        self.join_request = None;
        self.fetch_request = None;
        self.local_next = self.state.next_segment;
        self.state.status = SessionStatus::Disconnected;
        self.state.client_id = None;
    }

    /// Consume one server frame and return the frames to send in reply.
    ///
    /// # Errors
    ///
    /// [`SessionError::Corrupted`] poisons the session. [`SessionError::Server`]
    /// reports a rejected join or catch-up; the caller should reconnect.
    pub fn handle_frame(&mut self, frame: &Frame) -> Result<Vec<Frame>, SessionError> {
        self.ensure_usable()?;
        let result = self.dispatch(frame);
        if let Err(SessionError::Corrupted(e)) = &result {
            warn!(room = %self.room, error = %e, "session: canvas corrupted");
            self.poison();
        }
        result
    }

    /// Paint a local stroke optimistically. Returns the `draw:stroke` request
    /// to send.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotLive`] unless the session is live.
    pub fn stroke(&mut self, event: DrawEvent) -> Result<Frame, SessionError> {
        self.ensure_usable()?;
        if !self.state.is_live() {
            return Err(SessionError::NotLive(self.state.status));
        }
        let event = event.clamped(self.state.width, self.state.height, self.max_brush_size);
        let req = Frame::request(DRAW_STROKE, to_data(&event)?).with_room(self.room.clone());

        let segment = self.canvas.stroke_segment(&event, &mut self.local_next);
        if let Err(e) = self.canvas.paint(&event, segment, &mut self.local_next) {
            self.poison();
            return Err(e.into());
        }
        self.pending.push(PendingStroke { request_id: req.id.clone(), event });
        debug!(room = %self.room, id = %req.id, pending = self.pending.len(), "session: optimistic stroke");
        Ok(req)
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    fn dispatch(&mut self, frame: &Frame) -> Result<Vec<Frame>, SessionError> {
        match (frame.syscall.as_str(), frame.status) {
            (SESSION_CONNECTED, Status::Request) => {
                let client_id = frame.data_str("client_id").map(str::to_owned);
                Ok(vec![self.on_connected(client_id)?])
            }
            (ROOM_JOIN, Status::Done) if replies_to(frame, self.join_request.as_deref()) => {
                self.join_request = None;
                self.on_joined(from_data(&frame.data)?)
            }
            (LOG_FETCH, Status::Done) if replies_to(frame, self.fetch_request.as_deref()) => {
                self.fetch_request = None;
                self.on_log(from_data(&frame.data)?)
            }
            (DRAW_STROKE, Status::Request) => self.on_broadcast(from_data(&frame.data)?, None),
            (DRAW_STROKE, Status::Done) => self.on_broadcast(from_data(&frame.data)?, frame.parent_id.clone()),
            (DRAW_STROKE, Status::Error) => {
                self.on_rejected(frame)?;
                Ok(Vec::new())
            }
            (ROOM_JOIN | LOG_FETCH, Status::Error)
                if replies_to(frame, self.join_request.as_deref())
                    || replies_to(frame, self.fetch_request.as_deref()) =>
            {
                let (code, message) = frame.error_parts();
                Err(SessionError::Server {
                    syscall: frame.syscall.clone(),
                    code: code.to_owned(),
                    message: message.to_owned(),
                })
            }
            _ => {
                debug!(syscall = %frame.syscall, status = ?frame.status, "session: ignored frame");
                Ok(Vec::new())
            }
        }
    }

    fn on_joined(&mut self, reply: JoinReply) -> Result<Vec<Frame>, SessionError> {
        let resized = reply.width != self.canvas.width() || reply.height != self.canvas.height();
        // A head behind what we applied means the room restarted.
        if resized || reply.head < self.state.last_applied {
            if self.state.last_applied > 0 {
                warn!(room = %self.room, head = reply.head, last_applied = self.state.last_applied, "session: room reset, replaying from scratch");
            }
            self.canvas = self.new_canvas(reply.width, reply.height);
            self.state.next_segment = 0;
            self.state.last_applied = 0;
            self.local_next = 0;
        }
        self.state.width = reply.width;
        self.state.height = reply.height;
        self.max_brush_size = reply.max_brush_size;
        self.catch_up_target = reply.head;
        info!(room = %self.room, head = reply.head, last_applied = self.state.last_applied, "session: joined");
        Ok(vec![self.begin_catch_up()?])
    }

    fn on_log(&mut self, reply: LogReply) -> Result<Vec<Frame>, SessionError> {
        let fresh: Vec<_> = reply
            .entries
            .into_iter()
            .filter(|e| e.history_index() > self.state.last_applied)
            .collect();
        if let Some(first) = fresh.first() {
            if first.history_index() != self.state.last_applied + 1 {
                warn!(room = %self.room, first = first.history_index(), last_applied = self.state.last_applied, "session: catch-up gap");
                return Ok(vec![self.begin_catch_up()?]);
            }
        }

        let paged = !fresh.is_empty();
        for batch in batches(&fresh)? {
            self.enqueue(batch, None);
        }
        self.apply_ready()?;

        if paged && self.state.last_applied < self.catch_up_target {
            return Ok(vec![self.begin_catch_up()?]);
        }
        if !self.buffer.is_empty() {
            // Broadcasts arrived past a gap the log has not covered yet.
            return Ok(vec![self.begin_catch_up()?]);
        }
        self.state.status = SessionStatus::Live;
        info!(room = %self.room, last_applied = self.state.last_applied, "session: live");
        Ok(Vec::new())
    }

    fn on_broadcast(&mut self, batch: DrawBroadcast, request_id: Option<String>) -> Result<Vec<Frame>, SessionError> {
        if batch.last_index() <= self.state.last_applied {
            // Already applied through catch-up; only a confirmation is news.
            if let Some(id) = request_id {
                self.settle(&id)?;
            }
            return Ok(Vec::new());
        }

        self.enqueue(batch, request_id);
        if self.state.status != SessionStatus::Live {
            return Ok(Vec::new());
        }

        self.apply_ready()?;
        if self.buffer.len() > REORDER_WINDOW {
            warn!(room = %self.room, buffered = self.buffer.len(), last_applied = self.state.last_applied, "session: reorder window exceeded, resyncing");
            return Ok(vec![self.begin_catch_up()?]);
        }
        if !self.buffer.is_empty() && self.fetch_request.is_none() {
            info!(room = %self.room, last_applied = self.state.last_applied, "session: broadcast gap, fetching log");
            return Ok(vec![self.request_log()?]);
        }
        Ok(Vec::new())
    }

    /// The server refused one of our strokes: drop it from the canvas.
    fn on_rejected(&mut self, frame: &Frame) -> Result<(), SessionError> {
        let (code, message) = frame.error_parts();
        warn!(room = %self.room, code, message, "session: stroke rejected");
        if let Some(id) = frame.parent_id.as_deref() {
            self.settle(id)?;
        }
        Ok(())
    }

    // =========================================================================
    // APPLY
    // =========================================================================

    /// Apply every buffered batch that continues `last_applied`, with pending
    /// strokes lifted off for the duration.
    fn apply_ready(&mut self) -> Result<(), CanvasError> {
        let next_ready = |buffer: &BTreeMap<u64, Buffered>, last: u64| {
            buffer.first_key_value().is_some_and(|(first, _)| *first <= last + 1)
        };
        if !next_ready(&self.buffer, self.state.last_applied) {
            return Ok(());
        }

        self.rollback();
        while next_ready(&self.buffer, self.state.last_applied) {
            let Some((_, entry)) = self.buffer.pop_first() else {
                break;
            };
            if entry.batch.last_index() > self.state.last_applied {
                self.apply_canonical(&entry.batch)?;
            }
            if let Some(id) = entry.request_id {
                self.pending.retain(|p| p.request_id != id);
            }
        }
        self.repaint()
    }

    fn apply_canonical(&mut self, batch: &DrawBroadcast) -> Result<(), CanvasError> {
        self.canvas
            .apply_stroke(&batch.draw.draw, batch.draw.segment);
        if let Some(segment) = batch.draw.segment {
            self.state.observe_segment(segment);
        }
        for fill in &batch.fills {
            self.canvas.apply_fill(fill.seed, fill.from, fill.segment)?;
            self.state.observe_segment(fill.segment);
        }
        self.state.last_applied = batch.last_index();
        Ok(())
    }

    /// Forget one pending stroke and repaint the rest.
    fn settle(&mut self, request_id: &str) -> Result<(), CanvasError> {
        if !self.pending.iter().any(|p| p.request_id == request_id) {
            return Ok(());
        }
        self.rollback();
        self.pending.retain(|p| p.request_id != request_id);
        self.repaint()
    }

    /// Undo every pending stroke, newest first.
    fn rollback(&mut self) {
        for _ in 0..self.pending.len() {
            self.canvas.undo();
        }
        self.canvas.discard_redo();
    }

    /// Paint pending strokes again on top of canonical state.
    fn repaint(&mut self) -> Result<(), CanvasError> {
        self.local_next = self.state.next_segment;
        for stroke in &self.pending {
            let segment = self
                .canvas
                .stroke_segment(&stroke.event, &mut self.local_next);
            self.canvas
                .paint(&stroke.event, segment, &mut self.local_next)?;
        }
        Ok(())
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    /// Buffer a batch. The same batch from the log and from our own
    /// confirmation collapse into one entry that keeps the request id.
    fn enqueue(&mut self, batch: DrawBroadcast, request_id: Option<String>) {
        let entry = self
            .buffer
            .entry(batch.first_index())
            .or_insert(Buffered { batch, request_id: None });
        if request_id.is_some() {
            entry.request_id = request_id;
        }
    }

    /// Stop accepting strokes until the log has been replayed.
    fn begin_catch_up(&mut self) -> Result<Frame, ProtocolError> {
        self.state.status = SessionStatus::Reconciling;
        self.request_log()
    }

    /// Ask for every record after `last_applied`. A newer request makes any
    /// earlier reply stale.
    fn request_log(&mut self) -> Result<Frame, ProtocolError> {
        let request = LogRequest { room: self.room.clone(), after: self.state.last_applied };
        let req = Frame::request(LOG_FETCH, to_data(&request)?).with_room(self.room.clone());
        self.fetch_request = Some(req.id.clone());
        debug!(room = %self.room, after = self.state.last_applied, "session: log fetch");
        Ok(req)
    }

    fn new_canvas(&self, width: u32, height: u32) -> Canvas {
        let canvas = Canvas::new(width, height);
        match &self.sink_factory {
            Some(factory) => canvas.with_sink(factory(width, height)),
            None => canvas,
        }
    }

    fn poison(&mut self) {
        self.poisoned = true;
        self.pending.clear();
        self.buffer.clear();
        self.state.status = SessionStatus::Disconnected;
    }

    fn ensure_usable(&self) -> Result<(), SessionError> {
        if self.poisoned {
            return Err(SessionError::Poisoned);
        }
        Ok(())
    }
}

fn replies_to(frame: &Frame, request_id: Option<&str>) -> bool {
    request_id.is_some() && frame.parent_id.as_deref() == request_id
}
