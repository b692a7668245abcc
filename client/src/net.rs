//! Network driver for a [`ClientSession`].
//!
//! `spawn_client` runs one session over a WebSocket: it connects, feeds every
//! inbound frame to the session, sends whatever the session returns, and
//! reconnects with exponential backoff when the socket drops. Local strokes
//! come in over a channel; the session's state goes out over a `watch`.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures and server-rejected joins end the connection and
//! trigger a reconnect. A corrupted session is rebuilt from scratch and
//! replays the room log on the next join.

use std::time::Duration;

use canvas::stroke::DrawEvent;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use frames::protocol::{LogReply, RoomInfo};
use frames::{Frame, decode_frame, encode_frame};

use crate::session::{ClientSession, SessionError, SinkFactory};
use crate::state::ClientState;

#[cfg(test)]
#[path = "net_test.rs"]
mod net_test;

const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const STROKE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket failed: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<tokio_tungstenite::tungstenite::Error> for NetError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(e))
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP base URL of the server, e.g. `http://127.0.0.1:3000`.
    pub base_url: String,
    pub room: String,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            room: room.into(),
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

// =============================================================================
// URLS + HTTP CATCH-UP
// =============================================================================

/// WebSocket endpoint for an HTTP base URL.
///
/// # Errors
///
/// Returns [`NetError::InvalidBaseUrl`] unless the URL is `http://` or `https://`.
pub fn ws_url(base_url: &str) -> Result<String, NetError> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(NetError::InvalidBaseUrl(base_url.to_owned()));
    };
    Ok(format!("{ws_base}/api/ws"))
}

/// Room log records after `after` over HTTP.
///
/// # Errors
///
/// Returns [`NetError::Http`] for transport failures and non-2xx statuses.
pub async fn fetch_log(http: &reqwest::Client, base_url: &str, room: &str, after: u64) -> Result<LogReply, NetError> {
    let url = format!("{}/api/log", base_url.trim_end_matches('/'));
    let after = after.to_string();
    let reply = http
        .get(url)
        .query(&[("room", room), ("after", after.as_str())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(reply)
}

/// Room summary over HTTP.
///
/// # Errors
///
/// Returns [`NetError::Http`] for transport failures and non-2xx statuses.
pub async fn fetch_room(http: &reqwest::Client, base_url: &str, room: &str) -> Result<RoomInfo, NetError> {
    let url = format!("{}/api/rooms/{room}", base_url.trim_end_matches('/'));
    let info = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(info)
}

/// Double the delay, capped at `max`.
#[must_use]
pub fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

// =============================================================================
// CLIENT LOOP
// =============================================================================

/// A running client.
pub struct ClientHandle {
    strokes: mpsc::Sender<DrawEvent>,
    state: watch::Receiver<ClientState>,
    task: JoinHandle<()>,
}

impl ClientHandle {
    /// Queue a local stroke. Returns `false` once the client has stopped.
    pub async fn stroke(&self, event: DrawEvent) -> bool {
        self.strokes.send(event).await.is_ok()
    }

    /// Watch the session state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ClientState> {
        self.state.clone()
    }

    /// Close the connection and wait for the loop to exit.
    pub async fn shutdown(self) {
        drop(self.strokes);
        if let Err(e) = self.task.await {
            warn!(error = %e, "client: loop task failed");
        }
    }
}

/// Spawn the connection loop for one room.
#[must_use]
pub fn spawn_client(config: ClientConfig) -> ClientHandle {
    spawn(config, None)
}

/// Spawn the connection loop, rendering through sinks built by `factory`.
#[must_use]
pub fn spawn_client_with_sink(config: ClientConfig, factory: SinkFactory) -> ClientHandle {
    spawn(config, Some(factory))
}

fn spawn(config: ClientConfig, factory: Option<SinkFactory>) -> ClientHandle {
    let (strokes_tx, strokes_rx) = mpsc::channel(STROKE_CHANNEL_CAPACITY);
    let (state_tx, state_rx) = watch::channel(ClientState::default());
    let task = tokio::spawn(run_client(config, factory, strokes_rx, state_tx));
    ClientHandle { strokes: strokes_tx, state: state_rx, task }
}

fn new_session(room: &str, factory: Option<&SinkFactory>) -> ClientSession {
    let session = ClientSession::new(room);
    match factory {
        Some(factory) => session.with_sink_factory(factory.clone()),
        None => session,
    }
}

enum Exit {
    /// The socket closed; reconnect.
    Closed,
    /// The stroke channel closed; stop.
    Shutdown,
}

/// Main connection loop with reconnect logic.
async fn run_client(
    config: ClientConfig,
    factory: Option<SinkFactory>,
    mut strokes: mpsc::Receiver<DrawEvent>,
    state_tx: watch::Sender<ClientState>,
) {
    let url = match ws_url(&config.base_url) {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "client: not starting");
            return;
        }
    };
    let mut session = new_session(&config.room, factory.as_ref());
    let mut backoff = config.initial_backoff;

    loop {
        match connect_and_run(&url, &mut session, &mut strokes, &state_tx, &mut backoff, &config).await {
            Ok(Exit::Shutdown) => {
                info!(room = %config.room, "client: shut down");
                return;
            }
            Ok(Exit::Closed) => info!(room = %config.room, "client: disconnected"),
            Err(NetError::Session(e @ (SessionError::Corrupted(_) | SessionError::Poisoned))) => {
                warn!(room = %config.room, error = %e, "client: rebuilding session");
                session = new_session(&config.room, factory.as_ref());
            }
            Err(e) => warn!(room = %config.room, error = %e, "client: connection failed"),
        }

        session.on_disconnected();
        state_tx.send_replace(session.state().clone());

        info!(delay_ms = backoff.as_millis(), "client: reconnecting");
        let sleep = tokio::time::sleep(backoff);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => break,
                event = strokes.recv() => {
                    if event.is_none() {
                        return;
                    }
                    debug!("client: dropped stroke while disconnected");
                }
            }
        }
        backoff = next_backoff(backoff, config.max_backoff);
    }
}

/// Connect to the WebSocket and process messages until disconnect.
async fn connect_and_run(
    url: &str,
    session: &mut ClientSession,
    strokes: &mut mpsc::Receiver<DrawEvent>,
    state_tx: &watch::Sender<ClientState>,
    backoff: &mut Duration,
    config: &ClientConfig,
) -> Result<Exit, NetError> {
    let (socket, _) = connect_async(url).await?;
    *backoff = config.initial_backoff;
    info!(%url, room = %config.room, "client: connected");
    let (mut sink, mut stream) = socket.split();

    loop {
        let outbound: Vec<Frame> = tokio::select! {
            msg = stream.next() => match msg {
                None | Some(Ok(Message::Close(_))) => return Ok(Exit::Closed),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Binary(bytes))) => {
                    let frame = match decode_frame(&bytes) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(error = %e, "client: undecodable frame");
                            continue;
                        }
                    };
                    match session.handle_frame(&frame) {
                        Ok(out) => out,
                        Err(SessionError::Payload(e)) => {
                            warn!(syscall = %frame.syscall, error = %e, "client: bad payload");
                            Vec::new()
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Some(Ok(_)) => continue,
            },
            event = strokes.recv() => match event {
                None => {
                    if let Err(e) = sink.close().await {
                        debug!(error = %e, "client: close failed");
                    }
                    return Ok(Exit::Shutdown);
                }
                Some(event) => match session.stroke(event) {
                    Ok(req) => vec![req],
                    Err(SessionError::NotLive(status)) => {
                        debug!(?status, "client: dropped stroke before live");
                        Vec::new()
                    }
                    Err(e) => return Err(e.into()),
                },
            },
        };

        for frame in &outbound {
            sink.send(Message::Binary(encode_frame(frame).into())).await?;
        }
        state_tx.send_replace(session.state().clone());
    }
}
