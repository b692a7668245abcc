use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use canvas::point::Point;
use canvas::stroke::{BrushShape, DrawEvent, DrawType};
use clap::{Args, Parser, Subcommand, ValueEnum};
use client::net::{NetError, fetch_log, fetch_room, ws_url};
use frames::protocol::{DRAW_STROKE, DrawBroadcast, JoinReply, ROOM_JOIN, SESSION_CONNECTED, from_data, to_data};
use frames::{Data, Frame, Status};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

type Socket = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("bad payload: {0}")]
    Payload(#[from] frames::protocol::ProtocolError),
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {syscall}: {code} {message}")]
    ServerError { syscall: String, code: String, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("io failed: {0}")]
    Io(#[from] io::Error),
}

impl From<NetError> for CliError {
    fn from(e: NetError) -> Self {
        match e {
            NetError::InvalidBaseUrl(url) => Self::InvalidBaseUrl(url),
            NetError::Http(e) => Self::Http(e),
            NetError::Ws(e) => Self::WsConnect(e),
            NetError::Session(e) => Self::ServerError {
                syscall: "session".to_owned(),
                code: "-".to_owned(),
                message: e.to_string(),
            },
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "painter-cli", about = "Segment painter API and websocket CLI")]
struct Cli {
    #[arg(long, env = "PAINTER_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the server is up.
    Ping,
    /// Print a room summary.
    Room { room: String },
    /// Print room log records after an index.
    Log {
        room: String,
        #[arg(long, default_value_t = 0)]
        after: u64,
    },
    /// Send one stroke and print the canonical batch.
    Draw(DrawArgs),
    /// Send strokes from a JSONL file of draw events.
    Replay(ReplayArgs),
    /// Print stroke batches from other clients as they arrive.
    Watch {
        room: String,
        #[arg(long, help = "Stop after this many batches")]
        count: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Shape {
    Circle,
    Square,
}

#[derive(Args, Debug)]
struct DrawArgs {
    room: String,
    #[arg(long, value_parser = parse_point, help = "Start point as x,y")]
    from: Point,
    #[arg(long, value_parser = parse_point, help = "End point as x,y; defaults to --from")]
    to: Option<Point>,
    #[arg(long, default_value_t = 1)]
    size: u32,
    #[arg(long, default_value_t = false)]
    erase: bool,
    #[arg(long, value_enum, default_value_t = Shape::Circle)]
    shape: Shape,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    room: String,
    #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
    input: String,
    #[arg(long, default_value_t = 100)]
    progress_every: usize,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_owned();

    match cli.command {
        Command::Ping => run_ping(&base_url).await,
        Command::Room { room } => {
            let info = fetch_room(&reqwest::Client::new(), &base_url, &room).await?;
            print_json(&info)
        }
        Command::Log { room, after } => {
            let reply = fetch_log(&reqwest::Client::new(), &base_url, &room, after).await?;
            print_json(&reply)
        }
        Command::Draw(args) => run_draw(&base_url, args).await,
        Command::Replay(args) => run_replay(&base_url, args).await,
        Command::Watch { room, count } => run_watch(&base_url, &room, count).await,
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let response = reqwest::Client::new()
        .get(format!("{base_url}/healthz"))
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError {
            syscall: format!("HTTP {}", status.as_u16()),
            code: "-".to_owned(),
            message: "health check failed".to_owned(),
        });
    }
    println!("ok");
    Ok(())
}

async fn run_draw(base_url: &str, args: DrawArgs) -> Result<(), CliError> {
    let kind = if args.erase { DrawType::Erase } else { DrawType::Draw };
    let shape = match args.shape {
        Shape::Circle => BrushShape::Circle,
        Shape::Square => BrushShape::Square,
    };
    let event = DrawEvent::new(args.from, args.to.unwrap_or(args.from), kind, args.size).with_shape(shape);

    let mut stream = connect_and_join(base_url, &args.room).await?;
    let batch = send_stroke(&mut stream, &event).await?;
    print_json(&batch)
}

async fn run_replay(base_url: &str, args: ReplayArgs) -> Result<(), CliError> {
    let mut stream = connect_and_join(base_url, &args.room).await?;

    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };

    let mut sent = 0_usize;
    let mut skipped = 0_usize;
    let mut last_index = 0_u64;
    for line in reader.lines() {
        let Some(event) = parse_event_line(&line?)? else {
            skipped = skipped.saturating_add(1);
            continue;
        };
        last_index = send_stroke(&mut stream, &event).await?.last_index();
        sent = sent.saturating_add(1);
        if args.progress_every > 0 && sent.is_multiple_of(args.progress_every) {
            eprintln!("replayed {sent} strokes...");
        }
    }

    eprintln!(
        "replay complete: room={} sent={} skipped={} head={}",
        args.room, sent, skipped, last_index
    );
    Ok(())
}

async fn run_watch(base_url: &str, room: &str, count: Option<usize>) -> Result<(), CliError> {
    let mut stream = connect_and_join(base_url, room).await?;
    let mut seen = 0_usize;
    while count.is_none_or(|limit| seen < limit) {
        let frame = recv_next(&mut stream, None).await?;
        if frame.syscall != DRAW_STROKE || frame.status != Status::Request {
            continue;
        }
        let batch: DrawBroadcast = from_data(&frame.data)?;
        println!("{}", serde_json::to_string(&batch)?);
        seen = seen.saturating_add(1);
    }
    Ok(())
}

// =============================================================================
// WEBSOCKET HELPERS
// =============================================================================

async fn connect_and_join(base_url: &str, room: &str) -> Result<Socket, CliError> {
    let (mut stream, _) = connect_async(ws_url(base_url)?)
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;

    wait_for_session_connected(&mut stream).await?;

    let join = Frame::request(ROOM_JOIN, Data::new()).with_data("room", room);
    send(&mut stream, &join).await?;
    let reply = wait_for_terminal_response(&mut stream, &join.id, ROOM_JOIN).await?;
    let joined: JoinReply = from_data(&reply.data)?;
    eprintln!(
        "joined room={} size={}x{} head={}",
        joined.room, joined.width, joined.height, joined.head
    );
    Ok(stream)
}

async fn send_stroke(stream: &mut Socket, event: &DrawEvent) -> Result<DrawBroadcast, CliError> {
    let req = Frame::request(DRAW_STROKE, to_data(event)?);
    send(stream, &req).await?;
    let reply = wait_for_terminal_response(stream, &req.id, DRAW_STROKE).await?;
    Ok(from_data(&reply.data)?)
}

async fn send(stream: &mut Socket, frame: &Frame) -> Result<(), CliError> {
    stream
        .send(Message::Binary(frames::encode_frame(frame).into()))
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))
}

async fn wait_for_session_connected(stream: &mut Socket) -> Result<(), CliError> {
    loop {
        let frame = recv_next(stream, Some(Duration::from_secs(5))).await?;
        if frame.syscall == SESSION_CONNECTED {
            return Ok(());
        }
    }
}

async fn wait_for_terminal_response(stream: &mut Socket, request_id: &str, syscall: &str) -> Result<Frame, CliError> {
    loop {
        let frame = recv_next(stream, Some(Duration::from_secs(15))).await?;
        if frame.parent_id.as_deref() != Some(request_id) || frame.syscall != syscall {
            continue;
        }
        match frame.status {
            Status::Done => return Ok(frame),
            Status::Error | Status::Cancel => {
                let (code, message) = frame.error_parts();
                return Err(CliError::ServerError {
                    syscall: frame.syscall.clone(),
                    code: code.to_owned(),
                    message: message.to_owned(),
                });
            }
            _ => {}
        }
    }
}

async fn recv_next(stream: &mut Socket, timeout: Option<Duration>) -> Result<Frame, CliError> {
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(CliError::WsClosed);
            };
            match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
                Message::Binary(bytes) => {
                    return frames::decode_frame(&bytes).map_err(CliError::from);
                }
                Message::Close(_) => return Err(CliError::WsClosed),
                _ => {}
            }
        }
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| CliError::Timeout)?,
        None => fut.await,
    }
}

// =============================================================================
// PARSING + OUTPUT
// =============================================================================

fn parse_point(raw: &str) -> Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got `{raw}`"))?;
    let x = x.trim().parse::<i32>().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse::<i32>().map_err(|e| format!("bad y: {e}"))?;
    Ok(Point::new(x, y))
}

/// One draw event per line; blank lines and `#` comments are skipped.
fn parse_event_line(line: &str) -> Result<Option<DrawEvent>, CliError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
