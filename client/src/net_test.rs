use canvas::point::Point;
use canvas::stroke::DrawType;
use frames::Data;
use frames::protocol::{
    DRAW_STROKE, DrawBroadcast, DrawResponse, JoinReply, LOG_FETCH, ROOM_JOIN, SESSION_CONNECTED, from_data, to_data,
};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;

use super::*;

#[test]
fn ws_url_maps_http_schemes() {
    assert_eq!(ws_url("http://127.0.0.1:3000").unwrap(), "ws://127.0.0.1:3000/api/ws");
    assert_eq!(ws_url("https://paint.example.com/").unwrap(), "wss://paint.example.com/api/ws");
}

#[test]
fn ws_url_rejects_other_schemes() {
    assert!(matches!(ws_url("ftp://host"), Err(NetError::InvalidBaseUrl(_))));
    assert!(matches!(ws_url("127.0.0.1:3000"), Err(NetError::InvalidBaseUrl(_))));
}

#[test]
fn backoff_doubles_up_to_cap() {
    let max = Duration::from_secs(10);
    let mut delay = INITIAL_BACKOFF;
    let mut seen = Vec::new();
    for _ in 0..6 {
        seen.push(delay.as_millis());
        delay = next_backoff(delay, max);
    }
    assert_eq!(seen, vec![1000, 2000, 4000, 8000, 10_000, 10_000]);
}

#[test]
fn config_uses_default_backoff() {
    let config = ClientConfig::new("http://localhost:3000", "lobby");
    assert_eq!(config.room, "lobby");
    assert_eq!(config.initial_backoff, Duration::from_millis(1000));
    assert_eq!(config.max_backoff, Duration::from_secs(10));
}

async fn recv_frame(ws: &mut WebSocketStream<tokio::net::TcpStream>) -> Frame {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("server receive timed out")
            .expect("client closed")
            .expect("socket error");
        if let Message::Binary(bytes) = msg {
            return decode_frame(&bytes).unwrap();
        }
    }
}

async fn send_frame(ws: &mut WebSocketStream<tokio::net::TcpStream>, frame: &Frame) {
    ws.send(Message::Binary(encode_frame(frame).into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn client_joins_catches_up_and_strokes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let existing = DrawBroadcast {
        draw: DrawResponse {
            draw: DrawEvent::new(Point::new(0, 0), Point::new(3, 0), DrawType::Draw, 1),
            segment: Some(0),
            history_index: 1,
        },
        fills: Vec::new(),
    };

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        let hello = Frame::request(SESSION_CONNECTED, Data::new()).with_data("client_id", "c1");
        send_frame(&mut ws, &hello).await;

        let join = recv_frame(&mut ws).await;
        assert_eq!(join.syscall, ROOM_JOIN);
        assert_eq!(join.data_str("room"), Some("lobby"));
        let reply = JoinReply { room: "lobby".into(), width: 8, height: 8, max_brush_size: 4, head: 1 };
        send_frame(&mut ws, &join.done_with(to_data(&reply).unwrap())).await;

        let fetch = recv_frame(&mut ws).await;
        assert_eq!(fetch.syscall, LOG_FETCH);
        let log = frames::protocol::LogReply { room: "lobby".into(), entries: existing.entries() };
        send_frame(&mut ws, &fetch.done_with(to_data(&log).unwrap())).await;

        let stroke = recv_frame(&mut ws).await;
        assert_eq!(stroke.syscall, DRAW_STROKE);
        let event: DrawEvent = from_data(&stroke.data).unwrap();
        let batch = DrawBroadcast {
            draw: DrawResponse { draw: event, segment: Some(1), history_index: 2 },
            fills: Vec::new(),
        };
        send_frame(&mut ws, &stroke.done_with(to_data(&batch).unwrap())).await;

        // Hold the socket open until the client hangs up.
        while let Some(Ok(msg)) = ws.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    let handle = spawn_client(ClientConfig::new(format!("http://{addr}"), "lobby"));
    let mut state = handle.state();

    let live = timeout(Duration::from_secs(2), state.wait_for(|s| s.is_live()))
        .await
        .expect("client never went live")
        .unwrap()
        .clone();
    assert_eq!(live.last_applied, 1);
    assert_eq!(live.client_id.as_deref(), Some("c1"));
    assert_eq!((live.width, live.height), (8, 8));

    assert!(
        handle
            .stroke(DrawEvent::new(Point::new(0, 4), Point::new(3, 4), DrawType::Draw, 1))
            .await
    );
    let confirmed = timeout(Duration::from_secs(2), state.wait_for(|s| s.last_applied == 2))
        .await
        .expect("stroke never confirmed")
        .unwrap()
        .clone();
    assert_eq!(confirmed.next_segment, 2);

    handle.shutdown().await;
    timeout(Duration::from_secs(2), server)
        .await
        .expect("server never saw close")
        .unwrap();
}

#[tokio::test]
async fn client_without_server_stays_disconnected() {
    let config = ClientConfig {
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(20),
        ..ClientConfig::new("http://127.0.0.1:1", "lobby")
    };
    let handle = spawn_client(config);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!handle.state().borrow().is_live());
    timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .expect("shutdown hung");
}
