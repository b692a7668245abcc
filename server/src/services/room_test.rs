use super::*;
use crate::state::test_helpers;
use tokio::time::{Duration, timeout};

#[test]
fn room_names_are_validated() {
    assert!(validate_room_name("lobby").is_ok());
    assert!(validate_room_name("team_1-a").is_ok());
    assert!(matches!(validate_room_name(""), Err(RoomError::NameRequired)));
    assert!(matches!(validate_room_name("has space"), Err(RoomError::InvalidName(_))));
    assert!(matches!(validate_room_name(&"x".repeat(65)), Err(RoomError::InvalidName(_))));
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(RoomError::NotFound("r".into()).error_code(), "E_ROOM_NOT_FOUND");
    assert_eq!(RoomError::NameRequired.error_code(), "E_ROOM_INVALID");
    assert_eq!(RoomError::NotJoined.error_code(), "E_NOT_JOINED");
}

#[tokio::test]
async fn join_creates_room_with_configured_size() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(4);

    let reply = join_room(&state, "lobby", Uuid::new_v4(), tx).await.unwrap();

    assert_eq!(reply, JoinReply { room: "lobby".into(), width: 16, height: 16, max_brush_size: 64, head: 0 });
    assert_eq!(state.rooms.read().await["lobby"].clients.len(), 1);
}

#[tokio::test]
async fn join_rejects_bad_name() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(4);
    let err = join_room(&state, "no/slashes", Uuid::new_v4(), tx).await.unwrap_err();
    assert!(matches!(err, RoomError::InvalidName(_)));
    assert!(state.rooms.read().await.is_empty());
}

#[tokio::test]
async fn part_keeps_room() {
    let state = test_helpers::test_app_state();
    let (client_id, _rx) = test_helpers::seed_client(&state, "lobby").await;

    part_room(&state, "lobby", client_id).await;
    part_room(&state, "missing", client_id).await;

    let rooms = state.rooms.read().await;
    assert!(rooms["lobby"].clients.is_empty());
}

#[tokio::test]
async fn room_info_reports_counts() {
    let state = test_helpers::test_app_state();
    assert!(matches!(room_info(&state, "lobby").await, Err(RoomError::NotFound(_))));

    let (_client, _rx) = test_helpers::seed_client(&state, "lobby").await;
    let info = room_info(&state, "lobby").await.unwrap();
    assert_eq!(info.head, 0);
    assert_eq!(info.segments, 0);
    assert_eq!(info.clients, 1);
}

#[tokio::test]
async fn broadcast_excludes_sender() {
    let state = test_helpers::test_app_state();
    let (sender, mut sender_rx) = test_helpers::seed_client(&state, "lobby").await;
    let (_peer, mut peer_rx) = test_helpers::seed_client(&state, "lobby").await;

    let frame = Frame::request("room:join", frames::Data::new()).with_room("lobby");
    broadcast(&state, "lobby", &frame, Some(sender)).await;

    let got = timeout(Duration::from_millis(200), peer_rx.recv())
        .await
        .expect("peer receive timed out")
        .expect("peer channel closed");
    assert_eq!(got.syscall, "room:join");
    assert!(sender_rx.try_recv().is_err());
}
