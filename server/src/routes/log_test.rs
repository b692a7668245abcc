use canvas::point::Point;
use canvas::stroke::{DrawEvent, DrawType};

use super::*;
use crate::services::draw::apply_draw;
use crate::state::test_helpers;

#[test]
fn room_error_to_status_maps_variants() {
    assert_eq!(room_error_to_status(RoomError::NameRequired), StatusCode::BAD_REQUEST);
    assert_eq!(room_error_to_status(RoomError::InvalidName("a b".into())), StatusCode::BAD_REQUEST);
    assert_eq!(room_error_to_status(RoomError::NotFound("x".into())), StatusCode::NOT_FOUND);
    assert_eq!(room_error_to_status(RoomError::NotJoined), StatusCode::CONFLICT);
}

#[tokio::test]
async fn get_log_returns_entries_after() {
    let state = test_helpers::test_app_state();
    let (client, _rx) = test_helpers::seed_client(&state, "lobby").await;
    for y in 0..3 {
        let stroke = DrawEvent::new(Point::new(0, y * 4), Point::new(5, y * 4), DrawType::Draw, 1);
        apply_draw(&state, "lobby", client, stroke).await.unwrap();
    }

    let Json(reply) = get_log(State(state), Query(LogRequest { room: "lobby".into(), after: 1 }))
        .await
        .unwrap();

    assert_eq!(reply.room, "lobby");
    assert_eq!(reply.entries.iter().map(|e| e.history_index()).collect::<Vec<_>>(), vec![2, 3]);
}

#[tokio::test]
async fn get_log_unknown_room_is_not_found() {
    let state = test_helpers::test_app_state();
    let status = get_log(State(state), Query(LogRequest { room: "ghost".into(), after: 0 }))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_room_reports_segments_and_clients() {
    let state = test_helpers::test_app_state();
    let (client, _rx) = test_helpers::seed_client(&state, "lobby").await;
    let line = DrawEvent::new(Point::new(0, 0), Point::new(3, 0), DrawType::Draw, 1);
    let cut = DrawEvent::new(Point::new(1, 0), Point::new(2, 0), DrawType::Erase, 1);
    apply_draw(&state, "lobby", client, line).await.unwrap();
    apply_draw(&state, "lobby", client, cut).await.unwrap();

    let Json(info) = get_room(State(state), Path("lobby".into())).await.unwrap();

    assert_eq!((info.width, info.height), (16, 16));
    assert_eq!(info.head, 3);
    assert_eq!(info.segments, 2);
    assert_eq!(info.clients, 1);
}
