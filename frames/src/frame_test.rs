use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("room:join", Data::new());
    assert_eq!(frame.syscall, "room:join");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.room.is_none());
    assert!(frame.ts > 0);
    assert!(Uuid::parse_str(&frame.id).is_ok());
}

#[test]
fn reply_inherits_context() {
    let req = Frame::request("draw:stroke", Data::new()).with_room("lobby");
    let item = req.item(Data::new());

    assert_eq!(item.parent_id.as_deref(), Some(req.id.as_str()));
    assert_eq!(item.room.as_deref(), Some("lobby"));
    assert_eq!(item.syscall, "draw:stroke");
    assert_eq!(item.status, Status::Item);
    assert_ne!(item.id, req.id);
}

#[test]
fn done_with_carries_payload() {
    let req = Frame::request("log:fetch", Data::new());
    let done = req.done_with(Data::new()).with_data("entries", serde_json::json!([]));
    assert_eq!(done.status, Status::Done);
    assert_eq!(done.data.get("entries"), Some(&serde_json::json!([])));
    assert!(req.done().data.is_empty());
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(Status::Cancel.is_terminal());
    assert!(!Status::Request.is_terminal());
    assert!(!Status::Item.is_terminal());
}

#[test]
fn prefix_and_op() {
    let frame = Frame::request("draw:stroke", Data::new());
    assert_eq!(frame.prefix(), "draw");
    assert_eq!(frame.op(), "stroke");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
    assert_eq!(frame.op(), "");
}

#[test]
fn json_shape() {
    let original = Frame::request("room:join", Data::new())
        .with_room("lobby")
        .with_from("client-1")
        .with_data("key", "value");

    let json = serde_json::to_string(&original).expect("serialize");
    let restored: Frame = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(restored, original);
    assert_eq!(restored.data_str("key"), Some("value"));
    assert!(json.contains("\"status\":\"request\""));
}

#[test]
fn room_is_omitted_when_absent() {
    let json = serde_json::to_string(&Frame::request("log:fetch", Data::new())).expect("serialize");
    assert!(!json.contains("\"room\""));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("room not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_ROOM_NOT_FOUND"
        }
    }

    let req = Frame::request("log:fetch", Data::new());
    let err = req.error_from(&NotFound);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.error_parts(), ("E_ROOM_NOT_FOUND", "room not found"));
    assert_eq!(err.data.get(FRAME_RETRYABLE).and_then(serde_json::Value::as_bool), Some(false));
}

#[test]
fn plain_error_has_no_code() {
    let err = Frame::request("room:join", Data::new()).error("room required");
    assert_eq!(err.error_parts(), ("-", "room required"));
}

#[test]
fn cancel_references_target() {
    let req = Frame::request("log:fetch", Data::new());
    let cancel = Frame::cancel(req.id.clone());

    assert_eq!(cancel.parent_id, Some(req.id));
    assert_eq!(cancel.status, Status::Cancel);
    assert!(cancel.status.is_terminal());
}
