//! Shared frame model, protobuf codec and paint protocol records.
//!
//! This crate owns the wire representation used by `server`, `client` and
//! `cli`. Frame payloads stay flat JSON objects for handlers and travel as
//! protobuf for compact binary transport.

mod codec;
mod frame;
pub mod protocol;

pub use codec::{CodecError, decode_frame, encode_frame};
pub use frame::{Data, ErrorCode, FRAME_CODE, FRAME_MESSAGE, FRAME_RETRYABLE, Frame, Status};
