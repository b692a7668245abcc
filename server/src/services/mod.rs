//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room state transitions and the canonical canvas so
//! route handlers can stay focused on protocol translation.

pub mod draw;
pub mod log;
pub mod room;
