//! Segment painter client.
//!
//! | Module    | Role                                                        |
//! |-----------|-------------------------------------------------------------|
//! | `state`   | Resolution, segment allocator and reconciliation status     |
//! | `session` | Sans-IO room session: catch-up, ordering, optimistic strokes |
//! | `net`     | WebSocket loop with reconnect, HTTP catch-up fetcher        |

pub mod net;
pub mod session;
pub mod state;
