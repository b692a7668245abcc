//! Segmented pixel canvas for the collaborative paint room.
//!
//! Every pixel of a fixed-size canvas is either unpainted or labeled with a
//! segment id; a segment is a maximal 4-connected region sharing one label.
//! This crate keeps that labeling correct as strokes draw and erase, splits a
//! segment in two when a stroke cuts through it, and records every mutation
//! so it can be undone. It does no I/O. The server uses it as the authority
//! and the client uses it to replay what the server decided.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::Canvas`]: store plus history, the stroke entry points |
//! | [`segment`] | Pixel grid, boundary sets, split detection and relabel replay |
//! | [`stroke`] | Draw events and their rasterization into pixels |
//! | [`action`] | Undoable record of one stroke |
//! | [`history`] | Linear undo/redo over actions |
//! | [`point`] | Pixel coordinates and the point-keyed container |
//! | [`render`] | Pixel sink seam and an in-memory RGBA buffer |
//! | [`consts`] | Shared constants (alphas, brush limits) |

pub mod action;
pub mod consts;
pub mod engine;
pub mod history;
pub mod point;
pub mod render;
pub mod segment;
pub mod stroke;
