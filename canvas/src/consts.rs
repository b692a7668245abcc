//! Shared numeric constants for the canvas crate.

// ── Rendering ───────────────────────────────────────────────────

/// Alpha written for interior segment pixels.
pub const DRAW_ALPHA: f32 = 0.5;

/// Extra alpha added on top of [`DRAW_ALPHA`] for boundary pixels.
pub const BOUNDARY_ALPHA_BOOST: f32 = 0.5;

/// Alpha written for pixels that were erased.
pub const ERASED_ALPHA: f32 = 0.0;

// ── Topology ────────────────────────────────────────────────────

/// A pixel with this many same-segment 4-neighbors is interior.
pub const FULL_NEIGHBORS: u8 = 4;

// ── Brushes ─────────────────────────────────────────────────────

/// Smallest brush diameter; a size-1 brush stamps exactly one pixel.
pub const MIN_BRUSH_SIZE: u32 = 1;
