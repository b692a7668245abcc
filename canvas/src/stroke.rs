//! Stroke geometry shared by every party that paints.
//!
//! A [`DrawEvent`] is the raw description of one brush segment: two
//! endpoints, a tool, and a brush size. Client and server both expand it into
//! pixels with [`DrawEvent::pixels`], so the same event always touches the
//! same pixels no matter who paints it.
//!
//! The line between the endpoints is rasterized 4-connected. Stamping a brush
//! at each line pixel then yields a 4-connected footprint, which keeps a
//! size-1 stroke a single segment and lets an erase stroke cut a segment
//! cleanly in two.

#[cfg(test)]
#[path = "stroke_test.rs"]
mod stroke_test;

use serde::{Deserialize, Serialize};

use crate::consts::MIN_BRUSH_SIZE;
use crate::point::{Point, PointContainer};
use crate::segment::SegmentId;

/// What a stroke does to the pixels under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawType {
    /// Label pixels with the stroke's segment.
    Draw,
    /// Return pixels to unpainted.
    Erase,
}

impl DrawType {
    /// The label this tool writes, given the stroke's segment.
    #[must_use]
    pub fn paint_value(self, segment: Option<SegmentId>) -> Option<SegmentId> {
        match self {
            Self::Draw => segment,
            Self::Erase => None,
        }
    }
}

/// Brush footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushShape {
    #[default]
    Circle,
    Square,
}

/// One brush segment from `from` to `to`. Carries geometry only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawEvent {
    pub from: Point,
    pub to: Point,
    #[serde(rename = "type")]
    pub kind: DrawType,
    /// Brush diameter in pixels.
    pub size: u32,
    #[serde(default)]
    pub shape: BrushShape,
}

impl DrawEvent {
    #[must_use]
    pub fn new(from: Point, to: Point, kind: DrawType, size: u32) -> Self {
        Self { from, to, kind, size, shape: BrushShape::Circle }
    }

    #[must_use]
    pub fn with_shape(mut self, shape: BrushShape) -> Self {
        self.shape = shape;
        self
    }

    /// Clamp endpoints into a `width × height` canvas and the size into
    /// `MIN_BRUSH_SIZE..=max_size`.
    #[must_use]
    pub fn clamped(self, width: u32, height: u32, max_size: u32) -> Self {
        let max_x = i32::try_from(width.saturating_sub(1)).unwrap_or(i32::MAX);
        let max_y = i32::try_from(height.saturating_sub(1)).unwrap_or(i32::MAX);
        let clamp = |p: Point| Point::new(p.x.clamp(0, max_x), p.y.clamp(0, max_y));
        Self {
            from: clamp(self.from),
            to: clamp(self.to),
            size: self.size.clamp(MIN_BRUSH_SIZE, max_size.max(MIN_BRUSH_SIZE)),
            ..self
        }
    }

    /// Every in-bounds pixel the stroke covers, each once, in stamp order.
    #[must_use]
    pub fn pixels(&self, width: u32, height: u32) -> Vec<Point> {
        let mut seen = PointContainer::new();
        let mut out = Vec::new();
        for center in line(self.from, self.to) {
            for p in stamp(center, self.size, self.shape) {
                if in_canvas(p, width, height) && seen.set_if_absent(p, ()) {
                    out.push(p);
                }
            }
        }
        out
    }
}

/// 4-connected rasterization of the segment `from..=to`.
#[must_use]
pub fn line(from: Point, to: Point) -> Vec<Point> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let mut current = from;
    let mut out = Vec::new();
    loop {
        out.push(current);
        if current == to {
            break;
        }
        let e2 = 2 * err;
        if e2 - dy > dx - e2 {
            err += dy;
            current.x += sx;
        } else {
            err += dx;
            current.y += sy;
        }
    }
    out
}

/// Brush footprint of diameter `size` centered on `center`, unclipped.
#[must_use]
pub fn stamp(center: Point, size: u32, shape: BrushShape) -> Vec<Point> {
    let r = i32::try_from(size.max(MIN_BRUSH_SIZE) / 2).unwrap_or(i32::MAX / 2);
    let mut out = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            let inside = match shape {
                BrushShape::Square => true,
                BrushShape::Circle => dx * dx + dy * dy <= r * r,
            };
            if inside {
                out.push(Point::new(center.x + dx, center.y + dy));
            }
        }
    }
    out
}

fn in_canvas(p: Point, width: u32, height: u32) -> bool {
    match (u32::try_from(p.x), u32::try_from(p.y)) {
        (Ok(x), Ok(y)) => x < width && y < height,
        _ => false,
    }
}
