//! Rendering seam: the pixel sink the segment store writes color into.
//!
//! The store never reads pixel color back. Every reassignment emits one or
//! more `fill_pixel` writes carrying the segment color and an alpha that tells
//! interior pixels apart from boundary pixels. Hosts plug in a GPU texture
//! uploader; this crate ships a [`NullSink`] for headless use (the server) and
//! an in-memory [`RgbaBuffer`] for tests and simple hosts.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::point::Point;

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// A pseudo-random color for a newly seen segment.
    #[must_use]
    pub fn random() -> Self {
        Self { r: rand::random(), g: rand::random(), b: rand::random() }
    }

    /// CSS hex form, e.g. `#1f1a17`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Receiver of pixel writes produced by segment reassignment.
pub trait PixelSink: Send + Sync {
    fn fill_pixel(&mut self, at: Point, color: Rgb, alpha: f32);
}

impl<S: PixelSink + ?Sized> PixelSink for Box<S> {
    fn fill_pixel(&mut self, at: Point, color: Rgb, alpha: f32) {
        (**self).fill_pixel(at, color, alpha);
    }
}

/// Discards every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PixelSink for NullSink {
    fn fill_pixel(&mut self, _at: Point, _color: Rgb, _alpha: f32) {}
}

/// Shared RGBA8 buffer, row-major, `width * height * 4` bytes.
///
/// Cloning yields another handle onto the same pixels, so a host can keep one
/// handle for upload while the store owns the other.
#[derive(Debug, Clone)]
pub struct RgbaBuffer {
    width: u32,
    height: u32,
    data: Arc<Mutex<Vec<u8>>>,
}

impl RgbaBuffer {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 4;
        Self { width, height, data: Arc::new(Mutex::new(vec![0; len])) }
    }

    /// RGBA bytes at `at`, or `None` outside the buffer.
    #[must_use]
    pub fn pixel(&self, at: Point) -> Option<[u8; 4]> {
        let offset = self.offset(at)?;
        let data = self.lock();
        Some([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
    }

    /// Copy of the whole buffer.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().clone()
    }

    fn offset(&self, at: Point) -> Option<usize> {
        let (Ok(x), Ok(y)) = (u32::try_from(at.x), u32::try_from(at.y)) else {
            return None;
        };
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        match self.data.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl PixelSink for RgbaBuffer {
    fn fill_pixel(&mut self, at: Point, color: Rgb, alpha: f32) {
        let Some(offset) = self.offset(at) else {
            return;
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        let mut data = self.lock();
        data[offset] = color.r;
        data[offset + 1] = color.g;
        data[offset + 2] = color.b;
        data[offset + 3] = a;
    }
}
