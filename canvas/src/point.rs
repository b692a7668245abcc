//! Integer pixel coordinates and the sparse per-point container.
//!
//! `PointContainer` is the workhorse behind segment boundary sets, BFS visited
//! sets, and the painted-point ledger of a [`crate::action::CanvasAction`]. It is
//! a thin wrapper over a `HashMap` keyed by [`Point`]; iteration order is
//! unspecified.

#[cfg(test)]
#[path = "point_test.rs"]
mod point_test;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A pixel coordinate. Serialized as a two-element `[x, y]` array.
///
/// Coordinates are signed so neighbor arithmetic at the canvas edge can step
/// to `-1` without wrapping; the store treats such points as unpainted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four edge-sharing neighbors: left, right, up, down.
    #[must_use]
    pub fn neighbors4(self) -> [Point; 4] {
        let Point { x, y } = self;
        [Point::new(x - 1, y), Point::new(x + 1, y), Point::new(x, y - 1), Point::new(x, y + 1)]
    }

    /// The eight edge- or corner-sharing neighbors.
    #[must_use]
    pub fn neighbors8(self) -> [Point; 8] {
        let Point { x, y } = self;
        [
            Point::new(x - 1, y),
            Point::new(x + 1, y),
            Point::new(x, y - 1),
            Point::new(x, y + 1),
            Point::new(x - 1, y - 1),
            Point::new(x + 1, y - 1),
            Point::new(x - 1, y + 1),
            Point::new(x + 1, y + 1),
        ]
    }

    /// Row-major ordering key: `y` first, then `x`.
    fn row_major(self) -> (i32, i32) {
        (self.y, self.x)
    }
}

impl From<[i32; 2]> for Point {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [i32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Sparse map from [`Point`] to per-point metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointContainer<T> {
    points: HashMap<Point, T>,
}

impl<T> PointContainer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { points: HashMap::new() }
    }

    /// Insert or replace the metadata stored at `p`.
    pub fn set(&mut self, p: Point, meta: T) {
        self.points.insert(p, meta);
    }

    /// Insert `meta` only if `p` is absent. Returns `true` if it was inserted.
    pub fn set_if_absent(&mut self, p: Point, meta: T) -> bool {
        match self.points.entry(p) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(meta);
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, p: Point) -> Option<&T> {
        self.points.get(&p)
    }

    #[must_use]
    pub fn has(&self, p: Point) -> bool {
        self.points.contains_key(&p)
    }

    /// Remove `p`, returning its metadata if it was present.
    pub fn delete(&mut self, p: Point) -> Option<T> {
        self.points.remove(&p)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Derive a new container holding only the entries accepted by `pred`.
    /// The receiver is left untouched.
    #[must_use]
    pub fn filter(&self, mut pred: impl FnMut(Point, &T) -> bool) -> Self
    where
        T: Clone,
    {
        self.points
            .iter()
            .filter(|(p, meta)| pred(**p, meta))
            .map(|(p, meta)| (*p, meta.clone()))
            .collect()
    }

    /// Visit every entry once, in unspecified order.
    pub fn for_each(&self, mut visitor: impl FnMut(Point, &T)) {
        for (p, meta) in &self.points {
            visitor(*p, meta);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Point, &T)> {
        self.points.iter().map(|(p, meta)| (*p, meta))
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.keys().copied()
    }

    /// The lowest point in row-major order, if any.
    ///
    /// Used as the BFS seed so split detection picks the same seed on every
    /// run over the same frontier.
    #[must_use]
    pub fn first(&self) -> Option<Point> {
        self.points.keys().copied().min_by_key(|p| p.row_major())
    }

    /// All points sorted in row-major order.
    #[must_use]
    pub fn sorted_points(&self) -> Vec<Point> {
        let mut out: Vec<Point> = self.points().collect();
        out.sort_by_key(|p| p.row_major());
        out
    }
}

impl<T> Default for PointContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(Point, T)> for PointContainer<T> {
    fn from_iter<I: IntoIterator<Item = (Point, T)>>(iter: I) -> Self {
        Self { points: iter.into_iter().collect() }
    }
}

impl FromIterator<Point> for PointContainer<()> {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self { points: iter.into_iter().map(|p| (p, ())).collect() }
    }
}
