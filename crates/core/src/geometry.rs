//! Document-space geometry and screen/document coordinate conversion
//!
//! All rectangles use the page model shared by the editing code:
//! - Origin (0, 0) at the top-left of the page
//! - X increases to the right
//! - Y increases downward
//! - Units are in points (1/72 inch)

use serde::{Deserialize, Serialize};

/// A point in document space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle `(x0, y0, x1, y1)` in document space
///
/// Invariant: `x0 <= x1` and `y0 <= y1`. Use [`Rect::from_corners`] when the
/// corners come from an unordered source such as a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from already ordered coordinates
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        debug_assert!(x0 <= x1 && y0 <= y1, "unnormalized rect");
        Self { x0, y0, x1, y1 }
    }

    /// Create a rectangle from two arbitrary corners (normalized min/max)
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x0: a.x.min(b.x),
            y0: a.y.min(b.y),
            x1: a.x.max(b.x),
            y1: a.y.max(b.y),
        }
    }

    /// Create a square probe of `radius` on each side of `center`
    pub fn around(center: Point, radius: f32) -> Self {
        Self::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        )
    }

    /// Create from an `(x0, y0, x1, y1)` tuple
    pub fn from_tuple(rect: (f32, f32, f32, f32)) -> Self {
        Self::from_corners(Point::new(rect.0, rect.1), Point::new(rect.2, rect.3))
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// True when the rectangle has no area
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Check if this rectangle contains a point (edges included)
    pub fn contains_point(&self, point: &Point) -> bool {
        point.x >= self.x0 && point.x <= self.x1 && point.y >= self.y0 && point.y <= self.y1
    }

    /// Check if this rectangle shares a non-zero area with another
    ///
    /// Rectangles that only touch along an edge or at a corner do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Smallest rectangle enclosing both rectangles
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Grow the rectangle outward by `amount` on every side
    pub fn expand(&self, amount: f32) -> Rect {
        Rect {
            x0: self.x0 - amount,
            y0: self.y0 - amount,
            x1: self.x1 + amount,
            y1: self.y1 + amount,
        }
    }
}

/// Convert a screen-space pixel position to document space
pub fn to_document(px: f32, py: f32, scale: f32) -> (f32, f32) {
    (px / scale, py / scale)
}

/// Convert a document-space position to screen-space pixels
pub fn to_screen(dx: f32, dy: f32, scale: f32) -> (f32, f32) {
    (dx * scale, dy * scale)
}

/// Screen <-> document mapping at a fixed zoom level
///
/// The zoom control guarantees `scale > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateConverter {
    scale: f32,
}

impl CoordinateConverter {
    pub fn new(scale: f32) -> Self {
        debug_assert!(scale > 0.0);
        Self { scale }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        debug_assert!(scale > 0.0);
        self.scale = scale;
    }

    pub fn screen_to_document(&self, px: f32, py: f32) -> Point {
        let (x, y) = to_document(px, py, self.scale);
        Point::new(x, y)
    }

    pub fn document_to_screen(&self, point: Point) -> (f32, f32) {
        to_screen(point.x, point.y, self.scale)
    }

    /// Map two screen corners (in any order) to a normalized document rectangle
    pub fn screen_rect_to_document(&self, a: (f32, f32), b: (f32, f32)) -> Rect {
        Rect::from_corners(
            self.screen_to_document(a.0, a.1),
            self.screen_to_document(b.0, b.1),
        )
    }

    /// Map a document rectangle to screen space `(x0, y0, x1, y1)`
    pub fn document_rect_to_screen(&self, rect: &Rect) -> (f32, f32, f32, f32) {
        let (x0, y0) = to_screen(rect.x0, rect.y0, self.scale);
        let (x1, y1) = to_screen(rect.x1, rect.y1, self.scale);
        (x0, y0, x1, y1)
    }
}

impl Default for CoordinateConverter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rect_from_corners_normalizes() {
        let rect = Rect::from_corners(Point::new(200.0, 120.0), Point::new(100.0, 100.0));
        assert_eq!(rect, Rect::new(100.0, 100.0, 200.0, 120.0));
        assert_eq!(rect.width(), 100.0);
        assert_eq!(rect.height(), 20.0);
    }

    #[test]
    fn test_rect_contains_point() {
        let rect = Rect::new(10.0, 20.0, 110.0, 35.0);

        assert!(rect.contains_point(&Point::new(50.0, 25.0)));
        assert!(rect.contains_point(&Point::new(10.0, 20.0))); // Corner
        assert!(rect.contains_point(&Point::new(110.0, 35.0))); // Corner
        assert!(!rect.contains_point(&Point::new(5.0, 25.0)));
        assert!(!rect.contains_point(&Point::new(50.0, 36.0)));
    }

    #[test]
    fn test_rect_intersects_requires_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 50.0, 150.0, 150.0);
        let touching = Rect::new(100.0, 0.0, 200.0, 100.0);
        let far = Rect::new(200.0, 200.0, 300.0, 300.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&touching));
        assert!(!a.intersects(&far));
    }

    #[test]
    fn test_union_and_expand() {
        let a = Rect::new(100.0, 100.0, 200.0, 120.0);
        let b = Rect::new(100.0, 100.0, 203.0, 121.0);
        let mask = a.union(&b).expand(1.0);
        assert_eq!(mask, Rect::new(99.0, 99.0, 204.0, 122.0));
    }

    #[test]
    fn test_zoom_to_125_percent() {
        assert_eq!(to_screen(100.0, 100.0, 1.25), (125.0, 125.0));
        let converter = CoordinateConverter::new(1.25);
        assert_eq!(converter.screen_to_document(125.0, 125.0), Point::new(100.0, 100.0));
    }

    #[test]
    fn test_screen_rect_to_document() {
        let converter = CoordinateConverter::new(2.0);
        let rect = converter.screen_rect_to_document((400.0, 240.0), (200.0, 200.0));
        assert_eq!(rect, Rect::new(100.0, 100.0, 200.0, 120.0));
        assert_eq!(
            converter.document_rect_to_screen(&rect),
            (200.0, 200.0, 400.0, 240.0)
        );
    }

    proptest! {
        #[test]
        fn prop_coordinates_round_trip(
            px in -10_000.0f32..10_000.0,
            py in -10_000.0f32..10_000.0,
            scale in 0.01f32..10.0,
        ) {
            let (dx, dy) = to_document(px, py, scale);
            let (rx, ry) = to_screen(dx, dy, scale);
            let tolerance = 1e-3 * (1.0 + px.abs().max(py.abs()));
            prop_assert!((rx - px).abs() <= tolerance);
            prop_assert!((ry - py).abs() <= tolerance);
        }
    }
}
