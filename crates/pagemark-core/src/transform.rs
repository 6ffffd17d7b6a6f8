//! Coordinate transforms between the three spaces the annotator works in.
//!
//! Display space is what the pointer reports (pixels, top-left origin,
//! affected by zoom and pan). Document space is what the model stores
//! (page units, top-left origin, zoom-independent). Export space is what
//! the page-description output expects (page units, bottom-left origin).

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom-and-pan transform between display and document space.
///
/// `doc = (display - offset) / scale`, and the inverse back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f64,
    pub offset: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    pub fn new(scale: f64, offset: Vec2) -> Self {
        Self {
            scale: scale.max(f64::MIN_POSITIVE),
            offset,
        }
    }

    /// Convert a display-space point to document space.
    pub fn display_to_doc(&self, display: Point) -> Point {
        Point::new(
            (display.x - self.offset.x) / self.scale,
            (display.y - self.offset.y) / self.scale,
        )
    }

    /// Convert a document-space point to display space.
    pub fn doc_to_display(&self, doc: Point) -> Point {
        Point::new(
            doc.x * self.scale + self.offset.x,
            doc.y * self.scale + self.offset.y,
        )
    }

    /// Convert a display-space rect to document space.
    pub fn rect_to_doc(&self, display: Rect) -> Rect {
        let p0 = self.display_to_doc(Point::new(display.x0, display.y0));
        let p1 = self.display_to_doc(Point::new(display.x1, display.y1));
        Rect::new(p0.x, p0.y, p1.x, p1.y)
    }

    /// Convert a display-space distance to document units.
    pub fn dist_to_doc(&self, display_dist: f64) -> f64 {
        display_dist / self.scale
    }
}

/// Flip a document-space point into export space (bottom-left origin).
///
/// The flip is its own inverse, so the same function converts back.
pub fn doc_to_export(p: Point, page_height: f64) -> Point {
    Point::new(p.x, page_height - p.y)
}

/// Export-space origin of a document-space box.
///
/// Boxes keep their own top-left-anchored width/height; only the origin
/// moves, to the box's bottom edge in document terms.
pub fn export_box_origin(x: f64, y: f64, height: f64, page_height: f64) -> Point {
    Point::new(x, page_height - y - height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_view_roundtrip() {
        let view = ViewTransform::default();
        let p = Point::new(123.0, 45.0);
        assert_eq!(view.display_to_doc(p), p);
        assert_eq!(view.doc_to_display(p), p);
    }

    #[test]
    fn test_zoomed_panned_roundtrip() {
        let view = ViewTransform::new(2.5, Vec2::new(-40.0, 12.0));
        for &(x, y) in &[(0.0, 0.0), (100.0, 250.0), (-33.0, 7.5)] {
            let p = Point::new(x, y);
            let back = view.doc_to_display(view.display_to_doc(p));
            assert!((back.x - p.x).abs() < 1e-9);
            assert!((back.y - p.y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_display_to_doc_applies_inverse_order() {
        let view = ViewTransform::new(2.0, Vec2::new(10.0, 20.0));
        let doc = view.display_to_doc(Point::new(30.0, 60.0));
        assert!((doc.x - 10.0).abs() < 1e-12);
        assert!((doc.y - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_dist_to_doc() {
        let view = ViewTransform::new(4.0, Vec2::ZERO);
        assert!((view.dist_to_doc(8.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_export_flip_self_inverse() {
        let page_height = 792.0;
        let p = Point::new(72.0, 100.0);
        let flipped = doc_to_export(p, page_height);
        assert!((flipped.y - 692.0).abs() < 1e-12);
        let back = doc_to_export(flipped, page_height);
        assert!((back.x - p.x).abs() < 1e-12);
        assert!((back.y - p.y).abs() < 1e-12);
    }

    #[test]
    fn test_export_box_origin() {
        // A 50-unit box at document y=10 on a 200-unit page draws at y=140.
        let o = export_box_origin(10.0, 10.0, 50.0, 200.0);
        assert!((o.x - 10.0).abs() < 1e-12);
        assert!((o.y - 140.0).abs() < 1e-12);
    }
}
