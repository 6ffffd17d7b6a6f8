//! Geometry primitives shared by the element model, the interaction engine
//! and the export serializer.
//!
//! The padding and control-point formulas here are the single source of truth
//! for line/arrow geometry. The interactive renderer, the drag recompute path
//! and the export serializer all call these functions; none of them re-derive
//! the values locally.

use kurbo::{Point, Rect, Vec2};

/// Minimum element extent in document units.
pub const MIN_ELEMENT_SIZE: f64 = 10.0;

/// Replace non-finite coordinates with zero.
///
/// Degenerate pointer input (NaN deltas from zero-length drags) is clamped
/// here instead of propagating into the model.
pub fn sanitize(p: Point) -> Point {
    Point::new(
        if p.x.is_finite() { p.x } else { 0.0 },
        if p.y.is_finite() { p.y } else { 0.0 },
    )
}

/// Midpoint of the `a -> b` chord.
pub fn midpoint(a: Point, b: Point) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Length of the `a -> b` chord, floored at 1.0 to avoid division by zero.
pub fn length(a: Point, b: Point) -> f64 {
    (b - a).hypot().max(1.0)
}

/// Unit normal of the `a -> b` direction (the direction rotated 90 degrees).
pub fn perpendicular(a: Point, b: Point) -> Vec2 {
    let d = b - a;
    let len = length(a, b);
    Vec2::new(-d.y / len, d.x / len)
}

/// Control point of the quadratic curve through `start` and `end` with the
/// given signed curvature (perpendicular offset in document units).
pub fn curve_control_point(start: Point, end: Point, curvature: f64) -> Point {
    let mid = midpoint(start, end);
    let n = perpendicular(start, end);
    Point::new(mid.x + n.x * curvature, mid.y + n.y * curvature)
}

/// Axis-aligned bounding box of a point set.
///
/// Returns a zero-area rect at the origin for an empty set.
pub fn bounding_box(points: &[Point]) -> Rect {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        let p = sanitize(*p);
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    if points.is_empty() {
        return Rect::ZERO;
    }
    Rect::new(min_x, min_y, max_x, max_y)
}

/// Padding added around a line/arrow's raw endpoint extent so the stroke and
/// arrowheads are never clipped by the element's bounding box.
pub fn stroke_padding(stroke_width: f64, has_arrowhead: bool) -> f64 {
    let sw = if stroke_width.is_finite() { stroke_width.max(0.0) } else { 0.0 };
    let arrow_extra = if has_arrowhead { sw * 3.0 } else { 0.0 };
    (sw * 1.5 + arrow_extra).max(4.0)
}

/// Arrowhead size for a segment: `strokeWidth * 3` clamped into `[8, 24]`,
/// then capped at 25% of the segment length so short segments never grow an
/// oversized head.
pub fn arrowhead_size(stroke_width: f64, segment_length: f64) -> f64 {
    let base = (stroke_width * 3.0).clamp(8.0, 24.0);
    base.min(segment_length * 0.25)
}

/// Derived bounding box for a line/arrow element.
///
/// Raw box over `start`, `end` and (when curvature is nonzero) the curve
/// control point; degenerate chords (both extents below [`MIN_ELEMENT_SIZE`])
/// are floored so a zero-length drag never yields an unselectable box; the
/// result is expanded by [`stroke_padding`] on all four sides.
///
/// Pure function of its inputs: recomputing with unchanged geometry returns
/// the identical box, so repeated drag frames never accumulate drift.
pub fn line_bounds(
    start: Point,
    end: Point,
    curvature: f64,
    stroke_width: f64,
    arrow_at_start: bool,
    arrow_at_end: bool,
) -> Rect {
    let start = sanitize(start);
    let end = sanitize(end);
    let raw = if curvature != 0.0 && curvature.is_finite() {
        bounding_box(&[start, end, curve_control_point(start, end, curvature)])
    } else {
        bounding_box(&[start, end])
    };

    let mut width = raw.width();
    let mut height = raw.height();
    if width < MIN_ELEMENT_SIZE && height < MIN_ELEMENT_SIZE {
        width = width.max(MIN_ELEMENT_SIZE);
        height = height.max(MIN_ELEMENT_SIZE);
    }

    let pad = stroke_padding(stroke_width, arrow_at_start || arrow_at_end);
    Rect::new(
        raw.x0 - pad,
        raw.y0 - pad,
        raw.x0 + width + pad,
        raw.y0 + height + pad,
    )
}

/// Sample the quadratic curve defined by `start`, `end` and `curvature` into
/// `samples` points (inclusive of both endpoints).
///
/// Zero curvature returns the bare segment: straight lines are drawn as
/// segments, not degenerate curves.
pub fn sample_curve(start: Point, end: Point, curvature: f64, samples: usize) -> Vec<Point> {
    if curvature == 0.0 || samples < 3 {
        return vec![start, end];
    }
    let ctrl = curve_control_point(start, end, curvature);
    (0..samples)
        .map(|i| {
            let t = i as f64 / (samples - 1) as f64;
            let u = 1.0 - t;
            Point::new(
                u * u * start.x + 2.0 * u * t * ctrl.x + t * t * end.x,
                u * u * start.y + 2.0 * u * t * ctrl.y + t * t * end.y,
            )
        })
        .collect()
}

/// Distance from a point to a line segment (a -> b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}
