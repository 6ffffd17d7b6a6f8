//! Annotation element model: kinds, styling and the element record itself.
//!
//! Field names on the wire are camelCase and every style field is optional,
//! matching the interchange payloads produced by existing clients. Accessors
//! supply the defaults so the rest of the crate never reasons about `None`.

use crate::geometry::{self, MIN_ELEMENT_SIZE};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ElementId = Uuid;

/// RGBA color with serde support (peniko::Color does not implement serde).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const RED: Rgba = Rgba::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` hex notation.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::rgb(r, g, b))
            }
            8 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
                Some(Self { r, g, b, a })
            }
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<Rgba> for peniko::Color {
    fn from(c: Rgba) -> Self {
        peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
    }
}

impl From<peniko::Color> for Rgba {
    fn from(c: peniko::Color) -> Self {
        let rgba = c.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Rect,
    Circle,
    Line,
    Arrow,
    Image,
    Signature,
}

impl ElementKind {
    /// Line kinds store their geometry as endpoints, not as a box.
    pub fn is_line(&self) -> bool {
        matches!(self, ElementKind::Line | ElementKind::Arrow)
    }

    /// Raster kinds carry a base64 payload in `content`.
    pub fn is_raster(&self) -> bool {
        matches!(self, ElementKind::Image | ElementKind::Signature)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Styling record. Every field is optional on the wire; unset fields fall
/// back to the defaults exposed by the accessor methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Rgba>,
    /// Doubles as stroke width for line kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<TextDecoration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_top_left_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_top_right_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_bottom_left_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_bottom_right_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_style: Option<StrokeStyle>,
    /// Signed perpendicular bow of a line/arrow, in document units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curvature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrow_start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrow_end: Option<bool>,
    /// Line-kind endpoints, absolute document coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Point>,
}

impl ElementStyle {
    pub fn color(&self) -> Rgba {
        self.color.unwrap_or(Rgba::BLACK)
    }

    pub fn stroke_width(&self) -> f64 {
        self.border_width.unwrap_or(1.0)
    }

    pub fn font_size(&self) -> f64 {
        self.font_size.unwrap_or(16.0)
    }

    pub fn opacity(&self) -> f64 {
        self.opacity.unwrap_or(1.0).clamp(0.0, 1.0)
    }

    pub fn curvature(&self) -> f64 {
        match self.curvature {
            Some(c) if c.is_finite() => c,
            _ => 0.0,
        }
    }

    pub fn arrow_start(&self) -> bool {
        self.arrow_start.unwrap_or(false)
    }

    pub fn arrow_end(&self) -> bool {
        self.arrow_end.unwrap_or(false)
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        self.stroke_style.unwrap_or(StrokeStyle::Solid)
    }

    /// Per-corner radius with uniform fallback.
    pub fn corner_radius(&self, corner: Option<f64>) -> f64 {
        corner.or(self.border_radius).unwrap_or(0.0)
    }

    /// Shallow merge: fields set in `patch` overwrite, unset fields keep
    /// their current value.
    pub fn merge(&mut self, patch: ElementStyle) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if patch.$field.is_some() {
                    self.$field = patch.$field;
                })*
            };
        }
        take!(
            color,
            background_color,
            border_color,
            border_width,
            font_size,
            font_family,
            font_weight,
            font_style,
            text_decoration,
            text_align,
            opacity,
            border_radius,
            border_top_left_radius,
            border_top_right_radius,
            border_bottom_left_radius,
            border_bottom_right_radius,
            stroke_style,
            curvature,
            arrow_start,
            arrow_end,
            start,
            end,
        );
    }
}

/// One annotation on a page.
///
/// `x/y/width/height` is the bounding box in document units. For line kinds
/// the box is derived from the endpoints in `style` and must never be edited
/// directly; [`Element::recompute_line_bounds`] is the only writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees, clockwise, about the box center.
    #[serde(default)]
    pub rotation: f64,
    /// Text content, or the base64 payload for raster kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub style: ElementStyle,
}

impl Element {
    pub fn new(kind: ElementKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            content: None,
            style: ElementStyle::default(),
        }
    }

    /// Assign a fresh id (used when pasting copies).
    pub fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Endpoints of a line kind, falling back to a horizontal chord through
    /// the box when the style carries none.
    pub fn line_points(&self) -> (Point, Point) {
        match (self.style.start, self.style.end) {
            (Some(s), Some(e)) => (geometry::sanitize(s), geometry::sanitize(e)),
            _ => (
                Point::new(self.x, self.y + self.height / 2.0),
                Point::new(self.x + self.width, self.y + self.height / 2.0),
            ),
        }
    }

    /// Move the whole element, endpoints included.
    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
        if let Some(s) = self.style.start {
            self.style.start = Some(s + delta);
        }
        if let Some(e) = self.style.end {
            self.style.end = Some(e + delta);
        }
    }

    /// Re-derive the bounding box of a line kind from its endpoints.
    ///
    /// No-op for non-line kinds.
    pub fn recompute_line_bounds(&mut self) {
        if !self.kind.is_line() {
            return;
        }
        let (start, end) = self.line_points();
        let bounds = geometry::line_bounds(
            start,
            end,
            self.style.curvature(),
            self.style.stroke_width(),
            self.style.arrow_start(),
            self.style.arrow_end(),
        );
        self.x = bounds.x0;
        self.y = bounds.y0;
        self.width = bounds.width();
        self.height = bounds.height();
    }

    /// Clamp box extents to the minimum element size. Line kinds are left
    /// alone, their box is derived.
    pub fn clamp_min_size(&mut self) {
        if self.kind.is_line() {
            return;
        }
        self.width = self.width.max(MIN_ELEMENT_SIZE);
        self.height = self.height.max(MIN_ELEMENT_SIZE);
    }

    /// Hit test in document space with a tolerance in document units.
    ///
    /// Line kinds test distance to the stroked path; box kinds test the
    /// inflated bounding box.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        if self.kind.is_line() {
            let (start, end) = self.line_points();
            let samples = geometry::sample_curve(start, end, self.style.curvature(), 24);
            let dist = geometry::point_to_polyline_dist(point, &samples);
            dist <= tolerance + self.style.stroke_width() / 2.0
        } else {
            self.bounds().inflate(tolerance, tolerance).contains(point)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgba::from_hex("#ff0000"), Some(Rgba::RED));
        assert_eq!(Rgba::from_hex("#f00"), Some(Rgba::RED));
        assert_eq!(
            Rgba::from_hex("#11223344"),
            Some(Rgba {
                r: 0x11,
                g: 0x22,
                b: 0x33,
                a: 0x44
            })
        );
        assert_eq!(Rgba::from_hex("ff0000"), None);
        assert_eq!(Rgba::from_hex("#12345"), None);
        assert_eq!(Rgba::from_hex("#gg0000"), None);
    }

    #[test]
    fn test_hex_roundtrip() {
        for hex in ["#000000", "#ff8040", "#12345678"] {
            let c = Rgba::from_hex(hex).unwrap();
            assert_eq!(c.to_hex(), hex);
        }
    }

    #[test]
    fn test_style_defaults() {
        let style = ElementStyle::default();
        assert_eq!(style.color(), Rgba::BLACK);
        assert!((style.stroke_width() - 1.0).abs() < f64::EPSILON);
        assert!((style.font_size() - 16.0).abs() < f64::EPSILON);
        assert!((style.opacity() - 1.0).abs() < f64::EPSILON);
        assert_eq!(style.curvature(), 0.0);
        assert!(!style.arrow_end());
        assert_eq!(style.stroke_style(), StrokeStyle::Solid);
    }

    #[test]
    fn test_style_merge_is_shallow() {
        let mut style = ElementStyle {
            color: Some(Rgba::RED),
            border_width: Some(3.0),
            ..Default::default()
        };
        style.merge(ElementStyle {
            border_width: Some(5.0),
            opacity: Some(0.5),
            ..Default::default()
        });
        assert_eq!(style.color, Some(Rgba::RED));
        assert_eq!(style.border_width, Some(5.0));
        assert_eq!(style.opacity, Some(0.5));
    }

    #[test]
    fn test_corner_radius_fallback() {
        let style = ElementStyle {
            border_radius: Some(6.0),
            border_top_left_radius: Some(2.0),
            ..Default::default()
        };
        assert!((style.corner_radius(style.border_top_left_radius) - 2.0).abs() < f64::EPSILON);
        assert!((style.corner_radius(style.border_top_right_radius) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_translate_moves_endpoints() {
        let mut el = Element::new(ElementKind::Line, 0.0, 0.0, 150.0, 10.0);
        el.style.start = Some(Point::new(10.0, 10.0));
        el.style.end = Some(Point::new(160.0, 10.0));
        el.translate(Vec2::new(5.0, -3.0));
        assert_eq!(el.style.start, Some(Point::new(15.0, 7.0)));
        assert_eq!(el.style.end, Some(Point::new(165.0, 7.0)));
        assert!((el.x - 5.0).abs() < f64::EPSILON);
        assert!((el.y - -3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_recompute_line_bounds() {
        let mut el = Element::new(ElementKind::Line, 0.0, 0.0, 0.0, 0.0);
        el.style.start = Some(Point::new(0.0, 0.0));
        el.style.end = Some(Point::new(150.0, 0.0));
        el.recompute_line_bounds();
        assert!((el.x - -4.0).abs() < 1e-12);
        assert!((el.y - -4.0).abs() < 1e-12);
        assert!((el.width - 158.0).abs() < 1e-12);
        assert!((el.height - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_recompute_noop_for_box_kinds() {
        let mut el = Element::new(ElementKind::Rect, 10.0, 10.0, 50.0, 50.0);
        el.recompute_line_bounds();
        assert!((el.width - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test_box() {
        let el = Element::new(ElementKind::Rect, 10.0, 10.0, 50.0, 50.0);
        assert!(el.hit_test(Point::new(30.0, 30.0), 0.0));
        assert!(!el.hit_test(Point::new(100.0, 100.0), 0.0));
        // Tolerance inflates the box.
        assert!(el.hit_test(Point::new(62.0, 30.0), 3.0));
    }

    #[test]
    fn test_hit_test_line_follows_stroke() {
        let mut el = Element::new(ElementKind::Line, 0.0, 0.0, 0.0, 0.0);
        el.style.start = Some(Point::new(0.0, 0.0));
        el.style.end = Some(Point::new(100.0, 0.0));
        el.recompute_line_bounds();
        assert!(el.hit_test(Point::new(50.0, 1.0), 2.0));
        // Inside the padded box but far from the stroke.
        assert!(!el.hit_test(Point::new(50.0, 30.0), 2.0));
    }

    #[test]
    fn test_hit_test_curved_line() {
        let mut el = Element::new(ElementKind::Arrow, 0.0, 0.0, 0.0, 0.0);
        el.style.start = Some(Point::new(0.0, 0.0));
        el.style.end = Some(Point::new(100.0, 0.0));
        el.style.curvature = Some(40.0);
        el.recompute_line_bounds();
        // Curve apex sits at half the control offset above the chord.
        assert!(el.hit_test(Point::new(50.0, 20.0), 2.0));
        assert!(!el.hit_test(Point::new(50.0, -10.0), 2.0));
    }

    #[test]
    fn test_wire_format_field_names() {
        let mut el = Element::new(ElementKind::Rect, 1.0, 2.0, 30.0, 40.0);
        el.style.background_color = Some(Rgba::RED);
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["type"], "rect");
        assert!(json["style"]["backgroundColor"].is_object());
        // Unset options stay off the wire.
        assert!(json["style"].get("borderWidth").is_none());
        assert!(json.get("content").is_none());
    }

    #[test]
    fn test_element_json_roundtrip() {
        let mut el = Element::new(ElementKind::Arrow, 0.0, 0.0, 0.0, 0.0);
        el.style.start = Some(Point::new(5.0, 5.0));
        el.style.end = Some(Point::new(155.0, 5.0));
        el.style.arrow_end = Some(true);
        el.style.stroke_style = Some(StrokeStyle::Dashed);
        el.recompute_line_bounds();
        let json = serde_json::to_string(&el).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back, el);
    }
}
