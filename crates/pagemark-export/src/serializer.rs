//! Walks a document page by page and reduces every annotation to export
//! draw calls.
//!
//! All output coordinates are in page units with a bottom-left origin. Line
//! and arrow geometry is converted endpoint by endpoint through the same
//! curve sampling the editor uses; the padded bounding box never reaches the
//! output. Undecodable raster payloads are skipped with a recorded warning
//! and the export continues.

use crate::ops::{
    DecodedImage, DocumentMetadata, DrawOp, ExportError, ExportTarget, RasterFormat,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use kurbo::{Point, Vec2};
use pagemark_core::element::{Element, ElementKind, StrokeStyle};
use pagemark_core::transform::{doc_to_export, export_box_origin};
use pagemark_core::{Document, geometry};

/// Samples used for curved line paths.
const CURVE_SAMPLES: usize = 24;

/// Non-fatal issues encountered during an export.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub warnings: Vec<String>,
}

/// Serialize a whole document through the given target.
pub fn export_document<T: ExportTarget>(
    document: &Document,
    mut target: T,
    metadata: &DocumentMetadata,
) -> Result<(T::Output, ExportReport), ExportError> {
    let mut report = ExportReport::default();

    for (index, page) in document.pages.iter().enumerate() {
        target.begin_page(index, page.width_pts, page.height_pts)?;
        for element in document.elements_ordered(index) {
            serialize_element(element, page.height_pts, &mut target, &mut report)?;
        }
    }

    let output = target.finish(metadata)?;
    Ok((output, report))
}

fn serialize_element<T: ExportTarget>(
    element: &Element,
    page_height: f64,
    target: &mut T,
    report: &mut ExportReport,
) -> Result<(), ExportError> {
    let style = &element.style;
    let opacity = style.opacity();

    match element.kind {
        ElementKind::Text => {
            let Some(text) = element.content.as_deref().filter(|t| !t.is_empty()) else {
                log::debug!("skipping empty text element {}", element.id);
                return Ok(());
            };
            let size = style.font_size();
            // Baseline approximated by the font size.
            target.draw(DrawOp::Text {
                text: text.to_string(),
                x: element.x,
                y: page_height - element.y - size,
                size,
                font_family: style.font_family.clone(),
                color: style.color(),
                opacity,
            })?;
        }
        ElementKind::Rect => {
            let origin = export_box_origin(element.x, element.y, element.height, page_height);
            target.draw(DrawOp::Rect {
                x: origin.x,
                y: origin.y,
                width: element.width,
                height: element.height,
                fill: style.background_color,
                border: border_of(element),
                opacity,
                rotation: element.rotation,
            })?;
        }
        ElementKind::Circle => {
            let center = doc_to_export(
                Point::new(
                    element.x + element.width / 2.0,
                    element.y + element.height / 2.0,
                ),
                page_height,
            );
            target.draw(DrawOp::Ellipse {
                cx: center.x,
                cy: center.y,
                rx: element.width / 2.0,
                ry: element.height / 2.0,
                fill: style.background_color,
                border: border_of(element),
                opacity,
            })?;
        }
        ElementKind::Line | ElementKind::Arrow => {
            serialize_line(element, page_height, target)?;
        }
        ElementKind::Image | ElementKind::Signature => {
            let image = element
                .content
                .as_deref()
                .ok_or_else(|| "missing raster payload".to_string())
                .and_then(decode_raster);
            match image {
                Ok(image) => {
                    let origin =
                        export_box_origin(element.x, element.y, element.height, page_height);
                    target.draw(DrawOp::Image {
                        image,
                        x: origin.x,
                        y: origin.y,
                        width: element.width,
                        height: element.height,
                        opacity,
                        rotation: element.rotation,
                    })?;
                }
                Err(reason) => {
                    log::warn!("skipping element {}: {reason}", element.id);
                    report
                        .warnings
                        .push(format!("element {} skipped: {reason}", element.id));
                }
            }
        }
    }
    Ok(())
}

fn serialize_line<T: ExportTarget>(
    element: &Element,
    page_height: f64,
    target: &mut T,
) -> Result<(), ExportError> {
    let style = &element.style;
    let (start, end) = element.line_points();
    let curvature = style.curvature();
    let stroke_width = style.stroke_width();
    let color = style.color();
    let opacity = style.opacity();

    let points: Vec<Point> = geometry::sample_curve(start, end, curvature, CURVE_SAMPLES)
        .into_iter()
        .map(|p| doc_to_export(p, page_height))
        .collect();

    let dash = match style.stroke_style() {
        StrokeStyle::Solid => None,
        StrokeStyle::Dashed => Some((10.0, 5.0)),
        StrokeStyle::Dotted => Some((2.0, 5.0)),
    };

    target.draw(DrawOp::Path {
        points,
        stroke_width,
        color,
        opacity,
        dash,
    })?;

    let size = geometry::arrowhead_size(stroke_width, geometry::length(start, end));
    let control = geometry::curve_control_point(start, end, curvature);

    if style.arrow_start() {
        let apex = doc_to_export(start, page_height);
        let tail = doc_to_export(if curvature != 0.0 { control } else { end }, page_height);
        target.draw(arrowhead(apex, tail, size, color, opacity))?;
    }
    if style.arrow_end() {
        let apex = doc_to_export(end, page_height);
        let tail = doc_to_export(if curvature != 0.0 { control } else { start }, page_height);
        target.draw(arrowhead(apex, tail, size, color, opacity))?;
    }
    Ok(())
}

/// Filled triangle at `apex`, opening back toward `tail`, with base points
/// rotated 30 degrees either side of the local direction.
fn arrowhead(
    apex: Point,
    tail: Point,
    size: f64,
    color: pagemark_core::Rgba,
    opacity: f64,
) -> DrawOp {
    let back = (tail - apex) / geometry::length(apex, tail);
    let spread = std::f64::consts::FRAC_PI_6;
    DrawOp::Triangle {
        points: [
            apex,
            apex + rotate(back, spread) * size,
            apex + rotate(back, -spread) * size,
        ],
        color,
        opacity,
    }
}

fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

fn border_of(element: &Element) -> Option<(pagemark_core::Rgba, f64)> {
    element
        .style
        .border_color
        .map(|color| (color, element.style.stroke_width()))
}

/// Decode and validate a base64 raster payload (bare or data-URL form).
fn decode_raster(payload: &str) -> Result<DecodedImage, String> {
    let b64 = match payload.find(";base64,") {
        Some(pos) if payload.starts_with("data:") => &payload[pos + ";base64,".len()..],
        _ => payload,
    };
    let bytes = BASE64
        .decode(b64.trim())
        .map_err(|e| format!("invalid base64: {e}"))?;
    let format = RasterFormat::detect(&bytes).ok_or("unsupported raster format")?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| format!("broken image: {e}"))?;
    Ok(DecodedImage {
        width: decoded.width(),
        height: decoded.height(),
        bytes,
        format,
    })
}
