//! Interchange codec for copy/paste.
//!
//! The canonical payload is `{"__pagemark": true, "elements": [...]}` in
//! document-space units. It travels as plain text and, for cross-application
//! robustness, inside a minimal HTML fragment whose `data-pagemark`
//! attribute survives clipboard HTML sanitizers that rewrite the body.

use crate::element::{Element, ElementKind};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Offset applied to pasted elements so copies never land exactly on their
/// source.
pub const PASTE_OFFSET: f64 = 10.0;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("failed to encode clipboard payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Canonical interchange payload.
#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    #[serde(rename = "__pagemark")]
    marker: bool,
    elements: Vec<Element>,
}

/// Flavors offered to / read from the system clipboard.
#[derive(Debug, Clone, Default)]
pub struct ClipboardContents {
    pub text: Option<String>,
    pub html: Option<String>,
    /// Raw raster bytes (png or jpeg).
    pub image: Option<Vec<u8>>,
}

/// Encode elements for the system clipboard.
pub fn encode(elements: &[Element]) -> Result<ClipboardContents, ClipboardError> {
    let payload = Payload {
        marker: true,
        elements: elements.to_vec(),
    };
    let json = serde_json::to_string(&payload)?;

    let mut contents = ClipboardContents {
        text: Some(json.clone()),
        html: Some(format!(
            "<span data-pagemark=\"{}\"></span>",
            escape_html(&json)
        )),
        image: None,
    };

    match elements {
        [single] if single.kind == ElementKind::Text => {
            // A lone text annotation pastes as its content elsewhere.
            if let Some(content) = &single.content {
                contents.text = Some(content.clone());
            }
        }
        [single] if single.kind.is_raster() => {
            if let Some(payload) = &single.content {
                if let Ok(bytes) = BASE64.decode(strip_data_url(payload)) {
                    contents.image = Some(bytes);
                }
            }
        }
        _ => {}
    }

    Ok(contents)
}

/// Decode clipboard contents into elements ready for insertion.
///
/// Preference order: canonical payload (HTML wrapper, then bare JSON text),
/// raster bytes, plain text. Canonical elements get fresh ids and the paste
/// offset; foreign flavors become a new element at the paste point. An
/// undecodable clipboard yields an empty vec.
pub fn decode(contents: &ClipboardContents, paste_point: Option<Point>) -> Vec<Element> {
    if let Some(html) = &contents.html {
        if let Some(payload) = payload_from_html(html) {
            return materialize(payload);
        }
    }
    if let Some(text) = &contents.text {
        if let Ok(payload) = serde_json::from_str::<Payload>(text) {
            if payload.marker {
                return materialize(payload);
            }
        }
    }
    if let Some(bytes) = &contents.image {
        let at = paste_point.unwrap_or(Point::new(100.0, 100.0));
        let mut element = Element::new(ElementKind::Image, at.x, at.y, 200.0, 200.0);
        element.content = Some(BASE64.encode(bytes));
        return vec![element];
    }
    if let Some(text) = &contents.text {
        if !text.is_empty() {
            let at = paste_point.unwrap_or(Point::new(100.0, 100.0));
            let mut element = Element::new(ElementKind::Text, at.x, at.y, 200.0, 30.0);
            element.content = Some(text.clone());
            return vec![element];
        }
    }
    Vec::new()
}

fn materialize(payload: Payload) -> Vec<Element> {
    let offset = Vec2::new(PASTE_OFFSET, PASTE_OFFSET);
    payload
        .elements
        .into_iter()
        .map(|mut element| {
            element.regenerate_id();
            element.translate(offset);
            element
        })
        .collect()
}

fn payload_from_html(html: &str) -> Option<Payload> {
    let attr = "data-pagemark=\"";
    let start = html.find(attr)? + attr.len();
    let end = html[start..].find('"')? + start;
    let json = unescape_html(&html[start..end]);
    let payload: Payload = serde_json::from_str(&json).ok()?;
    payload.marker.then_some(payload)
}

fn strip_data_url(payload: &str) -> &str {
    match payload.find(";base64,") {
        Some(pos) if payload.starts_with("data:") => &payload[pos + ";base64,".len()..],
        _ => payload,
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
