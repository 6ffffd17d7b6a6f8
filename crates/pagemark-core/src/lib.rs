//! Pagemark Core Library
//!
//! Platform-agnostic model and editing logic for the Pagemark page
//! annotator: geometry primitives, coordinate transforms, the element
//! model, the annotation document, pointer interaction and the
//! copy/paste interchange codec.

pub mod clipboard;
pub mod document;
pub mod element;
pub mod geometry;
pub mod interaction;
pub mod transform;

pub use clipboard::{ClipboardContents, ClipboardError, PASTE_OFFSET};
pub use document::{Document, ElementPatch, Page};
pub use element::{Element, ElementId, ElementKind, ElementStyle, Rgba, StrokeStyle};
pub use geometry::MIN_ELEMENT_SIZE;
pub use interaction::{Editor, Gesture, LineEnd, ToolKind};
pub use transform::{ViewTransform, doc_to_export, export_box_origin};
