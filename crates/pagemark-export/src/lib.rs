//! Pagemark Export Library
//!
//! Serializes annotation documents into page-space draw calls behind the
//! [`ExportTarget`] abstraction. The actual document-bytes producer (a PDF
//! writer, a print backend) implements the trait; [`Recorder`] captures the
//! stream in memory for tests.

mod ops;
mod serializer;

pub use ops::{
    DecodedImage, DocumentMetadata, DrawOp, ExportError, ExportTarget, RasterFormat, RecordedPage,
    Recorder,
};
pub use serializer::{ExportReport, export_document};
