//! Export drawing primitives and the target abstraction.
//!
//! The serializer reduces every annotation to a handful of page-space draw
//! operations; the document-bytes producer lives behind [`ExportTarget`]
//! ("page size and ordered draw calls in, bytes out"). [`Recorder`] is the
//! in-memory target used by tests.

use kurbo::Point;
use pagemark_core::Rgba;
use thiserror::Error;

/// Export errors. Per-element decode failures are reported as warnings, not
/// through this type; only target failures abort an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export target failed: {0}")]
    Target(String),
}

/// Raster payload formats the exporter can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    /// Detect the format from magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, 0x50, 0x4e, 0x47]) {
            Some(RasterFormat::Png)
        } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            Some(RasterFormat::Jpeg)
        } else {
            None
        }
    }
}

/// A validated raster payload ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub format: RasterFormat,
    /// Natural pixel dimensions.
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    /// Scale the natural size to fit within a box, preserving aspect ratio.
    /// Never scales up.
    pub fn fit_within(&self, max_width: f64, max_height: f64) -> (f64, f64) {
        let w = self.width as f64;
        let h = self.height as f64;
        let scale = (max_width / w).min(max_height / h).min(1.0);
        (w * scale, h * scale)
    }
}

/// One draw call in export space (page units, bottom-left origin).
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        text: String,
        /// Baseline origin.
        x: f64,
        y: f64,
        size: f64,
        font_family: Option<String>,
        color: Rgba,
        opacity: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<Rgba>,
        border: Option<(Rgba, f64)>,
        opacity: f64,
        /// Degrees about the box center.
        rotation: f64,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        fill: Option<Rgba>,
        border: Option<(Rgba, f64)>,
        opacity: f64,
    },
    /// Stroked polyline; two points for a straight segment, more for a
    /// sampled curve.
    Path {
        points: Vec<Point>,
        stroke_width: f64,
        color: Rgba,
        opacity: f64,
        /// (on, off) lengths, None for solid.
        dash: Option<(f64, f64)>,
    },
    /// Filled triangle (arrowheads).
    Triangle {
        points: [Point; 3],
        color: Rgba,
        opacity: f64,
    },
    Image {
        image: DecodedImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        opacity: f64,
        rotation: f64,
    },
}

/// Optional document-info fields passed to the target at finish.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
}

/// Consumer of the serialized draw stream.
///
/// Pages arrive in order; within a page, draw calls arrive in paint order
/// (back to front). `finish` consumes the target and produces the output
/// document.
pub trait ExportTarget {
    type Output;

    fn begin_page(&mut self, index: usize, width_pts: f64, height_pts: f64)
    -> Result<(), ExportError>;

    fn draw(&mut self, op: DrawOp) -> Result<(), ExportError>;

    fn finish(self, metadata: &DocumentMetadata) -> Result<Self::Output, ExportError>;
}

/// One recorded page of draw calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedPage {
    pub width_pts: f64,
    pub height_pts: f64,
    pub ops: Vec<DrawOp>,
}

/// In-memory target that captures the draw stream for inspection.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pages: Vec<RecordedPage>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExportTarget for Recorder {
    type Output = Vec<RecordedPage>;

    fn begin_page(
        &mut self,
        _index: usize,
        width_pts: f64,
        height_pts: f64,
    ) -> Result<(), ExportError> {
        self.pages.push(RecordedPage {
            width_pts,
            height_pts,
            ops: Vec::new(),
        });
        Ok(())
    }

    fn draw(&mut self, op: DrawOp) -> Result<(), ExportError> {
        match self.pages.last_mut() {
            Some(page) => {
                page.ops.push(op);
                Ok(())
            }
            None => Err(ExportError::Target("draw before begin_page".to_string())),
        }
    }

    fn finish(self, _metadata: &DocumentMetadata) -> Result<Self::Output, ExportError> {
        Ok(self.pages)
    }
}
