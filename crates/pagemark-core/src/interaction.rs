//! Pointer-driven editing: tools, selection, gestures and the bridge to the
//! external transform gizmo.
//!
//! The editor receives pointer events in display space, converts them to
//! document space through the view transform and commits every frame through
//! [`Document::update`], so line boxes are re-derived continuously while
//! dragging. One undo snapshot is pushed on each gesture's first mutating
//! frame, making undo restore the pre-gesture state in one step while a
//! click that never moves costs nothing.

use crate::clipboard::{self, ClipboardContents};
use crate::document::{Document, ElementPatch};
use crate::element::{Element, ElementId, ElementKind, ElementStyle, Rgba};
use crate::geometry::{self, MIN_ELEMENT_SIZE};
use crate::transform::ViewTransform;
use kurbo::{Point, Rect, Vec2};

/// Pointer travel (document units) before a press becomes a drag. Within
/// this zone a center-handle press stays mode-undetermined.
const DRAG_DEAD_ZONE: f64 = 2.0;

/// Handle hit radius in display pixels.
const HANDLE_HIT_RADIUS: f64 = 8.0;

/// Hit-test tolerance for element bodies, in display pixels.
const HIT_TOLERANCE: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Select,
    Text,
    Rect,
    Circle,
    Line,
    Arrow,
    Image,
    Signature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    Start,
    End,
}

/// Current gesture of the pointer state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    /// A tool just placed an element; moving the pointer drags it.
    ToolPlacing { id: ElementId, last: Point },
    /// Body drag of the selected element.
    Dragging { id: ElementId, last: Point },
    /// The external gizmo is resizing the selected element.
    ResizingHandle { id: ElementId },
    /// The external gizmo is rotating the selected element.
    RotatingHandle { id: ElementId },
    /// One endpoint of a line kind follows the pointer.
    EndpointDragging { id: ElementId, end: LineEnd },
    /// The center handle adjusts curvature.
    CurveDragging { id: ElementId },
    /// Center handle pressed, drag direction not yet known.
    PendingCenter { id: ElementId, press: Point },
}

/// Interactive editing session over one document.
#[derive(Debug, Clone)]
pub struct Editor {
    pub document: Document,
    pub view: ViewTransform,
    pub tool: ToolKind,
    pub selection: Option<ElementId>,
    /// Element in external text editing, skipped by hit tests.
    pub editing: Option<ElementId>,
    pub current_page: usize,
    gesture: Gesture,
    /// A snapshot is owed before this gesture's first mutation. Deferred so
    /// a bare selection click never spends an undo slot.
    undo_pending: bool,
}

impl Editor {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            view: ViewTransform::default(),
            tool: ToolKind::Select,
            selection: None,
            editing: None,
            current_page: 0,
            gesture: Gesture::Idle,
            undo_pending: false,
        }
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    /// Handle a pointer press at a display-space position.
    pub fn pointer_down(&mut self, display: Point) {
        let doc = self.view.display_to_doc(display);

        if self.tool != ToolKind::Select {
            let Some(element) = element_for_tool(self.tool, doc) else {
                self.tool = ToolKind::Select;
                return;
            };
            self.document.push_undo();
            if let Some(id) = self.document.create(self.current_page, element) {
                self.selection = Some(id);
                self.gesture = Gesture::ToolPlacing { id, last: doc };
            }
            self.tool = ToolKind::Select;
            return;
        }

        let handle_tol = self.view.dist_to_doc(HANDLE_HIT_RADIUS);

        // Handles of the selected line take priority over body hits.
        if let Some(id) = self.selection {
            if let Some(element) = self.document.find(id) {
                if element.kind.is_line() {
                    let (start, end) = element.line_points();
                    let curvature = element.style.curvature();
                    if (doc - start).hypot() <= handle_tol {
                        self.undo_pending = true;
                        self.gesture = Gesture::EndpointDragging {
                            id,
                            end: LineEnd::Start,
                        };
                        return;
                    }
                    if (doc - end).hypot() <= handle_tol {
                        self.undo_pending = true;
                        self.gesture = Gesture::EndpointDragging {
                            id,
                            end: LineEnd::End,
                        };
                        return;
                    }
                    // Center handle sits on the curve at t = 0.5.
                    let mid = geometry::midpoint(start, end);
                    let n = geometry::perpendicular(start, end);
                    let center = Point::new(
                        mid.x + n.x * curvature * 0.5,
                        mid.y + n.y * curvature * 0.5,
                    );
                    if (doc - center).hypot() <= handle_tol {
                        self.undo_pending = true;
                        self.gesture = Gesture::PendingCenter { id, press: doc };
                        return;
                    }
                }
            }
        }

        let hit_tol = self.view.dist_to_doc(HIT_TOLERANCE);
        let hit = self
            .document
            .elements_at_point(self.current_page, doc, hit_tol)
            .into_iter()
            .find(|&id| Some(id) != self.editing);

        match hit {
            Some(id) => {
                self.selection = Some(id);
                self.undo_pending = true;
                self.gesture = Gesture::Dragging { id, last: doc };
            }
            None => {
                self.selection = None;
                self.gesture = Gesture::Idle;
            }
        }
    }

    /// Handle pointer movement at a display-space position.
    pub fn pointer_move(&mut self, display: Point) {
        let doc = geometry::sanitize(self.view.display_to_doc(display));

        match self.gesture {
            Gesture::Idle | Gesture::ResizingHandle { .. } | Gesture::RotatingHandle { .. } => {}
            Gesture::ToolPlacing { id, last } | Gesture::Dragging { id, last } => {
                self.commit_undo_point();
                let delta = doc - last;
                self.drag_by(id, delta);
                self.gesture = match self.gesture {
                    Gesture::ToolPlacing { .. } => Gesture::ToolPlacing { id, last: doc },
                    _ => Gesture::Dragging { id, last: doc },
                };
            }
            Gesture::EndpointDragging { id, end } => {
                self.commit_undo_point();
                let mut style = ElementStyle::default();
                match end {
                    LineEnd::Start => style.start = Some(doc),
                    LineEnd::End => style.end = Some(doc),
                }
                self.document.update(
                    id,
                    ElementPatch {
                        style: Some(style),
                        ..Default::default()
                    },
                );
            }
            Gesture::CurveDragging { id } => {
                self.commit_undo_point();
                self.set_curvature_from_pointer(id, doc);
            }
            Gesture::PendingCenter { id, press } => {
                let disp = doc - press;
                if disp.hypot() <= DRAG_DEAD_ZONE {
                    return;
                }
                // Classify once at dead-zone exit: predominantly perpendicular
                // displacement bends the curve, otherwise the whole line moves.
                let Some(element) = self.document.find(id) else {
                    self.gesture = Gesture::Idle;
                    return;
                };
                let (start, end) = element.line_points();
                let chord = (end - start).normalize();
                let n = geometry::perpendicular(start, end);
                let along = disp.dot(chord);
                let across = disp.dot(n);
                self.commit_undo_point();
                if across.abs() >= along.abs() {
                    self.gesture = Gesture::CurveDragging { id };
                    self.set_curvature_from_pointer(id, doc);
                } else {
                    self.drag_by(id, disp);
                    self.gesture = Gesture::Dragging { id, last: doc };
                }
            }
        }
    }

    /// Handle pointer release.
    pub fn pointer_up(&mut self) {
        self.gesture = Gesture::Idle;
        self.undo_pending = false;
    }

    /// Lost pointer capture is treated exactly like a release.
    pub fn pointer_capture_lost(&mut self) {
        self.pointer_up();
    }

    /// Double activation: enter text editing when a text element is hit.
    pub fn pointer_double_click(&mut self, display: Point) {
        let doc = self.view.display_to_doc(display);
        let hit_tol = self.view.dist_to_doc(HIT_TOLERANCE);
        let hit = self
            .document
            .elements_at_point(self.current_page, doc, hit_tol)
            .into_iter()
            .find(|&id| {
                self.document
                    .find(id)
                    .is_some_and(|e| e.kind == ElementKind::Text)
            });
        if let Some(id) = hit {
            self.begin_text_edit(id);
        }
    }

    pub fn begin_text_edit(&mut self, id: ElementId) {
        if self.document.find(id).is_some() {
            self.selection = Some(id);
            self.editing = Some(id);
            self.gesture = Gesture::Idle;
        }
    }

    /// Leave text editing, committing the given content if changed.
    pub fn end_text_edit(&mut self, content: Option<String>) {
        if let Some(id) = self.editing.take() {
            if let Some(content) = content {
                self.document.push_undo();
                self.document.update(
                    id,
                    ElementPatch {
                        content: Some(content),
                        ..Default::default()
                    },
                );
            }
        }
    }

    /// Begin a gizmo resize gesture on the selection.
    pub fn begin_resize(&mut self) {
        if let Some(id) = self.selection {
            self.document.push_undo();
            self.gesture = Gesture::ResizingHandle { id };
        }
    }

    /// Apply one gizmo resize frame, given the new box in display space.
    ///
    /// Extents are clamped to the minimum element size; circles re-lock to a
    /// square using the smaller extent. Line kinds ignore box resizing, their
    /// geometry lives in the endpoints.
    pub fn apply_resize(&mut self, display_rect: Rect) {
        let Gesture::ResizingHandle { id } = self.gesture else {
            return;
        };
        let Some(element) = self.document.find(id) else {
            return;
        };
        if element.kind.is_line() {
            return;
        }
        let is_circle = element.kind == ElementKind::Circle;

        let rect = self.view.rect_to_doc(display_rect).abs();
        let mut width = rect.width().max(MIN_ELEMENT_SIZE);
        let mut height = rect.height().max(MIN_ELEMENT_SIZE);
        if is_circle {
            let side = width.min(height);
            width = side;
            height = side;
        }
        self.document.update(
            id,
            ElementPatch {
                x: Some(rect.x0),
                y: Some(rect.y0),
                width: Some(width),
                height: Some(height),
                ..Default::default()
            },
        );
    }

    /// Begin a gizmo rotation gesture on the selection.
    pub fn begin_rotation(&mut self) {
        if let Some(id) = self.selection {
            self.document.push_undo();
            self.gesture = Gesture::RotatingHandle { id };
        }
    }

    /// Apply one gizmo rotation frame, in degrees about the box center.
    pub fn apply_rotation(&mut self, degrees: f64) {
        let Gesture::RotatingHandle { id } = self.gesture else {
            return;
        };
        let rotation = if degrees.is_finite() { degrees } else { 0.0 };
        self.document.update(
            id,
            ElementPatch {
                rotation: Some(rotation),
                ..Default::default()
            },
        );
    }

    /// Delete the selected element, if any.
    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selection.take() {
            self.document.push_undo();
            self.document.remove(id);
            if self.editing == Some(id) {
                self.editing = None;
            }
            self.gesture = Gesture::Idle;
        }
    }

    /// Encode the selection for the system clipboard.
    pub fn copy_selection(&self) -> Option<ClipboardContents> {
        let id = self.selection?;
        let element = self.document.find(id)?;
        clipboard::encode(std::slice::from_ref(element)).ok()
    }

    /// Paste clipboard contents onto the current page.
    ///
    /// Returns the ids of the inserted elements; the last one becomes the
    /// selection.
    pub fn paste(&mut self, contents: &ClipboardContents, at: Option<Point>) -> Vec<ElementId> {
        let elements = clipboard::decode(contents, at);
        if elements.is_empty() {
            return Vec::new();
        }
        self.document.push_undo();
        let mut ids = Vec::with_capacity(elements.len());
        for element in elements {
            if let Some(id) = self.document.create(self.current_page, element) {
                ids.push(id);
            }
        }
        if let Some(&last) = ids.last() {
            self.selection = Some(last);
        }
        ids
    }

    pub fn undo(&mut self) -> bool {
        self.gesture = Gesture::Idle;
        self.undo_pending = false;
        let done = self.document.undo();
        self.prune_selection();
        done
    }

    pub fn redo(&mut self) -> bool {
        self.gesture = Gesture::Idle;
        self.undo_pending = false;
        let done = self.document.redo();
        self.prune_selection();
        done
    }

    /// Push the gesture's undo snapshot on its first mutation.
    fn commit_undo_point(&mut self) {
        if self.undo_pending {
            self.undo_pending = false;
            self.document.push_undo();
        }
    }

    fn prune_selection(&mut self) {
        if let Some(id) = self.selection {
            if self.document.find(id).is_none() {
                self.selection = None;
            }
        }
        if let Some(id) = self.editing {
            if self.document.find(id).is_none() {
                self.editing = None;
            }
        }
    }

    /// Move an element by a document-space delta, committing through
    /// `update` so line boxes stay derived.
    fn drag_by(&mut self, id: ElementId, delta: Vec2) {
        let Some(element) = self.document.find(id) else {
            return;
        };
        let patch = if element.kind.is_line() {
            let (start, end) = element.line_points();
            ElementPatch {
                style: Some(ElementStyle {
                    start: Some(start + delta),
                    end: Some(end + delta),
                    ..Default::default()
                }),
                ..Default::default()
            }
        } else {
            ElementPatch {
                x: Some(element.x + delta.x),
                y: Some(element.y + delta.y),
                ..Default::default()
            }
        };
        self.document.update(id, patch);
    }

    fn set_curvature_from_pointer(&mut self, id: ElementId, doc: Point) {
        let Some(element) = self.document.find(id) else {
            return;
        };
        let (start, end) = element.line_points();
        let mid = geometry::midpoint(start, end);
        let n = geometry::perpendicular(start, end);
        let curvature = (doc - mid).dot(n);
        self.document.update(
            id,
            ElementPatch {
                style: Some(ElementStyle {
                    curvature: Some(curvature),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
    }
}

/// Defaults-sized element for a placement tool at a document-space point.
fn element_for_tool(tool: ToolKind, at: Point) -> Option<Element> {
    let element = match tool {
        ToolKind::Select => return None,
        ToolKind::Text => {
            let mut el = Element::new(ElementKind::Text, at.x, at.y, 200.0, 30.0);
            el.content = Some("Double click to edit".to_string());
            el.style.font_size = Some(16.0);
            el
        }
        ToolKind::Rect => {
            let mut el = Element::new(ElementKind::Rect, at.x, at.y, 100.0, 100.0);
            el.style.background_color = Some(Rgba::RED);
            el
        }
        ToolKind::Circle => {
            let mut el = Element::new(ElementKind::Circle, at.x, at.y, 100.0, 100.0);
            el.style.background_color = Some(Rgba::RED);
            el
        }
        ToolKind::Line | ToolKind::Arrow => {
            let kind = if tool == ToolKind::Line {
                ElementKind::Line
            } else {
                ElementKind::Arrow
            };
            let mut el = Element::new(kind, at.x, at.y, 0.0, 0.0);
            el.style.start = Some(at);
            el.style.end = Some(Point::new(at.x + 150.0, at.y));
            el.style.border_width = Some(1.0);
            if kind == ElementKind::Arrow {
                el.style.arrow_end = Some(true);
            }
            el
        }
        ToolKind::Image => Element::new(ElementKind::Image, at.x, at.y, 200.0, 200.0),
        ToolKind::Signature => Element::new(ElementKind::Signature, at.x, at.y, 200.0, 200.0),
    };
    Some(element)
}
