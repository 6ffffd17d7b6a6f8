//! Annotation document: per-page paint order over a shared element arena,
//! with snapshot-based undo/redo.

use crate::element::{Element, ElementId, ElementStyle};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// One page of the underlying file, in points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub width_pts: f64,
    pub height_pts: f64,
    /// Paint order (back to front) of the elements on this page.
    #[serde(default)]
    pub order: Vec<ElementId>,
}

impl Page {
    pub fn new(width_pts: f64, height_pts: f64) -> Self {
        Self {
            width_pts,
            height_pts,
            order: Vec::new(),
        }
    }
}

/// Partial update applied through [`Document::update`]. Unset fields keep
/// their current value; `style` is merged shallowly.
#[derive(Debug, Clone, Default)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub content: Option<String>,
    pub style: Option<ElementStyle>,
}

/// A snapshot of document state for undo/redo.
#[derive(Debug, Clone)]
struct DocumentSnapshot {
    elements: HashMap<ElementId, Element>,
    orders: Vec<Vec<ElementId>>,
}

/// All annotations across the file's pages.
///
/// Elements live in one arena keyed by id; each page holds only the paint
/// order of its own elements. An id appears in at most one page's order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub pages: Vec<Page>,
    pub elements: HashMap<ElementId, Element>,
    #[serde(skip)]
    undo_stack: Vec<DocumentSnapshot>,
    #[serde(skip)]
    redo_stack: Vec<DocumentSnapshot>,
}

impl Document {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages,
            elements: HashMap::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Add an element to a page, normalizing its geometry first.
    ///
    /// Returns `None` when the page index is out of range.
    pub fn create(&mut self, page: usize, mut element: Element) -> Option<ElementId> {
        if page >= self.pages.len() {
            log::debug!("create on missing page {page}");
            return None;
        }
        element.recompute_line_bounds();
        element.clamp_min_size();
        let id = element.id;
        self.pages[page].order.push(id);
        self.elements.insert(id, element);
        Some(id)
    }

    pub fn find(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Apply a partial update. Unknown ids are a silent no-op so stale
    /// references (from async UI events) never panic.
    ///
    /// Line kinds re-derive their box from the endpoints after every patch,
    /// so box fields in a patch on a line kind are overridden by the derived
    /// values. Box kinds are clamped to the minimum element size.
    pub fn update(&mut self, id: ElementId, patch: ElementPatch) {
        let Some(element) = self.elements.get_mut(&id) else {
            log::debug!("update on missing element {id}");
            return;
        };

        if let Some(x) = patch.x {
            element.x = x;
        }
        if let Some(y) = patch.y {
            element.y = y;
        }
        if let Some(width) = patch.width {
            element.width = width;
        }
        if let Some(height) = patch.height {
            element.height = height;
        }
        if let Some(rotation) = patch.rotation {
            element.rotation = rotation;
        }
        if let Some(content) = patch.content {
            element.content = Some(content);
        }
        if let Some(style) = patch.style {
            element.style.merge(style);
        }

        if element.kind.is_line() {
            element.recompute_line_bounds();
        } else {
            element.clamp_min_size();
        }
    }

    /// Remove an element from the arena and its page's order.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        for page in &mut self.pages {
            page.order.retain(|&eid| eid != id);
        }
        self.elements.remove(&id)
    }

    /// Replace a page's paint order. No-op (returning false) unless the new
    /// order is a permutation of the current one.
    pub fn reorder(&mut self, page: usize, order: &[ElementId]) -> bool {
        let Some(page) = self.pages.get_mut(page) else {
            return false;
        };
        if order.len() != page.order.len() {
            log::debug!("reorder rejected: length mismatch");
            return false;
        }
        let mut sorted_new: Vec<ElementId> = order.to_vec();
        let mut sorted_old = page.order.clone();
        sorted_new.sort();
        sorted_old.sort();
        if sorted_new != sorted_old {
            log::debug!("reorder rejected: not a permutation");
            return false;
        }
        page.order = order.to_vec();
        true
    }

    /// Elements of a page in paint order (back to front).
    pub fn elements_ordered(&self, page: usize) -> impl Iterator<Item = &Element> {
        self.pages
            .get(page)
            .into_iter()
            .flat_map(|p| p.order.iter())
            .filter_map(|id| self.elements.get(id))
    }

    /// Hits on a page, front to back, for selection priority.
    pub fn elements_at_point(&self, page: usize, point: Point, tolerance: f64) -> Vec<ElementId> {
        let Some(page) = self.pages.get(page) else {
            return Vec::new();
        };
        page.order
            .iter()
            .rev()
            .filter_map(|&id| {
                self.elements
                    .get(&id)
                    .filter(|e| e.hit_test(point, tolerance))
                    .map(|_| id)
            })
            .collect()
    }

    /// Index of the page whose order contains `id`.
    pub fn owning_page(&self, id: ElementId) -> Option<usize> {
        self.pages.iter().position(|p| p.order.contains(&id))
    }

    pub fn bring_to_front(&mut self, id: ElementId) {
        if let Some(page) = self.owning_page(id) {
            let order = &mut self.pages[page].order;
            order.retain(|&eid| eid != id);
            order.push(id);
        }
    }

    pub fn send_to_back(&mut self, id: ElementId) {
        if let Some(page) = self.owning_page(id) {
            let order = &mut self.pages[page].order;
            order.retain(|&eid| eid != id);
            order.insert(0, id);
        }
    }

    /// Returns true if the element moved, false if already at the front.
    pub fn bring_forward(&mut self, id: ElementId) -> bool {
        if let Some(page) = self.owning_page(id) {
            let order = &mut self.pages[page].order;
            if let Some(pos) = order.iter().position(|&eid| eid == id) {
                if pos < order.len() - 1 {
                    order.swap(pos, pos + 1);
                    return true;
                }
            }
        }
        false
    }

    /// Returns true if the element moved, false if already at the back.
    pub fn send_backward(&mut self, id: ElementId) -> bool {
        if let Some(page) = self.owning_page(id) {
            let order = &mut self.pages[page].order;
            if let Some(pos) = order.iter().position(|&eid| eid == id) {
                if pos > 0 {
                    order.swap(pos, pos - 1);
                    return true;
                }
            }
        }
        false
    }

    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            elements: self.elements.clone(),
            orders: self.pages.iter().map(|p| p.order.clone()).collect(),
        }
    }

    fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.elements = snapshot.elements;
        for (page, order) in self.pages.iter_mut().zip(snapshot.orders) {
            page.order = order;
        }
    }

    /// Push current state to the undo stack (call before making changes).
    pub fn push_undo(&mut self) {
        let snapshot = self.snapshot();
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Returns true if an undo was performed.
    pub fn undo(&mut self) -> bool {
        if let Some(snapshot) = self.undo_stack.pop() {
            let current = self.snapshot();
            self.redo_stack.push(current);
            self.restore(snapshot);
            true
        } else {
            false
        }
    }

    /// Returns true if a redo was performed.
    pub fn redo(&mut self) -> bool {
        if let Some(snapshot) = self.redo_stack.pop() {
            let current = self.snapshot();
            self.undo_stack.push(current);
            self.restore(snapshot);
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, Rgba};
    use crate::geometry::MIN_ELEMENT_SIZE;

    fn letter_doc() -> Document {
        Document::new(vec![Page::new(612.0, 792.0)])
    }

    fn rect_at(x: f64, y: f64) -> Element {
        Element::new(ElementKind::Rect, x, y, 100.0, 100.0)
    }

    #[test]
    fn test_create_and_find() {
        let mut doc = letter_doc();
        let id = doc.create(0, rect_at(0.0, 0.0)).unwrap();
        assert_eq!(doc.len(), 1);
        assert!(doc.find(id).is_some());
        assert_eq!(doc.owning_page(id), Some(0));
    }

    #[test]
    fn test_create_missing_page() {
        let mut doc = letter_doc();
        assert!(doc.create(3, rect_at(0.0, 0.0)).is_none());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_create_clamps_min_size() {
        let mut doc = letter_doc();
        let id = doc
            .create(0, Element::new(ElementKind::Rect, 0.0, 0.0, 2.0, 3.0))
            .unwrap();
        let el = doc.find(id).unwrap();
        assert!((el.width - MIN_ELEMENT_SIZE).abs() < f64::EPSILON);
        assert!((el.height - MIN_ELEMENT_SIZE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_create_derives_line_bounds() {
        let mut doc = letter_doc();
        let mut line = Element::new(ElementKind::Line, 0.0, 0.0, 0.0, 0.0);
        line.style.start = Some(Point::new(10.0, 10.0));
        line.style.end = Some(Point::new(160.0, 10.0));
        let id = doc.create(0, line).unwrap();
        let el = doc.find(id).unwrap();
        assert!((el.x - 6.0).abs() < 1e-12);
        assert!((el.width - 158.0).abs() < 1e-12);
        assert!((el.height - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut doc = letter_doc();
        doc.update(
            ElementId::new_v4(),
            ElementPatch {
                x: Some(10.0),
                ..Default::default()
            },
        );
        assert!(doc.is_empty());
    }

    #[test]
    fn test_update_merges_style() {
        let mut doc = letter_doc();
        let mut el = rect_at(0.0, 0.0);
        el.style.background_color = Some(Rgba::RED);
        let id = doc.create(0, el).unwrap();
        doc.update(
            id,
            ElementPatch {
                style: Some(ElementStyle {
                    opacity: Some(0.5),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let el = doc.find(id).unwrap();
        assert_eq!(el.style.background_color, Some(Rgba::RED));
        assert_eq!(el.style.opacity, Some(0.5));
    }

    #[test]
    fn test_update_line_geometry_rederives_box() {
        let mut doc = letter_doc();
        let mut line = Element::new(ElementKind::Line, 0.0, 0.0, 0.0, 0.0);
        line.style.start = Some(Point::new(0.0, 0.0));
        line.style.end = Some(Point::new(150.0, 0.0));
        let id = doc.create(0, line).unwrap();

        // Box fields in a geometry patch are overridden by the derived box.
        doc.update(
            id,
            ElementPatch {
                x: Some(999.0),
                style: Some(ElementStyle {
                    end: Some(Point::new(150.0, 80.0)),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let el = doc.find(id).unwrap();
        assert!((el.x - -4.0).abs() < 1e-12);
        assert!((el.height - 88.0).abs() < 1e-12);
    }

    #[test]
    fn test_line_box_only_patch_is_overridden() {
        let mut doc = letter_doc();
        let mut line = Element::new(ElementKind::Line, 0.0, 0.0, 0.0, 0.0);
        line.style.start = Some(Point::new(0.0, 0.0));
        line.style.end = Some(Point::new(150.0, 0.0));
        let id = doc.create(0, line).unwrap();

        // A patch that touches only the box leaves the endpoints alone, so
        // the derived box wins and the patch has no effect.
        doc.update(
            id,
            ElementPatch {
                x: Some(999.0),
                width: Some(5.0),
                ..Default::default()
            },
        );
        let el = doc.find(id).unwrap();
        assert_eq!(el.style.start, Some(Point::new(0.0, 0.0)));
        assert_eq!(el.style.end, Some(Point::new(150.0, 0.0)));
        assert!((el.x - -4.0).abs() < 1e-12);
        assert!((el.width - 158.0).abs() < 1e-12);
    }

    #[test]
    fn test_update_stroke_width_widens_line_box() {
        let mut doc = letter_doc();
        let mut line = Element::new(ElementKind::Line, 0.0, 0.0, 0.0, 0.0);
        line.style.start = Some(Point::new(0.0, 0.0));
        line.style.end = Some(Point::new(150.0, 0.0));
        let id = doc.create(0, line).unwrap();
        doc.update(
            id,
            ElementPatch {
                style: Some(ElementStyle {
                    border_width: Some(10.0),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        let el = doc.find(id).unwrap();
        // pad = 10 * 1.5
        assert!((el.y - -15.0).abs() < 1e-12);
        assert!((el.height - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_remove_clears_order() {
        let mut doc = letter_doc();
        let id = doc.create(0, rect_at(0.0, 0.0)).unwrap();
        assert!(doc.remove(id).is_some());
        assert!(doc.is_empty());
        assert!(doc.pages[0].order.is_empty());
        assert!(doc.remove(id).is_none());
    }

    #[test]
    fn test_reorder_permutation_only() {
        let mut doc = letter_doc();
        let a = doc.create(0, rect_at(0.0, 0.0)).unwrap();
        let b = doc.create(0, rect_at(50.0, 50.0)).unwrap();

        assert!(doc.reorder(0, &[b, a]));
        assert_eq!(doc.pages[0].order, vec![b, a]);

        // Wrong length and foreign ids are rejected.
        assert!(!doc.reorder(0, &[a]));
        assert!(!doc.reorder(0, &[a, ElementId::new_v4()]));
        assert_eq!(doc.pages[0].order, vec![b, a]);
    }

    #[test]
    fn test_elements_at_point_front_to_back() {
        let mut doc = letter_doc();
        let a = doc.create(0, rect_at(0.0, 0.0)).unwrap();
        let b = doc.create(0, rect_at(50.0, 50.0)).unwrap();

        let hits = doc.elements_at_point(0, Point::new(75.0, 75.0), 0.0);
        assert_eq!(hits, vec![b, a]);

        let hits = doc.elements_at_point(0, Point::new(25.0, 25.0), 0.0);
        assert_eq!(hits, vec![a]);
    }

    #[test]
    fn test_z_order_ops() {
        let mut doc = letter_doc();
        let a = doc.create(0, rect_at(0.0, 0.0)).unwrap();
        let b = doc.create(0, rect_at(10.0, 10.0)).unwrap();
        let c = doc.create(0, rect_at(20.0, 20.0)).unwrap();

        doc.bring_to_front(a);
        assert_eq!(doc.pages[0].order, vec![b, c, a]);

        doc.send_to_back(c);
        assert_eq!(doc.pages[0].order, vec![c, b, a]);

        assert!(doc.bring_forward(c));
        assert_eq!(doc.pages[0].order, vec![b, c, a]);

        assert!(!doc.bring_forward(a));
        assert!(doc.send_backward(c));
        assert!(!doc.send_backward(b));
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut doc = letter_doc();
        doc.push_undo();
        let id = doc.create(0, rect_at(0.0, 0.0)).unwrap();

        assert!(doc.undo());
        assert!(doc.is_empty());
        assert!(doc.pages[0].order.is_empty());

        assert!(doc.redo());
        assert_eq!(doc.len(), 1);
        assert!(doc.find(id).is_some());
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut doc = letter_doc();
        doc.push_undo();
        doc.create(0, rect_at(0.0, 0.0));
        assert!(doc.undo());
        assert!(doc.can_redo());

        doc.push_undo();
        doc.create(0, rect_at(50.0, 50.0));
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_undo_history_bounded() {
        let mut doc = letter_doc();
        for i in 0..(MAX_UNDO_HISTORY + 10) {
            doc.push_undo();
            doc.create(0, rect_at(i as f64, 0.0));
        }
        let mut undos = 0;
        while doc.undo() {
            undos += 1;
        }
        assert_eq!(undos, MAX_UNDO_HISTORY);
    }

    #[test]
    fn test_undo_empty_stack() {
        let mut doc = letter_doc();
        assert!(!doc.can_undo());
        assert!(!doc.undo());
        assert!(!doc.can_redo());
        assert!(!doc.redo());
    }
}
