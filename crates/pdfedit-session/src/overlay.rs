//! Overlay synchronizer
//!
//! Keeps the visible overlay elements bound 1:1 to engine operation handles.
//! Elements live in pixel space on their page; operations live in document
//! space. All binding changes go through this module so the handle ↔ element
//! maps stay consistent in one place.

use std::collections::{BTreeMap, HashMap};

use pdfedit_ops::{EditOperation, OpId, OpKind, TextStyle};

use crate::engine::{issue, DocumentEngine};
use crate::error::{Result, SessionError};
use crate::geometry::{rescale, to_doc_space, to_pixel_space, DocRect, PixelRect, Viewport, ViewportCache};
use crate::history::{ActionLog, Reverted};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Kind-specific payload of an overlay element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    Text {
        text: String,
        style: TextStyle,
    },
    Opaque {
        color: String,
    },
    Checkbox {
        checked: bool,
    },
    Highlight {
        color: String,
        opacity: f64,
    },
    /// Covered original text with replacement text drawn over it
    Replaced {
        original_rect: DocRect,
        original_text: String,
        text: String,
        style: TextStyle,
    },
}

impl ElementContent {
    pub fn kind(&self) -> OpKind {
        match self {
            ElementContent::Text { .. } => OpKind::InsertText,
            ElementContent::Opaque { .. } => OpKind::OpaqueRect,
            ElementContent::Checkbox { .. } => OpKind::Checkbox,
            ElementContent::Highlight { .. } => OpKind::Highlight,
            ElementContent::Replaced { .. } => OpKind::ReplaceText,
        }
    }

    /// Text boxes and replaced text take part in the overlap check as subjects
    pub fn is_text_box(&self) -> bool {
        self.kind().is_text_bearing()
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ElementContent::Text { text, .. } | ElementContent::Replaced { text, .. } => {
                Some(text)
            }
            _ => None,
        }
    }

    pub fn style(&self) -> Option<&TextStyle> {
        match self {
            ElementContent::Text { style, .. } | ElementContent::Replaced { style, .. } => {
                Some(style)
            }
            _ => None,
        }
    }

    fn from_record(record: &EditOperation) -> Self {
        match record {
            EditOperation::AddText { text, style, .. } => ElementContent::Text {
                text: text.clone(),
                style: style.clone(),
            },
            EditOperation::AddWhiteRect { color, .. } => ElementContent::Opaque {
                color: color.clone(),
            },
            EditOperation::AddCheckbox { checked, .. } => {
                ElementContent::Checkbox { checked: *checked }
            }
            EditOperation::AddHighlight { color, opacity, .. } => ElementContent::Highlight {
                color: color.clone(),
                opacity: *opacity,
            },
            EditOperation::ReplaceText {
                original_rect,
                original_text,
                new_text,
                style,
                ..
            } => ElementContent::Replaced {
                original_rect: *original_rect,
                original_text: original_text.clone(),
                text: new_text.clone(),
                style: style.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayElement {
    pub id: ElementId,
    pub page: u32,
    pub rect: PixelRect,
    pub content: ElementContent,
    /// Advisory: the element overlaps a text box or redaction on its page
    pub overlap_warning: bool,
    /// An in-place text editor is open on this element
    pub editing: bool,
}

impl OverlayElement {
    /// Record describing this element, positioned with `rect` in document space
    pub fn to_record(&self, rect: DocRect) -> EditOperation {
        let page = self.page;
        match &self.content {
            ElementContent::Text { text, style } => EditOperation::AddText {
                id: 0,
                page,
                rect,
                text: text.clone(),
                style: style.clone(),
            },
            ElementContent::Opaque { color } => EditOperation::AddWhiteRect {
                id: 0,
                page,
                rect,
                color: color.clone(),
            },
            ElementContent::Checkbox { checked } => EditOperation::AddCheckbox {
                id: 0,
                page,
                rect,
                checked: *checked,
            },
            ElementContent::Highlight { color, opacity } => EditOperation::AddHighlight {
                id: 0,
                page,
                rect,
                color: color.clone(),
                opacity: *opacity,
            },
            ElementContent::Replaced {
                original_rect,
                original_text,
                text,
                style,
            } => EditOperation::ReplaceText {
                id: 0,
                page,
                original_rect: *original_rect,
                replacement_rect: rect,
                original_text: original_text.clone(),
                new_text: text.clone(),
                style: style.clone(),
            },
        }
    }
}

/// Overlay elements of every page plus their bindings to engine handles
#[derive(Debug, Default)]
pub struct Overlay {
    elements: BTreeMap<ElementId, OverlayElement>,
    by_handle: HashMap<OpId, ElementId>,
    by_element: HashMap<ElementId, OpId>,
    preview: Option<(u32, PixelRect)>,
    next_id: u64,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unbound element
    pub fn create(&mut self, page: u32, rect: PixelRect, content: ElementContent) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.insert(
            id,
            OverlayElement {
                id,
                page,
                rect,
                content,
                overlap_warning: false,
                editing: false,
            },
        );
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&OverlayElement> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Result<&mut OverlayElement> {
        self.elements
            .get_mut(&id)
            .ok_or(SessionError::UnknownElement(id))
    }

    pub fn elements(&self) -> impl Iterator<Item = &OverlayElement> {
        self.elements.values()
    }

    pub fn elements_on_page(&self, page: u32) -> impl Iterator<Item = &OverlayElement> {
        self.elements.values().filter(move |e| e.page == page)
    }

    pub(crate) fn elements_mut(&mut self) -> impl Iterator<Item = &mut OverlayElement> {
        self.elements.values_mut()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn handle_of(&self, element: ElementId) -> Option<OpId> {
        self.by_element.get(&element).copied()
    }

    pub fn element_for(&self, handle: OpId) -> Option<ElementId> {
        self.by_handle.get(&handle).copied()
    }

    /// Bind `element` to `handle`, dropping any previous binding of either
    pub fn bind(&mut self, element: ElementId, handle: OpId) -> Result<()> {
        if !self.elements.contains_key(&element) {
            return Err(SessionError::UnknownElement(element));
        }
        self.unbind(element);
        if let Some(other) = self.by_handle.remove(&handle) {
            self.by_element.remove(&other);
        }
        self.by_handle.insert(handle, element);
        self.by_element.insert(element, handle);
        Ok(())
    }

    pub fn unbind(&mut self, element: ElementId) -> Option<OpId> {
        let handle = self.by_element.remove(&element)?;
        self.by_handle.remove(&handle);
        Some(handle)
    }

    /// Remove an element and its binding. The engine is not touched.
    pub fn remove(&mut self, element: ElementId) -> Option<OverlayElement> {
        self.unbind(element);
        self.elements.remove(&element)
    }

    /// Move in place: the handle binding is unchanged
    pub fn move_to(&mut self, element: ElementId, x: f64, y: f64) -> Result<()> {
        let el = self.get_mut(element)?;
        el.rect.x = x;
        el.rect.y = y;
        Ok(())
    }

    /// Resize in place: the handle binding is unchanged
    pub fn resize_to(&mut self, element: ElementId, rect: PixelRect) -> Result<()> {
        self.get_mut(element)?.rect = rect;
        Ok(())
    }

    pub fn preview(&self) -> Option<(u32, PixelRect)> {
        self.preview
    }

    pub(crate) fn set_preview(&mut self, page: u32, rect: PixelRect) {
        self.preview = Some((page, rect));
    }

    pub(crate) fn clear_preview(&mut self) {
        self.preview = None;
    }

    /// Record for the element's current state in document space
    pub fn record_for(&self, element: ElementId, viewports: &ViewportCache) -> Result<EditOperation> {
        let el = self.get(element).ok_or(SessionError::UnknownElement(element))?;
        let viewport = viewports.get(el.page)?;
        Ok(el.to_record(to_doc_space(&viewport, &el.rect)))
    }

    /// Issue the element's current state as a new operation inside the open
    /// action and bind the element to it.
    pub fn commit_element<E: DocumentEngine + ?Sized>(
        &mut self,
        log: &mut ActionLog,
        engine: &mut E,
        viewports: &ViewportCache,
        element: ElementId,
    ) -> Result<OpId> {
        let record = self.record_for(element, viewports)?;
        let handle = issue(engine, &record)?;
        log.record(handle)?;
        self.bind(element, handle)?;
        tracing::debug!(element = element.0, handle, kind = ?record.kind(), "element committed");
        Ok(handle)
    }

    /// Remove the element's operation inside the open action. The element
    /// stays on screen, unbound, for the caller to replace or delete.
    pub fn displace_element<E: DocumentEngine + ?Sized>(
        &mut self,
        log: &mut ActionLog,
        engine: &mut E,
        element: ElementId,
    ) -> Result<Option<EditOperation>> {
        let Some(handle) = self.handle_of(element) else {
            return Ok(None);
        };
        let record = log.displace(engine, handle)?;
        self.unbind(element);
        Ok(Some(record))
    }

    /// Replace the element's operation with one describing its current state
    pub fn replace_element<E: DocumentEngine + ?Sized>(
        &mut self,
        log: &mut ActionLog,
        engine: &mut E,
        viewports: &ViewportCache,
        element: ElementId,
    ) -> Result<OpId> {
        self.displace_element(log, engine, element)?;
        self.commit_element(log, engine, viewports, element)
    }

    /// Delete the element and its operation inside the open action
    pub fn delete_element<E: DocumentEngine + ?Sized>(
        &mut self,
        log: &mut ActionLog,
        engine: &mut E,
        element: ElementId,
    ) -> Result<()> {
        self.displace_element(log, engine, element)?;
        self.remove(element);
        Ok(())
    }

    /// Build a bound element purely from an operation record
    pub fn recreate(&mut self, record: &EditOperation, viewports: &ViewportCache) -> Result<ElementId> {
        let viewport = viewports.get(record.page())?;
        let rect = to_pixel_space(&viewport, &record.rect());
        let id = self.create(record.page(), rect, ElementContent::from_record(record));
        self.bind(id, record.id())?;
        Ok(id)
    }

    /// Mirror an undo/redo/abort: drop elements of removed handles and
    /// recreate elements for restored records.
    pub fn apply_reverted(&mut self, reverted: &Reverted, viewports: &ViewportCache) {
        for handle in &reverted.removed {
            if let Some(element) = self.element_for(*handle) {
                self.remove(element);
            }
        }
        for restored in &reverted.restored {
            if let Err(err) = self.recreate(&restored.record, viewports) {
                tracing::warn!(handle = restored.handle, error = %err, "could not recreate overlay element");
            }
        }
    }

    /// Re-express every element of `page` under a new viewport
    pub fn relayout_page(&mut self, page: u32, from: &Viewport, to: &Viewport) {
        for el in self.elements.values_mut().filter(|e| e.page == page) {
            el.rect = rescale(from, to, &el.rect);
        }
        if let Some((preview_page, rect)) = self.preview {
            if preview_page == page {
                self.preview = Some((page, rescale(from, to, &rect)));
            }
        }
    }
}
