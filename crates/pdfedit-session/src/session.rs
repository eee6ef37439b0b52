//! Edit session
//!
//! One `EditSession` per open document. It owns every piece of mutable edit
//! state and routes host input to the active controller. Public input methods
//! never return errors: failures abort the gesture, and engine failures also
//! leave a notice for the user.

use std::collections::BTreeSet;
use std::time::Instant;

use pdfedit_ops::{OpId, TextStyle};

use crate::config::SessionConfig;
use crate::controllers::{
    ActiveGesture, DrawEnd, DrawGesture, EditContext, GestureOutcome, Key, MoveGesture,
    PointerCapture, ResizeGesture, TextEdit,
};
use crate::engine::{DocumentEngine, PageRenderer, TextRun};
use crate::error::{ErrorClass, Result, SessionError};
use crate::geometry::{PixelPoint, PixelRect, Viewport, ViewportCache};
use crate::history::{Action, ActionLog, Reverted};
use crate::notice::{Notice, NoticeLevel, NoticeQueue};
use crate::overlap;
use crate::overlay::{ElementContent, ElementId, Overlay};
use crate::tools::{route, PointerTarget, Route, Tool};

pub struct EditSession<E: DocumentEngine, R: PageRenderer> {
    engine: E,
    renderer: R,
    config: SessionConfig,
    log: ActionLog,
    overlay: Overlay,
    tool: Tool,
    selected: Option<ElementId>,
    viewports: ViewportCache,
    active: Option<ActiveGesture>,
    capture: PointerCapture,
    notices: NoticeQueue,
    page_count: u32,
}

impl<E: DocumentEngine, R: PageRenderer> EditSession<E, R> {
    /// Load `bytes` into the renderer and start a session over `engine`
    pub fn open(engine: E, mut renderer: R, bytes: &[u8], config: SessionConfig) -> Result<Self> {
        let page_count = renderer.load_document(bytes)?;
        tracing::info!(page_count, signed = engine.is_signed(), "edit session opened");
        Ok(Self {
            engine,
            renderer,
            notices: NoticeQueue::new(config.notice_ttl()),
            config,
            log: ActionLog::new(),
            overlay: Overlay::new(),
            tool: Tool::default(),
            selected: None,
            viewports: ViewportCache::new(),
            active: None,
            capture: PointerCapture::new(),
            page_count,
        })
    }

    /// Cancel whatever is in progress and hand back the collaborators
    pub fn close(mut self) -> (E, R) {
        self.cancel_active();
        tracing::info!(dirty = self.log.is_dirty(), "edit session closed");
        (self.engine, self.renderer)
    }

    /// Render `page` at `scale`, caching its viewport. Elements already on
    /// the page are re-laid out when the scale changed.
    pub fn render_page(&mut self, page: u32, scale: f64) -> Result<Viewport> {
        let viewport = self.renderer.render_page(page, scale)?.viewport;
        if let Ok(previous) = self.viewports.get(page) {
            if previous != viewport {
                let on_page = self
                    .active
                    .as_ref()
                    .is_some_and(|g| g.follows_pointer() && g.page() == page);
                if on_page {
                    self.cancel_active();
                }
                self.overlay.relayout_page(page, &previous, &viewport);
            }
        }
        self.viewports.insert(page, viewport);
        tracing::debug!(page, scale, "page rendered");
        Ok(viewport)
    }

    pub fn viewport(&self, page: u32) -> Option<Viewport> {
        self.viewports.get(page).ok()
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools. A gesture in progress is cancelled.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool != self.tool {
            self.cancel_active();
            tracing::debug!(from = %self.tool, to = %tool, "tool changed");
            self.tool = tool;
        }
    }

    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    pub fn select(&mut self, element: Option<ElementId>) {
        self.selected = element.filter(|id| self.overlay.get(*id).is_some());
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Name of the active gesture, if any
    pub fn active_gesture(&self) -> Option<&'static str> {
        self.active.as_ref().map(ActiveGesture::name)
    }

    pub fn editing(&self) -> Option<&TextEdit> {
        match &self.active {
            Some(ActiveGesture::Text(edit)) => Some(edit),
            _ => None,
        }
    }

    /// Whether the host should forward global pointer-move/up events
    pub fn pointer_capture_active(&self) -> bool {
        self.capture.is_active()
    }

    pub fn pointer_down(&mut self, page: u32, point: PixelPoint, target: PointerTarget) -> GestureOutcome {
        let pending_text = matches!(&self.active, Some(ActiveGesture::Text(edit)) if edit.commit_pending());
        if pending_text {
            // The blur that scheduled this commit belongs to this click
            self.commit_text();
        } else if let Some(active) = &self.active {
            tracing::debug!(active = active.name(), "pointer down ignored during gesture");
            return GestureOutcome::Ignored;
        }

        let outcome = match route(self.tool, target) {
            Route::Deselect => {
                self.selected = None;
                GestureOutcome::Updated
            }
            Route::Move(element) => {
                let capture = self.capture.acquire("move");
                match MoveGesture::start(&self.overlay, element, point, capture) {
                    Ok(gesture) => {
                        self.selected = Some(element);
                        self.active = Some(ActiveGesture::Move(gesture));
                        GestureOutcome::Started
                    }
                    Err(err) => self.fail(err),
                }
            }
            Route::Resize(element, handle) => {
                if self.selected != Some(element) {
                    return self.fail(SessionError::sequencing(format!(
                        "resize of {:?} without selecting it",
                        element
                    )));
                }
                let capture = self.capture.acquire("resize");
                match ResizeGesture::start(
                    &self.overlay,
                    element,
                    handle,
                    point,
                    self.config.min_size_px,
                    capture,
                ) {
                    Ok(gesture) => {
                        self.active = Some(ActiveGesture::Resize(gesture));
                        GestureOutcome::Started
                    }
                    Err(err) => self.fail(err),
                }
            }
            Route::Draw => {
                if let Err(err) = self.viewports.get(page) {
                    return self.fail(err);
                }
                let capture = self.capture.acquire("draw");
                let gesture = DrawGesture::start(&mut self.overlay, page, self.tool, point, capture);
                self.selected = None;
                self.active = Some(ActiveGesture::Draw(gesture));
                GestureOutcome::Started
            }
            Route::PlaceCheckbox => {
                let size = self.config.checkbox_size_px.max(self.config.min_size_px);
                let rect = PixelRect::centered_on(point, size, size);
                let result = self.context().place(
                    "checkbox",
                    page,
                    rect,
                    ElementContent::Checkbox { checked: true },
                );
                self.conclude(result)
            }
        };
        self.settle();
        outcome
    }

    pub fn pointer_move(&mut self, point: PixelPoint) -> GestureOutcome {
        let result = match &mut self.active {
            Some(ActiveGesture::Draw(gesture)) => {
                gesture.update(&mut self.overlay, point);
                Ok(())
            }
            Some(ActiveGesture::Move(gesture)) => gesture.update(&mut self.overlay, point),
            Some(ActiveGesture::Resize(gesture)) => gesture.update(&mut self.overlay, point),
            _ => return GestureOutcome::Ignored,
        };
        let outcome = match result {
            Ok(()) => GestureOutcome::Updated,
            Err(err) => {
                self.cancel_active();
                self.fail(err)
            }
        };
        self.settle();
        outcome
    }

    pub fn pointer_up(&mut self, point: PixelPoint) -> GestureOutcome {
        let Some(gesture) = self.active.take() else {
            return GestureOutcome::Ignored;
        };
        let outcome = match gesture {
            ActiveGesture::Draw(gesture) => {
                let page = gesture.page();
                let end = gesture.finish(&mut self.context(), point);
                self.complete_draw(page, end)
            }
            ActiveGesture::Move(gesture) => {
                let result = gesture.finish(&mut self.context(), point);
                self.conclude(result)
            }
            ActiveGesture::Resize(gesture) => {
                let result = gesture.finish(&mut self.context(), point);
                self.conclude(result)
            }
            ActiveGesture::Text(edit) => {
                self.active = Some(ActiveGesture::Text(edit));
                GestureOutcome::Ignored
            }
        };
        self.settle();
        outcome
    }

    pub fn key(&mut self, key: Key) -> GestureOutcome {
        let outcome = match key {
            Key::Escape => match self.active.take() {
                Some(gesture) => {
                    self.cancel_gesture(gesture);
                    GestureOutcome::Cancelled
                }
                None => {
                    self.selected = None;
                    GestureOutcome::Ignored
                }
            },
            Key::Enter { shift } => {
                let Some(mut edit) = self.take_text() else {
                    return GestureOutcome::Ignored;
                };
                if shift {
                    edit.insert_newline(&mut self.context());
                    self.active = Some(ActiveGesture::Text(edit));
                    GestureOutcome::Updated
                } else {
                    let result = edit.commit(&mut self.context());
                    self.conclude(result)
                }
            }
            Key::Delete => match (self.active.is_some(), self.selected) {
                (false, Some(element)) => return self.delete_element(element),
                _ => GestureOutcome::Ignored,
            },
        };
        self.settle();
        outcome
    }

    /// Replace the in-progress editor text
    pub fn set_editor_text(&mut self, text: &str) -> GestureOutcome {
        let Some(mut edit) = self.take_text() else {
            return GestureOutcome::Ignored;
        };
        edit.set_text(&mut self.context(), text);
        self.active = Some(ActiveGesture::Text(edit));
        self.settle();
        GestureOutcome::Updated
    }

    /// The editor lost focus. Empty text cancels right away; otherwise the
    /// commit is deferred so a click on a nearby style control lands first.
    pub fn blur(&mut self, now: Instant) -> GestureOutcome {
        let Some(mut edit) = self.take_text() else {
            return GestureOutcome::Ignored;
        };
        if edit.is_empty() {
            edit.cancel(&mut self.context());
            self.settle();
            return GestureOutcome::Cancelled;
        }
        edit.blur(now, self.config.blur_commit_delay());
        self.active = Some(ActiveGesture::Text(edit));
        GestureOutcome::Updated
    }

    /// Focus returned to the editor; a pending blur commit is dropped
    pub fn focus_editor(&mut self) -> GestureOutcome {
        let Some(mut edit) = self.take_text() else {
            return GestureOutcome::Ignored;
        };
        edit.focus();
        self.active = Some(ActiveGesture::Text(edit));
        GestureOutcome::Updated
    }

    /// Advance timers: fire a due blur commit and drop expired notices
    pub fn tick(&mut self, now: Instant) -> GestureOutcome {
        self.notices.prune(now);
        let due = matches!(&self.active, Some(ActiveGesture::Text(edit)) if edit.commit_due(now));
        if !due {
            return GestureOutcome::Ignored;
        }
        let outcome = self.commit_text();
        self.settle();
        outcome
    }

    /// Open the in-place editor on a text, replaced-text or redaction element
    pub fn open_text_edit(&mut self, element: ElementId) -> GestureOutcome {
        if self.active.is_some() {
            return GestureOutcome::Ignored;
        }
        let Some(el) = self.overlay.get(element) else {
            return self.fail(SessionError::UnknownElement(element));
        };
        let page = el.page;
        let runs = match el.content {
            ElementContent::Opaque { .. } => self.text_runs(page),
            _ => Vec::new(),
        };
        let outcome = match TextEdit::reopen(&mut self.context(), element, &runs) {
            Ok(edit) => {
                self.active = Some(ActiveGesture::Text(edit));
                GestureOutcome::Started
            }
            Err(err) => self.fail(err),
        };
        self.settle();
        outcome
    }

    /// Delete an element and its operation as one undoable action
    pub fn delete_element(&mut self, element: ElementId) -> GestureOutcome {
        if self.active.is_some() {
            return GestureOutcome::Ignored;
        }
        let result = self.context().delete(element);
        let outcome = self.conclude(result);
        self.settle();
        outcome
    }

    /// Change the style of a text element. While the element is being edited
    /// only the editor changes; otherwise its operation is replaced.
    pub fn restyle_text(&mut self, element: ElementId, style: TextStyle) -> GestureOutcome {
        if let Some(mut edit) = self.take_text() {
            let outcome = if edit.element() == element {
                edit.set_style(&mut self.context(), style);
                GestureOutcome::Updated
            } else {
                GestureOutcome::Ignored
            };
            self.active = Some(ActiveGesture::Text(edit));
            return outcome;
        }
        if self.active.is_some() {
            return GestureOutcome::Ignored;
        }

        let Some(snapshot) = self.overlay.get(element).cloned() else {
            return self.fail(SessionError::UnknownElement(element));
        };
        let restyled = match self.overlay.get_mut(element).map(|el| &mut el.content) {
            Ok(ElementContent::Text { style: current, .. })
            | Ok(ElementContent::Replaced { style: current, .. }) => {
                *current = style;
                true
            }
            _ => false,
        };
        if !restyled {
            return self.fail(SessionError::sequencing(format!(
                "{:?} element has no text style",
                snapshot.content.kind()
            )));
        }
        let result = self.context().replace("style", element, snapshot);
        let outcome = self.conclude(result);
        self.settle();
        outcome
    }

    /// Revert the last action. Returns the handles it removed.
    pub fn undo(&mut self) -> Vec<OpId> {
        self.cancel_active();
        match self.log.undo(&mut self.engine) {
            Ok(Some(reverted)) => {
                self.apply(&reverted);
                reverted.removed
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                self.fail(err);
                Vec::new()
            }
        }
    }

    /// Re-apply the last undone action. Returns the handles it created.
    pub fn redo(&mut self) -> Vec<OpId> {
        self.cancel_active();
        match self.log.redo(&mut self.engine) {
            Ok(Some(reverted)) => {
                self.apply(&reverted);
                reverted.restored.iter().map(|r| r.handle).collect()
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                self.fail(err);
                Vec::new()
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    pub fn has_changes(&self) -> bool {
        self.log.has_changes()
    }

    /// True when edits happened since the last successful export
    pub fn is_dirty(&self) -> bool {
        self.log.is_dirty()
    }

    pub fn is_signed(&self) -> bool {
        self.engine.is_signed()
    }

    /// Export through the engine. A pending text edit is committed first and
    /// any pointer gesture is cancelled.
    pub fn export(&mut self) -> Result<Vec<u8>> {
        if self.editing().is_some() {
            self.commit_text();
        } else {
            self.cancel_active();
        }
        self.settle();
        match self.engine.export() {
            Ok(bytes) => {
                self.log.mark_saved();
                tracing::info!(bytes = bytes.len(), "document exported");
                Ok(bytes)
            }
            Err(err) => {
                let err = SessionError::from(err);
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Notices still visible at `now`
    pub fn notices(&self, now: Instant) -> impl Iterator<Item = &Notice> {
        self.notices.active(now)
    }

    fn context(&mut self) -> EditContext<'_, E> {
        EditContext {
            engine: &mut self.engine,
            log: &mut self.log,
            overlay: &mut self.overlay,
            viewports: &self.viewports,
            config: &self.config,
        }
    }

    fn take_text(&mut self) -> Option<TextEdit> {
        match self.active.take() {
            Some(ActiveGesture::Text(edit)) => Some(edit),
            other => {
                self.active = other;
                None
            }
        }
    }

    fn commit_text(&mut self) -> GestureOutcome {
        let Some(edit) = self.take_text() else {
            return GestureOutcome::Ignored;
        };
        let result = edit.commit(&mut self.context());
        self.conclude(result)
    }

    fn complete_draw(&mut self, page: u32, end: DrawEnd) -> GestureOutcome {
        match end {
            DrawEnd::Discarded => GestureOutcome::Cancelled,
            DrawEnd::Place {
                label,
                rect,
                content,
            } => {
                let result = self.context().place(label, page, rect, content);
                self.conclude(result)
            }
            DrawEnd::Text(rect) => match TextEdit::begin_new(&mut self.context(), page, rect) {
                Ok(edit) => {
                    self.active = Some(ActiveGesture::Text(edit));
                    GestureOutcome::Started
                }
                Err(err) => self.fail(err),
            },
        }
    }

    fn cancel_active(&mut self) {
        if let Some(gesture) = self.active.take() {
            self.cancel_gesture(gesture);
        }
    }

    fn cancel_gesture(&mut self, gesture: ActiveGesture) {
        tracing::debug!(gesture = gesture.name(), "gesture cancelled");
        match gesture {
            ActiveGesture::Draw(gesture) => gesture.cancel(&mut self.overlay),
            ActiveGesture::Move(gesture) => gesture.cancel(&mut self.overlay),
            ActiveGesture::Resize(gesture) => gesture.cancel(&mut self.overlay),
            ActiveGesture::Text(edit) => edit.cancel(&mut self.context()),
        }
        self.settle();
    }

    fn apply(&mut self, reverted: &Reverted) {
        self.overlay.apply_reverted(reverted, &self.viewports);
        self.settle();
    }

    fn text_runs(&self, page: u32) -> Vec<TextRun> {
        match self.renderer.extract_text_with_positions(page) {
            Ok(runs) => runs,
            Err(err) => {
                tracing::warn!(page, error = %err, "text extraction failed; using default style");
                Vec::new()
            }
        }
    }

    fn conclude(&mut self, result: Result<Option<Action>>) -> GestureOutcome {
        match result {
            Ok(action) => GestureOutcome::committed(action),
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: SessionError) -> GestureOutcome {
        self.report(&err);
        self.settle();
        GestureOutcome::Aborted
    }

    fn report(&mut self, err: &SessionError) {
        match err.class() {
            ErrorClass::Sequencing => tracing::warn!(error = %err, "gesture aborted: out of sequence"),
            ErrorClass::Geometry => tracing::warn!(error = %err, "gesture aborted: no page geometry"),
            ErrorClass::Engine => {
                tracing::warn!(error = %err, "edit rejected by engine");
                self.notices.push(NoticeLevel::Error, err.to_string(), Instant::now());
            }
        }
    }

    /// Drop a stale selection and recompute overlap warnings
    fn settle(&mut self) {
        if let Some(selected) = self.selected {
            if self.overlay.get(selected).is_none() {
                self.selected = None;
            }
        }
        let pages: BTreeSet<u32> = self.overlay.elements().map(|el| el.page).collect();
        for page in pages {
            overlap::recompute(&mut self.overlay, page);
        }
    }
}
