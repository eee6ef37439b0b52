//! Interaction controllers
//!
//! One short-lived state machine per gesture. Only one may be active at a
//! time; the session holds it in a single `ActiveGesture` slot. Controllers
//! that follow the pointer hold a `PointerSubscription` which detaches when
//! the controller is dropped, whichever way the gesture ends.

mod drag;
mod draw;
mod resize;
mod text_edit;

pub use drag::MoveGesture;
pub use draw::{DrawEnd, DrawGesture};
pub use resize::{resize_rect, ResizeGesture, ResizeHandle};
pub use text_edit::{estimate_text_size, TextEdit, TextMode};

use std::cell::Cell;
use std::rc::Rc;

use pdfedit_ops::OpId;

use crate::config::SessionConfig;
use crate::engine::DocumentEngine;
use crate::error::{Result, SessionError};
use crate::geometry::{PixelRect, ViewportCache};
use crate::history::{Action, ActionLog};
use crate::overlay::{ElementContent, ElementId, Overlay, OverlayElement};

/// Result of feeding one input event to the session
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Nothing to do for this event
    Ignored,
    Started,
    Updated,
    /// The gesture ended with a committed action
    Committed { label: String, handles: Vec<OpId> },
    /// The gesture ended without an edit
    Cancelled,
    /// The gesture failed and was rolled back
    Aborted,
}

impl GestureOutcome {
    pub fn committed(action: Option<Action>) -> Self {
        match action {
            Some(action) => GestureOutcome::Committed {
                label: action.label,
                handles: action.handles,
            },
            None => GestureOutcome::Cancelled,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, GestureOutcome::Committed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter { shift: bool },
    Escape,
    Delete,
}

/// The single active gesture slot
#[derive(Debug)]
pub enum ActiveGesture {
    Draw(DrawGesture),
    Move(MoveGesture),
    Resize(ResizeGesture),
    Text(TextEdit),
}

impl ActiveGesture {
    pub fn name(&self) -> &'static str {
        match self {
            ActiveGesture::Draw(_) => "draw",
            ActiveGesture::Move(_) => "move",
            ActiveGesture::Resize(_) => "resize",
            ActiveGesture::Text(_) => "text",
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            ActiveGesture::Draw(g) => g.page(),
            ActiveGesture::Move(g) => g.page(),
            ActiveGesture::Resize(g) => g.page(),
            ActiveGesture::Text(g) => g.page(),
        }
    }

    pub fn follows_pointer(&self) -> bool {
        !matches!(self, ActiveGesture::Text(_))
    }
}

/// Registry of global pointer-move/pointer-up subscriptions
#[derive(Debug, Clone, Default)]
pub struct PointerCapture {
    holders: Rc<Cell<usize>>,
}

impl PointerCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, owner: &'static str) -> PointerSubscription {
        self.holders.set(self.holders.get() + 1);
        tracing::trace!(owner, "pointer capture acquired");
        PointerSubscription {
            holders: Rc::clone(&self.holders),
            owner,
        }
    }

    pub fn is_active(&self) -> bool {
        self.holders.get() > 0
    }

    pub fn subscribers(&self) -> usize {
        self.holders.get()
    }
}

/// Live pointer subscription; released on drop
#[derive(Debug)]
pub struct PointerSubscription {
    holders: Rc<Cell<usize>>,
    owner: &'static str,
}

impl Drop for PointerSubscription {
    fn drop(&mut self) {
        self.holders.set(self.holders.get().saturating_sub(1));
        tracing::trace!(owner = self.owner, "pointer capture released");
    }
}

/// Mutable session state a controller works on
pub struct EditContext<'a, E: DocumentEngine + ?Sized> {
    pub engine: &'a mut E,
    pub log: &'a mut ActionLog,
    pub overlay: &'a mut Overlay,
    pub viewports: &'a ViewportCache,
    pub config: &'a SessionConfig,
}

impl<'a, E: DocumentEngine + ?Sized> EditContext<'a, E> {
    /// Create a new element and its operation as one action
    pub fn place(
        &mut self,
        label: &str,
        page: u32,
        rect: PixelRect,
        content: ElementContent,
    ) -> Result<Option<Action>> {
        self.viewports.get(page)?;
        self.log.begin_action(label)?;
        let element = self.overlay.create(page, rect, content);
        let result = self.commit_element(element).map(|_| ());
        self.finish(element, None, result)
    }

    /// Replace an element's operation with its current state as one action.
    /// `snapshot` is the element as it was before the caller mutated it.
    pub fn replace(
        &mut self,
        label: &str,
        element: ElementId,
        snapshot: OverlayElement,
    ) -> Result<Option<Action>> {
        if let Err(err) = self.log.begin_action(label) {
            self.restore(element, snapshot);
            return Err(err);
        }
        let result = self
            .overlay
            .replace_element(&mut *self.log, &mut *self.engine, self.viewports, element)
            .map(|_| ());
        self.finish(element, Some(snapshot), result)
    }

    /// Delete an element and its operation as one action
    pub fn delete(&mut self, element: ElementId) -> Result<Option<Action>> {
        let snapshot = self
            .overlay
            .get(element)
            .cloned()
            .ok_or(SessionError::UnknownElement(element))?;
        self.log.begin_action("delete")?;
        let result = self
            .overlay
            .displace_element(&mut *self.log, &mut *self.engine, element)
            .map(|_| ());
        if result.is_ok() {
            self.overlay.remove(element);
        }
        self.finish(element, Some(snapshot), result)
    }

    pub fn commit_element(&mut self, element: ElementId) -> Result<OpId> {
        self.overlay
            .commit_element(&mut *self.log, &mut *self.engine, self.viewports, element)
    }

    /// Commit the open action, or roll it back if `result` failed
    pub fn finish(
        &mut self,
        element: ElementId,
        snapshot: Option<OverlayElement>,
        result: Result<()>,
    ) -> Result<Option<Action>> {
        match result.and_then(|_| self.log.commit_action()) {
            Ok(action) => Ok(action),
            Err(err) => {
                tracing::warn!(element = element.0, error = %err, "gesture aborted");
                self.rollback(element, snapshot);
                Err(err)
            }
        }
    }

    /// Undo whatever the open action did. A still-bound element is put back
    /// to `snapshot`; an unbound one is dropped, since the abort recreates
    /// the element of any operation it restores. When the engine refuses the
    /// abort, a bound element keeps its current state so it keeps matching
    /// the operation left on the undo stack.
    pub fn rollback(&mut self, element: ElementId, snapshot: Option<OverlayElement>) {
        let bound = self.overlay.handle_of(element).is_some();
        if !bound {
            self.overlay.remove(element);
        }
        let aborted = !self.log.is_open()
            || match self.log.abort_action(&mut *self.engine) {
                Ok(reverted) => {
                    self.overlay.apply_reverted(&reverted, self.viewports);
                    true
                }
                Err(err) => {
                    tracing::error!(error = %err, "could not roll back aborted action");
                    false
                }
            };
        if let (true, true, Some(snapshot)) = (bound, aborted, snapshot) {
            self.restore(element, snapshot);
        }
    }

    fn restore(&mut self, element: ElementId, snapshot: OverlayElement) {
        if let Ok(el) = self.overlay.get_mut(element) {
            el.rect = snapshot.rect;
            el.content = snapshot.content;
            el.editing = false;
        }
    }
}
