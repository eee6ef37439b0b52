//! Moving an element by dragging its body

use crate::engine::DocumentEngine;
use crate::error::{Result, SessionError};
use crate::geometry::{PixelPoint, PixelRect};
use crate::history::Action;
use crate::overlay::{ElementContent, ElementId, Overlay};

use super::{EditContext, PointerSubscription};

#[derive(Debug)]
pub struct MoveGesture {
    element: ElementId,
    page: u32,
    start: PixelPoint,
    origin: PixelRect,
    _capture: PointerSubscription,
}

impl MoveGesture {
    pub fn start(
        overlay: &Overlay,
        element: ElementId,
        start: PixelPoint,
        capture: PointerSubscription,
    ) -> Result<Self> {
        let el = overlay
            .get(element)
            .ok_or(SessionError::UnknownElement(element))?;
        tracing::debug!(element = element.0, page = el.page, "move started");
        Ok(Self {
            element,
            page: el.page,
            start,
            origin: el.rect,
            _capture: capture,
        })
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Move the element visually. The engine is not touched until `finish`.
    pub fn update(&self, overlay: &mut Overlay, point: PixelPoint) -> Result<()> {
        let target = self.target(point);
        overlay.move_to(self.element, target.x, target.y)
    }

    pub fn cancel(self, overlay: &mut Overlay) {
        if let Err(err) = overlay.resize_to(self.element, self.origin) {
            tracing::debug!(error = %err, "moved element vanished before cancel");
        }
        tracing::debug!(element = self.element.0, "move cancelled");
    }

    /// Drop the element at `point`. A click without movement toggles a
    /// checkbox and does nothing to other kinds.
    pub fn finish<E: DocumentEngine + ?Sized>(
        self,
        ctx: &mut EditContext<'_, E>,
        point: PixelPoint,
    ) -> Result<Option<Action>> {
        let target = self.target(point);
        let current = ctx
            .overlay
            .get(self.element)
            .cloned()
            .ok_or(SessionError::UnknownElement(self.element))?;
        let mut snapshot = current.clone();
        snapshot.rect = self.origin;

        ctx.overlay.move_to(self.element, target.x, target.y)?;
        if target == self.origin {
            let ElementContent::Checkbox { checked } = current.content else {
                return Ok(None);
            };
            ctx.overlay.get_mut(self.element)?.content = ElementContent::Checkbox { checked: !checked };
            return ctx.replace("checkbox", self.element, snapshot);
        }
        ctx.replace("move", self.element, snapshot)
    }

    fn target(&self, point: PixelPoint) -> PixelRect {
        self.origin
            .translated(point.x - self.start.x, point.y - self.start.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::controllers::PointerCapture;
    use crate::engine::fetch_record;
    use crate::geometry::{Viewport, ViewportCache};
    use crate::history::ActionLog;
    use crate::test_support::{engine, FlakyEngine};
    use pdfedit_ops::{EditEngine, EditOperation};

    struct Fixture {
        engine: FlakyEngine,
        log: ActionLog,
        overlay: Overlay,
        viewports: ViewportCache,
        config: SessionConfig,
        capture: PointerCapture,
    }

    impl Fixture {
        fn new() -> Self {
            let mut viewports = ViewportCache::new();
            viewports.insert(1, Viewport::new(1.0, 612.0, 792.0));
            Self {
                engine: FlakyEngine::new(engine(1)),
                log: ActionLog::new(),
                overlay: Overlay::new(),
                viewports,
                config: SessionConfig::default(),
                capture: PointerCapture::new(),
            }
        }

        fn ctx(&mut self) -> EditContext<'_, FlakyEngine> {
            EditContext {
                engine: &mut self.engine,
                log: &mut self.log,
                overlay: &mut self.overlay,
                viewports: &self.viewports,
                config: &self.config,
            }
        }

        fn place(&mut self, content: ElementContent) -> ElementId {
            self.ctx()
                .place("place", 1, PixelRect::new(100.0, 100.0, 40.0, 40.0), content)
                .unwrap();
            self.overlay.elements().next().unwrap().id
        }

        fn inner(&self) -> &EditEngine {
            self.engine.inner()
        }
    }

    fn drag(fx: &mut Fixture, element: ElementId, to: PixelPoint) -> Result<Option<Action>> {
        let gesture = MoveGesture::start(
            &fx.overlay,
            element,
            PixelPoint::new(110.0, 110.0),
            fx.capture.acquire("move"),
        )
        .unwrap();
        gesture.update(&mut fx.overlay, PixelPoint::new(130.0, 130.0)).unwrap();
        // No engine calls while dragging
        assert_eq!(fx.inner().operations()[0].rect().x, 100.0);
        gesture.finish(&mut fx.ctx(), to)
    }

    #[test]
    fn test_move_replaces_operation_in_one_action() {
        let mut fx = Fixture::new();
        let el = fx.place(ElementContent::Opaque {
            color: "#000000".to_string(),
        });

        let action = drag(&mut fx, el, PixelPoint::new(160.0, 110.0)).unwrap().unwrap();
        assert_eq!(action.label, "move");
        assert_eq!(action.displaced.len(), 1);
        assert_eq!(fx.inner().operations().len(), 1);
        assert_eq!(fx.inner().operations()[0].rect().x, 150.0);
        assert_eq!(fx.overlay.handle_of(el), Some(action.handles[0]));
        assert!(!fx.capture.is_active());
    }

    #[test]
    fn test_click_toggles_checkbox() {
        let mut fx = Fixture::new();
        let el = fx.place(ElementContent::Checkbox { checked: true });

        let action = drag(&mut fx, el, PixelPoint::new(110.0, 110.0)).unwrap().unwrap();
        assert_eq!(action.label, "checkbox");
        let record = fetch_record(&fx.engine, action.handles[0]).unwrap();
        assert!(matches!(record, EditOperation::AddCheckbox { checked: false, .. }));
        assert_eq!(fx.overlay.get(el).unwrap().rect.x, 100.0);
    }

    #[test]
    fn test_click_on_redaction_is_no_edit() {
        let mut fx = Fixture::new();
        let el = fx.place(ElementContent::Opaque {
            color: "#000000".to_string(),
        });
        assert_eq!(drag(&mut fx, el, PixelPoint::new(110.0, 110.0)).unwrap(), None);
        assert_eq!(fx.log.undo_stack().len(), 1);
    }

    #[test]
    fn test_failed_move_restores_element_and_operation() {
        let mut fx = Fixture::new();
        let el = fx.place(ElementContent::Opaque {
            color: "#000000".to_string(),
        });
        fx.engine.fail_next_create();

        assert!(drag(&mut fx, el, PixelPoint::new(160.0, 110.0)).is_err());

        assert!(!fx.log.is_open());
        assert_eq!(fx.log.undo_stack().len(), 1);
        assert_eq!(fx.inner().operations().len(), 1);
        assert_eq!(fx.inner().operations()[0].rect().x, 100.0);
        // The element was recreated from the restored record
        assert_eq!(fx.overlay.len(), 1);
        let restored = fx.overlay.elements().next().unwrap();
        assert_eq!(restored.rect.x, 100.0);
        assert!(fx.overlay.handle_of(restored.id).is_some());
    }
}
