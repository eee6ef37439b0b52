//! Handle-based resizing

use serde::{Deserialize, Serialize};

use crate::engine::DocumentEngine;
use crate::error::{Result, SessionError};
use crate::geometry::{PixelPoint, PixelRect};
use crate::history::Action;
use crate::overlay::{ElementId, Overlay};

use super::{EditContext, PointerSubscription};

/// The eight resize handles: four corners and four edge midpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NorthWest,
        ResizeHandle::North,
        ResizeHandle::NorthEast,
        ResizeHandle::East,
        ResizeHandle::SouthEast,
        ResizeHandle::South,
        ResizeHandle::SouthWest,
        ResizeHandle::West,
    ];

    fn moves_left(&self) -> bool {
        matches!(
            self,
            ResizeHandle::NorthWest | ResizeHandle::West | ResizeHandle::SouthWest
        )
    }

    fn moves_right(&self) -> bool {
        matches!(
            self,
            ResizeHandle::NorthEast | ResizeHandle::East | ResizeHandle::SouthEast
        )
    }

    fn moves_top(&self) -> bool {
        matches!(
            self,
            ResizeHandle::NorthWest | ResizeHandle::North | ResizeHandle::NorthEast
        )
    }

    fn moves_bottom(&self) -> bool {
        matches!(
            self,
            ResizeHandle::SouthWest | ResizeHandle::South | ResizeHandle::SouthEast
        )
    }
}

/// Resize `original` by dragging `handle` by (dx, dy).
///
/// Edges the handle does not own never move. When the dragged edge would
/// bring a dimension below `min`, the dimension is clamped to `min` measured
/// from the pinned opposite edge.
pub fn resize_rect(original: PixelRect, handle: ResizeHandle, dx: f64, dy: f64, min: f64) -> PixelRect {
    let mut left = original.x;
    let mut right = original.right();
    let mut top = original.y;
    let mut bottom = original.bottom();

    if handle.moves_left() {
        left = (left + dx).min(right - min);
    }
    if handle.moves_right() {
        right = (right + dx).max(left + min);
    }
    if handle.moves_top() {
        top = (top + dy).min(bottom - min);
    }
    if handle.moves_bottom() {
        bottom = (bottom + dy).max(top + min);
    }

    PixelRect::new(left, top, right - left, bottom - top)
}

#[derive(Debug)]
pub struct ResizeGesture {
    element: ElementId,
    page: u32,
    handle: ResizeHandle,
    start: PixelPoint,
    origin: PixelRect,
    min: f64,
    _capture: PointerSubscription,
}

impl ResizeGesture {
    pub fn start(
        overlay: &Overlay,
        element: ElementId,
        handle: ResizeHandle,
        start: PixelPoint,
        min: f64,
        capture: PointerSubscription,
    ) -> Result<Self> {
        let el = overlay
            .get(element)
            .ok_or(SessionError::UnknownElement(element))?;
        tracing::debug!(element = element.0, page = el.page, ?handle, "resize started");
        Ok(Self {
            element,
            page: el.page,
            handle,
            start,
            origin: el.rect,
            min,
            _capture: capture,
        })
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn update(&self, overlay: &mut Overlay, point: PixelPoint) -> Result<()> {
        overlay.resize_to(self.element, self.target(point))
    }

    pub fn cancel(self, overlay: &mut Overlay) {
        if let Err(err) = overlay.resize_to(self.element, self.origin) {
            tracing::debug!(error = %err, "resized element vanished before cancel");
        }
        tracing::debug!(element = self.element.0, "resize cancelled");
    }

    pub fn finish<E: DocumentEngine + ?Sized>(
        self,
        ctx: &mut EditContext<'_, E>,
        point: PixelPoint,
    ) -> Result<Option<Action>> {
        let target = self.target(point);
        let mut snapshot = ctx
            .overlay
            .get(self.element)
            .cloned()
            .ok_or(SessionError::UnknownElement(self.element))?;
        snapshot.rect = self.origin;

        ctx.overlay.resize_to(self.element, target)?;
        if target == self.origin {
            return Ok(None);
        }
        ctx.replace("resize", self.element, snapshot)
    }

    fn target(&self, point: PixelPoint) -> PixelRect {
        resize_rect(
            self.origin,
            self.handle,
            point.x - self.start.x,
            point.y - self.start.y,
            self.min,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MIN: f64 = 10.0;

    fn rect() -> PixelRect {
        PixelRect::new(100.0, 100.0, 200.0, 40.0)
    }

    #[test]
    fn test_northwest_inward_keeps_southeast_corner() {
        let resized = resize_rect(rect(), ResizeHandle::NorthWest, 20.0, 10.0, MIN);
        assert_eq!(resized, PixelRect::new(120.0, 110.0, 180.0, 30.0));
        assert_eq!(resized.right(), rect().right());
        assert_eq!(resized.bottom(), rect().bottom());
    }

    #[test]
    fn test_northwest_past_opposite_edge_clamps() {
        let resized = resize_rect(rect(), ResizeHandle::NorthWest, 500.0, 0.0, MIN);
        assert_eq!(resized.width, MIN);
        assert_eq!(resized.x, rect().right() - MIN);
        assert_eq!(resized.right(), rect().right());
    }

    #[test]
    fn test_edge_handles_move_one_axis() {
        let resized = resize_rect(rect(), ResizeHandle::East, 30.0, 99.0, MIN);
        assert_eq!(resized, PixelRect::new(100.0, 100.0, 230.0, 40.0));

        let resized = resize_rect(rect(), ResizeHandle::North, 99.0, -20.0, MIN);
        assert_eq!(resized, PixelRect::new(100.0, 80.0, 200.0, 60.0));
    }

    #[test]
    fn test_south_clamps_from_top() {
        let resized = resize_rect(rect(), ResizeHandle::South, 0.0, -100.0, MIN);
        assert_eq!(resized, PixelRect::new(100.0, 100.0, 200.0, MIN));
    }
}
