//! Rubber-band rectangle drawing

use crate::config::SessionConfig;
use crate::engine::DocumentEngine;
use crate::geometry::{PixelPoint, PixelRect};
use crate::overlay::{ElementContent, Overlay};
use crate::tools::Tool;

use super::{EditContext, PointerSubscription};

/// What a finished draw turns into
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEnd {
    /// Too small to keep
    Discarded,
    /// Create an element with this content
    Place {
        label: &'static str,
        rect: PixelRect,
        content: ElementContent,
    },
    /// Open a text editor over this rectangle
    Text(PixelRect),
}

#[derive(Debug)]
pub struct DrawGesture {
    page: u32,
    tool: Tool,
    origin: PixelPoint,
    current: PixelPoint,
    _capture: PointerSubscription,
}

impl DrawGesture {
    pub fn start(
        overlay: &mut Overlay,
        page: u32,
        tool: Tool,
        origin: PixelPoint,
        capture: PointerSubscription,
    ) -> Self {
        let gesture = Self {
            page,
            tool,
            origin,
            current: origin,
            _capture: capture,
        };
        overlay.set_preview(page, gesture.rect());
        tracing::debug!(page, tool = %tool, "draw started");
        gesture
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn rect(&self) -> PixelRect {
        PixelRect::from_corners(self.origin, self.current)
    }

    pub fn update(&mut self, overlay: &mut Overlay, point: PixelPoint) {
        self.current = point;
        overlay.set_preview(self.page, self.rect());
    }

    pub fn cancel(self, overlay: &mut Overlay) {
        overlay.clear_preview();
        tracing::debug!(page = self.page, "draw cancelled");
    }

    /// End the drag at `point`. The preview is discarded either way.
    pub fn finish<E: DocumentEngine + ?Sized>(
        mut self,
        ctx: &mut EditContext<'_, E>,
        point: PixelPoint,
    ) -> DrawEnd {
        self.current = point;
        ctx.overlay.clear_preview();
        let end = self.resolve(ctx.config);
        tracing::debug!(page = self.page, tool = %self.tool, end = ?end, "draw finished");
        end
    }

    fn resolve(&self, config: &SessionConfig) -> DrawEnd {
        let rect = self.rect();
        let big_enough = rect.meets_min_size(config.min_size_px);
        let default_box = PixelRect::new(
            self.origin.x,
            self.origin.y,
            config.default_text_box.width.max(config.min_size_px),
            config.default_text_box.height.max(config.min_size_px),
        );

        match (self.tool, big_enough) {
            (Tool::Redact, true) => DrawEnd::Place {
                label: "redact",
                rect,
                content: ElementContent::Opaque {
                    color: config.redaction_color.clone(),
                },
            },
            (Tool::Highlight, true) => DrawEnd::Place {
                label: "highlight",
                rect,
                content: ElementContent::Highlight {
                    color: config.highlight_color.clone(),
                    opacity: config.highlight_opacity,
                },
            },
            (Tool::TextBox, true) => DrawEnd::Text(rect),
            // A click with the redact or text tool drops a default-sized text box
            (Tool::Redact | Tool::TextBox, false) => DrawEnd::Text(default_box),
            _ => DrawEnd::Discarded,
        }
    }
}
