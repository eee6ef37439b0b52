//! Coordinate transformation between pixel space and PDF point space
//!
//! Pixel space has its origin at the top-left of the rendered page surface
//! with Y growing downward. Document space has its origin at the bottom-left
//! of the page with Y growing upward, in points.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

pub use pdfedit_ops::PdfRect as DocRect;

/// Per-page scale and point-space dimensions, produced when a page is rendered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Pixels per point. Must be positive; not validated here.
    pub scale: f64,
    pub page_width_pts: f64,
    pub page_height_pts: f64,
}

impl Viewport {
    pub fn new(scale: f64, page_width_pts: f64, page_height_pts: f64) -> Self {
        Self {
            scale,
            page_width_pts,
            page_height_pts,
        }
    }

    /// Size of the rendered surface in pixels
    pub fn surface_size(&self) -> (f64, f64) {
        (
            self.page_width_pts * self.scale,
            self.page_height_pts * self.scale,
        )
    }
}

/// Viewports of rendered pages, kept for the lifetime of a session
#[derive(Debug, Clone, Default)]
pub struct ViewportCache {
    pages: HashMap<u32, Viewport>,
}

impl ViewportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache the viewport of a rendered page, returning the one it replaces
    pub fn insert(&mut self, page: u32, viewport: Viewport) -> Option<Viewport> {
        self.pages.insert(page, viewport)
    }

    pub fn get(&self, page: u32) -> Result<Viewport> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(SessionError::MissingViewport(page))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle on a rendered page surface (origin top-left, Y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanned by two corners, in any order
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Rectangle of the given size centred on `center`
    pub fn centered_on(center: PixelPoint, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn contains(&self, point: PixelPoint) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Axis-aligned intersection test; touching edges do not intersect.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn meets_min_size(&self, min: f64) -> bool {
        self.width >= min && self.height >= min
    }
}

/// Convert a pixel rectangle to document space.
///
/// The pixel rect's bottom edge becomes the document rect's origin, measured
/// up from the page's bottom edge.
pub fn to_doc_space(viewport: &Viewport, rect: &PixelRect) -> DocRect {
    let scale = viewport.scale;
    DocRect {
        x: rect.x / scale,
        y: viewport.page_height_pts - (rect.y + rect.height) / scale,
        width: rect.width / scale,
        height: rect.height / scale,
    }
}

/// Convert a document rectangle to pixel space
pub fn to_pixel_space(viewport: &Viewport, rect: &DocRect) -> PixelRect {
    let scale = viewport.scale;
    PixelRect {
        x: rect.x * scale,
        y: (viewport.page_height_pts - rect.y - rect.height) * scale,
        width: rect.width * scale,
        height: rect.height * scale,
    }
}

/// Re-express a pixel rect rendered under `from` in the pixel space of `to`
pub fn rescale(from: &Viewport, to: &Viewport, rect: &PixelRect) -> PixelRect {
    to_pixel_space(to, &to_doc_space(from, rect))
}
