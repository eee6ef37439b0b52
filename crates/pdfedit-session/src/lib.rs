//! Edit session orchestration
//!
//! Keeps an interactive overlay of annotations in sync with the operations of
//! a document edit engine.
//!
//! - `geometry`: pixel space ↔ document space transform and the viewport cache
//! - `history`: actions with grouped undo/redo over engine handles
//! - `overlay`: overlay elements bound 1:1 to operation handles
//! - `controllers`: draw, move, resize and in-place text edit gestures
//! - `tools`: the closed tool set and pointer routing
//! - `overlap`: advisory redaction overlap warnings
//! - `session`: `EditSession`, the single owner of all of the above

pub mod config;
pub mod controllers;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod history;
pub mod notice;
pub mod overlap;
pub mod overlay;
pub mod session;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{BoxSize, SessionConfig};
pub use controllers::{resize_rect, GestureOutcome, Key, PointerCapture, ResizeHandle};
pub use engine::{
    fetch_record, issue, DocumentEngine, FontInfo, MetricsRenderer, PageRenderer, RenderedPage,
    TextRun,
};
pub use error::{ErrorClass, Result, SessionError};
pub use geometry::{to_doc_space, to_pixel_space, DocRect, PixelPoint, PixelRect, Viewport};
pub use history::{Action, ActionLog, Reverted};
pub use notice::{Notice, NoticeLevel};
pub use overlay::{ElementContent, ElementId, Overlay, OverlayElement};
pub use session::EditSession;
pub use tools::{PointerTarget, Tool};

// Operation records are part of this crate's API
pub use pdfedit_ops::{EditOperation, EngineError, OpId, OpKind, TextStyle};
