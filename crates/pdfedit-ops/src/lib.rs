//! PDF edit operations
//!
//! This crate holds the operation records shared by the edit layer and an
//! in-process engine that stores them against a document loaded with lopdf.
//!
//! - `operations`: the `EditOperation` tagged union and the live `OperationLog`
//! - `engine`: `EditEngine`, the page-scoped create/remove/export primitives
//! - `pages`: page count, page dimensions and signature detection
//! - `text`: positioned text runs read from page content streams

pub mod engine;
pub mod error;
pub mod operations;
pub mod pages;
pub mod text;

pub use engine::EditEngine;
pub use error::EngineError;
pub use operations::{EditOperation, OpId, OpKind, OperationLog, PdfRect, TextStyle};
pub use pages::{has_signatures, PageMetrics, PageOrientation, PdfPages};
pub use text::{extract_page_text, PositionedText};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, EngineError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| EngineError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
