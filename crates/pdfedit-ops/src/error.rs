use thiserror::Error;

use crate::operations::OpId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Opacity {0} is outside 0..=1")]
    InvalidOpacity(f64),

    #[error("Operation {0} not found")]
    NotFound(OpId),

    #[error("Document is signed. Editing would invalidate the signature.")]
    SignedDocument,

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
