use pdfedit_ops::EngineError;
use thiserror::Error;

use crate::overlay::ElementId;

#[derive(Error, Debug)]
pub enum SessionError {
    /// A controller or caller issued calls out of order
    #[error("Sequencing error: {0}")]
    Sequencing(String),

    #[error("No viewport cached for page {0}; render the page first")]
    MissingViewport(u32),

    #[error("Engine rejected the edit: {0}")]
    Engine(#[from] EngineError),

    #[error("Failed to decode operation record: {0}")]
    RecordDecode(#[from] serde_json::Error),

    #[error("Unknown overlay element {0:?}")]
    UnknownElement(ElementId),
}

/// How a failure is surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Controller bug; the gesture is aborted silently
    Sequencing,
    /// Missing or unusable page geometry; the gesture is aborted silently
    Geometry,
    /// The engine failed; shown to the user as a notice
    Engine,
}

impl SessionError {
    pub fn sequencing(message: impl Into<String>) -> Self {
        SessionError::Sequencing(message.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            SessionError::Sequencing(_)
            | SessionError::UnknownElement(_) => ErrorClass::Sequencing,
            SessionError::MissingViewport(_) => ErrorClass::Geometry,
            SessionError::Engine(_) | SessionError::RecordDecode(_) => ErrorClass::Engine,
        }
    }

    pub fn is_user_visible(&self) -> bool {
        self.class() == ErrorClass::Engine
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
