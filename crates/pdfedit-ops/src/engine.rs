//! In-process document edit engine
//!
//! Owns the loaded document and the live operation log. Every primitive is
//! page-scoped with 1-based page numbers and validates its input before an
//! operation is stored, so a rejected call never leaves a partial record.

use serde::Serialize;

use crate::error::EngineError;
use crate::operations::{EditOperation, OpId, OperationLog, PdfRect, TextStyle};
use crate::pages::PdfPages;

/// Edit engine for a single PDF document
#[derive(Debug, Clone)]
pub struct EditEngine {
    document_name: String,
    pages: PdfPages,
    operations: OperationLog,
}

#[derive(Serialize)]
struct ExportManifest<'a> {
    document: &'a str,
    page_count: u32,
    operations: &'a [EditOperation],
}

impl EditEngine {
    pub fn new(name: &str, bytes: &[u8]) -> Result<Self, EngineError> {
        let pages = PdfPages::load(bytes)?;
        tracing::debug!(
            document = name,
            page_count = pages.page_count(),
            signed = pages.is_signed(),
            "edit engine loaded document"
        );
        Ok(Self {
            document_name: name.to_string(),
            pages,
            operations: OperationLog::new(),
        })
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn page_count(&self) -> u32 {
        self.pages.page_count()
    }

    pub fn pages(&self) -> &PdfPages {
        &self.pages
    }

    pub fn is_signed(&self) -> bool {
        self.pages.is_signed()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_text(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        text: &str,
        font_size: f64,
        color: &str,
        font_name: Option<String>,
        is_italic: bool,
        is_bold: bool,
    ) -> Result<OpId, EngineError> {
        self.store(EditOperation::AddText {
            id: 0,
            page,
            rect: PdfRect::new(x, y, width, height),
            text: text.to_string(),
            style: TextStyle {
                font_size,
                color: color.to_string(),
                font_name,
                is_italic,
                is_bold,
            },
        })
    }

    /// Add a colored rectangle to cover/redact content.
    /// `color` defaults to white.
    pub fn add_white_rect(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Option<String>,
    ) -> Result<OpId, EngineError> {
        self.store(EditOperation::AddWhiteRect {
            id: 0,
            page,
            rect: PdfRect::new(x, y, width, height),
            color: color.unwrap_or_else(|| "#FFFFFF".to_string()),
        })
    }

    pub fn add_checkbox(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        checked: bool,
    ) -> Result<OpId, EngineError> {
        self.store(EditOperation::AddCheckbox {
            id: 0,
            page,
            rect: PdfRect::new(x, y, width, height),
            checked,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_highlight(
        &mut self,
        page: u32,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: &str,
        opacity: f64,
    ) -> Result<OpId, EngineError> {
        self.store(EditOperation::AddHighlight {
            id: 0,
            page,
            rect: PdfRect::new(x, y, width, height),
            color: color.to_string(),
            opacity,
        })
    }

    /// Replace text at a position (cover the original + overlay new text)
    #[allow(clippy::too_many_arguments)]
    pub fn replace_text(
        &mut self,
        page: u32,
        original_rect: PdfRect,
        replacement_rect: PdfRect,
        original_text: &str,
        new_text: &str,
        style: TextStyle,
    ) -> Result<OpId, EngineError> {
        self.store(EditOperation::ReplaceText {
            id: 0,
            page,
            original_rect,
            replacement_rect,
            original_text: original_text.to_string(),
            new_text: new_text.to_string(),
            style,
        })
    }

    pub fn remove_operation(&mut self, id: OpId) -> Result<(), EngineError> {
        if self.is_signed() {
            return Err(EngineError::SignedDocument);
        }
        self.operations
            .remove(id)
            .map(|_| ())
            .ok_or(EngineError::NotFound(id))
    }

    pub fn get_operation(&self, id: OpId) -> Option<&EditOperation> {
        self.operations.get_operation(id)
    }

    /// Serialized record of a live operation
    pub fn get_operation_json(&self, id: OpId) -> Result<String, EngineError> {
        let op = self.get_operation(id).ok_or(EngineError::NotFound(id))?;
        op.to_json()
            .map_err(|e| EngineError::SerializationError(e.to_string()))
    }

    pub fn operations(&self) -> &[EditOperation] {
        self.operations.operations()
    }

    pub fn has_changes(&self) -> bool {
        !self.operations.is_empty()
    }

    /// Edit manifest consumed by the flattening step
    pub fn export(&self) -> Result<Vec<u8>, EngineError> {
        if self.is_signed() {
            return Err(EngineError::SignedDocument);
        }
        let manifest = ExportManifest {
            document: &self.document_name,
            page_count: self.page_count(),
            operations: self.operations.operations(),
        };
        serde_json::to_vec(&manifest).map_err(|e| EngineError::SerializationError(e.to_string()))
    }

    fn store(&mut self, op: EditOperation) -> Result<OpId, EngineError> {
        self.validate(&op)?;
        let id = self.operations.add(op);
        tracing::trace!(handle = id, "operation stored");
        Ok(id)
    }

    fn validate(&self, op: &EditOperation) -> Result<(), EngineError> {
        if self.is_signed() {
            return Err(EngineError::SignedDocument);
        }

        let page = op.page();
        if page == 0 || page > self.page_count() {
            return Err(EngineError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            });
        }

        let mut rects = vec![op.rect()];
        if let EditOperation::ReplaceText { original_rect, .. } = op {
            rects.push(*original_rect);
        }
        for rect in rects {
            if !rect.is_finite() {
                return Err(EngineError::InvalidGeometry(format!(
                    "non-finite rectangle {:?}",
                    rect
                )));
            }
            if rect.width <= 0.0 || rect.height <= 0.0 {
                return Err(EngineError::InvalidGeometry(format!(
                    "empty rectangle {}x{}",
                    rect.width, rect.height
                )));
            }
        }

        if let EditOperation::AddHighlight { opacity, .. } = op {
            if !(0.0..=1.0).contains(opacity) {
                return Err(EngineError::InvalidOpacity(*opacity));
            }
        }

        Ok(())
    }
}
