//! Operation records for PDF edits
//!
//! Every edit the engine knows about is one `EditOperation`, identified by an
//! `OpId` handle. Records are immutable once stored: changing an annotation
//! means removing its record and adding a new one.

use serde::{Deserialize, Serialize};

pub type OpId = u64;

/// Rectangle in PDF point space (origin bottom-left, Y grows upward)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PdfRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Axis-aligned intersection test; touching edges do not intersect.
    pub fn intersects(&self, other: &PdfRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: String,
    /// Font family as reported by the renderer ("serif", "Times-Roman", ...)
    #[serde(default)]
    pub font_name: Option<String>,
    #[serde(default)]
    pub is_italic: bool,
    #[serde(default)]
    pub is_bold: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            color: "#000000".to_string(),
            font_name: None,
            is_italic: false,
            is_bold: false,
        }
    }
}

/// Closed set of operation kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OpKind {
    InsertText,
    OpaqueRect,
    Checkbox,
    Highlight,
    ReplaceText,
}

impl OpKind {
    /// Kinds whose overlay element carries editable text
    pub fn is_text_bearing(&self) -> bool {
        matches!(self, OpKind::InsertText | OpKind::ReplaceText)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EditOperation {
    AddText {
        id: OpId,
        page: u32,
        rect: PdfRect,
        text: String,
        style: TextStyle,
    },
    AddHighlight {
        id: OpId,
        page: u32,
        rect: PdfRect,
        color: String,
        opacity: f64,
    },
    AddCheckbox {
        id: OpId,
        page: u32,
        rect: PdfRect,
        checked: bool,
    },
    ReplaceText {
        id: OpId,
        page: u32,
        original_rect: PdfRect,
        replacement_rect: PdfRect,
        original_text: String,
        new_text: String,
        style: TextStyle,
    },
    /// Opaque rectangle covering content (white-out or black redaction)
    AddWhiteRect {
        id: OpId,
        page: u32,
        rect: PdfRect,
        color: String,
    },
}

impl EditOperation {
    pub fn id(&self) -> OpId {
        match self {
            EditOperation::AddText { id, .. }
            | EditOperation::AddHighlight { id, .. }
            | EditOperation::AddCheckbox { id, .. }
            | EditOperation::ReplaceText { id, .. }
            | EditOperation::AddWhiteRect { id, .. } => *id,
        }
    }

    pub fn set_id(&mut self, new_id: OpId) {
        match self {
            EditOperation::AddText { id, .. }
            | EditOperation::AddHighlight { id, .. }
            | EditOperation::AddCheckbox { id, .. }
            | EditOperation::ReplaceText { id, .. }
            | EditOperation::AddWhiteRect { id, .. } => *id = new_id,
        }
    }

    pub fn page(&self) -> u32 {
        match self {
            EditOperation::AddText { page, .. }
            | EditOperation::AddHighlight { page, .. }
            | EditOperation::AddCheckbox { page, .. }
            | EditOperation::ReplaceText { page, .. }
            | EditOperation::AddWhiteRect { page, .. } => *page,
        }
    }

    /// The rectangle the operation visibly occupies.
    /// For `ReplaceText` this is the replacement rect.
    pub fn rect(&self) -> PdfRect {
        match self {
            EditOperation::AddText { rect, .. }
            | EditOperation::AddHighlight { rect, .. }
            | EditOperation::AddCheckbox { rect, .. }
            | EditOperation::AddWhiteRect { rect, .. } => *rect,
            EditOperation::ReplaceText {
                replacement_rect, ..
            } => *replacement_rect,
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            EditOperation::AddText { .. } => OpKind::InsertText,
            EditOperation::AddHighlight { .. } => OpKind::Highlight,
            EditOperation::AddCheckbox { .. } => OpKind::Checkbox,
            EditOperation::ReplaceText { .. } => OpKind::ReplaceText,
            EditOperation::AddWhiteRect { .. } => OpKind::OpaqueRect,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Ordered store of live operations with monotonic id allocation.
/// Ids are never reused, even after removal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationLog {
    next_id: OpId,
    operations: Vec<EditOperation>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut op: EditOperation) -> OpId {
        let id = self.next_id;
        self.next_id += 1;
        op.set_id(id);
        self.operations.push(op);
        id
    }

    pub fn remove(&mut self, id: OpId) -> Option<EditOperation> {
        let pos = self.operations.iter().position(|op| op.id() == id)?;
        Some(self.operations.remove(pos))
    }

    pub fn get_operation(&self, id: OpId) -> Option<&EditOperation> {
        self.operations.iter().find(|op| op.id() == id)
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.operations
    }

    pub fn operations_for_page(&self, page: u32) -> Vec<&EditOperation> {
        self.operations
            .iter()
            .filter(|op| op.page() == page)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
