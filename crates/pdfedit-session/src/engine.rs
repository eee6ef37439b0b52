//! Collaborator interfaces
//!
//! The edit layer never mutates documents itself. It talks to a
//! `DocumentEngine` that owns operations and to a `PageRenderer` that knows
//! page geometry. Both are implemented here for the in-process types in
//! `pdfedit-ops`.

use pdfedit_ops::{EditEngine, EditOperation, EngineError, OpId, PdfPages, PositionedText, TextStyle};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{DocRect, Viewport};

/// Operation primitives of the document edit engine. All page numbers are
/// 1-based. Calls are synchronous and may be slow.
pub trait DocumentEngine {
    fn add_text(
        &mut self,
        page: u32,
        rect: DocRect,
        text: &str,
        style: &TextStyle,
    ) -> std::result::Result<OpId, EngineError>;

    fn add_white_rect(
        &mut self,
        page: u32,
        rect: DocRect,
        color: &str,
    ) -> std::result::Result<OpId, EngineError>;

    fn add_checkbox(
        &mut self,
        page: u32,
        rect: DocRect,
        checked: bool,
    ) -> std::result::Result<OpId, EngineError>;

    fn add_highlight(
        &mut self,
        page: u32,
        rect: DocRect,
        color: &str,
        opacity: f64,
    ) -> std::result::Result<OpId, EngineError>;

    #[allow(clippy::too_many_arguments)]
    fn replace_text(
        &mut self,
        page: u32,
        old_rect: DocRect,
        new_rect: DocRect,
        old_text: &str,
        new_text: &str,
        style: &TextStyle,
    ) -> std::result::Result<OpId, EngineError>;

    fn remove_operation(&mut self, handle: OpId) -> std::result::Result<(), EngineError>;

    /// Serialized record of a live operation
    fn operation_json(&self, handle: OpId) -> std::result::Result<String, EngineError>;

    fn export(&self) -> std::result::Result<Vec<u8>, EngineError>;

    fn is_signed(&self) -> bool;
}

/// Issue the create primitive matching `op`. The record's own id is ignored;
/// the engine assigns a fresh handle.
pub fn issue<E: DocumentEngine + ?Sized>(
    engine: &mut E,
    op: &EditOperation,
) -> std::result::Result<OpId, EngineError> {
    match op {
        EditOperation::AddText {
            page,
            rect,
            text,
            style,
            ..
        } => engine.add_text(*page, *rect, text, style),
        EditOperation::AddWhiteRect {
            page, rect, color, ..
        } => engine.add_white_rect(*page, *rect, color),
        EditOperation::AddCheckbox {
            page,
            rect,
            checked,
            ..
        } => engine.add_checkbox(*page, *rect, *checked),
        EditOperation::AddHighlight {
            page,
            rect,
            color,
            opacity,
            ..
        } => engine.add_highlight(*page, *rect, color, *opacity),
        EditOperation::ReplaceText {
            page,
            original_rect,
            replacement_rect,
            original_text,
            new_text,
            style,
            ..
        } => engine.replace_text(
            *page,
            *original_rect,
            *replacement_rect,
            original_text,
            new_text,
            style,
        ),
    }
}

/// Fetch and decode the engine's record for `handle`
pub fn fetch_record<E: DocumentEngine + ?Sized>(engine: &E, handle: OpId) -> Result<EditOperation> {
    let json = engine.operation_json(handle)?;
    Ok(EditOperation::from_json(&json)?)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FontInfo {
    pub font_name: Option<String>,
    pub font_size: f64,
    #[serde(default)]
    pub is_bold: bool,
    #[serde(default)]
    pub is_italic: bool,
}

/// A run of existing page text with its position in document space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub rect: DocRect,
    pub text: String,
    pub font: FontInfo,
}

impl From<PositionedText> for TextRun {
    fn from(run: PositionedText) -> Self {
        Self {
            rect: run.rect,
            text: run.text,
            font: FontInfo {
                font_name: run.font_name,
                font_size: run.font_size,
                is_bold: run.is_bold,
                is_italic: run.is_italic,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedPage {
    pub page: u32,
    pub viewport: Viewport,
}

/// Page rendering collaborator. Rasterization onto a surface is the host's
/// concern; the edit layer only consumes the resulting geometry.
pub trait PageRenderer {
    fn load_document(&mut self, bytes: &[u8]) -> std::result::Result<u32, EngineError>;

    fn render_page(&mut self, page: u32, scale: f64)
        -> std::result::Result<RenderedPage, EngineError>;

    /// Viewport of `page` at scale 1.0
    fn page_info(&self, page: u32) -> std::result::Result<Viewport, EngineError>;

    /// Read-only text runs, used to seed styles when editing over existing text
    fn extract_text_with_positions(
        &self,
        page: u32,
    ) -> std::result::Result<Vec<TextRun>, EngineError>;
}

impl DocumentEngine for EditEngine {
    fn add_text(
        &mut self,
        page: u32,
        rect: DocRect,
        text: &str,
        style: &TextStyle,
    ) -> std::result::Result<OpId, EngineError> {
        EditEngine::add_text(
            self,
            page,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            text,
            style.font_size,
            &style.color,
            style.font_name.clone(),
            style.is_italic,
            style.is_bold,
        )
    }

    fn add_white_rect(
        &mut self,
        page: u32,
        rect: DocRect,
        color: &str,
    ) -> std::result::Result<OpId, EngineError> {
        EditEngine::add_white_rect(
            self,
            page,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            Some(color.to_string()),
        )
    }

    fn add_checkbox(
        &mut self,
        page: u32,
        rect: DocRect,
        checked: bool,
    ) -> std::result::Result<OpId, EngineError> {
        EditEngine::add_checkbox(self, page, rect.x, rect.y, rect.width, rect.height, checked)
    }

    fn add_highlight(
        &mut self,
        page: u32,
        rect: DocRect,
        color: &str,
        opacity: f64,
    ) -> std::result::Result<OpId, EngineError> {
        EditEngine::add_highlight(
            self,
            page,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            color,
            opacity,
        )
    }

    fn replace_text(
        &mut self,
        page: u32,
        old_rect: DocRect,
        new_rect: DocRect,
        old_text: &str,
        new_text: &str,
        style: &TextStyle,
    ) -> std::result::Result<OpId, EngineError> {
        EditEngine::replace_text(
            self,
            page,
            old_rect,
            new_rect,
            old_text,
            new_text,
            style.clone(),
        )
    }

    fn remove_operation(&mut self, handle: OpId) -> std::result::Result<(), EngineError> {
        EditEngine::remove_operation(self, handle)
    }

    fn operation_json(&self, handle: OpId) -> std::result::Result<String, EngineError> {
        self.get_operation_json(handle)
    }

    fn export(&self) -> std::result::Result<Vec<u8>, EngineError> {
        EditEngine::export(self)
    }

    fn is_signed(&self) -> bool {
        EditEngine::is_signed(self)
    }
}

/// Page renderer backed by lopdf. It reports page geometry and the text runs
/// of each content stream; rasterizing is left to the host.
#[derive(Debug, Clone, Default)]
pub struct MetricsRenderer {
    pages: Option<PdfPages>,
}

impl MetricsRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn pages(&self) -> std::result::Result<&PdfPages, EngineError> {
        self.pages
            .as_ref()
            .ok_or_else(|| EngineError::ParseError("no document loaded".to_string()))
    }
}

impl PageRenderer for MetricsRenderer {
    fn load_document(&mut self, bytes: &[u8]) -> std::result::Result<u32, EngineError> {
        let pages = PdfPages::load(bytes)?;
        let page_count = pages.page_count();
        self.pages = Some(pages);
        Ok(page_count)
    }

    fn render_page(
        &mut self,
        page: u32,
        scale: f64,
    ) -> std::result::Result<RenderedPage, EngineError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(EngineError::InvalidGeometry(format!(
                "render scale must be positive, got {}",
                scale
            )));
        }
        let base = self.page_info(page)?;
        Ok(RenderedPage {
            page,
            viewport: Viewport { scale, ..base },
        })
    }

    fn page_info(&self, page: u32) -> std::result::Result<Viewport, EngineError> {
        let metrics = self.pages()?.metrics(page)?;
        Ok(Viewport::new(1.0, metrics.width, metrics.height))
    }

    fn extract_text_with_positions(
        &self,
        page: u32,
    ) -> std::result::Result<Vec<TextRun>, EngineError> {
        let runs = self.pages()?.text_runs(page)?;
        Ok(runs.into_iter().map(TextRun::from).collect())
    }
}
