//! Shared fixtures for unit tests

use std::collections::HashMap;

use lopdf::{dictionary, Document, Object};
use pdfedit_ops::{EditEngine, EngineError, OpId, TextStyle};

use crate::engine::{DocumentEngine, PageRenderer, RenderedPage, TextRun};
use crate::geometry::{DocRect, Viewport};

/// In-memory PDF with `page_count` US Letter pages
pub fn pdf_with_pages(page_count: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..page_count)
        .map(|_| {
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }))
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn engine(page_count: u32) -> EditEngine {
    EditEngine::new("fixture.pdf", &pdf_with_pages(page_count)).unwrap()
}

/// Engine wrapper whose primitives can be made to fail on demand
#[derive(Debug)]
pub struct FlakyEngine {
    inner: EditEngine,
    fail_creates: bool,
    fail_next_create: bool,
    fail_removes: bool,
}

impl FlakyEngine {
    pub fn new(inner: EditEngine) -> Self {
        Self {
            inner,
            fail_creates: false,
            fail_next_create: false,
            fail_removes: false,
        }
    }

    pub fn fail_creates(&mut self, fail: bool) {
        self.fail_creates = fail;
    }

    /// Fail only the next create call
    pub fn fail_next_create(&mut self) {
        self.fail_next_create = true;
    }

    pub fn fail_removes(&mut self, fail: bool) {
        self.fail_removes = fail;
    }

    pub fn inner(&self) -> &EditEngine {
        &self.inner
    }

    fn check_create(&mut self) -> Result<(), EngineError> {
        if self.fail_creates || std::mem::take(&mut self.fail_next_create) {
            return Err(EngineError::InvalidGeometry("injected failure".to_string()));
        }
        Ok(())
    }
}

impl DocumentEngine for FlakyEngine {
    fn add_text(&mut self, page: u32, rect: DocRect, text: &str, style: &TextStyle) -> Result<OpId, EngineError> {
        self.check_create()?;
        DocumentEngine::add_text(&mut self.inner, page, rect, text, style)
    }

    fn add_white_rect(&mut self, page: u32, rect: DocRect, color: &str) -> Result<OpId, EngineError> {
        self.check_create()?;
        DocumentEngine::add_white_rect(&mut self.inner, page, rect, color)
    }

    fn add_checkbox(&mut self, page: u32, rect: DocRect, checked: bool) -> Result<OpId, EngineError> {
        self.check_create()?;
        DocumentEngine::add_checkbox(&mut self.inner, page, rect, checked)
    }

    fn add_highlight(
        &mut self,
        page: u32,
        rect: DocRect,
        color: &str,
        opacity: f64,
    ) -> Result<OpId, EngineError> {
        self.check_create()?;
        DocumentEngine::add_highlight(&mut self.inner, page, rect, color, opacity)
    }

    fn replace_text(
        &mut self,
        page: u32,
        old_rect: DocRect,
        new_rect: DocRect,
        old_text: &str,
        new_text: &str,
        style: &TextStyle,
    ) -> Result<OpId, EngineError> {
        self.check_create()?;
        DocumentEngine::replace_text(&mut self.inner, page, old_rect, new_rect, old_text, new_text, style)
    }

    fn remove_operation(&mut self, handle: OpId) -> Result<(), EngineError> {
        if self.fail_removes {
            return Err(EngineError::NotFound(handle));
        }
        DocumentEngine::remove_operation(&mut self.inner, handle)
    }

    fn operation_json(&self, handle: OpId) -> Result<String, EngineError> {
        self.inner.operation_json(handle)
    }

    fn export(&self) -> Result<Vec<u8>, EngineError> {
        DocumentEngine::export(&self.inner)
    }

    fn is_signed(&self) -> bool {
        self.inner.is_signed()
    }
}

/// Renderer with fixed Letter pages and scripted text runs
#[derive(Debug, Default)]
pub struct FakeRenderer {
    page_count: u32,
    runs: HashMap<u32, Vec<TextRun>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runs(mut self, page: u32, runs: Vec<TextRun>) -> Self {
        self.runs.insert(page, runs);
        self
    }

    fn check_page(&self, page: u32) -> Result<(), EngineError> {
        if page == 0 || page > self.page_count {
            return Err(EngineError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        Ok(())
    }
}

impl PageRenderer for FakeRenderer {
    fn load_document(&mut self, bytes: &[u8]) -> Result<u32, EngineError> {
        self.page_count = pdfedit_ops::get_page_count(bytes)?;
        Ok(self.page_count)
    }

    fn render_page(&mut self, page: u32, scale: f64) -> Result<RenderedPage, EngineError> {
        self.check_page(page)?;
        Ok(RenderedPage {
            page,
            viewport: Viewport::new(scale, 612.0, 792.0),
        })
    }

    fn page_info(&self, page: u32) -> Result<Viewport, EngineError> {
        self.check_page(page)?;
        Ok(Viewport::new(1.0, 612.0, 792.0))
    }

    fn extract_text_with_positions(&self, page: u32) -> Result<Vec<TextRun>, EngineError> {
        self.check_page(page)?;
        Ok(self.runs.get(&page).cloned().unwrap_or_default())
    }
}
