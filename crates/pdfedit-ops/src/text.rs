//! Positioned text extraction
//!
//! Walks a page's content stream and reports every text-showing operator as
//! a run in PDF point space. Glyph widths are not read from the embedded font
//! programs, so run widths are estimated from the font size.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

use crate::error::EngineError;
use crate::operations::PdfRect;
use crate::pages::{inherited, resolve};

/// Average glyph advance as a fraction of the font size
const AVERAGE_GLYPH_WIDTH: f64 = 0.5;
/// Part of the font size that sits below the baseline
const DESCENT: f64 = 0.2;
/// TJ adjustments beyond this many thousandths of an em read as a word gap
const WORD_GAP: f64 = 100.0;

/// One run of existing page text
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PositionedText {
    pub rect: PdfRect,
    pub text: String,
    /// BaseFont of the run, without any subset prefix
    pub font_name: Option<String>,
    /// Font size in points after the text matrix is applied
    pub font_size: f64,
    pub is_bold: bool,
    pub is_italic: bool,
}

/// Text runs on `page_num` (1-indexed), in content stream order
pub fn extract_page_text(doc: &Document, page_num: u32) -> Result<Vec<PositionedText>, EngineError> {
    let pages = doc.get_pages();
    let page_id = *pages.get(&page_num).ok_or(EngineError::PageOutOfRange {
        page: page_num,
        page_count: pages.len() as u32,
    })?;
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|_| EngineError::ParseError(format!("Page {} is not a dictionary", page_num)))?;

    let content = doc
        .get_page_content(page_id)
        .map_err(|e| EngineError::ParseError(e.to_string()))?;
    if content.is_empty() {
        return Ok(Vec::new());
    }
    let content = Content::decode(&content).map_err(|e| EngineError::ParseError(e.to_string()))?;

    let mut state = TextState::default();
    let mut runs = Vec::new();
    for op in &content.operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "BT" => state.begin(),
            "Tf" => {
                if let [Object::Name(resource), size, ..] = operands {
                    state.face = FontFace::lookup(doc, page, resource);
                    state.font_size = number(size).unwrap_or(state.font_size);
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    state.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let [tx, ty, ..] = operands {
                    let (tx, ty) = (number(tx).unwrap_or(0.0), number(ty).unwrap_or(0.0));
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.move_line(tx, ty);
                }
            }
            "Tm" => {
                let values: Vec<f64> = operands.iter().filter_map(number).collect();
                if let [a, b, c, d, e, f] = values[..] {
                    state.line = Matrix([a, b, c, d, e, f]);
                    state.text = state.line;
                }
            }
            "T*" => state.next_line(),
            "Tj" | "TJ" => {
                if let Some(operand) = operands.first() {
                    runs.extend(state.show(operand));
                }
            }
            "'" => {
                state.next_line();
                if let Some(operand) = operands.first() {
                    runs.extend(state.show(operand));
                }
            }
            "\"" => {
                state.next_line();
                if let Some(operand) = operands.get(2) {
                    runs.extend(state.show(operand));
                }
            }
            _ => {}
        }
    }

    tracing::trace!(page = page_num, runs = runs.len(), "page text extracted");
    Ok(runs)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    /// Prepend a translation expressed in text space
    fn translate(self, tx: f64, ty: f64) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        Matrix([a, b, c, d, e + tx * a + ty * c, f + tx * b + ty * d])
    }

    fn scale_x(&self) -> f64 {
        self.0[0].hypot(self.0[1])
    }

    fn scale_y(&self) -> f64 {
        self.0[2].hypot(self.0[3])
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct FontFace {
    name: Option<String>,
    is_bold: bool,
    is_italic: bool,
}

impl FontFace {
    /// Resolve a `/Font` resource of `page` to its BaseFont
    fn lookup(doc: &Document, page: &Dictionary, resource: &[u8]) -> Self {
        let base_font = inherited(doc, page, b"Resources")
            .and_then(|resources| resources.as_dict().ok())
            .and_then(|resources| resources.get(b"Font").ok())
            .and_then(|fonts| resolve(doc, fonts).as_dict().ok())
            .and_then(|fonts| fonts.get(resource).ok())
            .and_then(|font| resolve(doc, font).as_dict().ok())
            .and_then(|font| font.get(b"BaseFont").ok())
            .and_then(|name| name.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).into_owned());
        Self::from_base_font(base_font)
    }

    fn from_base_font(base_font: Option<String>) -> Self {
        let Some(name) = base_font else {
            return Self::default();
        };
        // Subset fonts are named "ABCDEF+Family"
        let name = match name.split_once('+') {
            Some((tag, family)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => {
                family.to_string()
            }
            _ => name,
        };
        let lower = name.to_ascii_lowercase();
        Self {
            is_bold: ["bold", "black", "heavy"].iter().any(|w| lower.contains(w)),
            is_italic: lower.contains("italic") || lower.contains("oblique"),
            name: Some(name),
        }
    }
}

#[derive(Debug)]
struct TextState {
    line: Matrix,
    text: Matrix,
    leading: f64,
    font_size: f64,
    face: FontFace,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            line: Matrix::IDENTITY,
            text: Matrix::IDENTITY,
            leading: 0.0,
            font_size: 12.0,
            face: FontFace::default(),
        }
    }
}

impl TextState {
    fn begin(&mut self) {
        self.line = Matrix::IDENTITY;
        self.text = Matrix::IDENTITY;
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line = self.line.translate(tx, ty);
        self.text = self.line;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    /// Emit the run drawn by a Tj/TJ operand and advance past it
    fn show(&mut self, operand: &Object) -> Option<PositionedText> {
        let (text, kerning) = decode_operand(operand)?;
        let glyphs = text.chars().count() as f64;
        // Advance in unscaled text space units
        let advance = (glyphs * AVERAGE_GLYPH_WIDTH - kerning / 1000.0) * self.font_size;
        let start = self.text;
        self.text = self.text.translate(advance, 0.0);

        let size = self.font_size * start.scale_y();
        if text.trim().is_empty() || size <= 0.0 {
            return None;
        }
        let [.., x, y] = start.0;
        Some(PositionedText {
            rect: PdfRect::new(x, y - DESCENT * size, advance * start.scale_x(), size),
            text,
            font_name: self.face.name.clone(),
            font_size: size,
            is_bold: self.face.is_bold,
            is_italic: self.face.is_italic,
        })
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(n) => Some(*n as f64),
        Object::Real(n) => Some(*n as f64),
        _ => None,
    }
}

/// Decode a Tj string or TJ array. Returns the text and the summed TJ
/// position adjustments in thousandths of an em.
fn decode_operand(operand: &Object) -> Option<(String, f64)> {
    match operand {
        Object::String(bytes, _) => Some((decode_string(bytes), 0.0)),
        Object::Array(items) => {
            let mut text = String::new();
            let mut kerning = 0.0;
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_string(bytes)),
                    other => {
                        if let Some(adjust) = number(other) {
                            kerning += adjust;
                            if adjust < -WORD_GAP {
                                text.push(' ');
                            }
                        }
                    }
                }
            }
            Some((text, kerning))
        }
        _ => None,
    }
}

fn decode_string(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if let Ok(text) = String::from_utf16(&units) {
            return text;
        }
    }
    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures::{pdf_with_pages, pdf_with_text};
    use pretty_assertions::assert_eq;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_runs_follow_text_positioning() {
        let doc = Document::load_mem(&pdf_with_text()).unwrap();
        let runs = extract_page_text(&doc, 1).unwrap();
        assert_eq!(runs.len(), 2);

        let hello = &runs[0];
        assert_eq!(hello.text, "Hello");
        assert_eq!(hello.font_name.as_deref(), Some("Helvetica-BoldOblique"));
        assert!(hello.is_bold && hello.is_italic);
        assert!(close(hello.font_size, 12.0));
        assert!(close(hello.rect.x, 100.0));
        assert!(close(hello.rect.y, 700.0 - 2.4));
        assert!(close(hello.rect.width, 30.0));

        // T* with a 14pt leading drops one line
        let world = &runs[1];
        assert_eq!(world.text, "World");
        assert!(close(world.rect.x, 100.0));
        assert!(close(world.rect.y, 686.0 - 2.4));
    }

    #[test]
    fn test_page_without_content_has_no_runs() {
        let doc = Document::load_mem(&pdf_with_pages(2, 612, 792)).unwrap();
        assert!(extract_page_text(&doc, 2).unwrap().is_empty());
        assert!(matches!(
            extract_page_text(&doc, 3),
            Err(EngineError::PageOutOfRange { page: 3, .. })
        ));
    }

    #[test]
    fn test_tj_array_gaps_become_spaces() {
        let operand = Object::Array(vec![
            Object::string_literal("Hello"),
            Object::Integer(-250),
            Object::string_literal("there"),
            Object::Integer(-20),
        ]);
        let (text, kerning) = decode_operand(&operand).unwrap();
        assert_eq!(text, "Hello there");
        assert_eq!(kerning, -270.0);
    }

    #[test]
    fn test_decode_string_encodings() {
        assert_eq!(decode_string(b"plain"), "plain");
        assert_eq!(decode_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
        assert_eq!(decode_string(&[0x43, 0x61, 0x66, 0xE9]), "Caf\u{e9}");
    }

    #[test]
    fn test_subset_prefix_stripped() {
        let face = FontFace::from_base_font(Some("QWERTY+Times-Italic".to_string()));
        assert_eq!(face.name.as_deref(), Some("Times-Italic"));
        assert!(face.is_italic && !face.is_bold);

        let face = FontFace::from_base_font(Some("Custom+Font".to_string()));
        assert_eq!(face.name.as_deref(), Some("Custom+Font"));
    }
}
