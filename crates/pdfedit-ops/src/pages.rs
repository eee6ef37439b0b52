//! Page-level metrics
//!
//! Loads a document with lopdf and extracts the per-page dimensions the
//! overlay needs to map between pixels and points.

use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

use crate::error::EngineError;
use crate::text::{extract_page_text, PositionedText};

/// Dimensions of a single PDF page
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageMetrics {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Page width in points (1 point = 1/72 inch)
    pub width: f64,
    /// Page height in points
    pub height: f64,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i32,
    pub orientation: PageOrientation,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

impl PageMetrics {
    pub fn from_document(doc: &Document, page_num: u32) -> Result<Self, EngineError> {
        let pages = doc.get_pages();
        let page_count = pages.len() as u32;
        let page_id = pages
            .get(&page_num)
            .ok_or(EngineError::PageOutOfRange {
                page: page_num,
                page_count,
            })?;

        let page_dict = doc
            .get_object(*page_id)
            .and_then(Object::as_dict)
            .map_err(|_| EngineError::ParseError(format!("Page {} is not a dictionary", page_num)))?;

        let media_box = inherited(doc, page_dict, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .map(|array| parse_box_array(array))
            .transpose()?
            // US Letter when neither the page nor its parent declares one
            .unwrap_or([0.0, 0.0, 612.0, 792.0]);
        let (width, height) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);

        let rotation = inherited(doc, page_dict, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .map(|angle| normalize_rotation(angle as i32))
            .unwrap_or(0);

        let (effective_width, effective_height) = if rotation == 90 || rotation == 270 {
            (height, width)
        } else {
            (width, height)
        };

        let orientation = if (effective_width - effective_height).abs() < 1.0 {
            PageOrientation::Square
        } else if effective_width > effective_height {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };

        Ok(Self {
            page_num,
            width,
            height,
            rotation,
            orientation,
        })
    }
}

/// A parsed document with the per-page facts the edit layer needs
#[derive(Debug, Clone)]
pub struct PdfPages {
    doc: Document,
    pages: Vec<PageMetrics>,
    is_signed: bool,
}

impl PdfPages {
    pub fn load(bytes: &[u8]) -> Result<Self, EngineError> {
        let doc = Document::load_mem(bytes).map_err(|e| EngineError::ParseError(e.to_string()))?;
        let page_count = doc.get_pages().len() as u32;

        let pages = (1..=page_count)
            .map(|page_num| PageMetrics::from_document(&doc, page_num))
            .collect::<Result<Vec<_>, _>>()?;

        let is_signed = has_signatures(&doc);
        Ok(Self {
            doc,
            pages,
            is_signed,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn is_signed(&self) -> bool {
        self.is_signed
    }

    pub fn metrics(&self, page_num: u32) -> Result<&PageMetrics, EngineError> {
        page_num
            .checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
            .ok_or(EngineError::PageOutOfRange {
                page: page_num,
                page_count: self.page_count(),
            })
    }

    /// Positioned text runs of `page_num`
    pub fn text_runs(&self, page_num: u32) -> Result<Vec<PositionedText>, EngineError> {
        self.metrics(page_num)?;
        extract_page_text(&self.doc, page_num)
    }
}

/// True when the AcroForm declares signatures (SigFlags bit 1) or holds a
/// `/FT /Sig` field.
pub fn has_signatures(doc: &Document) -> bool {
    let Ok(catalog) = doc.catalog() else {
        return false;
    };
    let Some(acro_form) = catalog
        .get(b"AcroForm")
        .ok()
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return false;
    };

    if let Ok(flags) = acro_form.get(b"SigFlags").and_then(Object::as_i64) {
        if flags & 1 != 0 {
            return true;
        }
    }

    let Ok(fields) = acro_form.get(b"Fields").and_then(Object::as_array) else {
        return false;
    };
    fields.iter().any(|field| is_signature_field(doc, field, 0))
}

fn is_signature_field(doc: &Document, field: &Object, depth: usize) -> bool {
    // Malformed field trees can be cyclic
    if depth > 8 {
        return false;
    }
    let Ok(dict) = resolve(doc, field).as_dict() else {
        return false;
    };
    if dict
        .get(b"FT")
        .and_then(Object::as_name)
        .map(|name| name == b"Sig")
        .unwrap_or(false)
    {
        return true;
    }
    dict.get(b"Kids")
        .and_then(Object::as_array)
        .map(|kids| kids.iter().any(|kid| is_signature_field(doc, kid, depth + 1)))
        .unwrap_or(false)
}

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj.as_reference() {
        Ok(id) => doc.get_object(id).unwrap_or(obj),
        Err(_) => obj,
    }
}

/// Look a key up on the page, falling back to the parent Pages node
pub(crate) fn inherited<'a>(doc: &'a Document, page_dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    if let Ok(value) = page_dict.get(key) {
        return Some(resolve(doc, value));
    }
    let parent_id = page_dict.get(b"Parent").ok()?.as_reference().ok()?;
    let parent = doc.get_object(parent_id).ok()?.as_dict().ok()?;
    parent.get(key).ok().map(|value| resolve(doc, value))
}

/// Parse a box array [x1, y1, x2, y2]
fn parse_box_array(array: &[Object]) -> Result<[f64; 4], EngineError> {
    if array.len() != 4 {
        return Err(EngineError::ParseError(
            "MediaBox must have 4 elements".to_string(),
        ));
    }

    let mut result = [0.0; 4];
    for (i, obj) in array.iter().enumerate() {
        result[i] = match obj {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => {
                return Err(EngineError::ParseError(format!(
                    "MediaBox element {} is not a number",
                    i
                )))
            }
        };
    }

    Ok(result)
}

fn normalize_rotation(angle: i32) -> i32 {
    angle.rem_euclid(360)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build an in-memory PDF with `page_count` pages of the given size
    pub fn pdf_with_pages(page_count: u32, width: i64, height: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..page_count)
            .map(|_| {
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => Object::Reference(pages_id),
                    "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
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

    /// One Letter page showing "Hello" and, a line below, "World" in a
    /// subset Helvetica-BoldOblique
    pub fn pdf_with_text() -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "ABCDEF+Helvetica-BoldOblique",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello")]),
                Operation::new("TL", vec![14.into()]),
                Operation::new("T*", vec![]),
                Operation::new(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal("Wor"),
                        Object::Integer(-20),
                        Object::string_literal("ld"),
                    ])],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1i64,
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

    /// Same as `pdf_with_pages` with an AcroForm signature field attached
    pub fn signed_pdf() -> Vec<u8> {
        let bytes = pdf_with_pages(1, 612, 792);
        let mut doc = Document::load_mem(&bytes).unwrap();
        let sig_field = doc.add_object(dictionary! {
            "FT" => "Sig",
            "T" => Object::string_literal("Signature1"),
        });
        let acro_form = doc.add_object(dictionary! {
            "Fields" => vec![Object::Reference(sig_field)],
        });
        let catalog_id = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        doc.get_object_mut(catalog_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("AcroForm", Object::Reference(acro_form));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}
