//! Shared fixtures for session integration tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfedit_ops::EditEngine;
use pdfedit_session::{
    EditSession, ElementId, GestureOutcome, MetricsRenderer, PixelPoint, PointerTarget,
    ResizeHandle, SessionConfig, Tool,
};

pub type Session = EditSession<EditEngine, MetricsRenderer>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .try_init();
}

fn build(page_count: u32, sig_flags: Option<i64>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..page_count)
        .map(|_| {
            Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
            }))
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    };
    if let Some(flags) = sig_flags {
        let acro_form = doc.add_object(dictionary! {
            "Fields" => Vec::<Object>::new(),
            "SigFlags" => flags,
        });
        catalog.set("AcroForm", Object::Reference(acro_form));
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save fixture pdf");
    buffer
}

/// US Letter pages inheriting their MediaBox from the page tree root
pub fn pdf_with_pages(page_count: u32) -> Vec<u8> {
    build(page_count, None)
}

/// One Letter page with "Hello" at (100, 700) and "World" a line below,
/// set in a subset Helvetica-BoldOblique at 12pt
pub fn pdf_with_text() -> Vec<u8> {
    let mut doc = Document::load_mem(&build(1, None)).expect("reload fixture pdf");
    let page_id = *doc.get_pages().get(&1).expect("page 1");

    let font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "ABCDEF+Helvetica-BoldOblique",
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![100.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("Hello")]),
            Operation::new("TD", vec![0.into(), (-14).into()]),
            Operation::new("Tj", vec![Object::string_literal("World")]),
            Operation::new("ET", vec![]),
        ],
    };
    let stream = Stream::new(dictionary! {}, content.encode().expect("encode content"));
    let contents = doc.add_object(stream);

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .expect("page dictionary");
    page.set("Contents", Object::Reference(contents));
    page.set(
        "Resources",
        dictionary! { "Font" => dictionary! { "F1" => Object::Reference(font) } },
    );

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save fixture pdf");
    buffer
}

/// One page with an AcroForm marked as signed
pub fn signed_pdf() -> Vec<u8> {
    build(1, Some(3))
}

/// Open a session over `bytes` and render page 1 at `scale`
pub fn open(bytes: &[u8], scale: f64) -> Session {
    init_tracing();
    let engine = EditEngine::new("fixture.pdf", bytes).expect("engine loads fixture");
    let mut session = EditSession::open(engine, MetricsRenderer::new(), bytes, SessionConfig::default())
        .expect("session opens");
    session.render_page(1, scale).expect("page 1 renders");
    session
}

pub fn draw(session: &mut Session, tool: Tool, from: (f64, f64), to: (f64, f64)) -> GestureOutcome {
    session.set_tool(tool);
    session.pointer_down(1, PixelPoint::new(from.0, from.1), PointerTarget::Page);
    session.pointer_move(PixelPoint::new(to.0, to.1));
    session.pointer_up(PixelPoint::new(to.0, to.1))
}

pub fn drag(session: &mut Session, element: ElementId, by: (f64, f64)) -> GestureOutcome {
    let start = PixelPoint::new(0.0, 0.0);
    let end = PixelPoint::new(by.0, by.1);
    session.pointer_down(1, start, PointerTarget::Element(element));
    session.pointer_move(end);
    session.pointer_up(end)
}

pub fn resize(
    session: &mut Session,
    element: ElementId,
    handle: ResizeHandle,
    by: (f64, f64),
) -> GestureOutcome {
    session.select(Some(element));
    let start = PixelPoint::new(0.0, 0.0);
    let end = PixelPoint::new(by.0, by.1);
    session.pointer_down(1, start, PointerTarget::Handle(element, handle));
    session.pointer_move(end);
    session.pointer_up(end)
}

/// Newest element on the overlay
pub fn latest(session: &Session) -> Option<ElementId> {
    session.overlay().elements().map(|el| el.id).max()
}

/// Handle-independent description of every overlay element
pub fn overlay_snapshot(session: &Session) -> Vec<String> {
    let mut items: Vec<String> = session
        .overlay()
        .elements()
        .map(|el| {
            format!(
                "p{} {:?} {:.3},{:.3},{:.3},{:.3} {:?}",
                el.page,
                el.content.kind(),
                el.rect.x,
                el.rect.y,
                el.rect.width,
                el.rect.height,
                el.content
            )
        })
        .collect();
    items.sort();
    items
}

/// Handle-independent description of every live engine operation
pub fn engine_snapshot(session: &Session) -> Vec<String> {
    let mut records: Vec<String> = session
        .engine()
        .operations()
        .iter()
        .map(|op| {
            let mut op = op.clone();
            op.set_id(0);
            op.to_json().expect("record serializes")
        })
        .collect();
    records.sort();
    records
}
