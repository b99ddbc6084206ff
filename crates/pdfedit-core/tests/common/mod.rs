//! Shared fixtures for the pdfedit-core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use pdfedit_core::{
    DocumentModel, ExtractionError, LopdfDocument, PixelBuffer, Rasterizer, RenderedPage,
    TextItem, Viewport,
};
use std::collections::HashMap;
use std::time::Duration;

/// Text drawn with `/F1` (Helvetica) at a fixed baseline origin
pub struct Run {
    pub text: &'static str,
    pub x: i64,
    pub y: i64,
    pub size: i64,
}

pub const fn run(text: &'static str, x: i64, y: i64, size: i64) -> Run {
    Run { text, x, y, size }
}

/// A PDF with one US Letter page per entry
pub fn pdf_with_pages(pages: &[&[Run]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for runs in pages {
        let mut operations = Vec::new();
        for r in runs.iter() {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), r.size.into()]),
                Operation::new("Td", vec![r.x.into(), r.y.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(r.text.as_bytes().to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id =
            doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
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

pub fn invoice_pdf() -> Vec<u8> {
    pdf_with_pages(&[
        &[
            run("Invoice #001", 50, 700, 12),
            run("Total: $100", 50, 650, 10),
        ],
        &[run("Terms", 72, 720, 14)],
    ])
}

/// Decoded operations of a page's combined content streams
pub fn page_operations(bytes: &[u8], page: u32) -> Vec<Operation> {
    let doc = Document::load_mem(bytes).unwrap();
    let page_id = doc.get_pages()[&page];
    let content = doc.get_page_content(page_id).unwrap();
    Content::decode(&content).unwrap().operations
}

pub fn numbers(op: &Operation) -> Vec<f64> {
    op.operands
        .iter()
        .filter_map(|o| match o {
            Object::Integer(v) => Some(*v as f64),
            Object::Real(v) => Some(*v as f64),
            _ => None,
        })
        .collect()
}

/// Every `re` operand list on a page, as `[x, y, w, h]`
pub fn rectangles(bytes: &[u8], page: u32) -> Vec<Vec<f64>> {
    page_operations(bytes, page)
        .iter()
        .filter(|op| op.operator == "re")
        .map(numbers)
        .collect()
}

/// Fill colour (`rg` operands) in effect at each `re` on a page
pub fn rectangle_fills(bytes: &[u8], page: u32) -> Vec<Vec<f64>> {
    let mut fill = vec![0.0, 0.0, 0.0];
    let mut fills = Vec::new();
    for op in page_operations(bytes, page) {
        match op.operator.as_str() {
            "rg" => fill = numbers(&op),
            "re" => fills.push(fill.clone()),
            _ => {}
        }
    }
    fills
}

/// Every `Tj` string on a page
pub fn shown_strings(bytes: &[u8], page: u32) -> Vec<String> {
    page_operations(bytes, page)
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(s, _)) => Some(String::from_utf8_lossy(s).into_owned()),
            _ => None,
        })
        .collect()
}

/// Rasterizer stand-in: blank pixels, text layer read from the content stream
pub struct FakeRasterizer {
    bytes: Vec<u8>,
    delays: HashMap<u32, Duration>,
    failing_pages: Vec<u32>,
}

impl FakeRasterizer {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            delays: HashMap::new(),
            failing_pages: Vec::new(),
        }
    }

    pub fn with_delay(mut self, page: u32, delay: Duration) -> Self {
        self.delays.insert(page, delay);
        self
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.failing_pages.push(page);
        self
    }

    fn document(&self) -> LopdfDocument {
        LopdfDocument::load(&self.bytes).unwrap()
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn render_page(&self, page_number: u32, zoom: f64) -> Result<RenderedPage, ExtractionError> {
        if let Some(delay) = self.delays.get(&page_number) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_pages.contains(&page_number) {
            return Err(ExtractionError::RenderError {
                page: page_number,
                message: "rasterizer crashed".to_string(),
            });
        }
        let size = self
            .document()
            .page_size(page_number)
            .map_err(|e| ExtractionError::RenderError {
                page: page_number,
                message: e.to_string(),
            })?;
        let viewport = Viewport::new(zoom, size.width, size.height);
        let (width, height) = viewport.pixel_size();
        Ok(RenderedPage {
            page_number,
            viewport,
            pixels: PixelBuffer::blank(width, height),
        })
    }

    async fn text_content(&self, page_number: u32) -> Result<Vec<TextItem>, ExtractionError> {
        self.document().text_items(page_number)
    }
}
