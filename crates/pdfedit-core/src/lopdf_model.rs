//! lopdf-backed document model
//!
//! Drawing is flattened into page content rather than added as annotations,
//! so erased glyphs are really covered in every viewer. For each touched page
//! the existing content streams are wrapped in `q ... Q` and one extra stream
//! with the new operations is appended after them.

use crate::color::Rgb;
use crate::coords::{PdfPoint, PdfRect, Size};
use crate::error::{DocumentLoadError, ExtractionError, PatchError};
use crate::fonts::{FontMetrics, StandardFont};
use crate::model::DocumentModel;
use crate::rasterizer::TextItem;
use crate::text_content;
use crate::winansi;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use tracing::warn;

/// US Letter, used when a page has no resolvable MediaBox
const FALLBACK_PAGE_SIZE: Size = Size {
    width: 612.0,
    height: 792.0,
};

/// Line advance for multi-line text, as a multiple of the font size
const LINE_HEIGHT: f64 = 1.2;

/// Inheritable page attributes are looked up at most this many levels up
const MAX_INHERITANCE_DEPTH: usize = 32;

/// A standard font registered in the document
#[derive(Debug, Clone, PartialEq)]
pub struct LopdfFont {
    font: StandardFont,
    resource_name: String,
    object_id: ObjectId,
}

impl LopdfFont {
    /// Name under which the font is registered in page resources
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }
}

impl FontMetrics for LopdfFont {
    fn total_height(&self, size: f64) -> f64 {
        self.font.total_height(size)
    }

    fn ascent_height(&self, size: f64) -> f64 {
        self.font.ascent_height(size)
    }

    fn width_of_text(&self, text: &str, size: f64) -> f64 {
        self.font.width_of_text(text, size)
    }
}

#[derive(Debug, Default)]
struct PendingPage {
    operations: Vec<Operation>,
    fonts: BTreeMap<String, ObjectId>,
}

pub struct LopdfDocument {
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    fonts: Vec<LopdfFont>,
    pending: BTreeMap<u32, PendingPage>,
}

impl LopdfDocument {
    /// The parsed document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Positioned text items of a page, read from its content stream
    pub fn text_items(&self, page: u32) -> Result<Vec<TextItem>, ExtractionError> {
        text_content::page_text_items(&self.doc, page)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, PatchError> {
        self.check_page(page)?;
        self.pages
            .get(&page)
            .copied()
            .ok_or(PatchError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            })
    }

    fn push_operations(&mut self, page: u32, operations: Vec<Operation>) {
        self.pending
            .entry(page)
            .or_default()
            .operations
            .extend(operations);
    }
}

impl DocumentModel for LopdfDocument {
    type Font = LopdfFont;

    fn load(bytes: &[u8]) -> Result<Self, DocumentLoadError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| DocumentLoadError::ParseError(e.to_string()))?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(DocumentLoadError::NoPages);
        }
        Ok(Self {
            doc,
            pages,
            fonts: Vec::new(),
            pending: BTreeMap::new(),
        })
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> Result<Size, PatchError> {
        let page_id = self.page_id(page)?;
        let media_box = find_inherited(&self.doc, page_id, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .map(|arr| arr.iter().filter_map(as_number).collect::<Vec<_>>());

        match media_box.as_deref() {
            Some([x1, y1, x2, y2]) => Ok(Size::new((x2 - x1).abs(), (y2 - y1).abs())),
            _ => {
                warn!(page, "page has no usable MediaBox, assuming US Letter");
                Ok(FALLBACK_PAGE_SIZE)
            }
        }
    }

    fn embed_standard_font(&mut self, font: StandardFont) -> Result<LopdfFont, PatchError> {
        if let Some(existing) = self.fonts.iter().find(|f| f.font == font) {
            return Ok(existing.clone());
        }
        let object_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        let handle = LopdfFont {
            font,
            resource_name: format!("PdfEdit{}", font.base_font()),
            object_id,
        };
        self.fonts.push(handle.clone());
        Ok(handle)
    }

    fn draw_rectangle(&mut self, page: u32, rect: &PdfRect, fill: Rgb) -> Result<(), PatchError> {
        self.check_page(page)?;
        self.push_operations(
            page,
            vec![
                Operation::new("q", vec![]),
                color_operation(fill),
                Operation::new(
                    "re",
                    vec![
                        real(rect.x),
                        real(rect.y),
                        real(rect.width),
                        real(rect.height),
                    ],
                ),
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
            ],
        );
        Ok(())
    }

    fn draw_text(
        &mut self,
        page: u32,
        text: &str,
        position: PdfPoint,
        size: f64,
        font: &LopdfFont,
        color: Rgb,
    ) -> Result<(), PatchError> {
        self.check_page(page)?;

        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font.resource_name.as_bytes().to_vec()),
                    real(size),
                ],
            ),
            Operation::new("TL", vec![real(size * LINE_HEIGHT)]),
            color_operation(color),
            Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    real(position.x),
                    real(position.y),
                ],
            ),
        ];
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(
                    winansi::encode(line.trim_end_matches('\r')),
                    StringFormat::Literal,
                )],
            ));
        }
        operations.push(Operation::new("ET", vec![]));
        operations.push(Operation::new("Q", vec![]));

        self.push_operations(page, operations);
        self.pending
            .entry(page)
            .or_default()
            .fonts
            .insert(font.resource_name.clone(), font.object_id);
        Ok(())
    }

    fn serialize(mut self) -> Result<Vec<u8>, PatchError> {
        let pending = std::mem::take(&mut self.pending);
        for (page, changes) in pending {
            let page_id = self.page_id(page)?;
            register_fonts(&mut self.doc, page_id, &changes.fonts)?;
            append_page_content(&mut self.doc, page_id, changes.operations)?;
        }

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| PatchError::SerializationError(e.to_string()))?;
        Ok(output)
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn color_operation(color: Rgb) -> Operation {
    Operation::new(
        "rg",
        vec![
            Object::Real(color.r),
            Object::Real(color.g),
            Object::Real(color.b),
        ],
    )
}

pub(crate) fn as_number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(*v as f64),
        _ => None,
    }
}

/// Follow a single indirect reference
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up an inheritable page attribute (`Resources`, `MediaBox`, ...)
/// on the page or its ancestors
pub(crate) fn find_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Effective resource dictionary of a page, and the object holding it when
/// the page refers to it indirectly
fn effective_resources(doc: &Document, page_id: ObjectId) -> (Option<ObjectId>, Dictionary) {
    let own = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Resources").ok());

    match own {
        Some(Object::Reference(id)) => (
            Some(*id),
            doc.get_dictionary(*id)
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
        ),
        Some(Object::Dictionary(dict)) => (None, dict.clone()),
        _ => (
            None,
            find_inherited(doc, page_id, b"Resources")
                .and_then(|obj| obj.as_dict().ok())
                .cloned()
                .unwrap_or_else(Dictionary::new),
        ),
    }
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PatchError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PatchError::OperationError(e.to_string()))
}

fn register_fonts(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &BTreeMap<String, ObjectId>,
) -> Result<(), PatchError> {
    if fonts.is_empty() {
        return Ok(());
    }

    let (resources_id, mut resources) = effective_resources(doc, page_id);
    let mut font_dict = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    for (name, font_id) in fonts {
        font_dict.set(name.as_bytes().to_vec(), Object::Reference(*font_id));
    }
    resources.set("Font", Object::Dictionary(font_dict));

    match resources_id {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(resources));
        }
        None => {
            page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
        }
    }
    Ok(())
}

fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), PatchError> {
    let existing: Vec<Object> = match doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Contents").ok())
    {
        Some(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Some(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let mut suffix = vec![Operation::new("Q", vec![])];
    suffix.extend(operations);
    let mut encoded = b"\n".to_vec();
    encoded.extend(
        Content { operations: suffix }
            .encode()
            .map_err(|e| PatchError::SerializationError(e.to_string()))?,
    );

    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let suffix_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(prefix_id));
    contents.extend(existing);
    contents.push(Object::Reference(suffix_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}
