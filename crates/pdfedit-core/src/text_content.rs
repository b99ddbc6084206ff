//! Text items read straight from a page content stream
//!
//! Supports simple single-byte fonts: codes are decoded as WinAnsi and glyph
//! advances come from the font's `/Widths` array, or from the closest standard
//! font when the array is missing. Composite (Type0) fonts and ToUnicode maps
//! are not interpreted.

use crate::error::ExtractionError;
use crate::fonts::StandardFont;
use crate::lopdf_model::{as_number, find_inherited, resolve};
use crate::rasterizer::TextItem;
use crate::winansi;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use std::collections::HashMap;
use tracing::debug;

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m1` followed by `m2`
fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn translation(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

#[derive(Debug, Clone)]
struct FontWidths {
    base_font: String,
    first_char: i64,
    widths: Vec<f64>,
    fallback: StandardFont,
}

impl FontWidths {
    fn from_dict(doc: &Document, resource_name: &str, font: &lopdf::Dictionary) -> Self {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|obj| obj.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .unwrap_or_else(|| resource_name.to_string());
        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(as_number)
            .unwrap_or(0.0) as i64;
        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|obj| resolve(doc, obj))
            .and_then(|obj| obj.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| resolve(doc, w).and_then(as_number).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            fallback: StandardFont::closest_to(&base_font),
            base_font,
            first_char,
            widths,
        }
    }

    fn unknown(resource_name: &str) -> Self {
        Self {
            base_font: resource_name.to_string(),
            first_char: 0,
            widths: Vec::new(),
            fallback: StandardFont::default(),
        }
    }

    /// Advance of one code in thousandths of an em
    fn glyph_width(&self, code: u8) -> f64 {
        let index = code as i64 - self.first_char;
        if index >= 0 {
            if let Some(width) = self.widths.get(index as usize) {
                if *width > 0.0 {
                    return *width;
                }
            }
        }
        self.fallback.glyph_width(code) as f64
    }
}

fn page_fonts(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, FontWidths> {
    let mut fonts = HashMap::new();
    let font_dict = find_inherited(doc, page_id, b"Resources")
        .and_then(|obj| obj.as_dict().ok())
        .and_then(|resources| resources.get(b"Font").ok())
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok());

    if let Some(font_dict) = font_dict {
        for (name, value) in font_dict.iter() {
            let resource_name = String::from_utf8_lossy(name);
            let widths = match resolve(doc, value).and_then(|obj| obj.as_dict().ok()) {
                Some(dict) => FontWidths::from_dict(doc, &resource_name, dict),
                None => FontWidths::unknown(&resource_name),
            };
            fonts.insert(name.clone(), widths);
        }
    }
    fonts
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

enum Piece<'a> {
    Bytes(&'a [u8]),
    Adjust(f64),
}

struct TextWalker {
    fonts: HashMap<Vec<u8>, FontWidths>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    items: Vec<TextItem>,
}

impl TextWalker {
    fn new(fonts: HashMap<Vec<u8>, FontWidths>) -> Self {
        Self {
            fonts,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            items: Vec::new(),
        }
    }

    fn numbers(op: &Operation) -> Vec<f64> {
        op.operands.iter().filter_map(as_number).collect()
    }

    fn matrix(op: &Operation) -> Option<Matrix> {
        match Self::numbers(op).as_slice() {
            [a, b, c, d, e, f] => Some([*a, *b, *c, *d, *e, *f]),
            _ => None,
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = multiply(&translation(tx, ty), &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn apply(&mut self, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Self::matrix(op) {
                    self.state.ctm = multiply(&m, &self.state.ctm);
                }
            }
            "BT" => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.state.font = Some(name.clone());
                }
                if let Some(size) = op.operands.get(1).and_then(as_number) {
                    self.state.font_size = size;
                }
            }
            "Tc" | "Tw" | "Tz" | "TL" | "Ts" => {
                if let Some(value) = op.operands.first().and_then(as_number) {
                    match op.operator.as_str() {
                        "Tc" => self.state.char_spacing = value,
                        "Tw" => self.state.word_spacing = value,
                        "Tz" => self.state.horizontal_scale = value / 100.0,
                        "TL" => self.state.leading = value,
                        _ => self.state.rise = value,
                    }
                }
            }
            "Td" | "TD" => {
                if let [tx, ty] = Self::numbers(op).as_slice() {
                    if op.operator == "TD" {
                        self.state.leading = -ty;
                    }
                    self.move_line(*tx, *ty);
                }
            }
            "Tm" => {
                if let Some(m) = Self::matrix(op) {
                    self.line_matrix = m;
                    self.text_matrix = m;
                }
            }
            "T*" => self.move_line(0.0, -self.state.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(&[Piece::Bytes(bytes)]);
                }
            }
            "'" => {
                self.move_line(0.0, -self.state.leading);
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(&[Piece::Bytes(bytes)]);
                }
            }
            "\"" => {
                let spacing: Vec<f64> = op.operands.iter().take(2).filter_map(as_number).collect();
                if let [aw, ac] = spacing.as_slice() {
                    self.state.word_spacing = *aw;
                    self.state.char_spacing = *ac;
                }
                self.move_line(0.0, -self.state.leading);
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    self.show(&[Piece::Bytes(bytes)]);
                }
            }
            "TJ" => {
                if let Some(Object::Array(elements)) = op.operands.first() {
                    let pieces: Vec<Piece> = elements
                        .iter()
                        .filter_map(|element| match element {
                            Object::String(bytes, _) => Some(Piece::Bytes(bytes)),
                            other => as_number(other).map(Piece::Adjust),
                        })
                        .collect();
                    self.show(&pieces);
                }
            }
            _ => {}
        }
    }

    fn show(&mut self, pieces: &[Piece]) {
        let state = &self.state;
        let size = state.font_size;
        let scale = state.horizontal_scale;
        let font = state.font.as_ref().and_then(|name| self.fonts.get(name));

        let mut text = String::new();
        let mut advance = 0.0;
        for piece in pieces {
            match piece {
                Piece::Bytes(bytes) => {
                    for &code in bytes.iter() {
                        let glyph = font
                            .map(|f| f.glyph_width(code))
                            .unwrap_or_else(|| StandardFont::default().glyph_width(code) as f64);
                        let word = if code == b' ' { state.word_spacing } else { 0.0 };
                        advance += (glyph / 1000.0 * size + state.char_spacing + word) * scale;
                        text.push(winansi::decode_byte(code));
                    }
                }
                Piece::Adjust(amount) => advance -= amount / 1000.0 * size * scale,
            }
        }

        let line = multiply(&self.text_matrix, &state.ctm);
        let transform = multiply(&[size * scale, 0.0, 0.0, size, 0.0, state.rise], &line);
        if !text.is_empty() {
            self.items.push(TextItem {
                text,
                transform,
                width: advance * line[0].hypot(line[1]),
                height: transform[2].hypot(transform[3]),
                font_name: font
                    .map(|f| f.base_font.clone())
                    .or_else(|| {
                        state
                            .font
                            .as_ref()
                            .map(|name| String::from_utf8_lossy(name).into_owned())
                    })
                    .unwrap_or_default(),
            });
        }
        self.text_matrix = multiply(&translation(advance, 0.0), &self.text_matrix);
    }
}

/// Text items of page `page` (1-based) in content-stream order
pub fn page_text_items(doc: &Document, page: u32) -> Result<Vec<TextItem>, ExtractionError> {
    let pages = doc.get_pages();
    let page_id = *pages.get(&page).ok_or(ExtractionError::PageOutOfRange {
        page,
        page_count: pages.len() as u32,
    })?;

    let data = doc
        .get_page_content(page_id)
        .map_err(|e| ExtractionError::TextContentError {
            page,
            message: e.to_string(),
        })?;
    let content = Content::decode(&data).map_err(|e| ExtractionError::TextContentError {
        page,
        message: e.to_string(),
    })?;

    let mut walker = TextWalker::new(page_fonts(doc, page_id));
    for op in &content.operations {
        walker.apply(op);
    }
    debug!(page, items = walker.items.len(), "read text items from content stream");
    Ok(walker.items)
}
