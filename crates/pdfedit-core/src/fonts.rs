//! Standard-14 substitute fonts
//!
//! Edited and added text is always drawn with one fixed standard font, and the
//! same font supplies the descent estimate for erasing original glyphs. The
//! original run's embedded font is never consulted.

use serde::{Deserialize, Serialize};

/// Vertical and horizontal metrics of a font at a given size, in PDF units
pub trait FontMetrics {
    /// Distance from the lowest descender to the highest ascender
    fn total_height(&self, size: f64) -> f64;

    /// Distance from the baseline to the highest ascender
    fn ascent_height(&self, size: f64) -> f64;

    /// Advance width of `text`
    fn width_of_text(&self, text: &str, size: f64) -> f64;

    fn descent_height(&self, size: f64) -> f64 {
        self.total_height(size) - self.ascent_height(size)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardFont {
    #[default]
    Helvetica,
    Courier,
}

// Helvetica AFM advance widths for codes 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

const HELVETICA_DEFAULT_WIDTH: u16 = 556;
const COURIER_WIDTH: u16 = 600;

impl StandardFont {
    /// PDF `BaseFont` name
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::Courier => "Courier",
        }
    }

    /// Map a font name reported by a text layer to the closest supported
    /// standard font. Anything that is not monospace falls back to Helvetica.
    pub fn closest_to(name: &str) -> StandardFont {
        let lower = name.to_lowercase();
        if lower.contains("courier")
            || lower.contains("mono")
            || lower.contains("consolas")
            || lower.contains("monaco")
        {
            StandardFont::Courier
        } else {
            StandardFont::Helvetica
        }
    }

    fn ascender(&self) -> f64 {
        match self {
            StandardFont::Helvetica => 718.0,
            StandardFont::Courier => 629.0,
        }
    }

    fn descender(&self) -> f64 {
        match self {
            StandardFont::Helvetica => -207.0,
            StandardFont::Courier => -157.0,
        }
    }

    /// Advance width of a single WinAnsi code in thousandths of an em
    pub fn glyph_width(&self, code: u8) -> u16 {
        match self {
            StandardFont::Courier => COURIER_WIDTH,
            StandardFont::Helvetica => match code {
                32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
                _ => HELVETICA_DEFAULT_WIDTH,
            },
        }
    }
}

impl FontMetrics for StandardFont {
    fn total_height(&self, size: f64) -> f64 {
        (self.ascender() - self.descender()) / 1000.0 * size
    }

    fn ascent_height(&self, size: f64) -> f64 {
        self.ascender() / 1000.0 * size
    }

    fn width_of_text(&self, text: &str, size: f64) -> f64 {
        let units: u32 = text
            .chars()
            .map(|c| {
                let code = if c.is_ascii() { c as u8 } else { 0 };
                self.glyph_width(code) as u32
            })
            .sum();
        units as f64 / 1000.0 * size
    }
}
