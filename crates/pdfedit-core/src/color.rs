use serde::{Deserialize, Serialize};

/// RGB color with components in the 0-1 range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Parse hex color string (e.g., "#FF0000" or "FF0000").
    /// Anything unparseable is treated as black.
    pub fn from_hex(color: &str) -> Rgb {
        let hex = color.trim().trim_start_matches('#');
        if hex.len() < 6 || !hex.is_ascii() {
            return Rgb::BLACK;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).unwrap_or(0) as f32 / 255.0
        };
        Rgb {
            r: channel(0..2),
            g: channel(2..4),
            b: channel(4..6),
        }
    }
}
