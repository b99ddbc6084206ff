//! WinAnsiEncoding conversion for simple (single-byte) fonts

// Codes 0x80..=0x9F differ from Latin-1.
const HIGH_CODES: [(u8, char); 27] = [
    (0x80, '€'),
    (0x82, '‚'),
    (0x83, 'ƒ'),
    (0x84, '„'),
    (0x85, '…'),
    (0x86, '†'),
    (0x87, '‡'),
    (0x88, 'ˆ'),
    (0x89, '‰'),
    (0x8A, 'Š'),
    (0x8B, '‹'),
    (0x8C, 'Œ'),
    (0x8E, 'Ž'),
    (0x91, '‘'),
    (0x92, '’'),
    (0x93, '“'),
    (0x94, '”'),
    (0x95, '•'),
    (0x96, '–'),
    (0x97, '—'),
    (0x98, '˜'),
    (0x99, '™'),
    (0x9A, 'š'),
    (0x9B, '›'),
    (0x9C, 'œ'),
    (0x9E, 'ž'),
    (0x9F, 'Ÿ'),
];

/// Encode text for a WinAnsi font. Characters outside the encoding become `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' | '\u{A0}'..='\u{FF}' => c as u32 as u8,
            _ => HIGH_CODES
                .iter()
                .find(|(_, ch)| *ch == c)
                .map(|(code, _)| *code)
                .unwrap_or(b'?'),
        })
        .collect()
}

pub fn decode_byte(byte: u8) -> char {
    match byte {
        0x80..=0x9F => HIGH_CODES
            .iter()
            .find(|(code, _)| *code == byte)
            .map(|(_, ch)| *ch)
            .unwrap_or('\u{FFFD}'),
        _ => byte as char,
    }
}
