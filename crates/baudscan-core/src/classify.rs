//! Byte classification
//!
//! Maps a single received byte to the category the scorer counts.

use serde::{Deserialize, Serialize};

/// Bytes that devices emit as framing or terminal control. Matched on the raw
/// value, so the high-bit members are recognised even though they are not
/// valid single-byte UTF-8.
pub const CONTROL_BYTES: [u8; 7] = [0x0E, 0x0F, 0xE0, 0xFE, 0xC0, 0x0D, 0x0A];

/// Whitespace counted as a word break
pub const WHITESPACE: [char; 4] = [' ', '\t', '\r', '\n'];

/// Sentence punctuation
pub const PUNCTUATION: [char; 6] = ['.', ',', ':', ';', '?', '!'];

/// Vowels, both cases
pub const VOWELS: [char; 10] = ['a', 'A', 'e', 'E', 'i', 'I', 'o', 'O', 'u', 'U'];

/// Category of a received byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ByteCategory {
    /// One of [`VOWELS`]
    Vowel,
    /// Space or tab
    Whitespace,
    /// One of [`PUNCTUATION`]
    Punctuation,
    /// Printable ASCII not covered above
    OtherPrintable,
    /// One of [`CONTROL_BYTES`], ignored by the scorer
    Control,
    /// Cannot appear in console text
    Invalid,
}

impl ByteCategory {
    /// Whether the category counts toward the trial total
    pub fn is_counted(self) -> bool {
        !matches!(self, ByteCategory::Control | ByteCategory::Invalid)
    }
}

/// Classify one raw byte
///
/// Control-set membership wins over the text categories, so CR and LF are
/// reported as `Control` rather than `Whitespace`.
pub fn classify(raw: u8) -> ByteCategory {
    if CONTROL_BYTES.contains(&raw) {
        return ByteCategory::Control;
    }

    let decoded = match std::str::from_utf8(std::slice::from_ref(&raw)) {
        Ok(s) => s.chars().next(),
        // Lone high-bit byte; the control set was the only raw match
        Err(_) => None,
    };

    match decoded {
        Some(c) if WHITESPACE.contains(&c) => ByteCategory::Whitespace,
        Some(c) if VOWELS.contains(&c) => ByteCategory::Vowel,
        Some(c) if PUNCTUATION.contains(&c) => ByteCategory::Punctuation,
        Some(' '..='~') => ByteCategory::OtherPrintable,
        _ => ByteCategory::Invalid,
    }
}
