//! Format sniffing
//!
//! MessagePack is recognised by its leading map marker. The textual formats
//! are recognised by their first non-whitespace character.

use crate::Format;

/// Guess the format of an encoded document
///
/// Returns `None` for empty input or input matching no known format.
pub fn detect_format(bytes: &[u8]) -> Option<Format> {
    let first = *bytes.first()?;
    if (0x80..=0x8f).contains(&first) || first == 0xde || first == 0xdf {
        return Some(Format::MsgPack);
    }

    let start = bytes.iter().position(|b| !b.is_ascii_whitespace())?;
    let rest = &bytes[start..];
    match rest[0] {
        b'{' | b'[' => Some(Format::Json),
        b'<' => Some(Format::Xml),
        b'@' if rest.starts_with(b"@header") || rest.starts_with(b"@data") => Some(Format::Text),
        _ => None,
    }
}
