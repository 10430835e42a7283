//! XML Encoding Detection and Conversion
//!
//! Content handed to a document may arrive as UTF-8 (with or without BOM)
//! or UTF-16. Everything is normalized to UTF-8 before it reaches the parser;
//! the tree and all projections are UTF-8 only.

use crate::error::{DocumentError, Result};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Detected encoding of raw XML input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl XmlEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return XmlEncoding::Utf8;
        }

        match (input[0], input[1]) {
            (0xFF, 0xFE) => XmlEncoding::Utf16Le,
            (0xFE, 0xFF) => XmlEncoding::Utf16Be,
            // No BOM: '<' paired with a NUL byte is UTF-16
            (0x00, b'<') => XmlEncoding::Utf16Be,
            (b'<', 0x00) => XmlEncoding::Utf16Le,
            _ => XmlEncoding::Utf8,
        }
    }
}

/// Length of a leading UTF-8 BOM, if any.
#[inline]
pub fn utf8_bom_len(input: &[u8]) -> usize {
    if input.starts_with(&UTF8_BOM) {
        UTF8_BOM.len()
    } else {
        0
    }
}

/// Normalize raw input to UTF-8 bytes.
///
/// A UTF-8 BOM is stripped. UTF-16 input is transcoded. The result is
/// checked to be valid UTF-8 so later stages can work with `str`.
pub fn convert_to_utf8(input: Vec<u8>) -> Result<Vec<u8>> {
    let utf8 = match XmlEncoding::detect(&input) {
        XmlEncoding::Utf8 => {
            let bom = utf8_bom_len(&input);
            if bom > 0 {
                input[bom..].to_vec()
            } else {
                input
            }
        }
        XmlEncoding::Utf16Le => decode_utf16(&input, [0xFF, 0xFE], u16::from_le_bytes)?,
        XmlEncoding::Utf16Be => decode_utf16(&input, [0xFE, 0xFF], u16::from_be_bytes)?,
    };

    if let Err(e) = std::str::from_utf8(&utf8) {
        return Err(DocumentError::malformed_at(
            format!("invalid UTF-8: {}", e),
            e.valid_up_to() as u64,
        ));
    }
    Ok(utf8)
}

fn decode_utf16(input: &[u8], bom: [u8; 2], unit: fn([u8; 2]) -> u16) -> Result<Vec<u8>> {
    let start = if input.starts_with(&bom) { 2 } else { 0 };
    let bytes = &input[start..];

    if bytes.len() % 2 != 0 {
        return Err(DocumentError::malformed("invalid UTF-16: odd number of bytes"));
    }

    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| unit([chunk[0], chunk[1]]))
        .collect();

    String::from_utf16(&code_units)
        .map(String::into_bytes)
        .map_err(|e| DocumentError::malformed(format!("invalid UTF-16: {}", e)))
}
