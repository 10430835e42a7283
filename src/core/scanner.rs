//! Markup boundary scanning using memchr
//!
//! A lazily fetched document arrives in arbitrary chunks. The chunked parser
//! only hands complete markup to the tokenizer, so it needs the offset just
//! past the last complete construct in its buffer. Text after that point is
//! held back until the next '<' arrives, which keeps text nodes whole.

use memchr::{memchr, memmem};

/// Offset just past the last complete markup construct in `buf`.
///
/// Returns 0 when no construct is complete yet.
pub fn find_safe_boundary(buf: &[u8]) -> usize {
    let mut pos = 0;
    let mut safe = 0;

    while let Some(offset) = memchr(b'<', &buf[pos..]) {
        let start = pos + offset;
        match construct_len(&buf[start..]) {
            Some(len) => {
                pos = start + len;
                safe = pos;
            }
            None => break,
        }
    }
    safe
}

/// Length of the construct starting at `rest[0] == b'<'`, or None when it is
/// not complete in `rest`.
fn construct_len(rest: &[u8]) -> Option<usize> {
    // Too short to tell a comment or CDATA section from a declaration
    if is_partial_prefix(rest, b"<!--") || is_partial_prefix(rest, b"<![CDATA[") {
        return None;
    }

    if rest.starts_with(b"<!--") {
        find_after(rest, 4, b"-->")
    } else if rest.starts_with(b"<![CDATA[") {
        find_after(rest, 9, b"]]>")
    } else if rest.starts_with(b"<?") {
        find_after(rest, 2, b"?>")
    } else if rest.starts_with(b"<!") {
        declaration_end(rest)
    } else {
        tag_end(rest)
    }
}

#[inline]
fn is_partial_prefix(rest: &[u8], marker: &[u8]) -> bool {
    rest.len() < marker.len() && marker.starts_with(rest)
}

#[inline]
fn find_after(rest: &[u8], skip: usize, terminator: &[u8]) -> Option<usize> {
    memmem::find(&rest[skip..], terminator).map(|i| skip + i + terminator.len())
}

/// End of a start/end/empty tag: the first '>' outside quoted attribute values.
fn tag_end(rest: &[u8]) -> Option<usize> {
    let mut in_single = false;
    let mut in_double = false;

    for (i, &b) in rest.iter().enumerate().skip(1) {
        match b {
            b'"' if !in_single => in_double = !in_double,
            b'\'' if !in_double => in_single = !in_single,
            b'>' if !in_single && !in_double => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// End of a `<!DOCTYPE ...>` declaration, which may carry an internal subset
/// in brackets containing its own '>' characters.
fn declaration_end(rest: &[u8]) -> Option<usize> {
    let mut in_single = false;
    let mut in_double = false;
    let mut depth = 0usize;

    for (i, &b) in rest.iter().enumerate().skip(2) {
        match b {
            b'"' if !in_single => in_double = !in_double,
            b'\'' if !in_double => in_single = !in_single,
            b'[' if !in_single && !in_double => depth += 1,
            b']' if !in_single && !in_double => depth = depth.saturating_sub(1),
            b'>' if !in_single && !in_double && depth == 0 => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// XML name start byte: ASCII letter, underscore, colon, or any byte of a
/// non-ASCII UTF-8 sequence
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// XML name byte: a start byte, digit, hyphen or period
#[inline]
pub fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

/// Whether `name` is a well-formed XML name
pub fn is_valid_name(name: &str) -> bool {
    match name.as_bytes().split_first() {
        Some((&first, rest)) => is_name_start_char(first) && rest.iter().all(|&b| is_name_char(b)),
        None => false,
    }
}
