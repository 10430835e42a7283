//! Chunked XML Parser
//!
//! Stateful parser that consumes a document in arbitrary chunks, as they are
//! pulled from a backing-store cursor. Only complete markup is tokenized;
//! anything after the last complete construct stays buffered until the next
//! chunk arrives.

use super::events::XmlEvent;
use super::parser::{parse_fragment, WellFormedness};
use crate::core::encoding::utf8_bom_len;
use crate::core::scanner::find_safe_boundary;
use crate::error::{DocumentError, Result};

/// Stateful chunked XML parser
pub struct ChunkedParser {
    /// Accumulated bytes not yet tokenized
    buffer: Vec<u8>,
    /// Absolute document offset of `buffer[0]`
    consumed: u64,
    /// Structure checks spanning all chunks
    checks: WellFormedness,
    /// Set once `finish` has run
    finished: bool,
}

impl ChunkedParser {
    pub fn new() -> Self {
        ChunkedParser {
            buffer: Vec::with_capacity(8192),
            consumed: 0,
            checks: WellFormedness::new(),
            finished: false,
        }
    }

    /// Feed a chunk of data, emitting events for every complete construct.
    pub fn feed<F>(&mut self, chunk: &[u8], sink: &mut F) -> Result<()>
    where
        F: FnMut(XmlEvent),
    {
        if self.finished {
            return Err(DocumentError::malformed("data after end of document"));
        }
        self.buffer.extend_from_slice(chunk);

        if self.consumed == 0 {
            let bom = utf8_bom_len(&self.buffer);
            if bom > 0 {
                self.buffer.drain(..bom);
                self.consumed = bom as u64;
            }
        }

        let boundary = find_safe_boundary(&self.buffer);
        if boundary == 0 {
            return Ok(());
        }

        parse_fragment(&self.buffer[..boundary], self.consumed, &mut self.checks, sink)?;

        self.buffer.drain(..boundary);
        self.consumed += boundary as u64;
        Ok(())
    }

    /// Finalize parsing: tokenize whatever is left and run the end-of-document checks.
    pub fn finish<F>(&mut self, sink: &mut F) -> Result<()>
    where
        F: FnMut(XmlEvent),
    {
        if self.finished {
            return Ok(());
        }

        let remaining = std::mem::take(&mut self.buffer);
        parse_fragment(&remaining, self.consumed, &mut self.checks, sink)?;
        self.consumed += remaining.len() as u64;

        self.checks
            .finish()
            .map_err(|msg| DocumentError::malformed_at(msg, self.consumed))?;
        self.finished = true;
        sink(XmlEvent::EndDocument);
        Ok(())
    }

    /// Number of buffered bytes waiting for more input
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes tokenized so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Check if there's unprocessed data
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Default for ChunkedParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chunks: &[&[u8]]) -> Result<Vec<XmlEvent>> {
        let mut parser = ChunkedParser::new();
        let mut out = Vec::new();
        for chunk in chunks {
            parser.feed(chunk, &mut |e| out.push(e))?;
        }
        parser.finish(&mut |e| out.push(e))?;
        Ok(out)
    }

    #[test]
    fn test_chunks_match_whole() {
        let whole = run(&[b"<root><item a=\"x\">text</item><!-- c --></root>"]).unwrap();
        let split = run(&[
            b"<ro",
            b"ot><item a=\"",
            b"x\">te",
            b"xt</item><!-",
            b"- c --></root>",
        ])
        .unwrap();
        assert_eq!(whole, split);
    }

    #[test]
    fn test_text_not_split() {
        let out = run(&[b"<r>hel", b"lo</r>"]).unwrap();
        assert_eq!(out[1], XmlEvent::Text("hello".to_string()));
    }

    #[test]
    fn test_buffering() {
        let mut parser = ChunkedParser::new();
        let mut out = Vec::new();
        parser.feed(b"<root><ite", &mut |e| out.push(e)).unwrap();
        assert_eq!(out.len(), 1);
        assert!(parser.has_pending());
        assert_eq!(parser.buffer_size(), 4);
        assert_eq!(parser.consumed(), 6);
    }

    #[test]
    fn test_mismatch_across_chunks() {
        let err = run(&[b"<a><b>", b"</a>"]).unwrap_err();
        match err {
            DocumentError::MalformedContent { position, .. } => assert_eq!(position, Some(6)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unclosed_at_finish() {
        assert!(run(&[b"<a><b></b>"]).unwrap_err().is_malformed());
    }

    #[test]
    fn test_bom_stripped() {
        let out = run(&[&[0xEF, 0xBB], &[0xBF, b'<', b'a', b'/', b'>']]).unwrap();
        assert!(out[0].is_start_element());
    }
}
