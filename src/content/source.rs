//! Backing-store cursors
//!
//! A lazily fetched document reads its bytes through a [`ContentSource`],
//! one chunk per pull. Cursors only move forward.

use std::io::Read;
use std::rc::Rc;

use crate::error::Result;

/// Forward-only cursor over stored document bytes.
///
/// Sources must yield UTF-8. `None` marks the end of the document; a source
/// is not polled again after returning it.
pub trait ContentSource {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

impl<S: ContentSource + ?Sized> ContentSource for Box<S> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        (**self).next_chunk()
    }
}

/// Cursor over an in-memory buffer, handing out fixed-size chunks
#[derive(Debug, Clone)]
pub struct ChunkedBytes {
    data: Rc<[u8]>,
    pos: usize,
    chunk_size: usize,
}

impl ChunkedBytes {
    pub fn new(data: Rc<[u8]>, chunk_size: usize) -> Self {
        ChunkedBytes {
            data,
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl ContentSource for ChunkedBytes {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(chunk))
    }
}

/// Cursor over any [`Read`] implementation
pub struct ReadSource<R> {
    reader: R,
    chunk_size: usize,
}

impl<R: Read> ReadSource<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        ReadSource {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<R: Read> ContentSource for ReadSource<R> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    chunk.truncate(n);
                    return Ok(Some(chunk));
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_bytes() {
        let mut source = ChunkedBytes::new(Rc::from(&b"abcdefg"[..]), 3);
        assert_eq!(source.next_chunk().unwrap(), Some(b"abc".to_vec()));
        assert_eq!(source.remaining(), 4);
        assert_eq!(source.next_chunk().unwrap(), Some(b"def".to_vec()));
        assert_eq!(source.next_chunk().unwrap(), Some(b"g".to_vec()));
        assert_eq!(source.next_chunk().unwrap(), None);
    }

    #[test]
    fn test_zero_chunk_size() {
        let mut source = ChunkedBytes::new(Rc::from(&b"ab"[..]), 0);
        assert_eq!(source.next_chunk().unwrap(), Some(b"a".to_vec()));
    }

    #[test]
    fn test_read_source() {
        let mut source = ReadSource::new(&b"hello"[..], 4);
        assert_eq!(source.next_chunk().unwrap(), Some(b"hell".to_vec()));
        assert_eq!(source.next_chunk().unwrap(), Some(b"o".to_vec()));
        assert_eq!(source.next_chunk().unwrap(), None);
    }
}
