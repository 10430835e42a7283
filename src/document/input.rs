//! Streaming content input

use std::io::{self, Read};

/// Byte stream supplying new document content.
///
/// Wraps any [`Read`] implementation; the stream is read to its end when
/// handed to `DocumentHandle::set_content_stream`.
pub struct XmlInputStream {
    reader: Box<dyn Read>,
}

impl XmlInputStream {
    pub fn new(reader: impl Read + 'static) -> Self {
        XmlInputStream {
            reader: Box::new(reader),
        }
    }

    /// Read everything that is left in the stream
    pub fn read_all(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for XmlInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl From<Vec<u8>> for XmlInputStream {
    fn from(bytes: Vec<u8>) -> Self {
        XmlInputStream::new(io::Cursor::new(bytes))
    }
}

impl std::fmt::Debug for XmlInputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlInputStream").finish_non_exhaustive()
    }
}
