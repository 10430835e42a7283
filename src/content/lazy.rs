//! Lazy content
//!
//! A partially built tree plus the cursor it is being built from. Each pull
//! reads one chunk, tokenizes the complete markup in it and appends the
//! resulting nodes to the tree.

use super::source::ContentSource;
use crate::dom::{TreeBuilder, XmlTree};
use crate::error::{DocumentError, Result};
use crate::reader::ChunkedParser;

pub struct LazyContent {
    builder: TreeBuilder,
    parser: ChunkedParser,
    source: Box<dyn ContentSource>,
    /// First error hit while pulling; later pulls report it again
    failure: Option<DocumentError>,
}

impl LazyContent {
    pub fn new(source: Box<dyn ContentSource>) -> Self {
        LazyContent {
            builder: TreeBuilder::new(),
            parser: ChunkedParser::new(),
            source,
            failure: None,
        }
    }

    /// Pull one chunk from the cursor. Returns true once the document is complete.
    pub fn pull(&mut self) -> Result<bool> {
        if self.builder.is_complete() {
            return Ok(true);
        }
        if let Some(err) = &self.failure {
            return Err(replay(err));
        }

        match self.pull_chunk() {
            Ok(()) => Ok(self.builder.is_complete()),
            Err(err) => {
                self.failure = Some(replay(&err));
                Err(err)
            }
        }
    }

    fn pull_chunk(&mut self) -> Result<()> {
        let builder = &mut self.builder;
        match self.source.next_chunk()? {
            Some(chunk) => {
                tracing::trace!(
                    bytes = chunk.len(),
                    consumed = self.parser.consumed(),
                    "pulled content chunk"
                );
                self.parser.feed(&chunk, &mut |event| builder.push(event))
            }
            None => {
                tracing::trace!(consumed = self.parser.consumed(), "content source exhausted");
                self.parser.finish(&mut |event| builder.push(event))
            }
        }
    }

    /// Pull until the document is complete
    pub fn drain(&mut self) -> Result<()> {
        while !self.pull()? {}
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.builder.is_complete()
    }

    /// Bytes of content tokenized so far
    pub fn consumed(&self) -> u64 {
        self.parser.consumed()
    }

    pub fn builder(&self) -> &TreeBuilder {
        &self.builder
    }

    /// The tree as known so far
    pub fn tree(&self) -> &XmlTree {
        self.builder.tree()
    }

    pub fn into_tree(self) -> XmlTree {
        self.builder.finish()
    }
}

impl std::fmt::Debug for LazyContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyContent")
            .field("consumed", &self.parser.consumed())
            .field("complete", &self.builder.is_complete())
            .field("failed", &self.failure.is_some())
            .finish()
    }
}

fn replay(err: &DocumentError) -> DocumentError {
    match err {
        DocumentError::MalformedContent { message, position } => DocumentError::MalformedContent {
            message: message.clone(),
            position: *position,
        },
        DocumentError::Source(message) => DocumentError::Source(message.clone()),
        other => DocumentError::Source(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::source::ChunkedBytes;
    use std::rc::Rc;

    fn lazy(input: &str, chunk_size: usize) -> LazyContent {
        LazyContent::new(Box::new(ChunkedBytes::new(
            Rc::from(input.as_bytes()),
            chunk_size,
        )))
    }

    #[test]
    fn test_pull_grows_tree() {
        let mut content = lazy("<root><a/><b/><c/></root>", 8);
        assert!(!content.pull().unwrap());
        let after_one = content.tree().node_count();
        assert!(after_one < 5);

        content.drain().unwrap();
        assert!(content.is_complete());
        assert_eq!(content.tree().node_count(), 5);
        assert!(content.pull().unwrap());
    }

    #[test]
    fn test_failure_is_sticky() {
        let mut content = lazy("<a><b></a>", 4);
        let first = content.drain().unwrap_err();
        assert!(first.is_malformed());
        assert!(content.pull().unwrap_err().is_malformed());
    }

    #[test]
    fn test_into_tree() {
        let mut content = lazy("<a>text</a>", 2);
        content.drain().unwrap();
        let tree = content.into_tree();
        let root = tree.root_element_id().unwrap();
        assert_eq!(tree.string_value(root), "text");
    }
}
