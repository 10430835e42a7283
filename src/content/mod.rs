//! Document content cell
//!
//! A [`ContentCell`] holds a document's XML content in one of three states:
//!
//! - `Empty`: nothing has been set or fetched
//! - `Lazy`: a partial tree still being read from a backing-store cursor
//! - `Materialized`: the complete tree
//!
//! Only the projections that need the whole document (text and tree) force
//! materialization. The streaming reader pulls from the cursor on demand.
//! A materialized cell only changes again through [`ContentCell::replace`].

pub mod lazy;
pub mod source;

use std::rc::Rc;

pub use lazy::LazyContent;
pub use source::{ChunkedBytes, ContentSource, ReadSource};

use crate::dom::{NodeId, XmlTree};
use crate::error::Result;
use crate::projection::text::serialize_tree;

/// Observable state of a content cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentState {
    Empty,
    Lazy,
    Materialized,
}

#[derive(Debug)]
enum CellState {
    Empty,
    Lazy(Box<LazyContent>),
    Materialized(Rc<XmlTree>),
}

/// Tri-state holder of a document's content
#[derive(Debug)]
pub struct ContentCell {
    state: CellState,
    /// Bumped on every replacement so readers can detect stale positions
    generation: u64,
}

impl ContentCell {
    /// An empty cell
    pub fn new() -> Self {
        ContentCell {
            state: CellState::Empty,
            generation: 0,
        }
    }

    /// A cell that reads its content from `source` on demand
    pub fn lazy(source: Box<dyn ContentSource>) -> Self {
        ContentCell {
            state: CellState::Lazy(Box::new(LazyContent::new(source))),
            generation: 0,
        }
    }

    /// A cell holding an already parsed tree
    pub fn materialized(tree: Rc<XmlTree>) -> Self {
        ContentCell {
            state: CellState::Materialized(tree),
            generation: 0,
        }
    }

    pub fn state(&self) -> ContentState {
        match self.state {
            CellState::Empty => ContentState::Empty,
            CellState::Lazy(_) => ContentState::Lazy,
            CellState::Materialized(_) => ContentState::Materialized,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Complete the tree and switch to `Materialized`.
    ///
    /// A materialized cell returns its tree unchanged. An empty cell becomes
    /// an empty document. A lazy cell drains its cursor first; on error the
    /// cell stays lazy and the error is returned again by later calls.
    pub fn materialize_full(&mut self) -> Result<Rc<XmlTree>> {
        match &mut self.state {
            CellState::Materialized(tree) => return Ok(Rc::clone(tree)),
            CellState::Empty => {
                tracing::debug!("materializing empty content");
            }
            CellState::Lazy(lazy) => {
                tracing::debug!(consumed = lazy.consumed(), "materializing lazy content");
                lazy.drain()?;
            }
        }

        let tree = match std::mem::replace(&mut self.state, CellState::Empty) {
            CellState::Lazy(lazy) => lazy.into_tree(),
            _ => XmlTree::new(),
        };
        let tree = Rc::new(tree);
        tracing::debug!(nodes = tree.node_count(), "content materialized");
        self.state = CellState::Materialized(Rc::clone(&tree));
        Ok(tree)
    }

    /// Canonical serialization of the whole document
    pub fn as_text(&mut self) -> Result<String> {
        let tree = self.materialize_full()?;
        Ok(serialize_tree(&tree))
    }

    /// The complete parsed tree
    pub fn as_tree(&mut self) -> Result<Rc<XmlTree>> {
        self.materialize_full()
    }

    /// Parse `input` and, if it is well-formed, make it the new content.
    ///
    /// On error the cell is left exactly as it was.
    pub fn replace(&mut self, input: Vec<u8>) -> Result<()> {
        let tree = XmlTree::parse(input)?;
        self.replace_tree(tree);
        Ok(())
    }

    /// Install an already parsed tree as the new content
    pub fn replace_tree(&mut self, tree: XmlTree) {
        tracing::debug!(
            generation = self.generation + 1,
            nodes = tree.node_count(),
            "replacing document content"
        );
        self.state = CellState::Materialized(Rc::new(tree));
        self.generation += 1;
    }

    /// Advance a lazy cell by one chunk.
    ///
    /// Once the cursor is exhausted the cell switches to `Materialized`.
    /// Returns true when the content is complete.
    pub fn pull_next(&mut self) -> Result<bool> {
        let complete = match &mut self.state {
            CellState::Lazy(lazy) => lazy.pull()?,
            _ => return Ok(true),
        };
        if complete {
            self.materialize_full()?;
        }
        Ok(complete)
    }

    /// The tree as known so far, if any content exists
    pub(crate) fn known_tree(&self) -> Option<&XmlTree> {
        match &self.state {
            CellState::Empty => None,
            CellState::Lazy(lazy) => Some(lazy.tree()),
            CellState::Materialized(tree) => Some(tree.as_ref()),
        }
    }

    /// True if `id` is an element whose end tag has not been read yet
    pub(crate) fn is_open(&self, id: NodeId) -> bool {
        match &self.state {
            CellState::Lazy(lazy) => lazy.builder().is_open(id),
            _ => false,
        }
    }

    /// True unless more content is waiting in a cursor
    pub fn is_complete(&self) -> bool {
        !matches!(self.state, CellState::Lazy(_))
    }
}

impl Default for ContentCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_cell(input: &str, chunk_size: usize) -> ContentCell {
        ContentCell::lazy(Box::new(ChunkedBytes::new(
            Rc::from(input.as_bytes()),
            chunk_size,
        )))
    }

    #[test]
    fn test_empty_materializes_to_empty_document() {
        let mut cell = ContentCell::new();
        assert_eq!(cell.state(), ContentState::Empty);
        let tree = cell.materialize_full().unwrap();
        assert!(tree.is_empty());
        assert_eq!(cell.state(), ContentState::Materialized);
        assert_eq!(cell.as_text().unwrap(), "");
    }

    #[test]
    fn test_lazy_materialize_idempotent() {
        let mut cell = lazy_cell("<a><b>x</b></a>", 3);
        assert_eq!(cell.state(), ContentState::Lazy);
        let first = cell.materialize_full().unwrap();
        let second = cell.materialize_full().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cell.as_text().unwrap(), "<a><b>x</b></a>");
    }

    #[test]
    fn test_replace() {
        let mut cell = lazy_cell("<old/>", 2);
        cell.replace(b"<new/>".to_vec()).unwrap();
        assert_eq!(cell.state(), ContentState::Materialized);
        assert_eq!(cell.generation(), 1);
        assert_eq!(cell.as_text().unwrap(), "<new/>");
    }

    #[test]
    fn test_replace_malformed_leaves_state() {
        let mut cell = ContentCell::new();
        cell.replace(b"<a/>".to_vec()).unwrap();
        let err = cell.replace(b"<a>".to_vec()).unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(cell.generation(), 1);
        assert_eq!(cell.as_text().unwrap(), "<a/>");

        let mut empty = ContentCell::new();
        assert!(empty.replace(b"not xml".to_vec()).is_err());
        assert_eq!(empty.state(), ContentState::Empty);
    }

    #[test]
    fn test_lazy_malformed_surfaces() {
        let mut cell = lazy_cell("<a><b></a>", 4);
        assert!(cell.as_text().unwrap_err().is_malformed());
        assert_eq!(cell.state(), ContentState::Lazy);
        assert!(cell.materialize_full().unwrap_err().is_malformed());
    }

    #[test]
    fn test_pull_next_transitions() {
        let mut cell = lazy_cell("<a/>", 100);
        assert!(!cell.pull_next().unwrap());
        assert!(cell.known_tree().is_some());
        assert!(cell.pull_next().unwrap());
        assert_eq!(cell.state(), ContentState::Materialized);
        assert!(cell.is_complete());
    }
}
