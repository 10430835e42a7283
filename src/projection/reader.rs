//! Streaming Reader Projection
//!
//! Forward-only, single-pass event reader over a document's content. The
//! reader replays the arena tree in node-id order, which is document order.
//! When the content is still lazy it asks the cell for the next chunk only
//! once it has run out of known nodes, so reading the first few events of a
//! large document never materializes the rest of it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::content::ContentCell;
use crate::dom::{NodeId, NodeKind, XmlTree, DOCUMENT_NODE};
use crate::error::{DocumentError, Result};
use crate::reader::events::XmlEvent;

/// Pull reader over a content cell
pub struct ContentReader {
    cell: Rc<RefCell<ContentCell>>,
    /// Cell generation this reader was created against
    generation: u64,
    /// Next node to replay
    next_node: NodeId,
    /// Elements started but not yet ended
    open: Vec<NodeId>,
    pending: VecDeque<XmlEvent>,
    started: bool,
    finished: bool,
}

enum Step {
    /// The next node is known and has been turned into events
    Emitted,
    /// The reader needs more of the document
    NeedMore,
    /// Every node has been replayed
    Exhausted,
}

impl ContentReader {
    pub fn new(cell: Rc<RefCell<ContentCell>>) -> Self {
        let generation = cell.borrow().generation();
        ContentReader {
            cell,
            generation,
            next_node: DOCUMENT_NODE + 1,
            open: Vec::new(),
            pending: VecDeque::new(),
            started: false,
            finished: false,
        }
    }

    /// Next event, or `None` after `EndDocument` has been returned.
    ///
    /// Fails with `StaleReader` if the content was replaced since the
    /// reader was created, and with `ReentrantMaterialization` if called
    /// while the same content is being materialized.
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.finished {
                return Ok(None);
            }

            let shared = Rc::clone(&self.cell);
            let mut cell = shared
                .try_borrow_mut()
                .map_err(|_| DocumentError::ReentrantMaterialization)?;
            if cell.generation() != self.generation {
                return Err(DocumentError::StaleReader);
            }

            match self.step(&cell) {
                Step::Emitted => {}
                Step::NeedMore => {
                    cell.pull_next()?;
                }
                Step::Exhausted => {
                    while let Some(id) = self.open.pop() {
                        self.push_end(cell.known_tree(), id);
                    }
                    self.pending.push_back(XmlEvent::EndDocument);
                    self.finished = true;
                }
            }
        }
    }

    /// True once `EndDocument` has been handed out
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }

    fn step(&mut self, cell: &ContentCell) -> Step {
        let tree = cell.known_tree();
        let node = tree.and_then(|t| t.get_node(self.next_node).map(|n| (t, n)));

        if !self.started {
            if node.is_none() && !cell.is_complete() {
                return Step::NeedMore;
            }
            self.started = true;
            if let Some(decl) = tree.and_then(XmlTree::declaration) {
                self.pending.push_back(XmlEvent::Declaration {
                    version: decl.version.clone(),
                    encoding: decl.encoding.clone(),
                    standalone: decl.standalone,
                });
            }
        }

        let (tree, node) = match node {
            Some(found) => found,
            None if cell.is_complete() => return Step::Exhausted,
            None => return Step::NeedMore,
        };

        while let Some(&top) = self.open.last() {
            if Some(top) == node.parent {
                break;
            }
            self.open.pop();
            self.push_end(Some(tree), top);
        }

        let id = self.next_node;
        let value = || tree.node_value(id).unwrap_or("").to_string();
        let event = match node.kind {
            NodeKind::Element => {
                let name = tree.node_name(id).unwrap_or("").to_string();
                let attributes = tree
                    .attribute_pairs(id)
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                if node.has_children() {
                    self.open.push(id);
                    XmlEvent::StartElement { name, attributes }
                } else if cell.is_open(id) {
                    // Children may still arrive with the next chunk
                    if self.pending.is_empty() {
                        return Step::NeedMore;
                    }
                    return Step::Emitted;
                } else {
                    XmlEvent::EmptyElement { name, attributes }
                }
            }
            NodeKind::Text => XmlEvent::Text(value()),
            NodeKind::CData => XmlEvent::CData(value()),
            NodeKind::Comment => XmlEvent::Comment(value()),
            NodeKind::DocumentType => XmlEvent::DocType(value()),
            NodeKind::ProcessingInstruction => XmlEvent::ProcessingInstruction {
                target: tree.node_name(id).unwrap_or("").to_string(),
                data: value(),
            },
            NodeKind::Document => {
                self.next_node += 1;
                return Step::Emitted;
            }
        };

        self.pending.push_back(event);
        self.next_node += 1;
        Step::Emitted
    }

    fn push_end(&mut self, tree: Option<&XmlTree>, id: NodeId) {
        let name = tree
            .and_then(|t| t.node_name(id))
            .unwrap_or("")
            .to_string();
        self.pending.push_back(XmlEvent::EndElement { name });
    }
}

impl Iterator for ContentReader {
    type Item = Result<XmlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event() {
            Ok(event) => event.map(Ok),
            Err(err) => {
                // A failed reader yields the error once and then ends
                self.finished = true;
                self.pending.clear();
                Some(Err(err))
            }
        }
    }
}

impl std::fmt::Debug for ContentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentReader")
            .field("generation", &self.generation)
            .field("next_node", &self.next_node)
            .field("depth", &self.open.len())
            .field("finished", &self.finished)
            .finish()
    }
}
