//! DOM Module - Arena-based XML tree
//!
//! Implements an efficient tree representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names and character data
//! - Namespace resolution while the tree is built

pub mod node;
pub mod strings;
pub mod tree;

pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
pub use strings::StringPool;
pub use tree::{ChildIter, DescendantIter, TreeBuilder, XmlDeclaration, XmlTree, XML_NAMESPACE};
