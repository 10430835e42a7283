//! Read projections over document content
//!
//! - Text: canonical serialization, plus an `io::Read` over it
//! - Reader: forward-only event stream that can run ahead of materialization
//! - Element: owned element tree detached from the arena

pub mod element;
pub mod reader;
pub mod text;

pub use element::{Attribute, Element, Node};
pub use reader::ContentReader;
pub use text::{serialize_node, serialize_tree, TextReader};
