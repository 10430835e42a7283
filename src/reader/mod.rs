//! XML Reader Module
//!
//! - Events: owned XML event types
//! - Parser: quick-xml tokenizing with document-level well-formedness checks
//! - Chunked: incremental parsing of a document fed in pieces

pub mod chunked;
pub mod events;
pub mod parser;

pub use chunked::ChunkedParser;
pub use events::XmlEvent;
pub use parser::parse_document;
