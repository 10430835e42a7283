//! xmlstore - Shared, lazily materialized XML document handles
//!
//! Layers, bottom up:
//! - core / reader: byte handling, quick-xml tokenizing, chunked parsing
//! - dom: arena tree with string interning, built incrementally
//! - content: Empty / Lazy / Materialized content cell
//! - metadata: `(uri, name)` keyed side table of typed or untyped values
//! - projection: text, streaming reader and owned element views of content
//! - document: the shared handle combining name, content and metadata
//! - container: storage interfaces plus an in-memory implementation
//!
//! ```
//! use xmlstore::{Container, EvaluationMode, MemoryContainer, NameChoice, XmlData};
//!
//! let container = MemoryContainer::new("books.dbxml");
//! let doc = container.create_empty_document();
//! doc.set_content("<book><title>Dune</title></book>")?;
//! doc.set_metadata("", "owner", XmlData::from("alice"))?;
//! container.put_document(&doc, NameChoice::Explicit("dune.xml".into()))?;
//!
//! let fetched = container.fetch_document("dune.xml", EvaluationMode::Lazy)?;
//! assert_eq!(fetched.content_as_text()?, "<book><title>Dune</title></book>");
//! # Ok::<(), xmlstore::DocumentError>(())
//! ```

pub mod config;
pub mod container;
pub mod content;
pub mod core;
pub mod document;
pub mod dom;
pub mod error;
pub mod metadata;
pub mod projection;
pub mod reader;

pub use config::StoreConfig;
pub use container::{Container, EvaluationMode, Manager, MemoryContainer, NameChoice, NameRegistry};
pub use content::{ContentCell, ContentSource, ContentState};
pub use document::{DocumentHandle, HandleState, XmlInputStream};
pub use dom::XmlTree;
pub use error::{DocumentError, Result};
pub use metadata::{
    MetadataEntry, MetadataIterator, MetadataSource, MetadataStore, MetadataValue, TypedValue,
    ValueKind, XmlData, NAME_METADATA_NAME, NAME_METADATA_URI,
};
pub use projection::{ContentReader, Element, Node, TextReader};
pub use reader::XmlEvent;
