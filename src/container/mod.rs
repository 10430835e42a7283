//! Container interfaces
//!
//! A container stores named documents. Handles come out of a container
//! either fully loaded or lazily backed by a cursor, depending on the
//! [`EvaluationMode`] of the fetch.

pub mod manager;
pub mod memory;

use serde::Deserialize;

pub use manager::Manager;
pub use memory::MemoryContainer;

use crate::document::DocumentHandle;
use crate::error::Result;

/// How a fetched document's content and metadata are loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Parse the content and read all metadata at fetch time
    #[default]
    Eager,
    /// Read content and metadata from cursors as they are needed
    Lazy,
}

/// Name to store a document under
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameChoice {
    /// The handle's own name, or a generated one if the handle has none
    Handle,
    /// This exact name
    Explicit(String),
    /// A fresh unique name, built from the handle's name when it has one
    Generate,
}

/// Name bookkeeping a bound handle needs from its container
pub trait NameRegistry {
    fn container_name(&self) -> &str;

    /// Move the document stored under `from` to `to`.
    ///
    /// Fails with `DuplicateName` if `to` is taken and `NotFound` if
    /// nothing is stored under `from`.
    fn rename(&self, from: &str, to: &str) -> Result<()>;
}

/// Document storage as seen by the handle layer
pub trait Container {
    fn name(&self) -> &str;

    /// A new, unattached document
    fn create_empty_document(&self) -> DocumentHandle {
        DocumentHandle::new()
    }

    /// A bound handle for the document stored under `name`
    fn fetch_document(&self, name: &str, mode: EvaluationMode) -> Result<DocumentHandle>;

    /// Store a copy of the handle's content and metadata under a new name
    /// and return that name. An unattached handle becomes bound to this
    /// container.
    fn put_document(&self, handle: &DocumentHandle, name: NameChoice) -> Result<String>;

    /// Overwrite the stored document with the handle's current state
    fn update_document(&self, handle: &DocumentHandle) -> Result<()>;
}
