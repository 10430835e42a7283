//! Document handles
//!
//! A [`DocumentHandle`] is a cheap, clonable reference to a shared
//! [`DocumentBody`]. Every clone reads and writes the same name, content and
//! metadata, and a write through one clone is visible through all others.
//!
//! Lifecycle:
//! - `New`: created empty, not attached to a container
//! - `Bound`: attached to a container under a name
//! - `Disposed`: this handle has released its body; every call fails with
//!   `UseAfterDispose`. Other clones are unaffected.

pub mod body;
pub mod input;

use std::rc::Rc;

pub use body::DocumentBody;
pub use input::XmlInputStream;

use crate::container::NameRegistry;
use crate::content::{ContentCell, ContentState};
use crate::dom::XmlTree;
use crate::error::{DocumentError, Result};
use crate::metadata::{
    MetadataIterator, MetadataStore, MetadataValue, TypedValue, ValueKind, XmlData,
    NAME_METADATA_NAME, NAME_METADATA_URI,
};
use crate::projection::{ContentReader, Element, TextReader};

/// Lifecycle state of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    New,
    Bound,
    Disposed,
}

/// Shared handle to a document body
#[derive(Clone)]
pub struct DocumentHandle {
    body: Option<Rc<DocumentBody>>,
}

impl DocumentHandle {
    /// A new, unnamed document with empty content and no metadata
    pub fn new() -> Self {
        DocumentHandle {
            body: Some(Rc::new(DocumentBody::new())),
        }
    }

    /// A handle for a stored document, attached to `registry` under `name`
    pub fn bound(
        name: impl Into<String>,
        content: ContentCell,
        metadata: MetadataStore,
        registry: Rc<dyn NameRegistry>,
    ) -> Self {
        let body = DocumentBody::from_parts(None, content, metadata);
        body.bind(name.into(), registry);
        DocumentHandle {
            body: Some(Rc::new(body)),
        }
    }

    fn body(&self) -> Result<&Rc<DocumentBody>> {
        self.body.as_ref().ok_or_else(|| {
            tracing::warn!("operation on disposed document handle");
            DocumentError::UseAfterDispose
        })
    }

    pub fn state(&self) -> HandleState {
        match &self.body {
            None => HandleState::Disposed,
            Some(body) if body.is_bound() => HandleState::Bound,
            Some(_) => HandleState::New,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.body.is_none()
    }

    /// True if both handles point at the same body
    pub fn shares_body_with(&self, other: &DocumentHandle) -> bool {
        match (&self.body, &other.body) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Number of live handles sharing this body
    pub fn handle_count(&self) -> usize {
        self.body.as_ref().map_or(0, Rc::strong_count)
    }

    // =========================================================================
    // Name
    // =========================================================================

    /// The document name; `None` for a new document that has not been named
    pub fn name(&self) -> Result<Option<String>> {
        Ok(self.body()?.name())
    }

    /// Set the document name.
    ///
    /// On a new document this only records the name; an empty name clears it
    /// so the container generates one on attach. On a bound document the
    /// rename goes to the container, which fails with `DuplicateName` if the
    /// name is taken.
    pub fn set_name(&self, name: &str) -> Result<()> {
        let body = self.body()?;
        let registry = match body.registry() {
            Some(registry) => registry,
            None => {
                body.set_name((!name.is_empty()).then(|| name.to_string()));
                return Ok(());
            }
        };

        if name.is_empty() {
            return Err(DocumentError::InvalidName(
                "a bound document needs a non-empty name".to_string(),
            ));
        }
        let current = body.name().unwrap_or_default();
        if current == name {
            return Ok(());
        }

        registry.rename(&current, name)?;
        tracing::debug!(
            container = registry.container_name(),
            from = %current,
            to = name,
            "renamed document"
        );
        body.set_name(Some(name.to_string()));
        Ok(())
    }

    /// Attach a new document to a container
    pub(crate) fn bind(&self, name: String, registry: Rc<dyn NameRegistry>) -> Result<()> {
        self.body()?.bind(name, registry);
        Ok(())
    }

    /// The container this handle is bound to, if any
    pub(crate) fn registry(&self) -> Result<Option<Rc<dyn NameRegistry>>> {
        Ok(self.body()?.registry())
    }

    // =========================================================================
    // Content
    // =========================================================================

    pub fn content_state(&self) -> Result<ContentState> {
        self.body()?.with_content(|cell| Ok(cell.state()))
    }

    /// Serialized content. Materializes a lazily fetched document.
    pub fn content_as_text(&self) -> Result<String> {
        self.body()?.with_content(|cell| cell.as_text())
    }

    /// Byte stream over the serialized content
    pub fn content_as_text_reader(&self) -> Result<TextReader> {
        Ok(TextReader::new(self.content_as_text()?))
    }

    /// Forward-only event reader. Does not force materialization.
    pub fn content_as_reader(&self) -> Result<ContentReader> {
        let body = self.body()?;
        Ok(ContentReader::new(Rc::clone(body.content_cell())))
    }

    /// The parsed tree. Materializes a lazily fetched document.
    pub fn content_as_tree(&self) -> Result<Rc<XmlTree>> {
        self.body()?.with_content(|cell| cell.as_tree())
    }

    /// Owned element tree of the root element
    pub fn to_element(&self) -> Result<Element> {
        Element::try_from(self)
    }

    /// Replace the content with a string of XML
    pub fn set_content(&self, content: &str) -> Result<()> {
        self.replace_content(content.as_bytes().to_vec())
    }

    /// Replace the content with raw bytes (UTF-8, or UTF-16 with a BOM)
    pub fn set_content_data(&self, data: &XmlData) -> Result<()> {
        self.replace_content(data.as_bytes().to_vec())
    }

    /// Replace the content with everything read from `stream`
    pub fn set_content_stream(&self, stream: XmlInputStream) -> Result<()> {
        self.body()?;
        self.replace_content(stream.read_all()?)
    }

    /// All content setters end here. The cell keeps its old content if
    /// `input` is not well-formed.
    fn replace_content(&self, input: Vec<u8>) -> Result<()> {
        self.body()?.with_content(|cell| cell.replace(input))
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Look up a metadata value. The reserved name key yields the document
    /// name as a string value.
    pub fn get_metadata(&self, uri: &str, name: &str) -> Result<Option<MetadataValue>> {
        let body = self.body()?;
        if is_reserved(uri, name) {
            return Ok(body.name().map(|n| MetadataValue::Typed(TypedValue::string(n))));
        }
        body.with_metadata(|store| store.get(uri, name))
    }

    /// Typed view of a metadata value; untyped text reads as `xs:string`
    pub fn metadata_as_value(&self, uri: &str, name: &str) -> Result<Option<TypedValue>> {
        Ok(self
            .get_metadata(uri, name)?
            .and_then(|value| value.to_typed()))
    }

    /// Raw bytes of a metadata value
    pub fn metadata_as_data(&self, uri: &str, name: &str) -> Result<Option<XmlData>> {
        Ok(self.get_metadata(uri, name)?.map(|value| value.to_data()))
    }

    /// Insert or overwrite a metadata value
    pub fn set_metadata(&self, uri: &str, name: &str, value: impl Into<MetadataValue>) -> Result<()> {
        let body = self.body()?;
        check_writable(uri, name)?;
        let value = value.into();
        body.with_metadata(|store| {
            store.set(uri, name, value);
            Ok(())
        })
    }

    /// Validate `lexical` as `kind` and store it. Nothing is written if the
    /// value is invalid.
    pub fn set_typed_metadata(
        &self,
        uri: &str,
        name: &str,
        kind: ValueKind,
        lexical: &str,
    ) -> Result<()> {
        let value = TypedValue::new(kind, lexical)?;
        self.set_metadata(uri, name, value)
    }

    /// Remove a metadata value; absent keys are ignored
    pub fn remove_metadata(&self, uri: &str, name: &str) -> Result<()> {
        let body = self.body()?;
        check_writable(uri, name)?;
        body.with_metadata(|store| {
            store.remove(uri, name);
            Ok(())
        })
    }

    /// Iterator over a snapshot of all metadata entries, without the name
    pub fn metadata_iter(&self) -> Result<MetadataIterator> {
        self.body()?.with_metadata(|store| store.iter())
    }

    // =========================================================================
    // Whole-document operations
    // =========================================================================

    /// Materialize the content and read every pending metadata entry
    pub fn fetch_all_data(&self) -> Result<()> {
        let body = self.body()?;
        body.with_content(|cell| cell.materialize_full().map(|_| ()))?;
        body.with_metadata(|store| store.fetch_all())
    }

    /// Release this handle's reference to the body. Other clones keep it
    /// alive; calling `dispose` again does nothing.
    pub fn dispose(&mut self) {
        if let Some(body) = self.body.take() {
            tracing::debug!(
                name = ?body.name(),
                remaining = Rc::strong_count(&body) - 1,
                "disposed document handle"
            );
        }
    }
}

impl Default for DocumentHandle {
    fn default() -> Self {
        Self::new()
    }
}

fn is_reserved(uri: &str, name: &str) -> bool {
    uri == NAME_METADATA_URI && name == NAME_METADATA_NAME
}

fn check_writable(uri: &str, name: &str) -> Result<()> {
    if is_reserved(uri, name) {
        return Err(DocumentError::ReservedMetadata {
            uri: uri.to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.body {
            Some(body) => f.debug_tuple("DocumentHandle").field(body).finish(),
            None => f.write_str("DocumentHandle(<disposed>)"),
        }
    }
}
