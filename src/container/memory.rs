//! In-memory container
//!
//! Documents are stored as serialized UTF-8 bytes plus their metadata
//! entries. Eager fetches share parsed trees through an LRU cache that is
//! invalidated whenever the stored document changes. Lazy fetches hand the
//! handle cursors over the stored bytes and entries.

use std::cell::{Cell, RefCell};
use std::num::NonZeroUsize;
use std::rc::Rc;

use indexmap::IndexMap;
use lru::LruCache;

use super::{Container, EvaluationMode, NameChoice, NameRegistry};
use crate::config::StoreConfig;
use crate::content::{ChunkedBytes, ContentCell, ContentState};
use crate::document::{DocumentHandle, HandleState};
use crate::dom::XmlTree;
use crate::error::{DocumentError, Result};
use crate::metadata::{MetadataEntry, MetadataStore};

#[derive(Debug, Clone)]
struct StoredDocument {
    /// Serialized content; `None` for a document that never had any
    content: Option<Rc<[u8]>>,
    metadata: Vec<MetadataEntry>,
}

struct ContainerInner {
    name: String,
    config: StoreConfig,
    documents: RefCell<IndexMap<String, StoredDocument>>,
    trees: RefCell<Option<LruCache<String, Rc<XmlTree>>>>,
    next_id: Cell<u64>,
}

impl ContainerInner {
    fn not_found(&self, name: &str) -> DocumentError {
        DocumentError::NotFound {
            container: self.name.clone(),
            name: name.to_string(),
        }
    }

    fn invalidate(&self, name: &str) {
        if let Some(cache) = self.trees.borrow_mut().as_mut() {
            cache.pop(name);
        }
    }

    /// Next name of the form `{base}{n}` that is not in use
    fn generate_name(&self, base: &str) -> String {
        let documents = self.documents.borrow();
        loop {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            let candidate = format!("{}{}", base, id);
            if !documents.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl NameRegistry for ContainerInner {
    fn container_name(&self) -> &str {
        &self.name
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        if to.is_empty() {
            return Err(DocumentError::InvalidName(
                "document names must not be empty".to_string(),
            ));
        }
        let mut documents = self.documents.borrow_mut();
        if documents.contains_key(to) {
            return Err(DocumentError::DuplicateName(to.to_string()));
        }
        let stored = documents
            .shift_remove(from)
            .ok_or_else(|| self.not_found(from))?;
        documents.insert(to.to_string(), stored);
        drop(documents);

        self.invalidate(from);
        self.invalidate(to);
        Ok(())
    }
}

/// Named document storage held in memory.
///
/// Clones refer to the same storage.
#[derive(Clone)]
pub struct MemoryContainer {
    inner: Rc<ContainerInner>,
}

impl MemoryContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, StoreConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: StoreConfig) -> Self {
        let trees = NonZeroUsize::new(config.tree_cache_capacity).map(LruCache::new);
        MemoryContainer {
            inner: Rc::new(ContainerInner {
                name: name.into(),
                config,
                documents: RefCell::new(IndexMap::new()),
                trees: RefCell::new(trees),
                next_id: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Fetch using the configured default mode
    pub fn fetch(&self, name: &str) -> Result<DocumentHandle> {
        self.fetch_document(name, self.inner.config.default_mode)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.documents.borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.documents.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.documents.borrow().is_empty()
    }

    /// Names of all stored documents, in the order they were stored
    pub fn document_names(&self) -> Vec<String> {
        self.inner.documents.borrow().keys().cloned().collect()
    }

    pub fn delete_document(&self, name: &str) -> Result<()> {
        self.inner
            .documents
            .borrow_mut()
            .shift_remove(name)
            .ok_or_else(|| self.inner.not_found(name))?;
        self.inner.invalidate(name);
        tracing::debug!(container = %self.inner.name, name, "deleted document");
        Ok(())
    }

    fn registry(&self) -> Rc<dyn NameRegistry> {
        let inner: Rc<ContainerInner> = Rc::clone(&self.inner);
        inner
    }

    /// Snapshot of a handle's content and metadata in stored form
    fn capture(handle: &DocumentHandle) -> Result<StoredDocument> {
        let content = match handle.content_state()? {
            ContentState::Empty => None,
            _ => Some(Rc::from(handle.content_as_text()?.into_bytes())),
        };
        let metadata = handle.metadata_iter()?.collect();
        Ok(StoredDocument { content, metadata })
    }

    fn cached_tree(&self, name: &str, bytes: &[u8]) -> Result<Rc<XmlTree>> {
        let inner = &self.inner;
        if let Some(tree) = inner
            .trees
            .borrow_mut()
            .as_mut()
            .and_then(|cache| cache.get(name).cloned())
        {
            tracing::trace!(container = %inner.name, name, "tree cache hit");
            return Ok(tree);
        }

        let tree = Rc::new(XmlTree::parse(bytes.to_vec())?);
        if let Some(cache) = inner.trees.borrow_mut().as_mut() {
            cache.put(name.to_string(), Rc::clone(&tree));
        }
        Ok(tree)
    }
}

impl Container for MemoryContainer {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn fetch_document(&self, name: &str, mode: EvaluationMode) -> Result<DocumentHandle> {
        let stored = self
            .inner
            .documents
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| self.inner.not_found(name))?;
        tracing::debug!(container = %self.inner.name, name, ?mode, "fetching document");

        let (content, metadata) = match mode {
            EvaluationMode::Eager => {
                let content = match &stored.content {
                    Some(bytes) => ContentCell::materialized(self.cached_tree(name, bytes)?),
                    None => ContentCell::new(),
                };
                let mut metadata = MetadataStore::new();
                for entry in stored.metadata {
                    metadata.set(&entry.uri, &entry.name, entry.value);
                }
                (content, metadata)
            }
            EvaluationMode::Lazy => {
                let content = match stored.content {
                    Some(bytes) => ContentCell::lazy(Box::new(ChunkedBytes::new(
                        bytes,
                        self.inner.config.lazy_chunk_size,
                    ))),
                    None => ContentCell::new(),
                };
                let metadata = MetadataStore::lazy(Box::new(stored.metadata.into_iter()));
                (content, metadata)
            }
        };

        Ok(DocumentHandle::bound(name, content, metadata, self.registry()))
    }

    fn put_document(&self, handle: &DocumentHandle, choice: NameChoice) -> Result<String> {
        let handle_name = handle.name()?;
        let name = match choice {
            NameChoice::Explicit(name) => name,
            NameChoice::Handle => match handle_name {
                Some(name) => name,
                None => self.inner.generate_name(&self.inner.config.name_prefix),
            },
            NameChoice::Generate => match handle_name {
                Some(name) => self.inner.generate_name(&format!("{}_", name)),
                None => self.inner.generate_name(&self.inner.config.name_prefix),
            },
        };
        if name.is_empty() {
            return Err(DocumentError::InvalidName(
                "document names must not be empty".to_string(),
            ));
        }
        if self.contains(&name) {
            return Err(DocumentError::DuplicateName(name));
        }

        let stored = Self::capture(handle)?;
        self.inner
            .documents
            .borrow_mut()
            .insert(name.clone(), stored);
        self.inner.invalidate(&name);

        if handle.state() == HandleState::New {
            handle.bind(name.clone(), self.registry())?;
        }
        tracing::debug!(container = %self.inner.name, name = %name, "stored document");
        Ok(name)
    }

    fn update_document(&self, handle: &DocumentHandle) -> Result<()> {
        let name = handle.name()?.unwrap_or_default();
        let bound_here = handle.registry()?.is_some_and(|registry| {
            std::ptr::addr_eq(Rc::as_ptr(&registry), Rc::as_ptr(&self.inner))
        });
        if !bound_here || !self.contains(&name) {
            return Err(self.inner.not_found(&name));
        }

        let stored = Self::capture(handle)?;
        self.inner
            .documents
            .borrow_mut()
            .insert(name.clone(), stored);
        self.inner.invalidate(&name);
        tracing::debug!(container = %self.inner.name, name = %name, "updated document");
        Ok(())
    }
}

impl std::fmt::Debug for MemoryContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContainer")
            .field("name", &self.inner.name)
            .field("documents", &self.len())
            .finish()
    }
}
