//! Shared document body
//!
//! The state every copy of a handle points at: the name, the owning
//! container, the content cell and the metadata store. Fields use interior
//! mutability so any handle can write through a shared reference.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use crate::container::NameRegistry;
use crate::content::ContentCell;
use crate::error::{DocumentError, Result};
use crate::metadata::MetadataStore;

pub struct DocumentBody {
    name: RefCell<Option<String>>,
    /// Container the document is attached to
    binding: RefCell<Option<Rc<dyn NameRegistry>>>,
    /// Shared separately so streaming readers can outlive a borrow of the body
    content: Rc<RefCell<ContentCell>>,
    metadata: RefCell<MetadataStore>,
}

impl DocumentBody {
    /// An unnamed, unattached body with empty content
    pub fn new() -> Self {
        Self::from_parts(None, ContentCell::new(), MetadataStore::new())
    }

    pub fn from_parts(name: Option<String>, content: ContentCell, metadata: MetadataStore) -> Self {
        DocumentBody {
            name: RefCell::new(name),
            binding: RefCell::new(None),
            content: Rc::new(RefCell::new(content)),
            metadata: RefCell::new(metadata),
        }
    }

    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    pub(crate) fn set_name(&self, name: Option<String>) {
        *self.name.borrow_mut() = name;
    }

    /// Attach the body to a container under `name`
    pub(crate) fn bind(&self, name: String, registry: Rc<dyn NameRegistry>) {
        *self.name.borrow_mut() = Some(name);
        *self.binding.borrow_mut() = Some(registry);
    }

    pub fn is_bound(&self) -> bool {
        self.binding.borrow().is_some()
    }

    pub(crate) fn registry(&self) -> Option<Rc<dyn NameRegistry>> {
        self.binding.borrow().clone()
    }

    pub(crate) fn content_cell(&self) -> &Rc<RefCell<ContentCell>> {
        &self.content
    }

    /// Run `f` with exclusive access to the content cell.
    ///
    /// Fails with `ReentrantMaterialization` if the cell is already in use,
    /// e.g. when a content source reads back into the same document.
    pub fn with_content<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut ContentCell) -> Result<R>,
    {
        let mut cell = self.borrow_content()?;
        f(&mut cell)
    }

    /// Run `f` with exclusive access to the metadata store
    pub fn with_metadata<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut MetadataStore) -> Result<R>,
    {
        let mut store = self
            .metadata
            .try_borrow_mut()
            .map_err(|_| DocumentError::ReentrantMaterialization)?;
        f(&mut store)
    }

    fn borrow_content(&self) -> Result<RefMut<'_, ContentCell>> {
        self.content
            .try_borrow_mut()
            .map_err(|_| DocumentError::ReentrantMaterialization)
    }
}

impl Default for DocumentBody {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DocumentBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let container = self
            .binding
            .borrow()
            .as_ref()
            .map(|registry| registry.container_name().to_string());
        f.debug_struct("DocumentBody")
            .field("name", &self.name.borrow())
            .field("container", &container)
            .field("content", &self.content.try_borrow().map(|c| c.state()).ok())
            .finish()
    }
}
