//! Container manager
//!
//! Owns the open containers and resolves document lookups by container id.

use std::cell::RefCell;

use indexmap::IndexMap;

use super::{Container, EvaluationMode, MemoryContainer};
use crate::config::StoreConfig;
use crate::document::DocumentHandle;
use crate::error::{DocumentError, Result};

/// Name used in `NotFound` errors for container lookups
const MANAGER_SCOPE: &str = "manager";

#[derive(Debug, Default)]
pub struct Manager {
    config: StoreConfig,
    containers: RefCell<IndexMap<String, MemoryContainer>>,
}

impl Manager {
    pub fn new(config: StoreConfig) -> Self {
        Manager {
            config,
            containers: RefCell::new(IndexMap::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create a container. Fails with `DuplicateName` if the id is taken.
    pub fn create_container(&self, id: &str) -> Result<MemoryContainer> {
        if id.is_empty() {
            return Err(DocumentError::InvalidName(
                "container names must not be empty".to_string(),
            ));
        }
        let mut containers = self.containers.borrow_mut();
        if containers.contains_key(id) {
            return Err(DocumentError::DuplicateName(id.to_string()));
        }
        let container = MemoryContainer::with_config(id, self.config.clone());
        containers.insert(id.to_string(), container.clone());
        tracing::debug!(container = id, "created container");
        Ok(container)
    }

    pub fn open_container(&self, id: &str) -> Result<MemoryContainer> {
        self.containers
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound {
                container: MANAGER_SCOPE.to_string(),
                name: id.to_string(),
            })
    }

    /// Forget a container. Handles already fetched from it stay usable.
    pub fn remove_container(&self, id: &str) -> Result<()> {
        self.containers
            .borrow_mut()
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| DocumentError::NotFound {
                container: MANAGER_SCOPE.to_string(),
                name: id.to_string(),
            })
    }

    pub fn container_names(&self) -> Vec<String> {
        self.containers.borrow().keys().cloned().collect()
    }

    /// A new, unattached document
    pub fn create_document(&self) -> DocumentHandle {
        DocumentHandle::new()
    }

    /// Fetch `name` from the container `container_id`
    pub fn fetch_document(
        &self,
        container_id: &str,
        name: &str,
        mode: EvaluationMode,
    ) -> Result<DocumentHandle> {
        self.open_container(container_id)?.fetch_document(name, mode)
    }
}
