//! Metadata store
//!
//! Side table of `(uri, name) -> value` entries attached to a document.
//!
//! Entries keep insertion order; overwriting a key keeps its position and
//! removing one closes the gap. A store created for a lazily fetched
//! document reads its entries from a [`MetadataSource`] as lookups need
//! them. Entries pulled later are appended at the end, and keys written or
//! removed locally are never brought back by a later pull.

pub mod value;

use std::collections::HashSet;

use indexmap::{Equivalent, IndexMap};

pub use value::{MetadataValue, TypedValue, ValueKind, XmlData};

use crate::error::Result;

/// Namespace of the implicit document name entry
pub const NAME_METADATA_URI: &str = "http://www.sleepycat.com/2002/dbxml";
/// Local name of the implicit document name entry
pub const NAME_METADATA_NAME: &str = "name";

/// Owned metadata key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataKey {
    pub uri: String,
    pub name: String,
}

impl MetadataKey {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        MetadataKey {
            uri: uri.into(),
            name: name.into(),
        }
    }
}

/// Borrowed key for lookups; hashes the same as [`MetadataKey`]
#[derive(Hash)]
struct KeyRef<'a> {
    uri: &'a str,
    name: &'a str,
}

impl Equivalent<MetadataKey> for KeyRef<'_> {
    fn equivalent(&self, key: &MetadataKey) -> bool {
        self.uri == key.uri && self.name == key.name
    }
}

/// One metadata entry as yielded by iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub uri: String,
    pub name: String,
    pub value: MetadataValue,
}

impl MetadataEntry {
    pub fn new(uri: impl Into<String>, name: impl Into<String>, value: MetadataValue) -> Self {
        MetadataEntry {
            uri: uri.into(),
            name: name.into(),
            value,
        }
    }
}

/// Forward-only cursor over stored metadata entries
pub trait MetadataSource {
    /// Next stored entry, `None` once every entry has been read
    fn next_entry(&mut self) -> Result<Option<MetadataEntry>>;
}

impl MetadataSource for std::vec::IntoIter<MetadataEntry> {
    fn next_entry(&mut self) -> Result<Option<MetadataEntry>> {
        Ok(self.next())
    }
}

#[derive(Default)]
pub struct MetadataStore {
    entries: IndexMap<MetadataKey, MetadataValue>,
    /// Remaining stored entries of a lazily fetched document
    pending: Option<Box<dyn MetadataSource>>,
    /// Keys removed locally while entries are still pending
    removed: HashSet<MetadataKey>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that pulls its entries from `source` on demand
    pub fn lazy(source: Box<dyn MetadataSource>) -> Self {
        MetadataStore {
            entries: IndexMap::new(),
            pending: Some(source),
            removed: HashSet::new(),
        }
    }

    /// Look up a value.
    ///
    /// A key that is not known yet is searched for in the pending source;
    /// only a source failure is an error, absence is `Ok(None)`.
    pub fn get(&mut self, uri: &str, name: &str) -> Result<Option<MetadataValue>> {
        let key = KeyRef { uri, name };
        loop {
            if let Some(value) = self.entries.get(&key) {
                return Ok(Some(value.clone()));
            }
            if !self.pull_one()? {
                return Ok(None);
            }
        }
    }

    /// Look up a value among the entries already known, without pulling
    pub fn peek(&self, uri: &str, name: &str) -> Option<&MetadataValue> {
        self.entries.get(&KeyRef { uri, name })
    }

    /// Insert or overwrite. An existing entry keeps its position.
    pub fn set(&mut self, uri: &str, name: &str, value: MetadataValue) {
        let key = MetadataKey::new(uri, name);
        if self.pending.is_some() {
            self.removed.remove(&key);
        }
        self.entries.insert(key, value);
    }

    /// Remove an entry. Removing an absent key does nothing.
    pub fn remove(&mut self, uri: &str, name: &str) -> Option<MetadataValue> {
        if self.pending.is_some() {
            self.removed.insert(MetadataKey::new(uri, name));
        }
        self.entries.shift_remove(&KeyRef { uri, name })
    }

    /// Read every pending entry from the source
    pub fn fetch_all(&mut self) -> Result<()> {
        while self.pull_one()? {}
        Ok(())
    }

    /// True once no entries are waiting in a source
    pub fn is_fully_fetched(&self) -> bool {
        self.pending.is_none()
    }

    /// Point-in-time iterator over all entries, in insertion order.
    ///
    /// Pending entries are fetched first. Later changes to the store are
    /// not seen by an iterator that already exists.
    pub fn iter(&mut self) -> Result<MetadataIterator> {
        self.fetch_all()?;
        let entries: Vec<MetadataEntry> = self
            .entries
            .iter()
            .map(|(key, value)| MetadataEntry::new(key.uri.clone(), key.name.clone(), value.clone()))
            .collect();
        Ok(MetadataIterator {
            inner: entries.into_iter(),
        })
    }

    /// Number of known entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.pending.is_none()
    }

    /// Read one entry from the pending source. Returns false when nothing
    /// is pending any more.
    fn pull_one(&mut self) -> Result<bool> {
        let source = match self.pending.as_mut() {
            Some(source) => source,
            None => return Ok(false),
        };

        match source.next_entry()? {
            Some(entry) => {
                let key = MetadataKey::new(entry.uri, entry.name);
                tracing::trace!(uri = %key.uri, name = %key.name, "pulled metadata entry");
                if !self.removed.contains(&key) && !self.entries.contains_key(&key) {
                    self.entries.insert(key, entry.value);
                }
                Ok(true)
            }
            None => {
                self.pending = None;
                self.removed.clear();
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("entries", &self.entries)
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

/// Single-pass iterator over a snapshot of a store's entries
#[derive(Debug)]
pub struct MetadataIterator {
    inner: std::vec::IntoIter<MetadataEntry>,
}

impl MetadataIterator {
    /// An iterator that yields nothing
    pub fn empty() -> Self {
        MetadataIterator {
            inner: Vec::new().into_iter(),
        }
    }
}

impl Iterator for MetadataIterator {
    type Item = MetadataEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for MetadataIterator {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;
    use pretty_assertions::assert_eq;

    fn untyped(s: &str) -> MetadataValue {
        MetadataValue::untyped(s)
    }

    fn lazy_store(entries: &[(&str, &str, &str)]) -> MetadataStore {
        let entries: Vec<_> = entries
            .iter()
            .map(|(u, n, v)| MetadataEntry::new(*u, *n, untyped(v)))
            .collect();
        MetadataStore::lazy(Box::new(entries.into_iter()))
    }

    #[test]
    fn test_set_get_overwrite() {
        let mut store = MetadataStore::new();
        store.set("", "owner", untyped("alice"));
        store.set("", "owner", MetadataValue::from(TypedValue::integer(3)));
        assert_eq!(
            store.get("", "owner").unwrap(),
            Some(MetadataValue::from(TypedValue::integer(3)))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_include_uri() {
        let mut store = MetadataStore::new();
        store.set("urn:a", "k", untyped("1"));
        store.set("urn:b", "k", untyped("2"));
        assert_eq!(store.get("urn:a", "k").unwrap(), Some(untyped("1")));
        assert_eq!(store.get("urn:b", "k").unwrap(), Some(untyped("2")));
        assert_eq!(store.get("", "k").unwrap(), None);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut store = MetadataStore::new();
        store.set("", "a", untyped("1"));
        assert_eq!(store.remove("", "missing"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_iteration_order() {
        let mut store = MetadataStore::new();
        store.set("", "a", untyped("1"));
        store.set("", "b", untyped("2"));
        store.set("", "c", untyped("3"));
        store.set("", "a", untyped("4"));
        store.remove("", "b");

        let names: Vec<_> = store.iter().unwrap().map(|e| e.name).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_iterator_is_snapshot() {
        let mut store = MetadataStore::new();
        store.set("", "a", untyped("1"));
        let iter = store.iter().unwrap();
        store.set("", "b", untyped("2"));
        assert_eq!(iter.len(), 1);
    }

    #[test]
    fn test_lazy_get_pulls_until_found() {
        let mut store = lazy_store(&[("", "a", "1"), ("", "b", "2"), ("", "c", "3")]);
        assert_eq!(store.get("", "b").unwrap(), Some(untyped("2")));
        assert_eq!(store.len(), 2);
        assert!(!store.is_fully_fetched());

        assert_eq!(store.get("", "zzz").unwrap(), None);
        assert!(store.is_fully_fetched());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_lazy_never_resurrects_local_changes() {
        let mut store = lazy_store(&[("", "a", "stored"), ("", "b", "stored")]);
        store.set("", "a", untyped("local"));
        store.remove("", "b");
        store.fetch_all().unwrap();

        let entries: Vec<_> = store.iter().unwrap().collect();
        assert_eq!(entries, vec![MetadataEntry::new("", "a", untyped("local"))]);
    }

    #[test]
    fn test_lazy_set_after_remove() {
        let mut store = lazy_store(&[("", "a", "stored")]);
        store.remove("", "a");
        store.set("", "a", untyped("again"));
        store.fetch_all().unwrap();
        assert_eq!(store.get("", "a").unwrap(), Some(untyped("again")));
    }

    struct Failing;

    impl MetadataSource for Failing {
        fn next_entry(&mut self) -> Result<Option<MetadataEntry>> {
            Err(DocumentError::Source("cursor closed".to_string()))
        }
    }

    #[test]
    fn test_source_failure() {
        let mut store = MetadataStore::lazy(Box::new(Failing));
        store.set("", "local", untyped("x"));
        assert_eq!(store.get("", "local").unwrap(), Some(untyped("x")));
        assert!(matches!(store.get("", "other"), Err(DocumentError::Source(_))));
        assert!(store.iter().is_err());
    }
}
