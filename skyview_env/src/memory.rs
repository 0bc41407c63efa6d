//! In-memory store implementations for simulation and tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::RwLock;

use crate::error::EnvError;
use crate::store::{FileStore, MetadataStore};
use crate::types::{ListPage, StoredObject};

/// Default number of keys returned per listing page.
const DEFAULT_PAGE_SIZE: usize = 1000;

fn poisoned<T>(_: T) -> EnvError {
    EnvError::storage("store lock poisoned")
}

/// Blob store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryFileStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns true if no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), EnvError> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        objects.insert(key.to_string(), StoredObject::new(body, content_type));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, EnvError> {
        let objects = self.objects.read().map_err(poisoned)?;
        Ok(objects.get(key).cloned())
    }

    async fn exists(&self, key: &str) -> Result<bool, EnvError> {
        let objects = self.objects.read().map_err(poisoned)?;
        Ok(objects.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), EnvError> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        objects.remove(key);
        Ok(())
    }
}

/// Ordered key-value store held in memory, with paginated listing.
#[derive(Debug)]
pub struct InMemoryMetadataStore {
    values: RwLock<BTreeMap<String, String>>,
    page_size: usize,
}

impl InMemoryMetadataStore {
    /// Creates an empty store with the default page size.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the listing page size (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn put(&self, key: &str, value: String) -> Result<(), EnvError> {
        let mut values = self.values.write().map_err(poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, EnvError> {
        let values = self.values.read().map_err(poisoned)?;
        Ok(values.get(key).cloned())
    }

    async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, EnvError> {
        let values = self.values.read().map_err(poisoned)?;

        let start = match cursor {
            Some(after) => Bound::Excluded(after.to_string()),
            None => Bound::Included(prefix.to_string()),
        };

        let mut keys: Vec<String> = values
            .range((start, Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .take(self.page_size + 1)
            .cloned()
            .collect();

        let cursor = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, cursor })
    }

    async fn delete(&self, key: &str) -> Result<(), EnvError> {
        let mut values = self.values.write().map_err(poisoned)?;
        values.remove(key);
        Ok(())
    }
}
