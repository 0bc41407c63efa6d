//! Production store backed by an embedded sled database.
//!
//! One database holds three trees:
//! - `files`: object key → raw bytes
//! - `content_types`: object key → MIME type
//! - `metadata`: metadata key → JSON text

use async_trait::async_trait;
use std::ops::Bound;
use std::path::Path;

use crate::error::EnvError;
use crate::store::{FileStore, MetadataStore};
use crate::types::{ListPage, StoredObject};

const DEFAULT_PAGE_SIZE: usize = 1000;
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Blob + metadata store on a single sled database.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
    files: sled::Tree,
    content_types: sled::Tree,
    metadata: sled::Tree,
    page_size: usize,
}

impl SledStore {
    /// Opens (or creates) a database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Opens a throwaway database that is deleted on drop.
    pub fn temporary() -> Result<Self, EnvError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, EnvError> {
        Ok(Self {
            files: db.open_tree("files")?,
            content_types: db.open_tree("content_types")?,
            metadata: db.open_tree("metadata")?,
            db,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Sets the listing page size (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Flushes dirty pages to disk.
    pub fn flush(&self) -> Result<(), EnvError> {
        self.db.flush()?;
        Ok(())
    }
}

#[async_trait]
impl FileStore for SledStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), EnvError> {
        self.files.insert(key, body)?;
        self.content_types.insert(key, content_type.as_bytes())?;
        tracing::debug!(key, "stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, EnvError> {
        let Some(body) = self.files.get(key)? else {
            return Ok(None);
        };
        let content_type = match self.content_types.get(key)? {
            Some(raw) => String::from_utf8(raw.to_vec())?,
            None => FALLBACK_CONTENT_TYPE.to_string(),
        };
        Ok(Some(StoredObject::new(body.to_vec(), content_type)))
    }

    async fn exists(&self, key: &str) -> Result<bool, EnvError> {
        Ok(self.files.contains_key(key)?)
    }

    async fn delete(&self, key: &str) -> Result<(), EnvError> {
        self.files.remove(key)?;
        self.content_types.remove(key)?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for SledStore {
    async fn put(&self, key: &str, value: String) -> Result<(), EnvError> {
        self.metadata.insert(key, value.into_bytes())?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, EnvError> {
        match self.metadata.get(key)? {
            Some(raw) => Ok(Some(String::from_utf8(raw.to_vec())?)),
            None => Ok(None),
        }
    }

    async fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ListPage, EnvError> {
        let iter = match cursor {
            Some(after) => self
                .metadata
                .range::<&[u8], _>((Bound::Excluded(after.as_bytes()), Bound::Unbounded)),
            None => self.metadata.scan_prefix(prefix),
        };

        let mut keys = Vec::new();
        for entry in iter {
            let (key, _) = entry?;
            let key = String::from_utf8(key.to_vec())?;
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key);
            if keys.len() > self.page_size {
                break;
            }
        }

        let cursor = if keys.len() > self.page_size {
            keys.truncate(self.page_size);
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, cursor })
    }

    async fn delete(&self, key: &str) -> Result<(), EnvError> {
        self.metadata.remove(key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sled_file_roundtrip_keeps_content_type() {
        let store = SledStore::temporary().unwrap();
        FileStore::put(&store, "x.json", b"[1]".to_vec(), "application/json")
            .await
            .unwrap();

        let obj = FileStore::get(&store, "x.json").await.unwrap().unwrap();
        assert_eq!(obj.text().unwrap(), "[1]");
        assert_eq!(obj.content_type, "application/json");

        FileStore::delete(&store, "x.json").await.unwrap();
        assert!(!store.exists("x.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_sled_metadata_pagination() {
        let store = SledStore::temporary().unwrap().with_page_size(2);
        for key in ["other", "sub-a", "sub-b", "sub-c"] {
            MetadataStore::put(&store, key, "{}".to_string()).await.unwrap();
        }

        let first = store.list("sub-", None).await.unwrap();
        assert_eq!(first.keys, vec!["sub-a", "sub-b"]);

        let second = store.list("sub-", first.cursor.as_deref()).await.unwrap();
        assert_eq!(second.keys, vec!["sub-c"]);
        assert!(second.is_last());
    }
}
