//! Common types for the SkyView environment abstraction.

use serde::{Deserialize, Serialize};

/// A blob as held by a [`crate::FileStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// The raw object bytes
    pub body: Vec<u8>,

    /// MIME type recorded at upload time
    pub content_type: String,
}

impl StoredObject {
    /// Creates a new stored object.
    pub fn new(body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            body,
            content_type: content_type.into(),
        }
    }

    /// Returns the body size in bytes.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    /// Decodes the body as UTF-8 text.
    pub fn text(&self) -> Result<String, crate::EnvError> {
        Ok(String::from_utf8(self.body.clone())?)
    }
}

/// One page of keys from a [`crate::MetadataStore`] listing.
///
/// `cursor` is `Some` while more keys remain; pass it back to fetch the
/// next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub cursor: Option<String>,
}

impl ListPage {
    /// Returns true if this is the final page.
    pub fn is_last(&self) -> bool {
        self.cursor.is_none()
    }
}
