//! Error types for the submission catalog.

use skyview_core::IngestError;
use skyview_env::EnvError;
use thiserror::Error;

/// Errors returned by [`crate::Catalog`] operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request itself is unacceptable (bad file name, empty body, invalid log)
    #[error("{0}")]
    BadRequest(String),

    /// No submission with the requested id
    #[error("{0}")]
    NotFound(String),

    /// The backing store failed
    #[error("Storage failure: {0}")]
    Store(#[from] EnvError),

    /// Stored content could not be encoded or decoded
    #[error("Serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(detail.into())
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }

    /// HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::Store(_) | Self::Serialization(_) => 500,
        }
    }

    /// Human-readable detail message.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

impl From<IngestError> for CatalogError {
    fn from(err: IngestError) -> Self {
        Self::BadRequest(err.to_string())
    }
}
