//! Error types for the SkyView environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The requested key does not exist
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The backing store rejected or failed the operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Value encoding/decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation timed out
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Creates a not-found error for a key.
    pub fn not_found(key: impl std::fmt::Display) -> Self {
        Self::NotFound(key.to_string())
    }
}

impl From<sled::Error> for EnvError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for EnvError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
