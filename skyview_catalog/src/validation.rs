//! Upload validation.

use serde_json::Value;
use skyview_core::ingest::{frame_count_of, parse_log_value};

use crate::error::CatalogError;

/// A log that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedLog {
    pub value: Value,
    pub frame_count: usize,
}

/// Only `.json` simulation logs are accepted.
pub fn validate_file_name(file_name: &str) -> Result<(), CatalogError> {
    if file_name.ends_with(".json") {
        Ok(())
    } else {
        Err(CatalogError::bad_request("File must be a .json simulation log"))
    }
}

/// Decodes the upload body as UTF-8.
pub fn decode_content(content: &[u8]) -> Result<&str, CatalogError> {
    if content.is_empty() {
        return Err(CatalogError::bad_request("Uploaded file is empty"));
    }
    std::str::from_utf8(content).map_err(|e| CatalogError::bad_request(format!("File encoding error: {}", e)))
}

/// Sanitizes and parses the log, requiring a top-level `frames` field.
pub fn validate_log(text: &str) -> Result<ValidatedLog, CatalogError> {
    let value = parse_log_value(text)?;
    let frame_count = frame_count_of(&value);
    Ok(ValidatedLog { value, frame_count })
}
