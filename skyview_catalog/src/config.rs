//! Catalog configuration.

/// Naming and presentation settings for the catalog.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Prefix of every submission id
    pub id_prefix: String,

    /// Suffix appended to the id to form the blob key
    pub file_suffix: String,

    /// Suffix appended to the id to form the metadata key
    pub metadata_suffix: String,

    /// Simulated seconds represented by one frame
    pub seconds_per_frame: f64,

    /// Keys fetched per metadata listing page
    pub list_page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            id_prefix: "sub-".to_string(),
            file_suffix: ".json".to_string(),
            metadata_suffix: "_metadata".to_string(),
            seconds_per_frame: 0.1,
            list_page_size: 1000,
        }
    }
}

impl CatalogConfig {
    pub fn with_seconds_per_frame(mut self, seconds: f64) -> Self {
        self.seconds_per_frame = seconds;
        self
    }

    pub fn with_list_page_size(mut self, page_size: usize) -> Self {
        self.list_page_size = page_size.max(1);
        self
    }

    /// Blob key of a submission's raw log.
    pub fn file_key(&self, id: &str) -> String {
        format!("{}{}", id, self.file_suffix)
    }

    /// Metadata key of a submission.
    pub fn metadata_key(&self, id: &str) -> String {
        format!("{}{}", id, self.metadata_suffix)
    }

    /// Submission id encoded in a metadata key, if it is one.
    pub fn id_from_metadata_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_suffix(self.metadata_suffix.as_str())
            .filter(|id| id.starts_with(self.id_prefix.as_str()))
    }

    /// Duration of a log with `frame_count` frames; `None` for an empty log.
    pub fn duration_secs(&self, frame_count: usize) -> Option<f64> {
        (frame_count > 0).then(|| frame_count as f64 * self.seconds_per_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        let config = CatalogConfig::default();
        assert_eq!(config.file_key("sub-20240101120000"), "sub-20240101120000.json");
        assert_eq!(config.metadata_key("sub-1"), "sub-1_metadata");
        assert_eq!(config.id_from_metadata_key("sub-1_metadata"), Some("sub-1"));
        assert_eq!(config.id_from_metadata_key("sub-1.json"), None);
        assert_eq!(config.id_from_metadata_key("other_metadata"), None);
    }

    #[test]
    fn test_duration() {
        let config = CatalogConfig::default();
        assert_eq!(config.duration_secs(0), None);
        let secs = config.duration_secs(250).unwrap_or_default();
        assert!((secs - 25.0).abs() < 1e-9);
    }
}
