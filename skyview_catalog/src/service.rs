//! The catalog service.
//!
//! Raw logs live in a [`FileStore`] under `<id>.json`; metadata records live
//! in a [`MetadataStore`] under `<id>_metadata`. Every read goes back to the
//! stores, so two catalogs over the same stores see the same submissions.

use serde_json::{Map, Value};
use skyview_core::metadata::obstacle_records;
use skyview_env::{FileStore, MetadataStore, ViewerContext};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::keys::{candidate_ids, created_at, parse_tags};
use crate::model::{
    StatusReport, Submission, SubmissionData, SubmissionFile, SubmissionMetadata, SubmissionMetrics,
    SubmissionReceipt, SubmissionStatus, SubmissionSummary, Upload,
};
use crate::validation::{decode_content, validate_file_name, validate_log};

const JSON_CONTENT_TYPE: &str = "application/json";
const UPLOAD_MESSAGE: &str = "Submission uploaded successfully. Ready for visualization.";

/// Submission catalog over a blob store and a metadata store.
pub struct Catalog<F, M, Ctx> {
    files: Arc<F>,
    metadata: Arc<M>,
    ctx: Arc<Ctx>,
    config: CatalogConfig,
}

impl<F, M, Ctx> Catalog<F, M, Ctx>
where
    F: FileStore,
    M: MetadataStore,
    Ctx: ViewerContext,
{
    pub fn new(files: Arc<F>, metadata: Arc<M>, ctx: Arc<Ctx>) -> Self {
        Self {
            files,
            metadata,
            ctx,
            config: CatalogConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CatalogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Validates and stores an upload.
    pub async fn create(&self, upload: Upload) -> Result<SubmissionReceipt, CatalogError> {
        validate_file_name(&upload.file_name)?;
        let text = decode_content(&upload.content)?;
        let validated = validate_log(text)?;

        let now = self.ctx.system_time();
        let id = self.allocate_id(now).await?;
        let created_at = created_at(now);

        let title = upload
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Submission {}", id));
        let record = SubmissionMetadata {
            id: id.clone(),
            title,
            name: non_empty(upload.name),
            tags: parse_tags(upload.tags.as_deref()),
            notes: non_empty(upload.notes),
            env_set: non_empty(upload.env_set),
            renderer_preset: non_empty(upload.renderer_preset),
            created_at: created_at.clone(),
            status: SubmissionStatus::Ready,
            log_file_name: upload.file_name,
            file_path: self.config.file_key(&id),
            frame_count: validated.frame_count,
        };

        let file_key = self.config.file_key(&id);
        self.files.put(&file_key, upload.content, JSON_CONTENT_TYPE).await?;
        self.metadata
            .put(&self.config.metadata_key(&id), serde_json::to_string_pretty(&record)?)
            .await?;

        info!(
            submission = %id,
            key = %file_key,
            frames = validated.frame_count,
            "Stored submission"
        );

        Ok(SubmissionReceipt {
            id,
            title: record.title,
            status: SubmissionStatus::Ready,
            created_at,
            message: UPLOAD_MESSAGE.to_string(),
        })
    }

    /// First free id for this instant.
    async fn allocate_id(&self, now: std::time::SystemTime) -> Result<String, CatalogError> {
        for id in candidate_ids(&self.config.id_prefix, now) {
            let taken = self.files.exists(&self.config.file_key(&id)).await?
                || self.metadata.get(&self.config.metadata_key(&id)).await?.is_some();
            if !taken {
                return Ok(id);
            }
            debug!(submission = %id, "Submission id taken, trying next suffix");
        }
        Err(CatalogError::bad_request("No submission id available"))
    }

    /// All metadata records, walking every listing page.
    async fn all_metadata(&self) -> Result<Vec<SubmissionMetadata>, CatalogError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.metadata.list(&self.config.id_prefix, cursor.as_deref()).await?;
            for key in &page.keys {
                let Some(id) = self.config.id_from_metadata_key(key) else {
                    continue;
                };
                if let Some(record) = self.read_metadata(id).await? {
                    records.push(record);
                }
            }
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    /// Metadata for `id`; unparseable records are treated as missing.
    async fn read_metadata(&self, id: &str) -> Result<Option<SubmissionMetadata>, CatalogError> {
        let Some(raw) = self.metadata.get(&self.config.metadata_key(id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                warn!(submission = %id, %err, "Skipping unreadable metadata record");
                Ok(None)
            }
        }
    }

    /// Raw log text for `id`.
    async fn read_log_text(&self, id: &str) -> Result<Option<String>, CatalogError> {
        match self.files.get(&self.config.file_key(id)).await? {
            Some(object) => Ok(Some(object.text()?)),
            None => Ok(None),
        }
    }

    /// Summaries of every submission, newest first.
    pub async fn list(&self) -> Result<Vec<SubmissionSummary>, CatalogError> {
        let mut summaries: Vec<SubmissionSummary> =
            self.all_metadata().await?.iter().map(SubmissionMetadata::summary).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    /// Full detail of every submission, newest first.
    pub async fn list_detailed(&self) -> Result<Vec<Submission>, CatalogError> {
        let mut records = self.all_metadata().await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut submissions = Vec::with_capacity(records.len());
        for record in records {
            let log = self.read_log_value(&record.id).await?;
            submissions.push(self.build_submission(record, log.as_ref()));
        }
        Ok(submissions)
    }

    async fn read_log_value(&self, id: &str) -> Result<Option<Value>, CatalogError> {
        Ok(self
            .read_log_text(id)
            .await?
            .and_then(|text| validate_log(&text).ok())
            .map(|v| v.value))
    }

    fn build_submission(&self, record: SubmissionMetadata, log: Option<&Value>) -> Submission {
        let (duration_sec, metrics) = match log {
            Some(value) => {
                let frames = value.get("frames").and_then(Value::as_array).map_or(0, Vec::len);
                let metrics = value
                    .get("metadata")
                    .and_then(Value::as_object)
                    .and_then(SubmissionMetrics::from_metadata);
                (self.config.duration_secs(frames), metrics)
            }
            None => (None, None),
        };

        let summary = record.summary();
        Submission {
            id: summary.id,
            title: summary.title,
            name: summary.name,
            created_at: summary.created_at,
            env_set: record.env_set,
            status: summary.status,
            duration_sec,
            notes: record.notes,
            tags: summary.tags,
            metrics,
            log_file_name: summary.log_file_name,
            renderer_version: record.renderer_preset,
        }
    }

    /// Full submission detail.
    pub async fn get(&self, id: &str) -> Result<Submission, CatalogError> {
        let record = self
            .read_metadata(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Submission not found"))?;
        let log = self.read_log_value(id).await?;
        Ok(self.build_submission(record, log.as_ref()))
    }

    /// Checks that the stored log can still be parsed.
    pub async fn status(&self, id: &str) -> Result<StatusReport, CatalogError> {
        let file_key = self.config.file_key(id);
        if !self.files.exists(&file_key).await? {
            return Err(CatalogError::not_found("Submission not found"));
        }

        let parsed = self
            .read_log_text(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Submission not found"))
            .and_then(|text| validate_log(&text));

        let report = match parsed {
            Ok(validated) => StatusReport {
                id: id.to_string(),
                status: SubmissionStatus::Ready,
                frame_count: Some(validated.frame_count),
                has_metadata: Some(validated.value.get("metadata").is_some()),
                file_path: Some(file_key),
                message: None,
            },
            Err(err) => {
                warn!(submission = %id, %err, "Stored log failed to parse");
                StatusReport {
                    id: id.to_string(),
                    status: SubmissionStatus::Error,
                    frame_count: None,
                    has_metadata: None,
                    file_path: None,
                    message: Some(err.detail()),
                }
            }
        };
        Ok(report)
    }

    /// Frame count, metadata, obstacles and first frame of the stored log.
    pub async fn data(&self, id: &str) -> Result<SubmissionData, CatalogError> {
        let text = self
            .read_log_text(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Submission not found"))?;
        let validated = validate_log(&text)?;

        let metadata: Map<String, Value> = validated
            .value
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let obstacles = obstacle_records(Some(&metadata)).to_vec();
        let first_frame = validated
            .value
            .get("frames")
            .and_then(Value::as_array)
            .and_then(|frames| frames.first())
            .cloned();

        Ok(SubmissionData {
            id: id.to_string(),
            frame_count: validated.frame_count,
            metadata,
            obstacles,
            first_frame,
        })
    }

    /// Raw log bytes for download.
    pub async fn file(&self, id: &str) -> Result<SubmissionFile, CatalogError> {
        let object = self
            .files
            .get(&self.config.file_key(id))
            .await?
            .ok_or_else(|| CatalogError::not_found("Log file not found"))?;

        let download_name = match self.read_metadata(id).await? {
            Some(record) => record.download_name(),
            None => format!("{}.json", id),
        };

        Ok(SubmissionFile {
            download_name,
            content_type: object.content_type,
            body: object.body,
        })
    }

    /// Log as pretty-printed JSON, or raw text when it does not parse.
    pub async fn log(&self, id: &str) -> Result<String, CatalogError> {
        let text = self
            .read_log_text(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Log file not found"))?;

        match validate_log(&text) {
            Ok(validated) => Ok(serde_json::to_string_pretty(&validated.value)?),
            Err(_) => Ok(text),
        }
    }

    /// Removes both the log and its metadata.
    pub async fn delete(&self, id: &str) -> Result<(), CatalogError> {
        let file_key = self.config.file_key(id);
        let metadata_key = self.config.metadata_key(id);
        let known = self.files.exists(&file_key).await? || self.metadata.get(&metadata_key).await?.is_some();
        if !known {
            return Err(CatalogError::not_found("Submission not found"));
        }

        self.files.delete(&file_key).await?;
        self.metadata.delete(&metadata_key).await?;
        info!(submission = %id, "Deleted submission");
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use skyview_env::{InMemoryFileStore, InMemoryMetadataStore};
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    /// Context whose wall clock only moves when told to.
    struct FixedClock {
        now: Mutex<SystemTime>,
    }

    impl FixedClock {
        fn at(secs: u64) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(UNIX_EPOCH + Duration::from_secs(secs)),
            })
        }

        fn advance(&self, secs: u64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::from_secs(secs);
        }
    }

    #[async_trait]
    impl ViewerContext for FixedClock {
        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn system_time(&self) -> SystemTime {
            *self.now.lock().unwrap()
        }

        async fn sleep(&self, _duration: Duration) {}

        fn spawn<Fut>(&self, _name: &str, future: Fut)
        where
            Fut: Future<Output = ()> + Send + 'static,
        {
            tokio::spawn(future);
        }

        fn seed(&self) -> u64 {
            0
        }
    }

    type MemCatalog = Catalog<InMemoryFileStore, InMemoryMetadataStore, FixedClock>;

    // 2024-03-05T07:08:09Z
    const T0: u64 = 1_709_622_489;

    fn catalog(clock: Arc<FixedClock>) -> MemCatalog {
        Catalog::new(
            Arc::new(InMemoryFileStore::new()),
            Arc::new(InMemoryMetadataStore::new().with_page_size(2)),
            clock,
        )
    }

    fn sample_log() -> String {
        json!({
            "metadata": {
                "score": 91.0,
                "collisions": 0,
                "obstacles": [{"type": "wall", "position": [0, 0, 1], "length": 4, "thickness": 1, "height": 2}]
            },
            "frames": [
                {"state": {"t": 0.0, "pos": [[0, 0, 0]], "ids": [1], "goals": [[5, 5, 5]]}},
                {"state": {"t": 0.1, "pos": [[1, 0, 0]], "ids": [1], "goals": [[5, 5, 5]]}}
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_create_stores_file_and_metadata() {
        let catalog = catalog(FixedClock::at(T0));
        let receipt = catalog
            .create(Upload::new("run.json", sample_log()).with_tags("swarm, fast").with_name("pilot"))
            .await
            .unwrap();

        assert_eq!(receipt.id, "sub-20240305070809");
        assert_eq!(receipt.title, "Submission sub-20240305070809");
        assert_eq!(receipt.status, SubmissionStatus::Ready);
        assert_eq!(receipt.created_at, "2024-03-05T07:08:09.000Z");
        assert_eq!(receipt.message, UPLOAD_MESSAGE);

        let detail = catalog.get(&receipt.id).await.unwrap();
        assert_eq!(detail.tags, vec!["swarm", "fast"]);
        assert_eq!(detail.name.as_deref(), Some("pilot"));
        assert_eq!(detail.log_file_name, "run.json");
        assert_eq!(detail.metrics.as_ref().and_then(|m| m.score), Some(91.0));
        assert!((detail.duration_sec.unwrap() - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_uploads() {
        let catalog = catalog(FixedClock::at(T0));

        let wrong_ext = catalog.create(Upload::new("run.csv", "a,b")).await.unwrap_err();
        let empty = catalog.create(Upload::new("run.json", Vec::new())).await.unwrap_err();
        let no_frames = catalog.create(Upload::new("run.json", "{}")).await.unwrap_err();

        assert_eq!(wrong_ext.status_code(), 400);
        assert_eq!(empty.detail(), "Uploaded file is empty");
        assert_eq!(no_frames.status_code(), 400);
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_second_ids_get_suffix() {
        let catalog = catalog(FixedClock::at(T0));
        let a = catalog.create(Upload::new("a.json", sample_log())).await.unwrap();
        let b = catalog.create(Upload::new("b.json", sample_log())).await.unwrap();
        let c = catalog.create(Upload::new("c.json", sample_log())).await.unwrap();

        assert_eq!(a.id, "sub-20240305070809");
        assert_eq!(b.id, "sub-20240305070809-2");
        assert_eq!(c.id, "sub-20240305070809-3");
    }

    #[tokio::test]
    async fn test_list_newest_first_across_pages() {
        let clock = FixedClock::at(T0);
        let catalog = catalog(clock.clone());
        for title in ["first", "second", "third"] {
            catalog
                .create(Upload::new("run.json", sample_log()).with_title(title))
                .await
                .unwrap();
            clock.advance(60);
        }

        let titles: Vec<String> = catalog.list().await.unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_metadata() {
        let files = Arc::new(InMemoryFileStore::new());
        let metadata = Arc::new(InMemoryMetadataStore::new());
        metadata.put("sub-broken_metadata", "{oops".to_string()).await.unwrap();
        let catalog = Catalog::new(files, metadata, FixedClock::at(T0));

        catalog.create(Upload::new("run.json", sample_log())).await.unwrap();
        assert_eq!(catalog.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let catalog = catalog(FixedClock::at(T0));
        let err = catalog.get("sub-nope").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.detail(), "Submission not found");
    }

    #[tokio::test]
    async fn test_status_ready_and_error() {
        let files = Arc::new(InMemoryFileStore::new());
        let catalog = Catalog::new(files.clone(), Arc::new(InMemoryMetadataStore::new()), FixedClock::at(T0));
        let receipt = catalog.create(Upload::new("run.json", sample_log())).await.unwrap();

        let ready = catalog.status(&receipt.id).await.unwrap();
        assert_eq!(ready.status, SubmissionStatus::Ready);
        assert_eq!(ready.frame_count, Some(2));
        assert_eq!(ready.has_metadata, Some(true));
        assert_eq!(ready.file_path.as_deref(), Some("sub-20240305070809.json"));

        files
            .put("sub-corrupt.json", b"{broken".to_vec(), JSON_CONTENT_TYPE)
            .await
            .unwrap();
        let broken = catalog.status("sub-corrupt").await.unwrap();
        assert_eq!(broken.status, SubmissionStatus::Error);
        assert!(broken.message.is_some());

        assert_eq!(catalog.status("sub-missing").await.unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn test_data_file_and_log() {
        let catalog = catalog(FixedClock::at(T0));
        let receipt = catalog
            .create(Upload::new("flight-7.json", sample_log()))
            .await
            .unwrap();

        let data = catalog.data(&receipt.id).await.unwrap();
        assert_eq!(data.frame_count, 2);
        assert_eq!(data.obstacles.len(), 1);
        assert_eq!(data.first_frame.unwrap()["state"]["t"], json!(0.0));

        let file = catalog.file(&receipt.id).await.unwrap();
        assert_eq!(file.download_name, "flight-7.json");
        assert_eq!(file.content_type, JSON_CONTENT_TYPE);
        assert_eq!(file.body, sample_log().into_bytes());

        let log = catalog.log(&receipt.id).await.unwrap();
        assert!(log.contains("\n  \"frames\""));
        assert_eq!(catalog.log("sub-missing").await.unwrap_err().detail(), "Log file not found");
    }

    #[tokio::test]
    async fn test_delete_removes_both_records() {
        let catalog = catalog(FixedClock::at(T0));
        let receipt = catalog.create(Upload::new("run.json", sample_log())).await.unwrap();

        catalog.delete(&receipt.id).await.unwrap();

        assert_eq!(catalog.get(&receipt.id).await.unwrap_err().status_code(), 404);
        assert_eq!(catalog.file(&receipt.id).await.unwrap_err().status_code(), 404);
        assert_eq!(catalog.delete(&receipt.id).await.unwrap_err().status_code(), 404);
    }
}
