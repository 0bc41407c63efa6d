//! Catalog records and responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use skyview_core::metadata::{bool_field, number_field};

/// Status of a stored submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionStatus {
    Ready,
    Error,
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Ready
    }
}

/// An upload request: the file plus optional form fields.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub title: Option<String>,
    pub name: Option<String>,
    /// Comma-separated or JSON-array tags
    pub tags: Option<String>,
    pub notes: Option<String>,
    pub env_set: Option<String>,
    pub renderer_preset: Option<String>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_env_set(mut self, env_set: impl Into<String>) -> Self {
        self.env_set = Some(env_set.into());
        self
    }

    pub fn with_renderer_preset(mut self, preset: impl Into<String>) -> Self {
        self.renderer_preset = Some(preset.into());
        self
    }
}

/// Metadata record stored for each submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub env_set: Option<String>,
    #[serde(default)]
    pub renderer_preset: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub log_file_name: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub frame_count: usize,
}

impl SubmissionMetadata {
    fn display_title(&self) -> String {
        if self.title.is_empty() {
            "Untitled".to_string()
        } else {
            self.title.clone()
        }
    }

    /// Name offered when the raw log is downloaded.
    pub fn download_name(&self) -> String {
        if self.log_file_name.is_empty() {
            format!("{}.json", self.id)
        } else {
            self.log_file_name.clone()
        }
    }

    pub fn summary(&self) -> SubmissionSummary {
        SubmissionSummary {
            id: self.id.clone(),
            title: self.display_title(),
            name: self.name.clone().filter(|n| !n.is_empty()),
            created_at: self.created_at.clone(),
            status: self.status,
            tags: self.tags.clone(),
            log_file_name: self.download_name(),
        }
    }
}

/// Response to a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub id: String,
    pub title: String,
    pub status: SubmissionStatus,
    pub created_at: String,
    pub message: String,
}

/// Row of the submission list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub id: String,
    pub title: String,
    pub name: Option<String>,
    pub created_at: String,
    pub status: SubmissionStatus,
    pub tags: Vec<String>,
    pub log_file_name: String,
}

/// Scores the simulator attached to the log metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collisions: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_efficiency: Option<f64>,
}

impl SubmissionMetrics {
    /// Extracts metrics from log metadata; `None` when no metric is present.
    pub fn from_metadata(metadata: &Map<String, Value>) -> Option<Self> {
        let metrics = Self {
            score: number_field(metadata, &["score"]),
            success: bool_field(metadata, &["success"]),
            time_sec: number_field(metadata, &["time_sec", "timeSec"]),
            collisions: number_field(metadata, &["collisions"]),
            smoothness: number_field(metadata, &["smoothness"]),
            path_efficiency: number_field(metadata, &["path_efficiency", "pathEfficiency"]),
        };
        (metrics != Self::default()).then_some(metrics)
    }
}

/// Full submission detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub title: String,
    pub name: Option<String>,
    pub created_at: String,
    pub env_set: Option<String>,
    pub status: SubmissionStatus,
    pub duration_sec: Option<f64>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub metrics: Option<SubmissionMetrics>,
    pub log_file_name: String,
    pub renderer_version: Option<String>,
}

impl Submission {
    /// Score used for gallery sorting (missing counts as 0).
    pub fn score(&self) -> f64 {
        self.metrics.as_ref().and_then(|m| m.score).unwrap_or(0.0)
    }
}

/// Result of a status check on a stored log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub id: String,
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_metadata: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Lightweight view of a stored log for the viewer page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionData {
    pub id: String,
    pub frame_count: usize,
    pub metadata: Map<String, Value>,
    pub obstacles: Vec<Value>,
    pub first_frame: Option<Value>,
}

/// Raw log bytes with the name to download them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFile {
    pub download_name: String,
    pub content_type: String,
    pub body: Vec<u8>,
}
