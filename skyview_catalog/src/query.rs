//! Gallery filtering and sorting.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::model::{Submission, SubmissionStatus};

/// Gallery sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GallerySort {
    /// `created_at` descending
    #[default]
    Newest,
    /// Score descending, missing scores count as 0
    Score,
    /// Duration ascending, missing durations last
    Duration,
}

impl FromStr for GallerySort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "score" => Ok(Self::Score),
            "duration" => Ok(Self::Duration),
            other => Err(format!("Unknown sort '{}' (expected newest, score, duration)", other)),
        }
    }
}

/// Filters applied to the gallery list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryQuery {
    /// Case-insensitive substring matched against title and tags
    pub search: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub sort: GallerySort,
}

impl GalleryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: SubmissionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_sort(mut self, sort: GallerySort) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, submission: &Submission) -> bool {
        if let Some(status) = self.status {
            if submission.status != status {
                return false;
            }
        }

        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        submission.title.to_lowercase().contains(&needle)
            || submission.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    fn compare(&self, a: &Submission, b: &Submission) -> Ordering {
        match self.sort {
            GallerySort::Newest => b.created_at.cmp(&a.created_at),
            GallerySort::Score => b.score().total_cmp(&a.score()),
            GallerySort::Duration => match (a.duration_sec, b.duration_sec) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }

    /// Filters and sorts; ties keep their input order.
    pub fn apply(&self, submissions: &[Submission]) -> Vec<Submission> {
        let mut selected: Vec<Submission> = submissions.iter().filter(|s| self.matches(s)).cloned().collect();
        selected.sort_by(|a, b| self.compare(a, b));
        selected
    }
}
