//! Submission ids and timestamps derived from the context clock.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::SystemTime;

/// `YYYYMMDDHHmmss` component of a submission id.
pub fn timestamp_component(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format("%Y%m%d%H%M%S").to_string()
}

/// RFC 3339 timestamp with millisecond precision and a `Z` suffix.
pub fn created_at(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Candidate ids for one instant: `<prefix><stamp>`, then `-2`, `-3`, ...
pub fn candidate_ids(prefix: &str, time: SystemTime) -> impl Iterator<Item = String> {
    let base = format!("{}{}", prefix, timestamp_component(time));
    (1u32..).map(move |n| if n == 1 { base.clone() } else { format!("{}-{}", base, n) })
}

/// Parses tags from either a JSON array or a comma-separated list.
pub fn parse_tags(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    if raw.starts_with('[') {
        if let Ok(tags) = serde_json::from_str::<Vec<String>>(raw) {
            return tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
    }

    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
