//! Log ingestion: sanitization and parsing of raw log text.
//!
//! Simulators written in dynamic languages happily emit `Infinity`, `-Infinity`
//! and `NaN` as bare literals, which are not JSON. These are rewritten to
//! `null` before parsing; string contents are never touched.

use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

use crate::flight_log::SimulationLog;

/// Number of characters of the original text quoted in parse errors.
const PREVIEW_CHARS: usize = 200;

/// Errors raised while turning text into a [`SimulationLog`].
#[derive(Debug, Error)]
pub enum IngestError {
    /// The input is empty or whitespace only
    #[error("Log is empty; expected a JSON simulation log")]
    Empty,

    /// The sanitized text is not valid JSON
    #[error("Log is not valid JSON: {message}. Content length: {length} bytes. Preview: {preview}...")]
    InvalidJson {
        message: String,
        length: usize,
        preview: String,
    },

    /// Top-level object has no `frames` field
    #[error("Invalid simulation log: missing 'frames' field")]
    MissingFrames,

    /// `frames` is present but does not have the log shape
    #[error("Invalid simulation log: {0}")]
    InvalidStructure(String),
}

/// Rewrites bare `Infinity`, `-Infinity` and `NaN` literals to `null`.
///
/// Returns the input unchanged (borrowed) when nothing needs rewriting.
pub fn sanitize_non_finite(text: &str) -> Cow<'_, str> {
    const LITERALS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    let bytes = text.as_bytes();
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            i += 1;
            continue;
        }
        if b == b'"' {
            in_string = true;
            i += 1;
            continue;
        }

        let boundary_before = i == 0 || !is_ident_byte(bytes[i - 1]);
        let literal = LITERALS.iter().find(|lit| {
            let end = i + lit.len();
            boundary_before
                && bytes[i..].starts_with(lit.as_bytes())
                && (end == bytes.len() || !is_ident_byte(bytes[end]))
        });

        match literal {
            Some(lit) => {
                let buf = out.get_or_insert_with(|| String::with_capacity(text.len()));
                buf.push_str(&text[copied_to..i]);
                buf.push_str("null");
                i += lit.len();
                copied_to = i;
            }
            None => i += 1,
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&text[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(text),
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Sanitizes and parses log text into a JSON value with a `frames` field.
///
/// The raw value is kept so callers can report on fields the typed model
/// ignores (e.g. whether `metadata` was present at all).
pub fn parse_log_value(text: &str) -> Result<Value, IngestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(IngestError::Empty);
    }

    let sanitized = sanitize_non_finite(text);
    let value: Value = serde_json::from_str(&sanitized).map_err(|e| IngestError::InvalidJson {
        message: e.to_string(),
        length: text.len(),
        preview: text.chars().take(PREVIEW_CHARS).collect(),
    })?;

    match value.as_object() {
        Some(obj) if obj.contains_key("frames") => Ok(value),
        _ => Err(IngestError::MissingFrames),
    }
}

/// Number of frames in a parsed log value (0 when `frames` is not an array).
pub fn frame_count_of(value: &Value) -> usize {
    value
        .get("frames")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

impl SimulationLog {
    /// Parses a log from raw text, sanitizing non-finite literals first.
    pub fn from_json_str(text: &str) -> Result<Self, IngestError> {
        let value = parse_log_value(text)?;
        Self::from_value(value)
    }

    /// Converts an already parsed value into a typed log.
    pub fn from_value(value: Value) -> Result<Self, IngestError> {
        serde_json::from_value(value).map_err(|e| IngestError::InvalidStructure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_value_literals() {
        let raw = r#"{"a": Infinity, "b": [-Infinity, NaN, 1], "c":NaN}"#;
        assert_eq!(
            sanitize_non_finite(raw),
            r#"{"a": null, "b": [null, null, 1], "c":null}"#
        );
    }

    #[test]
    fn test_sanitize_leaves_strings_and_identifiers() {
        let raw = r#"{"note": "NaN and Infinity \" NaN", "InfinityX": 1}"#;
        assert!(matches!(sanitize_non_finite(raw), Cow::Borrowed(_)));
    }

    #[test]
    fn test_parse_requires_frames() {
        assert!(matches!(parse_log_value("   "), Err(IngestError::Empty)));
        assert!(matches!(parse_log_value("{\"metadata\": {}}"), Err(IngestError::MissingFrames)));
        assert!(matches!(parse_log_value("[1, 2]"), Err(IngestError::MissingFrames)));

        match parse_log_value("{frames: ") {
            Err(IngestError::InvalidJson { length, preview, .. }) => {
                assert_eq!(length, 9);
                assert_eq!(preview, "{frames: ");
            }
            other => panic!("expected InvalidJson, got {:?}", other),
        }
    }

    #[test]
    fn test_non_ascii_outside_strings() {
        let value = parse_log_value("\u{feff}{\"frames\": []}").unwrap();
        assert_eq!(frame_count_of(&value), 0);

        assert!(matches!(
            parse_log_value("{\"frames\": [], \"x\": é}"),
            Err(IngestError::InvalidJson { .. })
        ));
        assert_eq!(sanitize_non_finite("[é, NaN]"), "[é, null]");
    }

    #[test]
    fn test_from_json_str_with_non_finite_metadata() {
        let raw = r#"{
            "metadata": {"config": {"simulation": {"goal_threshold": Infinity}}},
            "frames": [{"state": {"t": 0, "pos": [[0, 0, NaN]], "ids": [0], "goals": []}}]
        }"#;
        let log = SimulationLog::from_json_str(raw).unwrap();

        assert_eq!(log.frame_count(), 1);
        assert_eq!(log.goal_threshold(1.0), 1.0);
        assert_eq!(log.state(0).unwrap().pos[0].point(), None);
    }

    #[test]
    fn test_frame_count_of_non_array() {
        let value = parse_log_value(r#"{"frames": {"0": {}}}"#).unwrap();
        assert_eq!(frame_count_of(&value), 0);
        assert!(SimulationLog::from_value(value).is_err());
    }
}
