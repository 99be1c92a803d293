// SPDX-License-Identifier: MIT OR Apache-2.0
//! `schema_version` parsing and per-entry validation/triage.

use ng_core::{FileRef, JobKind, JobRow};
use serde_json::Value;

/// A parsed `major.minor` schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
}

impl SchemaVersion {
    /// The version assumed when `schema_version` is missing or
    /// unparseable: `0.1`.
    pub const DEFAULT: Self = Self { major: 0, minor: 1 };

    /// Parses a `"major.minor"` string. Missing or unparseable components
    /// fall back to [`SchemaVersion::DEFAULT`].
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::DEFAULT;
        };
        let mut parts = raw.splitn(2, '.');
        let major = parts.next().and_then(|s| s.parse().ok());
        let minor = parts.next().and_then(|s| s.parse().ok());
        match (major, minor) {
            (Some(major), Some(minor)) => Self { major, minor },
            _ => Self::DEFAULT,
        }
    }

    /// `true` if this major version is not readable by this loader.
    ///
    /// Major 0 is best-effort (unknown fields ignored). Every major version
    /// `>= 1` is currently unsupported.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.major >= 1
    }
}

/// Outcome of parsing the `items` array: validated rows plus a count of
/// entries that failed validation and were skipped.
pub struct ParsedItems {
    /// Entries that passed validation, in on-disk (append) order.
    pub valid: Vec<JobRow>,
    /// Number of entries skipped for missing/invalid required fields.
    pub skipped: usize,
}

/// Parses and validates every element of `items`, skipping (and counting)
/// entries that fail the required-field rules from the index schema.
#[must_use]
pub fn parse_items(items: &[Value]) -> ParsedItems {
    let mut valid = Vec::with_capacity(items.len());
    let mut skipped = 0usize;

    for item in items {
        match parse_entry(item) {
            Some(row) => valid.push(row),
            None => skipped += 1,
        }
    }

    ParsedItems { valid, skipped }
}

fn parse_entry(item: &Value) -> Option<JobRow> {
    let obj = item.as_object()?;

    let job_id = obj.get("job_id")?.as_str()?;
    if job_id.is_empty() {
        return None;
    }

    let created_at = obj.get("created_at")?.as_str()?;
    if chrono::DateTime::parse_from_rfc3339(created_at).is_err() {
        return None;
    }

    let kind_raw = obj.get("kind")?.as_str()?;
    let kind = JobKind::parse_lowercase(&kind_raw.to_ascii_lowercase())?;

    let files_raw = obj.get("files")?.as_array()?;
    if files_raw.is_empty() {
        return None;
    }
    let files: Vec<FileRef> = files_raw.iter().filter_map(parse_file_ref).collect();
    if !files.iter().any(FileRef::is_valid) {
        return None;
    }

    let seed = obj.get("seed")?.as_i64()?;

    Some(JobRow {
        job_id: job_id.to_string(),
        created_at: created_at.to_string(),
        kind,
        files,
        seed,
        prompt: string_field(obj, "prompt"),
        negative_prompt: string_field(obj, "negative_prompt"),
        preset_id: string_field(obj, "preset_id"),
        elapsed_seconds: obj.get("elapsed_seconds").and_then(Value::as_f64),
        tags: obj
            .get("tags")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default(),
        favorite: obj.get("favorite").and_then(Value::as_bool).unwrap_or(false),
        notes: string_field(obj, "notes").unwrap_or_default(),
    })
}

fn parse_file_ref(raw: &Value) -> Option<FileRef> {
    let obj = raw.as_object()?;
    let relative_path = obj.get("path")?.as_str()?.to_string();
    let sha256 = obj.get("sha256")?.as_str()?.to_ascii_lowercase();
    Some(FileRef {
        relative_path,
        sha256,
        content_type: string_field(obj, "content_type"),
        width: obj.get("width").and_then(Value::as_u64).map(|n| n as u32),
        height: obj.get("height").and_then(Value::as_u64).map(|n| n as u32),
        size_bytes: obj.get("size_bytes").and_then(Value::as_u64),
    })
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn version_defaults_when_missing() {
        assert_eq!(SchemaVersion::parse(None), SchemaVersion::DEFAULT);
        assert_eq!(SchemaVersion::parse(Some("garbage")), SchemaVersion::DEFAULT);
    }

    #[test]
    fn version_parses_major_minor() {
        assert_eq!(
            SchemaVersion::parse(Some("0.1")),
            SchemaVersion { major: 0, minor: 1 }
        );
        assert_eq!(
            SchemaVersion::parse(Some("2.0")),
            SchemaVersion { major: 2, minor: 0 }
        );
    }

    #[test]
    fn major_zero_is_supported_major_one_is_not() {
        assert!(!SchemaVersion { major: 0, minor: 1 }.is_unsupported());
        assert!(SchemaVersion { major: 1, minor: 0 }.is_unsupported());
        assert!(SchemaVersion { major: 2, minor: 0 }.is_unsupported());
    }

    #[test]
    fn entry_with_all_required_fields_parses() {
        let entry = json!({
            "job_id": "job-1",
            "created_at": "2026-01-01T00:00:00Z",
            "kind": "Image",
            "files": [{"path": "a.png", "sha256": "a".repeat(64)}],
            "seed": 42
        });
        let row = parse_entry(&entry).expect("should parse");
        assert_eq!(row.job_id, "job-1");
        assert_eq!(row.kind, JobKind::Image);
        assert_eq!(row.seed, 42);
    }

    #[test]
    fn entry_missing_required_field_is_rejected() {
        let entry = json!({
            "job_id": "job-1",
            "created_at": "2026-01-01T00:00:00Z",
            "kind": "image",
            "seed": 42
        });
        assert!(parse_entry(&entry).is_none());
    }

    #[test]
    fn entry_with_all_invalid_files_is_rejected() {
        let entry = json!({
            "job_id": "job-1",
            "created_at": "2026-01-01T00:00:00Z",
            "kind": "image",
            "files": [{"path": "../escape.png", "sha256": "a".repeat(64)}],
            "seed": 1
        });
        assert!(parse_entry(&entry).is_none());
    }

    #[test]
    fn parse_items_counts_skipped_entries() {
        let items = vec![
            json!({
                "job_id": "job-1", "created_at": "2026-01-01T00:00:00Z",
                "kind": "image", "files": [{"path": "a.png", "sha256": "a".repeat(64)}], "seed": 1
            }),
            json!({"job_id": ""}),
            json!({"job_id": "job-2"}),
        ];
        let parsed = parse_items(&items);
        assert_eq!(parsed.valid.len(), 1);
        assert_eq!(parsed.skipped, 2);
    }
}
