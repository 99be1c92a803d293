// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared domain types for the NextGallery index and view projection.
//!
//! These types are produced by the index loader and consumed by the view
//! projection layer. None of them perform I/O; they are plain data.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// Fallback text shown when a job has no prompt recorded.
pub const NO_PROMPT_FALLBACK: &str = "(no prompt)";

/// Fallback text shown when a job has no preset id recorded.
pub const UNKNOWN_PRESET_FALLBACK: &str = "unknown";

/// The kind of artifact a job produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// A still image.
    Image,
    /// A video clip.
    Video,
}

impl JobKind {
    /// Parse a kind from its lowercased wire representation.
    ///
    /// Unlike `serde`'s derived `Deserialize`, this never errors on mixed
    /// case — callers lowercase the raw string before calling this so
    /// `"Image"` and `"image"` both resolve.
    #[must_use]
    pub fn parse_lowercase(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// A single file produced by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Path relative to the workspace outputs directory.
    pub relative_path: String,
    /// Lowercase hex-encoded SHA-256 content hash (64 characters).
    pub sha256: String,
    /// MIME type, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Pixel width, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// File size in bytes, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl FileRef {
    /// Returns `true` when `relative_path` and `sha256` satisfy the entry
    /// validity rules: the path is non-empty, contains no `..` segment, and
    /// is not absolute/rooted; the hash is exactly 64 hex characters.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Self::is_valid_relative_path(&self.relative_path) && Self::is_valid_sha256(&self.sha256)
    }

    fn is_valid_relative_path(path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        if path.starts_with('/') || path.starts_with('\\') {
            return false;
        }
        // Windows drive-rooted paths (e.g. "C:\...") are also rejected.
        if path.len() >= 2 && path.as_bytes()[1] == b':' {
            return false;
        }
        !path
            .split(['/', '\\'])
            .any(|segment| segment == "..")
    }

    fn is_valid_sha256(hash: &str) -> bool {
        hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

/// One entry of the index's `items` array, projected for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRow {
    /// Unique job identifier.
    pub job_id: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// Whether this job produced an image or a video.
    pub kind: JobKind,
    /// Files produced by this job, in their original order.
    pub files: Vec<FileRef>,
    /// The seed used to produce this job's output.
    pub seed: i64,
    /// Generation prompt, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Negative prompt, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Identifier of the generation preset used, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
    /// Wall-clock seconds the job took to run, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    /// User-assigned tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the user has favorited this job.
    #[serde(default)]
    pub favorite: bool,
    /// Free-form user notes.
    #[serde(default)]
    pub notes: String,
}

impl JobRow {
    /// The prompt to display, falling back to [`NO_PROMPT_FALLBACK`] when
    /// absent.
    #[must_use]
    pub fn display_prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(NO_PROMPT_FALLBACK)
    }

    /// The preset id to display, falling back to [`UNKNOWN_PRESET_FALLBACK`]
    /// when absent.
    #[must_use]
    pub fn display_preset_id(&self) -> &str {
        self.preset_id.as_deref().unwrap_or(UNKNOWN_PRESET_FALLBACK)
    }

    /// Returns `true` if at least one of `files` is individually valid.
    #[must_use]
    pub fn has_any_valid_file(&self) -> bool {
        self.files.iter().any(FileRef::is_valid)
    }
}

/// Why a workspace could not be loaded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FatalReason {
    /// The workspace root does not exist on disk.
    WorkspaceNotFound,
    /// The workspace root exists but is not a directory.
    WorkspaceNotDirectory,
    /// The index declares a schema major version this loader cannot read.
    UnsupportedVersion,
}

/// The presentation state produced by a single load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    /// Transient entry state; reserved for the projection during an
    /// in-flight refresh. Never produced directly by the pure loader.
    Loading,
    /// No jobs to show.
    Empty,
    /// Jobs to show, newest first.
    List {
        /// Items in display order (newest first).
        items: Vec<JobRow>,
    },
    /// Unrecoverable for this workspace.
    Fatal {
        /// Human-readable explanation.
        message: String,
        /// Machine-readable reason.
        reason: FatalReason,
    },
}

impl LoadState {
    /// Returns the items of a [`LoadState::List`], or `None` otherwise.
    #[must_use]
    pub fn items(&self) -> Option<&[JobRow]> {
        match self {
            Self::List { items } => Some(items),
            _ => None,
        }
    }

    /// Returns `true` for [`LoadState::Fatal`].
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// Severity of a [`Banner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerSeverity {
    /// No banner is shown.
    None,
    /// Informational, non-error condition (e.g. some entries skipped).
    Info,
    /// A recoverable error occurred; previous data may still be shown.
    Warning,
}

/// A non-fatal, state-derived message surfaced alongside the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    /// How severe the condition is.
    pub severity: BannerSeverity,
    /// Human-readable message. Empty when `severity` is `None`.
    pub message: String,
    /// Number of entries skipped in the current load, if applicable.
    pub skipped_count: usize,
}

impl Banner {
    /// No banner.
    #[must_use]
    pub fn none() -> Self {
        Self {
            severity: BannerSeverity::None,
            message: String::new(),
            skipped_count: 0,
        }
    }

    /// An informational banner reporting `skipped_count` unparseable
    /// entries.
    #[must_use]
    pub fn info(message: impl Into<String>, skipped_count: usize) -> Self {
        Self {
            severity: BannerSeverity::Info,
            message: message.into(),
            skipped_count,
        }
    }

    /// A warning banner for a recoverable failure.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: BannerSeverity::Warning,
            message: message.into(),
            skipped_count: 0,
        }
    }
}

/// Result of a single, pure index load.
///
/// `last_known_good` is the snapshot the caller should pass into the next
/// call to the loader: it is the new "last good list", which persists
/// across recoverable failures and is refreshed on every successful load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    /// The presentation state for this load.
    pub state: LoadState,
    /// The banner to surface alongside `state`.
    pub banner: Banner,
    /// The snapshot to carry forward as `last_known_good` on the next load.
    pub last_known_good: Vec<JobRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_parses_only_lowercase() {
        assert_eq!(JobKind::parse_lowercase("image"), Some(JobKind::Image));
        assert_eq!(JobKind::parse_lowercase("video"), Some(JobKind::Video));
        assert_eq!(JobKind::parse_lowercase("Image"), None);
        assert_eq!(JobKind::parse_lowercase("audio"), None);
    }

    #[test]
    fn display_prompt_falls_back() {
        let row = sample_row(vec![]);
        assert_eq!(row.display_prompt(), NO_PROMPT_FALLBACK);
        assert_eq!(row.display_preset_id(), UNKNOWN_PRESET_FALLBACK);
    }

    #[test]
    fn file_ref_rejects_dotdot_and_absolute() {
        assert!(!FileRef {
            relative_path: "../escape.png".into(),
            sha256: "a".repeat(64),
            content_type: None,
            width: None,
            height: None,
            size_bytes: None,
        }
        .is_valid());

        assert!(!FileRef {
            relative_path: "/etc/passwd".into(),
            sha256: "a".repeat(64),
            content_type: None,
            width: None,
            height: None,
            size_bytes: None,
        }
        .is_valid());

        assert!(!FileRef {
            relative_path: "C:\\Windows\\System32".into(),
            sha256: "a".repeat(64),
            content_type: None,
            width: None,
            height: None,
            size_bytes: None,
        }
        .is_valid());
    }

    #[test]
    fn file_ref_rejects_bad_hash_length() {
        assert!(!FileRef {
            relative_path: "a.png".into(),
            sha256: "abc".into(),
            content_type: None,
            width: None,
            height: None,
            size_bytes: None,
        }
        .is_valid());
    }

    #[test]
    fn file_ref_accepts_well_formed_entry() {
        assert!(FileRef {
            relative_path: "outputs/a.png".into(),
            sha256: "f".repeat(64),
            content_type: Some("image/png".into()),
            width: Some(512),
            height: Some(512),
            size_bytes: Some(12345),
        }
        .is_valid());
    }

    fn sample_row(files: Vec<FileRef>) -> JobRow {
        JobRow {
            job_id: "job-1".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            kind: JobKind::Image,
            files,
            seed: 1,
            prompt: None,
            negative_prompt: None,
            preset_id: None,
            elapsed_seconds: None,
            tags: Vec::new(),
            favorite: false,
            notes: String::new(),
        }
    }

    #[test]
    fn load_state_items_accessor() {
        let list = LoadState::List {
            items: vec![sample_row(vec![])],
        };
        assert_eq!(list.items().map(<[_]>::len), Some(1));
        assert_eq!(LoadState::Empty.items(), None);
        assert!(LoadState::Fatal {
            message: "x".into(),
            reason: FatalReason::WorkspaceNotFound,
        }
        .is_fatal());
    }
}
