// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pure index-file loader state machine.
//!
//! [`load`] reads `{workspace_root}/.codecomfy/outputs/index.json` through
//! an injected [`FileReader`] and maps the state of the workspace on disk to
//! one of five user-visible presentation states. It performs no I/O beyond
//! the reader, holds no mutable state of its own, and never panics on
//! malformed input — every failure mode is a typed [`ng_core::LoadResult`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entry;
mod reader;

pub use entry::{parse_items, ParsedItems, SchemaVersion};
pub use reader::{FileReader, PathKind, StdFileReader};

use ng_core::{Banner, FatalReason, JobRow, LoadResult, LoadState};
use std::io;
use std::path::Path;
use tracing::warn;

/// Relative path, from the workspace root, to the writer-owned index file.
pub const INDEX_RELATIVE_PATH: &str = ".codecomfy/outputs/index.json";

/// Runs one pure load of `workspace_root`'s index file.
///
/// `last_known_good` is the snapshot returned as `last_known_good` by the
/// previous call (empty on the very first call for a workspace). The
/// returned [`LoadResult::last_known_good`] is what the caller should pass
/// in on the next call.
///
/// Decision order (first rule that matches wins) follows the documented
/// decision table exactly; see the module docs for the state machine shape.
#[must_use]
pub fn load(
    reader: &dyn FileReader,
    workspace_root: &Path,
    last_known_good: &[JobRow],
) -> LoadResult {
    match reader.kind(workspace_root) {
        PathKind::Missing => {
            return fatal(
                "Workspace directory does not exist",
                FatalReason::WorkspaceNotFound,
                last_known_good,
            );
        }
        PathKind::Directory => {}
        PathKind::File | PathKind::Other => {
            return fatal(
                "Workspace path is not a directory",
                FatalReason::WorkspaceNotDirectory,
                last_known_good,
            );
        }
    }

    let index_path = workspace_root.join(INDEX_RELATIVE_PATH);
    if reader.kind(&index_path) != PathKind::File {
        return LoadResult {
            state: LoadState::Empty,
            banner: Banner::none(),
            last_known_good: Vec::new(),
        };
    }

    let len = match reader.len(&index_path) {
        Ok(len) => len,
        Err(e) => return recover_from_io_error(&e, last_known_good),
    };

    if len == 0 {
        return recover("Index is empty/corrupt", last_known_good);
    }

    let bytes = match reader.read(&index_path) {
        Ok(bytes) => bytes,
        Err(e) => return recover_from_io_error(&e, last_known_good),
    };

    let doc: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(doc) => doc,
        Err(_) => return recover("Index is corrupt", last_known_good),
    };

    let schema_version = SchemaVersion::parse(doc.get("schema_version").and_then(|v| v.as_str()));
    if schema_version.is_unsupported() {
        return fatal(
            "Index schema version is not supported by this version",
            FatalReason::UnsupportedVersion,
            last_known_good,
        );
    }

    let items_raw = doc
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let ParsedItems { valid, skipped } = parse_items(&items_raw);

    if valid.is_empty() && skipped == 0 {
        return LoadResult {
            state: LoadState::Empty,
            banner: Banner::none(),
            last_known_good: Vec::new(),
        };
    }

    if valid.is_empty() && skipped > 0 {
        warn!(skipped, "all entries in index are malformed");
        return recover(
            &format!("All {skipped} entries in index are malformed"),
            last_known_good,
        );
    }

    let mut display_order = valid;
    display_order.reverse();

    let banner = if skipped > 0 {
        Banner::info(format!("{skipped} item(s) couldn't be displayed"), skipped)
    } else {
        Banner::none()
    };

    LoadResult {
        state: LoadState::List {
            items: display_order.clone(),
        },
        banner,
        last_known_good: display_order,
    }
}

fn fatal(message: &str, reason: FatalReason, last_known_good: &[JobRow]) -> LoadResult {
    LoadResult {
        state: LoadState::Fatal {
            message: message.to_string(),
            reason,
        },
        banner: Banner::none(),
        last_known_good: last_known_good.to_vec(),
    }
}

fn recover_from_io_error(err: &io::Error, last_known_good: &[JobRow]) -> LoadResult {
    let message = if err.kind() == io::ErrorKind::PermissionDenied {
        "Cannot read index: permission denied".to_string()
    } else {
        format!("Cannot read index: {err}")
    };
    recover(&message, last_known_good)
}

/// Implements the `recover(msg, lkg)` rule shared by every integrity
/// failure: fall back to the last-known-good list with a warning banner if
/// one exists, otherwise report empty with the same warning.
fn recover(message: &str, last_known_good: &[JobRow]) -> LoadResult {
    warn!(reason = message, "index load recovering");
    if last_known_good.is_empty() {
        LoadResult {
            state: LoadState::Empty,
            banner: Banner::warning(message),
            last_known_good: Vec::new(),
        }
    } else {
        LoadResult {
            state: LoadState::List {
                items: last_known_good.to_vec(),
            },
            banner: Banner::warning(message),
            last_known_good: last_known_good.to_vec(),
        }
    }
}
