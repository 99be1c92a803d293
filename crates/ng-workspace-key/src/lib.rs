// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic workspace path normalization and key derivation.
//!
//! [`normalize`] turns an arbitrary filesystem path into a canonical string
//! form; [`compute_key`] hashes that form into a stable 32-hex-char
//! [`WorkspaceKey`]. Both must produce byte-identical output across
//! reimplementations, so every step of the normalization pipeline below is
//! load-bearing and must not be reordered.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use ng_error::{ErrorCode, GalleryError};
use sha2::{Digest, Sha256};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// A normalized workspace path. Lowercase, forward-slashed, NFC-normalized,
/// with slash rules per [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonPath(String);

impl CanonPath {
    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 32-character lowercase hex workspace identity, derived from a
/// [`CanonPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceKey(String);

impl WorkspaceKey {
    /// Borrow the underlying 32-character hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The named-mutex/pipe namespace derived from this key, e.g.
    /// `NextGallery_<key>` for the mutex and
    /// `codecomfy.nextgallery.<key>` for the duplex pipe.
    #[must_use]
    pub fn mutex_name(&self) -> String {
        format!("NextGallery_{}", self.0)
    }

    /// The pipe channel name for this key.
    #[must_use]
    pub fn pipe_name(&self) -> String {
        format!("codecomfy.nextgallery.{}", self.0)
    }
}

impl AsRef<str> for WorkspaceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkspaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns `true` if `s` is exactly 32 lowercase hex characters.
#[must_use]
pub fn is_well_formed_key(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Normalizes `path` into a [`CanonPath`] following the contractual
/// seven-step pipeline:
///
/// 1. Reject empty, whitespace-only, or null-byte-containing input.
/// 2. Resolve to an absolute path using host OS semantics.
/// 3. Replace backslashes with forward slashes.
/// 4. Collapse any leading run of 3+ slashes down to exactly `//`.
/// 5. Apply Unicode NFC normalization.
/// 6. Lowercase, folding ASCII `A`-`Z` to `a`-`z` only (not locale-aware).
/// 7. Apply trailing-slash rules for UNC roots, drive roots, and regular
///    paths.
///
/// # Errors
///
/// Returns [`ErrorCode::WorkspaceKeyInvalidInput`] if `path` is empty,
/// whitespace-only, contains a null byte, or cannot be resolved to an
/// absolute path.
pub fn normalize(path: &str) -> Result<CanonPath, GalleryError> {
    if path.trim().is_empty() || path.contains('\0') {
        return Err(invalid_input(path));
    }

    let absolute = std::path::absolute(Path::new(path)).map_err(|e| {
        invalid_input(path).with_source(e)
    })?;
    let absolute = absolute
        .to_str()
        .ok_or_else(|| invalid_input(path))?
        .to_string();

    let slashed = absolute.replace('\\', "/");
    let collapsed = collapse_leading_slashes(&slashed);
    let nfc: String = collapsed.nfc().collect();
    let lowered = ascii_lowercase(&nfc);
    let final_form = apply_trailing_slash_rules(lowered);

    Ok(CanonPath(final_form))
}

fn invalid_input(path: &str) -> GalleryError {
    GalleryError::new(ErrorCode::WorkspaceKeyInvalidInput, "invalid workspace path")
        .with_context("input_len", path.len())
}

/// Collapses a leading run of three or more `/` down to exactly `//`.
/// Guards UNC edge cases where the OS resolver may emit extra separators.
fn collapse_leading_slashes(s: &str) -> String {
    let run = s.bytes().take_while(|&b| b == b'/').count();
    if run >= 3 {
        format!("//{}", &s[run..])
    } else {
        s.to_string()
    }
}

/// Lowercases ASCII `A`-`Z` only; every other character (including any
/// non-ASCII letter) passes through unchanged.
fn ascii_lowercase(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c })
        .collect()
}

fn apply_trailing_slash_rules(s: String) -> String {
    if is_unc_share_root(&s) {
        return s.trim_end_matches('/').to_string();
    }
    if is_bare_drive_root(&s) {
        return format!("{s}/");
    }
    if s.len() > 3 {
        return s.trim_end_matches('/').to_string();
    }
    s
}

/// A UNC share root begins with `//` and the remainder splits into exactly
/// two non-empty segments, e.g. `//server/share`.
fn is_unc_share_root(s: &str) -> bool {
    let Some(rest) = s.strip_prefix("//") else {
        return false;
    };
    let rest = rest.trim_end_matches('/');
    let segments: Vec<&str> = rest.split('/').collect();
    segments.len() == 2 && segments.iter().all(|seg| !seg.is_empty())
}

/// A bare drive root is exactly two characters, the second being `:`
/// (e.g. `c:`).
fn is_bare_drive_root(s: &str) -> bool {
    s.len() == 2 && s.as_bytes()[1] == b':'
}

/// Derives the 32-hex-char [`WorkspaceKey`] for `path`.
///
/// Equivalent to `normalize(path)` followed by
/// `sha256(utf8(canon_path))[..32]` hex-encoded lowercase.
///
/// # Errors
///
/// Propagates any error from [`normalize`].
pub fn compute_key(path: &str) -> Result<WorkspaceKey, GalleryError> {
    let canon = normalize(path)?;
    Ok(key_from_canon(&canon))
}

/// Derives a [`WorkspaceKey`] directly from an already-computed
/// [`CanonPath`], without re-running normalization.
#[must_use]
pub fn key_from_canon(canon: &CanonPath) -> WorkspaceKey {
    let digest = Sha256::digest(canon.as_str().as_bytes());
    let hex = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    WorkspaceKey(hex[..32].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_blank_input() {
        assert!(normalize("").is_err());
        assert!(normalize("   ").is_err());
    }

    #[test]
    fn rejects_null_byte() {
        assert!(normalize("/foo\0bar").is_err());
    }

    #[test]
    fn key_is_32_lowercase_hex_chars() {
        let key = compute_key("/home/user/workspace").unwrap();
        assert!(is_well_formed_key(key.as_str()));
    }

    #[test]
    fn normalize_is_idempotent() {
        let canon = normalize("/Home/User/Workspace/").unwrap();
        let reapplied = normalize(canon.as_str()).unwrap();
        assert_eq!(canon.as_str(), reapplied.as_str());
    }

    #[test]
    fn case_insensitive_for_ascii_letters() {
        let a = compute_key("/Home/User/Project").unwrap();
        let b = compute_key("/home/user/project").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn slash_direction_insensitive() {
        // std::path::absolute on a Unix host won't reinterpret backslashes
        // as separators, so this exercises our own backslash normalization
        // rather than OS path resolution.
        let collapsed_a = collapse_leading_slashes("/home/user/project");
        let collapsed_b = collapse_leading_slashes(&"\\home\\user\\project".replace('\\', "/"));
        assert_eq!(collapsed_a, collapsed_b);
    }

    #[test]
    fn trailing_slash_insensitive_for_regular_paths() {
        let a = compute_key("/home/user/project").unwrap();
        let b = compute_key("/home/user/project/").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unc_share_root_has_no_trailing_slash() {
        let result = apply_trailing_slash_rules("//server/share".to_string());
        assert_eq!(result, "//server/share");
        let result = apply_trailing_slash_rules("//server/share/".to_string());
        assert_eq!(result, "//server/share");
    }

    #[test]
    fn bare_drive_root_gets_trailing_slash() {
        assert_eq!(apply_trailing_slash_rules("c:".to_string()), "c:/");
    }

    #[test]
    fn three_or_more_leading_slashes_collapse_to_two() {
        assert_eq!(collapse_leading_slashes("///server/share"), "//server/share");
        assert_eq!(collapse_leading_slashes("////server/share"), "//server/share");
        assert_eq!(collapse_leading_slashes("//server/share"), "//server/share");
    }

    #[test]
    fn unicode_is_nfc_normalized() {
        // "e" + combining acute (NFD) should normalize to the same CanonPath
        // as the precomposed "é" (NFC).
        let nfd = "/home/caf\u{0065}\u{0301}";
        let nfc = "/home/caf\u{00e9}";
        let key_nfd = compute_key(nfd).unwrap();
        let key_nfc = compute_key(nfc).unwrap();
        assert_eq!(key_nfd, key_nfc);
    }

    #[test]
    fn well_formed_key_rejects_uppercase_and_wrong_length() {
        assert!(!is_well_formed_key("ABCDEF0123456789ABCDEF0123456789"));
        assert!(!is_well_formed_key("abc123"));
        assert!(is_well_formed_key(&"a".repeat(32)));
    }
}
