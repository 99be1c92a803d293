// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy with stable error codes for NextGallery.
//!
//! Every NextGallery error carries an [`ErrorCode`] (a machine-readable,
//! stable string tag), a human-readable message, an optional cause chain,
//! and arbitrary key-value context. Use the builder returned by
//! [`GalleryError::new`] to construct errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Workspace path normalization / key derivation errors.
    WorkspaceKey,
    /// Index file loading errors.
    Index,
    /// Wire envelope validation errors.
    Protocol,
    /// Named-pipe transport errors.
    Transport,
    /// Activation decision errors.
    Activation,
    /// Configuration loading errors.
    Config,
    /// Command-line argument errors.
    Cli,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WorkspaceKey => "workspace_key",
            Self::Index => "index",
            Self::Protocol => "protocol",
            Self::Transport => "transport",
            Self::Activation => "activation",
            Self::Config => "config",
            Self::Cli => "cli",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- WorkspaceKey --
    /// Input path was empty, whitespace-only, or contained a null byte.
    WorkspaceKeyInvalidInput,

    // -- Index --
    /// The index could not be read (permission denied, I/O failure).
    IndexReadFailed,
    /// The index file content could not be parsed as JSON.
    IndexCorrupt,
    /// `schema_version` major component is not supported.
    IndexUnsupportedVersion,
    /// Workspace root does not exist on disk.
    IndexWorkspaceNotFound,
    /// Workspace root exists but is not a directory.
    IndexWorkspaceNotDirectory,

    // -- Protocol --
    /// Envelope failed to parse or has missing/invalid fields.
    ProtocolInvalidEnvelope,
    /// Envelope exceeds the maximum wire size.
    ProtocolMessageTooLarge,
    /// `protocol_version` is not supported by this peer.
    ProtocolVersionMismatch,
    /// `workspace_key` does not match the expected 32-hex-char format.
    ProtocolInvalidKeyFormat,

    // -- Transport --
    /// Connecting to the peer's duplex channel timed out.
    TransportConnectTimeout,
    /// Sending the request timed out.
    TransportSendTimeout,
    /// Waiting for the response timed out.
    TransportReceiveTimeout,
    /// The channel closed before any data was read.
    TransportNoResponse,
    /// The response could not be parsed as a valid envelope.
    TransportInvalidResponse,
    /// Acquiring the system-global instance mutex failed unexpectedly.
    TransportMutexError,

    // -- Activation --
    /// The target window is no longer valid (closed, destroyed).
    ActivationWindowUnavailable,

    // -- Config --
    /// Configuration file or value is invalid.
    ConfigInvalid,

    // -- Cli --
    /// Command-line arguments were invalid or incomplete.
    CliInvalidArgs,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::WorkspaceKeyInvalidInput => ErrorCategory::WorkspaceKey,

            Self::IndexReadFailed
            | Self::IndexCorrupt
            | Self::IndexUnsupportedVersion
            | Self::IndexWorkspaceNotFound
            | Self::IndexWorkspaceNotDirectory => ErrorCategory::Index,

            Self::ProtocolInvalidEnvelope
            | Self::ProtocolMessageTooLarge
            | Self::ProtocolVersionMismatch
            | Self::ProtocolInvalidKeyFormat => ErrorCategory::Protocol,

            Self::TransportConnectTimeout
            | Self::TransportSendTimeout
            | Self::TransportReceiveTimeout
            | Self::TransportNoResponse
            | Self::TransportInvalidResponse
            | Self::TransportMutexError => ErrorCategory::Transport,

            Self::ActivationWindowUnavailable => ErrorCategory::Activation,

            Self::ConfigInvalid => ErrorCategory::Config,

            Self::CliInvalidArgs => ErrorCategory::Cli,

            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"INDEX_CORRUPT"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkspaceKeyInvalidInput => "WORKSPACE_KEY_INVALID_INPUT",
            Self::IndexReadFailed => "INDEX_READ_FAILED",
            Self::IndexCorrupt => "INDEX_CORRUPT",
            Self::IndexUnsupportedVersion => "INDEX_UNSUPPORTED_VERSION",
            Self::IndexWorkspaceNotFound => "INDEX_WORKSPACE_NOT_FOUND",
            Self::IndexWorkspaceNotDirectory => "INDEX_WORKSPACE_NOT_DIRECTORY",
            Self::ProtocolInvalidEnvelope => "PROTOCOL_INVALID_ENVELOPE",
            Self::ProtocolMessageTooLarge => "PROTOCOL_MESSAGE_TOO_LARGE",
            Self::ProtocolVersionMismatch => "PROTOCOL_VERSION_MISMATCH",
            Self::ProtocolInvalidKeyFormat => "PROTOCOL_INVALID_KEY_FORMAT",
            Self::TransportConnectTimeout => "TRANSPORT_CONNECT_TIMEOUT",
            Self::TransportSendTimeout => "TRANSPORT_SEND_TIMEOUT",
            Self::TransportReceiveTimeout => "TRANSPORT_RECEIVE_TIMEOUT",
            Self::TransportNoResponse => "TRANSPORT_NO_RESPONSE",
            Self::TransportInvalidResponse => "TRANSPORT_INVALID_RESPONSE",
            Self::TransportMutexError => "TRANSPORT_MUTEX_ERROR",
            Self::ActivationWindowUnavailable => "ACTIVATION_WINDOW_UNAVAILABLE",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::CliInvalidArgs => "CLI_INVALID_ARGS",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// GalleryError
// ---------------------------------------------------------------------------

/// Unified NextGallery error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use ng_error::{ErrorCode, GalleryError};
///
/// let err = GalleryError::new(ErrorCode::IndexCorrupt, "index is corrupt")
///     .with_context("skipped_count", 3);
/// ```
pub struct GalleryError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl GalleryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for GalleryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("GalleryError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for GalleryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for GalleryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
