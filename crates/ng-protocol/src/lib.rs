// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire types for the activation channel.
//!
//! The envelope ([`MessageEnvelope`]) is the versioned outer object carried
//! over [`ng_transport`](https://docs.rs/ng-transport)'s duplex pipe.
//! [`validate`] turns untrusted inbound bytes into a [`ValidationResult`];
//! construct outbound envelopes directly with [`MessageEnvelope::new`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod validate;

pub use validate::{validate, EnvelopeValidator, ValidationAction, ValidationResult};

use serde::{Deserialize, Serialize};

/// Current wire protocol version. The only value this build accepts for
/// `protocol_version`.
pub const PROTOCOL_VERSION: &str = "1";

/// Maximum serialized envelope size in either direction.
pub const MAX_ENVELOPE_BYTES: usize = 64 * 1024;

/// Maximum length of `ActivationRequestPayload::workspace_path`; longer
/// values are truncated when emitted.
pub const MAX_WORKSPACE_PATH_BYTES: usize = 32 * 1024;

/// Maximum entries in `ActivationRequestPayload::args`; longer sequences
/// are truncated when emitted.
pub const MAX_ARGS_ENTRIES: usize = 100;

/// Discriminates the kind of message an envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// A secondary instance asking the primary to activate.
    ActivationRequest,
    /// The primary's reply to an activation request.
    ActivationResponse,
    /// Liveness probe.
    Ping,
    /// Reply to a liveness probe.
    Pong,
}

impl MessageType {
    fn as_wire_str(self) -> &'static str {
        match self {
            Self::ActivationRequest => "activation_request",
            Self::ActivationResponse => "activation_response",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "activation_request" => Some(Self::ActivationRequest),
            "activation_response" => Some(Self::ActivationResponse),
            "ping" => Some(Self::Ping),
            "pong" => Some(Self::Pong),
            _ => None,
        }
    }
}

/// The versioned outer object for every message on the activation channel.
///
/// All fields are required on the wire; `payload` fields are
/// forward-compatible (unknown fields are ignored by readers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Wire protocol version. Currently always `"1"`.
    pub protocol_version: String,
    /// What kind of message this is.
    pub message_type: MessageType,
    /// The 32-hex-char workspace key this message is bound to.
    pub workspace_key: String,
    /// Opaque nested payload object, shape determined by `message_type`.
    pub payload: serde_json::Value,
    /// ISO-8601-with-milliseconds timestamp. Diagnostic only: never used
    /// for ordering, expiry, or replay prevention.
    pub timestamp: String,
}

impl MessageEnvelope {
    /// Builds a new envelope at the current protocol version.
    #[must_use]
    pub fn new(
        message_type: MessageType,
        workspace_key: impl Into<String>,
        payload: serde_json::Value,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            message_type,
            workspace_key: workspace_key.into(),
            payload,
            timestamp: timestamp.into(),
        }
    }

    /// Serializes this envelope to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` cannot be serialized (it should
    /// always succeed for `serde_json::Value`).
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Payload of an `activation_request` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRequestPayload {
    /// The workspace path the requester was launched against.
    pub workspace_path: String,
    /// The view the requester would like the primary to navigate to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_view: Option<String>,
    /// Pass-through command-line arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

impl ActivationRequestPayload {
    /// Builds a request payload, silently truncating `workspace_path` to
    /// [`MAX_WORKSPACE_PATH_BYTES`] and `args` to [`MAX_ARGS_ENTRIES`].
    #[must_use]
    pub fn new(
        workspace_path: impl Into<String>,
        requested_view: Option<String>,
        args: Option<Vec<String>>,
    ) -> Self {
        let mut workspace_path = workspace_path.into();
        if workspace_path.len() > MAX_WORKSPACE_PATH_BYTES {
            truncate_at_char_boundary(&mut workspace_path, MAX_WORKSPACE_PATH_BYTES);
        }
        let args = args.map(|mut a| {
            a.truncate(MAX_ARGS_ENTRIES);
            a
        });
        Self {
            workspace_path,
            requested_view,
            args,
        }
    }
}

fn truncate_at_char_boundary(s: &mut String, max_bytes: usize) {
    let mut cut = max_bytes.min(s.len());
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

/// Outcome status carried by an `activation_response` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Activation succeeded.
    Activated,
    /// Activation failed.
    Error,
    /// The primary is busy and could not service the request.
    Busy,
}

/// Observed window state reported back in an `activation_response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    /// The window was restored from a minimized state.
    Restored,
    /// The window was already in the foreground.
    AlreadyForeground,
    /// The window remains minimized.
    Minimized,
    /// Window state could not be determined.
    Unknown,
}

/// Payload of an `activation_response` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationResponsePayload {
    /// Whether activation succeeded, failed, or was refused as busy.
    pub status: ResponseStatus,
    /// The window state observed while handling the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_state: Option<WindowState>,
    /// The view the primary navigated to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigated_to: Option<String>,
    /// Explanatory error message when `status == Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
