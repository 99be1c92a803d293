// SPDX-License-Identifier: MIT OR Apache-2.0
//! Strict, ordered validation of inbound envelope bytes.

use crate::{MessageEnvelope, MessageType, MAX_ENVELOPE_BYTES, PROTOCOL_VERSION};
use ng_json_guard::{validate_json_object, JsonGuardLimits};
use ng_workspace_key::is_well_formed_key;
use serde_json::Value;

/// Generous guard applied to `payload`: deep enough for any realistic
/// activation payload, capped by the envelope's own 64 KiB ceiling.
const PAYLOAD_GUARD: JsonGuardLimits = JsonGuardLimits::new(16, MAX_ENVELOPE_BYTES);

/// What the caller should do with a validated (or rejected) envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationAction {
    /// Hand the envelope to the message handler.
    Process,
    /// Close the connection without responding. Callers should log one
    /// warning and nothing more.
    Drop,
    /// Respond with a well-formed `activation_response` envelope carrying
    /// `status = error`, then close.
    RespondWithError,
}

/// Result of validating one inbound message.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// What to do with the message.
    pub action: ValidationAction,
    /// The parsed envelope, present only when `action == Process`.
    pub envelope: Option<MessageEnvelope>,
    /// Human-readable reason, always present, used for the single log
    /// entry a `Drop` or `RespondWithError` emits.
    pub reason: String,
}

impl ValidationResult {
    fn process(envelope: MessageEnvelope) -> Self {
        Self {
            action: ValidationAction::Process,
            envelope: Some(envelope),
            reason: "ok".to_string(),
        }
    }

    fn drop_with(reason: impl Into<String>) -> Self {
        Self {
            action: ValidationAction::Drop,
            envelope: None,
            reason: reason.into(),
        }
    }

    fn respond_with_error(reason: impl Into<String>) -> Self {
        Self {
            action: ValidationAction::RespondWithError,
            envelope: None,
            reason: reason.into(),
        }
    }
}

/// Validates raw envelope bytes against `expected_workspace_key`.
///
/// Convenience wrapper around [`EnvelopeValidator::validate`] for
/// single-shot callers; servers that validate many messages against a
/// fixed key should construct an [`EnvelopeValidator`] once instead.
#[must_use]
pub fn validate(bytes: &[u8], expected_workspace_key: &str) -> ValidationResult {
    EnvelopeValidator::new(expected_workspace_key).validate(bytes)
}

/// Validates inbound envelope bytes against a fixed expected workspace key.
///
/// Rules are evaluated in order; the first matching rule wins. See the
/// module docs for the full table.
#[derive(Debug, Clone)]
pub struct EnvelopeValidator {
    expected_workspace_key: String,
}

impl EnvelopeValidator {
    /// Builds a validator bound to `expected_workspace_key`.
    #[must_use]
    pub fn new(expected_workspace_key: impl Into<String>) -> Self {
        Self {
            expected_workspace_key: expected_workspace_key.into(),
        }
    }

    /// Validates one message's raw bytes.
    #[must_use]
    pub fn validate(&self, bytes: &[u8]) -> ValidationResult {
        if bytes.len() > MAX_ENVELOPE_BYTES {
            return ValidationResult::drop_with(format!(
                "envelope of {} bytes exceeds {MAX_ENVELOPE_BYTES}-byte limit",
                bytes.len()
            ));
        }

        let value: Value = match serde_json::from_slice(bytes) {
            Ok(v) => v,
            Err(e) => return ValidationResult::drop_with(format!("invalid JSON: {e}")),
        };

        let Some(obj) = value.as_object() else {
            return ValidationResult::drop_with("envelope is not a JSON object");
        };

        let protocol_version = non_empty_str(obj, "protocol_version");
        let message_type_raw = non_empty_str(obj, "message_type");
        let workspace_key = non_empty_str(obj, "workspace_key");
        let timestamp = non_empty_str(obj, "timestamp");
        let payload = obj.get("payload").filter(|p| !p.is_null());
        let payload_ok = payload.is_some_and(|p| validate_json_object(p, PAYLOAD_GUARD).is_empty());

        if protocol_version.is_none()
            || message_type_raw.is_none()
            || workspace_key.is_none()
            || timestamp.is_none()
            || !payload_ok
        {
            return ValidationResult::drop_with("missing or empty required envelope field");
        }

        if protocol_version != Some(PROTOCOL_VERSION) {
            return ValidationResult::respond_with_error(format!(
                "unsupported protocol_version {protocol_version:?}"
            ));
        }

        let Some(message_type) = MessageType::parse(message_type_raw.unwrap()) else {
            return ValidationResult::drop_with("unrecognized message_type");
        };

        let workspace_key = workspace_key.unwrap();
        if !is_well_formed_key(workspace_key) {
            return ValidationResult::drop_with("Invalid workspace_key format");
        }
        if workspace_key != self.expected_workspace_key {
            return ValidationResult::drop_with("workspace_key does not match this instance");
        }

        match serde_json::from_slice::<MessageEnvelope>(bytes) {
            Ok(envelope) => {
                debug_assert_eq!(envelope.message_type, message_type);
                ValidationResult::process(envelope)
            }
            Err(e) => ValidationResult::drop_with(format!("envelope failed to deserialize: {e}")),
        }
    }
}

fn non_empty_str<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}
