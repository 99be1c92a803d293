// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wires the pure activation algorithm to window/index capabilities.
//!
//! The real window manager and index-loader integrations live in the UI
//! shell this backend is embedded in. The stand-ins here are always-valid,
//! always-foreground, and log what a real implementation would do, so the
//! activation channel can be exercised end to end without one.

use ng_activation::{
    ActivationHandler, ActivationRequest, ActivationResult, IndexHandle, WindowHandle,
};
use ng_protocol::{
    ActivationRequestPayload, ActivationResponsePayload, MessageEnvelope, MessageType,
    ResponseStatus,
};
use ng_transport::MessageHandler;
use std::sync::Mutex;

/// Always-valid window stand-in for the embedding's real window handle.
#[derive(Debug, Default)]
pub struct StubWindowHandle {
    minimized: bool,
    foreground: bool,
}

impl WindowHandle for StubWindowHandle {
    fn is_valid(&self) -> bool {
        true
    }

    fn is_minimized(&self) -> bool {
        self.minimized
    }

    fn is_foreground(&self) -> bool {
        self.foreground
    }

    fn restore_from_minimized(&mut self) {
        self.minimized = false;
    }

    fn bring_to_front(&mut self) {
        self.foreground = true;
    }

    fn flash_taskbar(&mut self) {
        tracing::debug!("flash_taskbar (no window shell attached)");
    }

    fn navigate_to(&mut self, view: &str) {
        tracing::info!(view, "navigate_to (no window shell attached)");
    }
}

/// Index-refresh stand-in for the embedding's real view-model refresh.
#[derive(Debug, Default)]
pub struct StubIndexHandle;

impl IndexHandle for StubIndexHandle {
    fn refresh(&mut self) {
        tracing::debug!("index refresh requested by activation (no view model attached)");
    }
}

/// Adapts [`ActivationHandler`] to [`MessageHandler`] for the transport
/// server, holding the window/index capabilities behind a mutex since
/// `handle` is called with `&self`.
pub struct ActivationMessageHandler {
    window: Mutex<StubWindowHandle>,
    index: Mutex<StubIndexHandle>,
}

impl ActivationMessageHandler {
    /// Builds a handler over the given window/index capabilities.
    #[must_use]
    pub fn new(window: StubWindowHandle, index: StubIndexHandle) -> Self {
        Self {
            window: Mutex::new(window),
            index: Mutex::new(index),
        }
    }
}

impl MessageHandler for ActivationMessageHandler {
    fn handle(&self, envelope: MessageEnvelope) -> Option<MessageEnvelope> {
        if envelope.message_type != MessageType::ActivationRequest {
            return None;
        }

        let payload: ActivationRequestPayload = match serde_json::from_value(envelope.payload.clone())
        {
            Ok(payload) => payload,
            Err(_) => return Some(error_response(&envelope, "malformed activation_request payload")),
        };

        let request = ActivationRequest {
            requested_view: payload.requested_view,
        };

        let mut window = self.window.lock().unwrap();
        let mut index = self.index.lock().unwrap();
        let result = ActivationHandler.handle(&request, &mut *window, &mut *index);
        let window_state = result.response_window_state();

        let response_payload = match result {
            ActivationResult::Success { navigated_to, .. } => ActivationResponsePayload {
                status: ResponseStatus::Activated,
                window_state: Some(window_state),
                navigated_to,
                error: None,
            },
            ActivationResult::Error { message, .. } => ActivationResponsePayload {
                status: ResponseStatus::Error,
                window_state: Some(window_state),
                navigated_to: None,
                error: Some(message),
            },
        };

        Some(MessageEnvelope::new(
            MessageType::ActivationResponse,
            envelope.workspace_key,
            serde_json::to_value(response_payload).unwrap_or_else(|_| serde_json::json!({})),
            ng_transport::now_iso8601(),
        ))
    }
}

fn error_response(envelope: &MessageEnvelope, reason: &str) -> MessageEnvelope {
    let payload = ActivationResponsePayload {
        status: ResponseStatus::Error,
        window_state: None,
        navigated_to: None,
        error: Some(reason.to_string()),
    };
    MessageEnvelope::new(
        MessageType::ActivationResponse,
        envelope.workspace_key.clone(),
        serde_json::to_value(payload).unwrap_or_else(|_| serde_json::json!({})),
        ng_transport::now_iso8601(),
    )
}
