// SPDX-License-Identifier: MIT OR Apache-2.0
//! The primary instance's side of the activation channel.

use crate::framing::{read_frame, write_frame};
use crate::now_iso8601;
use interprocess::local_socket::{
    tokio::Stream,
    traits::tokio::Listener as _,
    GenericNamespaced, ListenerOptions, ToNsName,
};
use ng_error::{ErrorCode, GalleryError};
use ng_protocol::{
    ActivationResponsePayload, EnvelopeValidator, MessageEnvelope, MessageType, ResponseStatus,
    ValidationAction,
};
use ng_workspace_key::WorkspaceKey;
use std::time::Instant;
use tokio::io::BufReader;
use tokio::sync::watch;

/// Handles a validated, non-`ping` envelope and optionally produces the
/// envelope to write back.
///
/// `ping` is handled in-component by [`PipeTransportServer`] and never
/// reaches this trait.
pub trait MessageHandler: Send + Sync {
    /// Processes `envelope`, returning a response envelope if one should be
    /// written back to the caller.
    fn handle(&self, envelope: MessageEnvelope) -> Option<MessageEnvelope>;
}

/// Server half of the duplex activation channel.
///
/// Services one connection at a time; additional connections queue at the
/// OS level while the current one is handled, matching the "max one
/// in-flight client" rule.
pub struct PipeTransportServer {
    workspace_key: WorkspaceKey,
    validator: EnvelopeValidator,
    started_at: Instant,
}

impl PipeTransportServer {
    /// Builds a server bound to `workspace_key`'s pipe name. Does not bind
    /// the OS resource yet; that happens in [`Self::serve`].
    #[must_use]
    pub fn new(workspace_key: WorkspaceKey) -> Self {
        let validator = EnvelopeValidator::new(workspace_key.as_str());
        Self {
            workspace_key,
            validator,
            started_at: Instant::now(),
        }
    }

    /// Runs the accept loop until `cancel` carries `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the named pipe cannot be created.
    pub async fn serve(
        &self,
        handler: &dyn MessageHandler,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<(), GalleryError> {
        let name = self
            .workspace_key
            .pipe_name()
            .to_ns_name::<GenericNamespaced>()
            .map_err(|e| {
                GalleryError::new(ErrorCode::TransportMutexError, "invalid activation pipe name")
                    .with_source(e)
            })?;
        let listener = ListenerOptions::new().name(name).create_tokio().map_err(|e| {
            GalleryError::new(ErrorCode::TransportMutexError, "failed to bind activation pipe")
                .with_source(e)
        })?;

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok(stream) => self.service_connection(stream, handler).await,
                        Err(e) => tracing::warn!(error = %e, "failed to accept activation connection"),
                    }
                }
            }
        }

        Ok(())
    }

    async fn service_connection(&self, stream: Stream, handler: &dyn MessageHandler) {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        let bytes = match read_frame(&mut reader).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return,
        };

        let result = self.validator.validate(&bytes);
        match result.action {
            ValidationAction::Drop => {
                tracing::warn!(reason = %result.reason, "dropped inbound activation envelope");
            }
            ValidationAction::RespondWithError => {
                let response = self.error_response(&result.reason);
                if let Ok(out) = response.to_bytes() {
                    let _ = write_frame(&mut writer, &out).await;
                }
            }
            ValidationAction::Process => {
                let envelope = result.envelope.expect("Process action always carries an envelope");
                let response = if envelope.message_type == MessageType::Ping {
                    Some(self.pong())
                } else {
                    handler.handle(envelope)
                };
                if let Some(response) = response {
                    if let Ok(out) = response.to_bytes() {
                        let _ = write_frame(&mut writer, &out).await;
                    }
                }
            }
        }
    }

    fn pong(&self) -> MessageEnvelope {
        let payload = serde_json::json!({
            "pid": std::process::id(),
            "uptime_seconds": self.started_at.elapsed().as_secs(),
        });
        MessageEnvelope::new(MessageType::Pong, self.workspace_key.as_str(), payload, now_iso8601())
    }

    fn error_response(&self, reason: &str) -> MessageEnvelope {
        let payload = ActivationResponsePayload {
            status: ResponseStatus::Error,
            window_state: None,
            navigated_to: None,
            error: Some(reason.to_string()),
        };
        MessageEnvelope::new(
            MessageType::ActivationResponse,
            self.workspace_key.as_str(),
            serde_json::to_value(payload).unwrap_or(serde_json::json!({})),
            now_iso8601(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::activate;
    use crate::client::{ClientOutcome, TransportTimeouts};
    use interprocess::local_socket::traits::tokio::Stream as _;
    use ng_protocol::ActivationRequestPayload;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_KEY_COUNTER: AtomicU64 = AtomicU64::new(0);

    // Each test needs its own pipe namespace; local sockets are
    // process-global, so a shared key would let concurrently-running tests
    // collide on the same listener.
    fn unique_workspace_key() -> WorkspaceKey {
        let n = TEST_KEY_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = format!("/tmp/ng-transport-test-{}-{n}", std::process::id());
        ng_workspace_key::compute_key(&path).expect("test path should normalize")
    }

    struct EchoHandler;

    impl MessageHandler for EchoHandler {
        fn handle(&self, envelope: MessageEnvelope) -> Option<MessageEnvelope> {
            Some(MessageEnvelope::new(
                MessageType::ActivationResponse,
                envelope.workspace_key,
                serde_json::to_value(ActivationResponsePayload {
                    status: ResponseStatus::Activated,
                    window_state: None,
                    navigated_to: None,
                    error: None,
                })
                .unwrap(),
                now_iso8601(),
            ))
        }
    }

    struct SilentHandler;

    impl MessageHandler for SilentHandler {
        fn handle(&self, _envelope: MessageEnvelope) -> Option<MessageEnvelope> {
            None
        }
    }

    #[tokio::test]
    async fn activation_request_round_trips_over_the_real_pipe() {
        let workspace_key = unique_workspace_key();
        let server = PipeTransportServer::new(workspace_key.clone());
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let serve_key = workspace_key.clone();
        tokio::spawn(async move {
            let _ = server.serve(&EchoHandler, cancel_rx).await;
            let _ = serve_key;
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let payload = ActivationRequestPayload::new("/workspace", Some("jobs".into()), None);
        let outcome = activate(&workspace_key, payload, TransportTimeouts::default()).await;

        match outcome {
            ClientOutcome::Success(envelope) => {
                let payload: ActivationResponsePayload =
                    serde_json::from_value(envelope.payload).unwrap();
                assert_eq!(payload.status, ResponseStatus::Activated);
            }
            other => panic!("expected a successful round trip, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ping_is_answered_without_reaching_the_handler() {
        let workspace_key = unique_workspace_key();
        let server = PipeTransportServer::new(workspace_key.clone());
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        tokio::spawn(async move {
            let _ = server.serve(&SilentHandler, cancel_rx).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let name = workspace_key
            .pipe_name()
            .to_ns_name::<GenericNamespaced>()
            .unwrap();
        let stream = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            interprocess::local_socket::tokio::Stream::connect(name),
        )
        .await
        .unwrap()
        .unwrap();
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        let envelope = MessageEnvelope::new(
            MessageType::Ping,
            workspace_key.as_str(),
            serde_json::json!({}),
            now_iso8601(),
        );
        write_frame(&mut writer, &envelope.to_bytes().unwrap()).await.unwrap();

        let response = read_frame(&mut reader).await.unwrap();
        let response: MessageEnvelope = serde_json::from_slice(&response).unwrap();
        assert_eq!(response.message_type, MessageType::Pong);
    }

    #[tokio::test]
    async fn malformed_key_is_dropped_with_no_response_bytes() {
        let workspace_key = unique_workspace_key();
        let server = PipeTransportServer::new(workspace_key.clone());
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        tokio::spawn(async move {
            let _ = server.serve(&SilentHandler, cancel_rx).await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let name = workspace_key
            .pipe_name()
            .to_ns_name::<GenericNamespaced>()
            .unwrap();
        let stream = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            interprocess::local_socket::tokio::Stream::connect(name),
        )
        .await
        .unwrap()
        .unwrap();
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        let envelope = MessageEnvelope::new(
            MessageType::ActivationRequest,
            "too-short-to-be-well-formed",
            serde_json::json!({}),
            now_iso8601(),
        );
        write_frame(&mut writer, &envelope.to_bytes().unwrap()).await.unwrap();
        drop(writer);

        let outcome = tokio::time::timeout(std::time::Duration::from_millis(200), read_frame(&mut reader)).await;
        match outcome {
            Ok(Ok(bytes)) => assert!(bytes.is_empty(), "dropped envelopes get no response bytes"),
            Ok(Err(_)) => {}
            Err(_) => panic!("server should close the connection promptly after a drop"),
        }
    }
}
