// SPDX-License-Identifier: MIT OR Apache-2.0
//! The secondary instance's side of the activation channel.

use crate::framing::{read_frame, write_frame};
use crate::now_iso8601;
use interprocess::local_socket::{
    tokio::Stream, traits::tokio::Stream as _, GenericNamespaced, ToNsName,
};
use ng_protocol::{ActivationRequestPayload, MessageEnvelope, MessageType};
use ng_workspace_key::WorkspaceKey;
use std::time::Duration;
use tokio::io::BufReader;

/// The three independent timeouts governing a client activation attempt.
///
/// Surfaced as a configuration value rather than magic numbers scattered
/// across call sites; see `ng-config` for where these defaults are loaded
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    /// Deadline to establish the connection.
    pub connect: Duration,
    /// Deadline to write the request and flush it.
    pub send: Duration,
    /// Deadline to read the response.
    pub receive: Duration,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(2),
            send: Duration::from_secs(1),
            receive: Duration::from_secs(5),
        }
    }
}

/// Outcome of one client activation attempt.
#[derive(Debug)]
pub enum ClientOutcome {
    /// A well-formed response envelope was received.
    Success(MessageEnvelope),
    /// Connecting to the peer's pipe did not complete within
    /// [`TransportTimeouts::connect`].
    ConnectTimeout,
    /// Writing the request did not complete within
    /// [`TransportTimeouts::send`].
    SendTimeout,
    /// No response arrived within [`TransportTimeouts::receive`].
    ReceiveTimeout,
    /// The channel closed before any response bytes were read.
    NoResponse,
    /// The response could not be parsed as a valid envelope.
    InvalidResponse,
    /// Any other I/O or protocol failure.
    Error(String),
}

/// Connects to the primary instance for `workspace_key`, sends one
/// `activation_request`, and awaits one response under the three
/// independent timeouts in `timeouts`.
pub async fn activate(
    workspace_key: &WorkspaceKey,
    payload: ActivationRequestPayload,
    timeouts: TransportTimeouts,
) -> ClientOutcome {
    let name = match workspace_key.pipe_name().to_ns_name::<GenericNamespaced>() {
        Ok(name) => name,
        Err(e) => return ClientOutcome::Error(e.to_string()),
    };

    let stream = match tokio::time::timeout(timeouts.connect, Stream::connect(name)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return ClientOutcome::Error(e.to_string()),
        Err(_) => return ClientOutcome::ConnectTimeout,
    };

    let (reader, mut writer) = tokio::io::split(stream);

    let envelope = MessageEnvelope::new(
        MessageType::ActivationRequest,
        workspace_key.as_str(),
        serde_json::to_value(&payload).unwrap_or(serde_json::json!({})),
        now_iso8601(),
    );
    let bytes = match envelope.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => return ClientOutcome::Error(e.to_string()),
    };

    match tokio::time::timeout(timeouts.send, write_frame(&mut writer, &bytes)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return ClientOutcome::Error(e.to_string()),
        Err(_) => return ClientOutcome::SendTimeout,
    }

    let mut reader = BufReader::new(reader);
    match tokio::time::timeout(timeouts.receive, read_frame(&mut reader)).await {
        Err(_) => ClientOutcome::ReceiveTimeout,
        Ok(Err(_)) => ClientOutcome::NoResponse,
        Ok(Ok(bytes)) if bytes.is_empty() => ClientOutcome::NoResponse,
        Ok(Ok(bytes)) => match serde_json::from_slice::<MessageEnvelope>(&bytes) {
            Ok(envelope) => ClientOutcome::Success(envelope),
            Err(_) => ClientOutcome::InvalidResponse,
        },
    }
}
