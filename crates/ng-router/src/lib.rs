// SPDX-License-Identifier: MIT OR Apache-2.0
//! Single-instance routing: mutex acquisition, then either primary window
//! creation or client-side activation of the existing instance.
//!
//! [`InstanceRouter::route`] is the sole entry point. On success it returns
//! a [`RouteDecision`] and, when the caller becomes primary, an
//! [`InstanceRouter`] whose [`Drop`] releases the workspace mutex.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod mutex_handle;

pub use mutex_handle::MutexHandle;

use ng_protocol::ActivationRequestPayload;
use ng_transport::{activate, ClientOutcome, TransportTimeouts};
use ng_workspace_key::WorkspaceKey;

/// What the caller should do after [`InstanceRouter::route`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Become the primary instance and create a window.
    ///
    /// `degraded` is `true` when this is a fallback after a failed or
    /// inconclusive attempt to reach an existing primary (suspected orphan
    /// mutex) rather than a clean first launch.
    CreateWindow {
        /// Whether this window creation follows a failed activation
        /// attempt against a suspected-orphaned mutex.
        degraded: bool,
    },
    /// An existing primary instance handled (or is trusted to have
    /// handled) the activation; the caller should exit `0`.
    ActivateExisting,
}

/// Owns the workspace mutex for as long as this process remains primary.
/// Dropping it releases the mutex.
pub struct InstanceRouter {
    mutex: Option<MutexHandle>,
}

impl InstanceRouter {
    /// Derives the mutex name for `workspace_key`, attempts to acquire it,
    /// and either becomes primary or activates the existing instance.
    ///
    /// `workspace_path` is the original (pre-normalization) path the user
    /// launched with; it is forwarded verbatim in the activation request so
    /// the primary can log or display it.
    pub async fn route(
        workspace_path: &str,
        workspace_key: &WorkspaceKey,
        requested_view: Option<String>,
        timeouts: TransportTimeouts,
    ) -> (RouteDecision, Self) {
        let mutex_name = workspace_key.mutex_name();
        let acquired = tokio::task::spawn_blocking(move || MutexHandle::try_acquire(&mutex_name))
            .await
            .unwrap_or(None);

        if let Some(mutex) = acquired {
            return (RouteDecision::CreateWindow { degraded: false }, Self { mutex: Some(mutex) });
        }

        let payload = ActivationRequestPayload::new(workspace_path, requested_view, None);
        let outcome = activate(workspace_key, payload, timeouts).await;
        let decision = Self::decide_from_outcome(outcome);
        (decision, Self { mutex: None })
    }

    /// Maps a transport client outcome to a route decision per the
    /// activation channel's "trust the mutex" policy: a receive timeout is
    /// treated as a busy-but-alive primary, not a dead one.
    fn decide_from_outcome(outcome: ClientOutcome) -> RouteDecision {
        match outcome {
            ClientOutcome::Success(_) => RouteDecision::ActivateExisting,
            ClientOutcome::ReceiveTimeout => {
                tracing::warn!("activation receive timed out; trusting the mutex holder");
                RouteDecision::ActivateExisting
            }
            ClientOutcome::ConnectTimeout => RouteDecision::CreateWindow { degraded: true },
            ClientOutcome::InvalidResponse => RouteDecision::CreateWindow { degraded: true },
            ClientOutcome::SendTimeout | ClientOutcome::NoResponse | ClientOutcome::Error(_) => {
                RouteDecision::CreateWindow { degraded: true }
            }
        }
    }

    /// `true` if this router holds the workspace mutex (i.e. this process
    /// is primary).
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.mutex.is_some()
    }
}
