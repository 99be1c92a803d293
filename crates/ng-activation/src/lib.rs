// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pure activation decision logic.
//!
//! [`ActivationHandler::handle`] converts a validated activation request
//! plus observed window state into an [`ActivationResult`]. It performs no
//! platform I/O itself; `window` and `index` are abstract capabilities the
//! caller wires to the real window manager and index loader.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use ng_protocol::WindowState;

/// The fields of an `activation_request` the handler needs.
#[derive(Debug, Clone, Default)]
pub struct ActivationRequest {
    /// The view the requester would like to navigate to, if any.
    pub requested_view: Option<String>,
}

/// Observable state and commands for the target window.
///
/// Kept intentionally narrow: three observables, four commands, matching
/// exactly what the activation algorithm needs.
pub trait WindowHandle {
    /// `false` if the window has been closed/destroyed.
    fn is_valid(&self) -> bool;
    /// Whether the window is currently minimized.
    fn is_minimized(&self) -> bool;
    /// Whether the window currently has OS input focus.
    fn is_foreground(&self) -> bool;
    /// Un-minimizes the window.
    fn restore_from_minimized(&mut self);
    /// Brings the window to the foreground without un-minimizing it.
    fn bring_to_front(&mut self);
    /// Flashes the taskbar/dock entry to draw attention.
    fn flash_taskbar(&mut self);
    /// Navigates the window's content to `view`.
    fn navigate_to(&mut self, view: &str);
}

/// The index-refresh command the handler always issues.
pub trait IndexHandle {
    /// Triggers a fresh index load.
    fn refresh(&mut self);
}

/// One outcome of a successful activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessOutcome {
    /// The window was brought to the foreground from the background.
    BroughtToFront,
    /// The window was already in the foreground.
    AlreadyForeground,
    /// The window was un-minimized.
    RestoredFromMinimized,
    /// The window navigated to a requested view.
    NavigatedToView,
    /// The index was refreshed.
    RefreshedIndex,
    /// The taskbar/dock entry was flashed.
    TaskbarFlashed,
}

/// A terminal failure outcome. Exactly one accompanies an error result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOutcome {
    /// The request envelope or payload was structurally invalid.
    ErrorInvalidMessage,
    /// The request declared an unsupported protocol version.
    ErrorUnsupportedVersion,
    /// The target window is no longer valid.
    ErrorWindowUnavailable,
    /// The request's workspace key did not match this instance.
    ErrorWorkspaceKeyMismatch,
    /// The request envelope exceeded the maximum wire size.
    ErrorMessageTooLarge,
    /// The request's workspace key was not well-formed.
    ErrorInvalidKeyFormat,
}

/// Result of one activation attempt.
///
/// Invariant: [`ActivationResult::Error`] always carries exactly one
/// [`ErrorOutcome`] and an explanatory message; [`ActivationResult::Success`]
/// always carries a non-empty outcome set that includes
/// [`SuccessOutcome::RefreshedIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationResult {
    /// Activation succeeded with the given set of effects.
    Success {
        /// Effects performed, in the order they happened.
        outcomes: Vec<SuccessOutcome>,
        /// The view navigated to, if `NavigatedToView` is present.
        navigated_to: Option<String>,
    },
    /// Activation failed outright; no window/index commands beyond what the
    /// algorithm specifies were issued.
    Error {
        /// Why activation failed.
        outcome: ErrorOutcome,
        /// Human-readable explanation.
        message: String,
    },
}

impl ActivationResult {
    /// The `window_state` to report on an `activation_response`: `restored`
    /// if the outcome set contains `RestoredFromMinimized` or
    /// `BroughtToFront`, `already_foreground` if it contains
    /// `AlreadyForeground`, `unknown` otherwise (including on error).
    #[must_use]
    pub fn response_window_state(&self) -> WindowState {
        let Self::Success { outcomes, .. } = self else {
            return WindowState::Unknown;
        };
        if outcomes.contains(&SuccessOutcome::RestoredFromMinimized)
            || outcomes.contains(&SuccessOutcome::BroughtToFront)
        {
            WindowState::Restored
        } else if outcomes.contains(&SuccessOutcome::AlreadyForeground) {
            WindowState::AlreadyForeground
        } else {
            WindowState::Unknown
        }
    }
}

/// Pure activation decision logic.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActivationHandler;

impl ActivationHandler {
    /// Runs the activation algorithm against `window` and `index`.
    ///
    /// 1. An invalid window is a hard failure; no further calls are made.
    /// 2. A minimized window is restored and its taskbar entry flashed.
    /// 3. A background window is brought to front.
    /// 4. A foreground window records `AlreadyForeground`.
    /// 5. A non-empty `requested_view` triggers navigation.
    /// 6. The index is always refreshed, last.
    pub fn handle(
        &self,
        request: &ActivationRequest,
        window: &mut dyn WindowHandle,
        index: &mut dyn IndexHandle,
    ) -> ActivationResult {
        if !window.is_valid() {
            return ActivationResult::Error {
                outcome: ErrorOutcome::ErrorWindowUnavailable,
                message: "target window is no longer valid".to_string(),
            };
        }

        let mut outcomes = Vec::new();

        if window.is_minimized() {
            window.restore_from_minimized();
            outcomes.push(SuccessOutcome::RestoredFromMinimized);
            window.flash_taskbar();
            outcomes.push(SuccessOutcome::TaskbarFlashed);
        } else if !window.is_foreground() {
            window.bring_to_front();
            outcomes.push(SuccessOutcome::BroughtToFront);
        } else {
            outcomes.push(SuccessOutcome::AlreadyForeground);
        }

        let navigated_to = request.requested_view.as_ref().filter(|v| !v.is_empty()).map(|view| {
            window.navigate_to(view);
            outcomes.push(SuccessOutcome::NavigatedToView);
            view.clone()
        });

        index.refresh();
        outcomes.push(SuccessOutcome::RefreshedIndex);

        ActivationResult::Success {
            outcomes,
            navigated_to,
        }
    }
}
