// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named duplex pipe transport for the activation channel.
//!
//! The channel name is derived purely from the workspace key:
//! `codecomfy.nextgallery.{workspace_key}`. Messages are newline-delimited
//! JSON envelopes capped at 64 KiB. [`server::PipeTransportServer`] accepts
//! one client at a time; [`client::activate`] sends a single
//! `activation_request` and awaits a response under three independent
//! timeouts.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod framing;
mod server;

pub use client::{activate, ClientOutcome, TransportTimeouts};
pub use server::{MessageHandler, PipeTransportServer};

/// Current UTC time as an ISO-8601 string with millisecond precision, the
/// format every envelope's `timestamp` field uses.
#[must_use]
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
