// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for NextGallery.
//!
//! [`GalleryConfig`] carries the timeout and polling constants as
//! configuration rather than magic numbers: the transport's three
//! timeouts, the projection's poll interval, and the failure-counter
//! backoff threshold.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use ng_transport::TransportTimeouts;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },
    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve
/// attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A timeout is configured unusually high, which delays routing
    /// decisions for the user.
    LargeTimeout {
        /// Which timeout this is (`connect`, `send`, or `receive`).
        phase: String,
        /// Configured value in seconds.
        secs: u64,
    },
    /// The poll interval is configured unusually low, which wastes work
    /// polling an index that rarely changes.
    ShortPollInterval {
        /// Configured value in seconds.
        secs: u64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LargeTimeout { phase, secs } => {
                write!(f, "{phase} timeout of {secs}s is unusually high")
            }
            Self::ShortPollInterval { secs } => {
                write!(f, "poll interval of {secs}s is unusually low")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

const MAX_TIMEOUT_SECS: u64 = 300;
const LARGE_TIMEOUT_THRESHOLD_SECS: u64 = 30;
const MIN_POLL_INTERVAL_SECS: u64 = 1;
const SHORT_POLL_INTERVAL_THRESHOLD_SECS: u64 = 1;
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Top-level runtime configuration for NextGallery.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct GalleryConfig {
    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Deadline, in seconds, to establish an activation channel connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Deadline, in seconds, to send an activation request.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    /// Deadline, in seconds, to receive an activation response.
    #[serde(default = "default_receive_timeout_secs")]
    pub receive_timeout_secs: u64,
    /// Interval, in seconds, between background index poll ticks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Consecutive warning/error loads before timer polling suspends.
    #[serde(default = "default_failure_backoff_threshold")]
    pub failure_backoff_threshold: u32,
}

fn default_connect_timeout_secs() -> u64 {
    2
}
fn default_send_timeout_secs() -> u64 {
    1
}
fn default_receive_timeout_secs() -> u64 {
    5
}
fn default_poll_interval_secs() -> u64 {
    3
}
fn default_failure_backoff_threshold() -> u32 {
    3
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            connect_timeout_secs: default_connect_timeout_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            receive_timeout_secs: default_receive_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            failure_backoff_threshold: default_failure_backoff_threshold(),
        }
    }
}

impl GalleryConfig {
    /// Projects the connect/send/receive fields into a
    /// [`TransportTimeouts`] for `ng-transport`.
    #[must_use]
    pub fn transport_timeouts(&self) -> TransportTimeouts {
        TransportTimeouts {
            connect: std::time::Duration::from_secs(self.connect_timeout_secs),
            send: std::time::Duration::from_secs(self.send_timeout_secs),
            receive: std::time::Duration::from_secs(self.receive_timeout_secs),
        }
    }

    /// The poll interval as a [`std::time::Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Loads a [`GalleryConfig`] from an optional TOML file path.
///
/// Returns [`GalleryConfig::default`] when `path` is `None` or when the file
/// at `path` does not exist — a missing `--config` file is not an error, it
/// just means "use the defaults". A file that exists but cannot be read for
/// another reason (permissions) or cannot be parsed as valid TOML for this
/// schema fails fast instead of silently falling back. Environment overrides
/// are applied on top in every case.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if `path` is `Some`, the file
/// exists, but it cannot be read, or [`ConfigError::ParseError`] if its
/// contents are not valid TOML for this schema.
pub fn load_config(path: Option<&Path>) -> Result<GalleryConfig, ConfigError> {
    let mut config = match path {
        Some(p) if !p.exists() => GalleryConfig::default(),
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => GalleryConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parses a TOML string into a [`GalleryConfig`].
///
/// # Errors
///
/// Returns [`ConfigError::ParseError`] if `content` is not valid TOML for
/// this schema.
pub fn parse_toml(content: &str) -> Result<GalleryConfig, ConfigError> {
    toml::from_str::<GalleryConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

/// Applies environment variable overrides.
///
/// Recognised variables: `NEXTGALLERY_LOG_LEVEL`.
pub fn apply_env_overrides(config: &mut GalleryConfig) {
    if let Ok(val) = std::env::var("NEXTGALLERY_LOG_LEVEL") {
        config.log_level = Some(val);
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validates a parsed configuration, returning advisory warnings.
///
/// Hard errors (zero/out-of-range timeouts, unrecognized log level, zero
/// backoff threshold) come back as [`ConfigError::ValidationError`]; soft
/// issues come back as warnings.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] listing every hard-error
/// condition found.
pub fn validate_config(config: &GalleryConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if let Some(ref level) = config.log_level {
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(format!("invalid log_level '{level}'"));
        }
    }

    for (phase, secs) in [
        ("connect", config.connect_timeout_secs),
        ("send", config.send_timeout_secs),
        ("receive", config.receive_timeout_secs),
    ] {
        if secs == 0 || secs > MAX_TIMEOUT_SECS {
            errors.push(format!(
                "{phase}_timeout_secs {secs} out of range (1..={MAX_TIMEOUT_SECS})"
            ));
        } else if secs > LARGE_TIMEOUT_THRESHOLD_SECS {
            warnings.push(ConfigWarning::LargeTimeout {
                phase: phase.to_string(),
                secs,
            });
        }
    }

    if config.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
        errors.push(format!(
            "poll_interval_secs must be at least {MIN_POLL_INTERVAL_SECS}"
        ));
    } else if config.poll_interval_secs <= SHORT_POLL_INTERVAL_THRESHOLD_SECS {
        warnings.push(ConfigWarning::ShortPollInterval {
            secs: config.poll_interval_secs,
        });
    }

    if config.failure_backoff_threshold == 0 {
        errors.push("failure_backoff_threshold must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merges two configurations. Non-default values in `overlay` take
/// precedence over `base`.
#[must_use]
pub fn merge_configs(base: GalleryConfig, overlay: GalleryConfig) -> GalleryConfig {
    GalleryConfig {
        log_level: overlay.log_level.or(base.log_level),
        connect_timeout_secs: overlay.connect_timeout_secs,
        send_timeout_secs: overlay.send_timeout_secs,
        receive_timeout_secs: overlay.receive_timeout_secs,
        poll_interval_secs: overlay.poll_interval_secs,
        failure_backoff_threshold: overlay.failure_backoff_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_spec_constants() {
        let cfg = GalleryConfig::default();
        assert_eq!(cfg.connect_timeout_secs, 2);
        assert_eq!(cfg.send_timeout_secs, 1);
        assert_eq!(cfg.receive_timeout_secs, 5);
        assert_eq!(cfg.poll_interval_secs, 3);
        assert_eq!(cfg.failure_backoff_threshold, 3);
    }

    #[test]
    fn default_config_has_no_warnings() {
        let cfg = GalleryConfig::default();
        let warnings = validate_config(&cfg).expect("default config should be valid");
        assert!(warnings.is_empty());
    }

    #[test]
    fn parse_valid_toml_string() {
        let toml = r#"
            log_level = "debug"
            connect_timeout_secs = 4
        "#;
        let cfg = parse_toml(toml).unwrap();
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.connect_timeout_secs, 4);
        assert_eq!(cfg.send_timeout_secs, 1);
    }

    #[test]
    fn parse_invalid_toml_gives_parse_error() {
        let err = parse_toml("this is [not valid toml =").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn validation_catches_invalid_log_level() {
        let cfg = GalleryConfig {
            log_level: Some("verbose".into()),
            ..Default::default()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn validation_catches_zero_timeout() {
        let cfg = GalleryConfig {
            connect_timeout_secs: 0,
            ..Default::default()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn validation_warns_on_large_timeout() {
        let cfg = GalleryConfig {
            receive_timeout_secs: 60,
            ..Default::default()
        };
        let warnings = validate_config(&cfg).unwrap();
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ConfigWarning::LargeTimeout { phase, .. } if phase == "receive")));
    }

    #[test]
    fn transport_timeouts_projection_matches_fields() {
        let cfg = GalleryConfig::default();
        let timeouts = cfg.transport_timeouts();
        assert_eq!(timeouts.connect.as_secs(), cfg.connect_timeout_secs);
        assert_eq!(timeouts.send.as_secs(), cfg.send_timeout_secs);
        assert_eq!(timeouts.receive.as_secs(), cfg.receive_timeout_secs);
    }

    #[test]
    fn merge_overlay_timeouts_take_precedence() {
        let base = GalleryConfig::default();
        let overlay = GalleryConfig {
            connect_timeout_secs: 10,
            ..GalleryConfig::default()
        };
        let merged = merge_configs(base, overlay);
        assert_eq!(merged.connect_timeout_secs, 10);
    }

    #[test]
    fn load_config_with_missing_path_falls_back_to_defaults() {
        let missing = Path::new("/no/such/config.toml");
        let config = load_config(Some(missing)).expect("missing file should not error");
        assert_eq!(config, GalleryConfig::default());
    }
}
