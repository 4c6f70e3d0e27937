// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Engine configuration.
//!
//! Configuration arrives programmatically from the embedding process; there
//! is no config file surface. All fields are fixed at engine construction
//! except the minimum severity, which stays adjustable as the single global
//! runtime threshold.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What a producer does when its channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverflowPolicy {
    /// Discard the new line, count it in `lost_total`, and return an error
    /// to the caller. The write never waits.
    #[default]
    Drop,
    /// Suspend the producer until the drain loop frees a slot. Writes are
    /// never lost, at the price of backpressure stalls.
    Block,
}

/// Built-in rendering sinks selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SinkKind {
    /// Human-readable lines on standard error.
    #[default]
    Stderr,
    /// Human-readable lines on standard output.
    Stdout,
    /// One JSON object per line on standard error.
    JsonStderr,
}

/// Startup configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Number of channel slots in the pool. Fixed at init; the
    /// (`max_producers` + 1)-th concurrent acquisition fails.
    pub max_producers: usize,

    /// When set, every channel gets exactly this capacity and acquisition
    /// hints are ignored. When unset, each producer's capacity hint is used.
    /// Either way the value is rounded up to the next power of two.
    #[serde(default)]
    pub channel_capacity: Option<usize>,

    /// Full-channel behavior.
    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// Whether the drain loop emits a synthetic notification line when a
    /// channel's lost count grows.
    #[serde(default = "default_report_loss")]
    pub report_loss: bool,

    /// Initial minimum severity. Lines that do not pass this threshold are
    /// discarded before touching the ring.
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,

    /// Where the drain loop renders to.
    #[serde(default)]
    pub sink: SinkKind,
}

fn default_report_loss() -> bool {
    true
}

fn default_min_severity() -> Severity {
    Severity::Info
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_producers: 16,
            channel_capacity: None,
            overflow: OverflowPolicy::default(),
            report_loss: true,
            min_severity: Severity::Info,
            sink: SinkKind::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_producers == 0 {
            return Err(ConfigError::NoProducers);
        }
        if self.channel_capacity == Some(0) {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_producers must be greater than zero")]
    NoProducers,

    #[error("channel_capacity must be greater than zero when set")]
    ZeroCapacity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_producers, 16);
        assert_eq!(config.channel_capacity, None);
        assert_eq!(config.overflow, OverflowPolicy::Drop);
        assert!(config.report_loss);
        assert_eq!(config.min_severity, Severity::Info);
        assert_eq!(config.sink, SinkKind::Stderr);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_producers_rejected() {
        let config = EngineConfig {
            max_producers: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoProducers));
    }

    #[test]
    fn test_zero_fixed_capacity_rejected() {
        let config = EngineConfig {
            channel_capacity: Some(0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCapacity));
    }

    #[test]
    fn test_serde_round_trip() {
        let config = EngineConfig {
            max_producers: 8,
            channel_capacity: Some(64),
            overflow: OverflowPolicy::Block,
            report_loss: false,
            min_severity: Severity::Debug,
            sink: SinkKind::JsonStderr,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let parsed: EngineConfig = serde_json::from_str(r#"{"max_producers": 4}"#).unwrap();
        assert_eq!(parsed.max_producers, 4);
        assert!(parsed.report_loss);
        assert_eq!(parsed.min_severity, Severity::Info);
    }
}
