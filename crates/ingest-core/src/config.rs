//! Stream consumption configuration.
//!
//! A [`StreamConfig`] identifies which plugin implementation to load, which
//! stream/partition to consume, and how the session should behave. It is
//! consumed once at bind/init time and never mutated afterwards.

use crate::error::ConsumerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// What a session does when a payload cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorPolicy {
    /// Return a decode error to the caller; the cursor stays on the bad record.
    #[default]
    FailSession,
    /// Log and count the bad record, move the cursor past it, keep pulling.
    SkipAndAdvance,
}

/// Checkpoint storage backend selection.
///
/// `Disabled` means `commit` fails as a configuration error; callers that
/// never commit are unaffected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum CheckpointConfig {
    #[default]
    Disabled,
    /// One JSON file per (stream, partition) under `dir`.
    Filesystem { dir: PathBuf },
    /// Process-global in-memory store. Survives sessions, not restarts;
    /// intended for tests and demos.
    Memory,
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

/// Immutable configuration for one consumed stream.
///
/// Loadable from TOML:
///
/// ```toml
/// consumer_factory = "jsonl"
/// stream = "events"
/// partition = 0
/// fetch_timeout_ms = 1000
/// decode_error_policy = "skip_and_advance"
///
/// [params]
/// path = "/var/data/events.jsonl"
///
/// [checkpoint]
/// backend = "filesystem"
/// dir = ".stream-ingest-checkpoints"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Registered plugin identifier naming the transport implementation.
    pub consumer_factory: String,

    /// Logical stream (topic) name.
    pub stream: String,

    /// Partition within the stream this configuration targets.
    #[serde(default)]
    pub partition: u32,

    /// Transport-specific connection parameters (endpoint, path, ...).
    #[serde(default)]
    pub params: HashMap<String, String>,

    /// How long a decode call waits for a record before reporting "no record".
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Malformed-payload handling.
    #[serde(default)]
    pub decode_error_policy: DecodeErrorPolicy,

    /// Where commits persist checkpoints.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

impl StreamConfig {
    /// Create a minimal configuration for the given plugin, stream, and partition.
    pub fn new(consumer_factory: impl Into<String>, stream: impl Into<String>, partition: u32) -> Self {
        Self {
            consumer_factory: consumer_factory.into(),
            stream: stream.into(),
            partition,
            params: HashMap::new(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            decode_error_policy: DecodeErrorPolicy::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }

    /// Set a transport parameter (builder-style, for construction in code).
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConsumerError> {
        toml::from_str(s)
            .map_err(|e| ConsumerError::Configuration(format!("invalid stream config: {e}")))
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConsumerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConsumerError::Configuration(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Fetch timeout as a [`Duration`].
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Look up a transport parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Look up a transport parameter the adapter cannot work without.
    pub fn require_param(&self, key: &str) -> Result<&str, ConsumerError> {
        self.param(key).ok_or_else(|| {
            ConsumerError::Configuration(format!(
                "plugin '{}' requires the '{key}' parameter for stream '{}'",
                self.consumer_factory, self.stream
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_toml_config() {
        let config = StreamConfig::from_toml_str(
            r#"
            consumer_factory = "jsonl"
            stream = "events"
            partition = 2
            fetch_timeout_ms = 250
            decode_error_policy = "skip_and_advance"

            [params]
            path = "/tmp/events.jsonl"

            [checkpoint]
            backend = "filesystem"
            dir = "/tmp/cp"
            "#,
        )
        .unwrap();

        assert_eq!(config.consumer_factory, "jsonl");
        assert_eq!(config.stream, "events");
        assert_eq!(config.partition, 2);
        assert_eq!(config.fetch_timeout(), Duration::from_millis(250));
        assert_eq!(config.decode_error_policy, DecodeErrorPolicy::SkipAndAdvance);
        assert_eq!(config.param("path"), Some("/tmp/events.jsonl"));
        assert_eq!(
            config.checkpoint,
            CheckpointConfig::Filesystem { dir: "/tmp/cp".into() }
        );
    }

    #[test]
    fn defaults_apply_when_omitted() {
        let config = StreamConfig::from_toml_str(
            r#"
            consumer_factory = "memory"
            stream = "t"
            "#,
        )
        .unwrap();

        assert_eq!(config.partition, 0);
        assert_eq!(config.fetch_timeout_ms, 5_000);
        assert_eq!(config.decode_error_policy, DecodeErrorPolicy::FailSession);
        assert_eq!(config.checkpoint, CheckpointConfig::Disabled);
    }

    #[test]
    fn missing_required_param_is_a_configuration_error() {
        let config = StreamConfig::new("jsonl", "events", 0);
        let err = config.require_param("path").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("'path'"));
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = StreamConfig::from_toml_str("not really toml [").unwrap_err();
        assert!(matches!(err, ConsumerError::Configuration(_)));
    }
}
