//! The consumer session contract.
//!
//! Transport adapters implement [`StreamConsumerFactory`] (bound once to a
//! configuration and schema) and [`StreamLevelConsumer`] (one session per
//! partition, driven sequentially by a single owning task through
//! init → start → repeated decode/commit → shutdown).
//!
//! # Session state machine
//!
//! ```text
//! Created ──init──▶ Initialized ──start──▶ Started ──decode──▶ Running
//!    │                    │                   │                   │
//!    └────────────────────┴─────shutdown──────┴───────────────────┘
//!                                  │
//!                                  ▼
//!                              Shutdown (terminal)
//! ```
//!
//! Every operation invoked after shutdown, or before the state it requires,
//! fails fast with [`ConsumerError::InvalidState`].

use crate::config::StreamConfig;
use crate::error::{ConsumerError, Result};
use crate::offset::Offset;
use crate::record::Record;
use crate::schema::Schema;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle states of a consumer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, not yet initialized.
    Created,
    /// `init` succeeded; session-local resources are bound.
    Initialized,
    /// `start` succeeded; transport resources are acquired.
    Started,
    /// At least one decode has been attempted.
    Running,
    /// `shutdown` completed. Terminal.
    Shutdown,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Initialized => "initialized",
            SessionState::Started => "started",
            SessionState::Running => "running",
            SessionState::Shutdown => "shutdown",
        }
    }

    /// Guard helper for implementations: error unless the current state is
    /// one of `allowed`.
    pub fn ensure(self, operation: &'static str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self) {
            Ok(())
        } else {
            Err(ConsumerError::InvalidState {
                operation,
                state: self,
            })
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write-only handle through which sessions report consumption metrics.
///
/// The session does not own metrics storage or export; the caller supplies
/// a sink at `init` and aggregates elsewhere.
pub trait MetricsSink: Send + Sync {
    /// Records successfully decoded and delivered to the caller.
    fn records_consumed(&self, stream: &str, partition: u32, count: u64);

    /// Payloads that failed to decode (skipped or fatal per policy).
    fn decode_errors(&self, stream: &str, partition: u32, count: u64);

    /// Time one checkpoint persistence took.
    fn commit_latency(&self, stream: &str, partition: u32, latency: Duration);
}

/// Sink that discards all metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricsSink;

impl MetricsSink for NullMetricsSink {
    fn records_consumed(&self, _stream: &str, _partition: u32, _count: u64) {}
    fn decode_errors(&self, _stream: &str, _partition: u32, _count: u64) {}
    fn commit_latency(&self, _stream: &str, _partition: u32, _latency: Duration) {}
}

/// Sink that reports metrics through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn records_consumed(&self, stream: &str, partition: u32, count: u64) {
        tracing::debug!(stream, partition, count, "records consumed");
    }

    fn decode_errors(&self, stream: &str, partition: u32, count: u64) {
        tracing::warn!(stream, partition, count, "decode errors");
    }

    fn commit_latency(&self, stream: &str, partition: u32, latency: Duration) {
        tracing::debug!(stream, partition, ?latency, "checkpoint committed");
    }
}

/// Per-implementation capability that produces consumer sessions.
///
/// A factory is bound exactly once, by the registry, before any caller sees
/// it. After binding, `create_consumer` may be called many times; each call
/// yields an independent session for the bound (stream, partition), and
/// distinct sessions may run concurrently on separate tasks sharing only the
/// immutable bound state.
pub trait StreamConsumerFactory: Send + Sync {
    /// Bind this factory to a configuration and schema.
    ///
    /// Called exactly once by
    /// [`ConsumerFactoryRegistry::resolve`](crate::ConsumerFactoryRegistry::resolve);
    /// binding twice is a configuration error. No transport I/O happens here.
    fn bind(&mut self, config: &StreamConfig, schema: &Schema) -> Result<()>;

    /// Create a fresh, independent consumer session in the `Created` state.
    fn create_consumer(&self) -> Result<Box<dyn StreamLevelConsumer>>;
}

impl std::fmt::Debug for dyn StreamConsumerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StreamConsumerFactory")
    }
}

/// A stateful session pulling, decoding, and checkpointing records from one
/// logical partition.
///
/// Designed for single-threaded sequential use by one owning task; see the
/// module docs for the state machine. Decode calls block (await) up to the
/// configured fetch timeout and report exhaustion as `Ok(None)`, never as an
/// error. Cancellation is the caller's concern: run sessions on cancellable
/// tasks and follow an abandoned call with `shutdown`.
#[async_trait]
pub trait StreamLevelConsumer: Send {
    /// Bind session-local resources and the metrics sink.
    ///
    /// Valid only in `Created`, exactly once. Fails with a configuration
    /// error if the configuration is structurally invalid or incompatible
    /// with the schema.
    async fn init(&mut self, config: &StreamConfig, metrics: Arc<dyn MetricsSink>) -> Result<()>;

    /// Acquire transport resources (connection, partition assignment).
    ///
    /// Valid only in `Initialized`. A connection failure is retryable: the
    /// session stays in `Initialized` and `start` may be called again
    /// without corrupting offset tracking.
    async fn start(&mut self) -> Result<()>;

    /// Reposition the read cursor so the next decode reads `offset`.
    ///
    /// Valid from `Started`/`Running`; performs no I/O itself. Mid-stream
    /// seeks, including non-monotonic ones, are supported.
    fn set_offset(&mut self, offset: Offset) -> Result<()>;

    /// Pull and decode the next record at the cursor into `destination`.
    ///
    /// Returns `Ok(Some(offset))` with the decoded record's offset,
    /// advancing the current offset exactly once, or `Ok(None)` when the
    /// fetch timeout elapses or the stream is exhausted. Malformed payloads
    /// follow the configured [`DecodeErrorPolicy`](crate::DecodeErrorPolicy).
    async fn next_decoded(&mut self, destination: &mut Record) -> Result<Option<Offset>>;

    /// One-shot read at an explicit offset for out-of-band lookups
    /// (replay/debug). Does not move the session cursor or affect
    /// `current_offset`.
    async fn next_decoded_at(
        &mut self,
        offset: Offset,
        destination: &mut Record,
    ) -> Result<Option<Offset>>;

    /// Value-returning decode variant for callers where in-place reuse is
    /// not worth the ceremony. Allocates a fresh container per record.
    async fn next_record(&mut self) -> Result<Option<Record>> {
        let mut record = Record::new();
        Ok(self.next_decoded(&mut record).await?.map(|_| record))
    }

    /// Offset of the most recently delivered record, or the initial
    /// assigned position if none has been decoded yet. Exact; no lag, no
    /// look-ahead.
    fn current_offset(&self) -> Result<Offset>;

    /// Durably persist `current_offset()` as this partition's checkpoint.
    ///
    /// Idempotent for a repeated identical value; a failed commit is
    /// retryable and leaves the previous checkpoint intact.
    async fn commit(&mut self) -> Result<()>;

    /// Durably persist an explicit offset, allowing the checkpoint to trail
    /// the read cursor for batched acknowledgement. Offsets beyond
    /// `current_offset()` are rejected: a checkpoint never exceeds data
    /// actually delivered.
    async fn commit_at(&mut self, offset: Offset) -> Result<()>;

    /// Release all session resources. Valid from any non-terminal state;
    /// afterwards every operation fails fast with an invalid-state error.
    async fn shutdown(&mut self) -> Result<()>;
}
