//! Consumer factory and session over in-memory topics.

use async_trait::async_trait;
use checkpoint::{CheckpointId, CheckpointStore};
use ingest_core::{
    ConsumerError, DecodeErrorPolicy, MetricsSink, NullMetricsSink, Offset, Record, Result, Schema,
    SessionState, StreamConfig, StreamConsumerFactory, StreamLevelConsumer,
};
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

use crate::topic::{lookup, MemoryTopic};

/// How often a blocked decode re-checks the topic for new payloads.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

struct Bound {
    config: StreamConfig,
    schema: Schema,
}

/// Factory for in-memory consumer sessions.
///
/// Bound once by the registry; each `create_consumer` call yields an
/// independent session over the topic named by the bound configuration.
#[derive(Default)]
pub struct MemoryConsumerFactory {
    bound: Option<Bound>,
}

impl MemoryConsumerFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamConsumerFactory for MemoryConsumerFactory {
    fn bind(&mut self, config: &StreamConfig, schema: &Schema) -> Result<()> {
        if self.bound.is_some() {
            return Err(ConsumerError::Configuration(
                "memory consumer factory is already bound".into(),
            ));
        }
        if config.stream.is_empty() {
            return Err(ConsumerError::Configuration(
                "memory consumer requires a non-empty stream name".into(),
            ));
        }
        self.bound = Some(Bound {
            config: config.clone(),
            schema: schema.clone(),
        });
        Ok(())
    }

    fn create_consumer(&self) -> Result<Box<dyn StreamLevelConsumer>> {
        let bound = self.bound.as_ref().ok_or_else(|| {
            ConsumerError::Configuration("memory consumer factory is not bound".into())
        })?;
        Ok(Box::new(MemoryConsumer::new(
            bound.config.clone(),
            bound.schema.clone(),
        )))
    }
}

/// One consumer session over an in-memory topic.
///
/// A record's offset is its index in the topic, so `current_offset` is the
/// index of the last delivered payload and `set_offset(k)` makes the next
/// decode read index `k`.
pub struct MemoryConsumer {
    config: StreamConfig,
    schema: Schema,
    state: SessionState,
    topic: Option<Arc<MemoryTopic>>,
    store: Option<Arc<dyn CheckpointStore>>,
    metrics: Arc<dyn MetricsSink>,
    /// Index the next decode reads from.
    cursor: i64,
    /// Offset of the last record delivered to the caller.
    last_delivered: Option<Offset>,
    /// Position assigned at init, reported until the first delivery.
    initial: Offset,
}

impl MemoryConsumer {
    /// Create a session in the `Created` state.
    pub fn new(config: StreamConfig, schema: Schema) -> Self {
        Self {
            config,
            schema,
            state: SessionState::Created,
            topic: None,
            store: None,
            metrics: Arc::new(NullMetricsSink),
            cursor: 0,
            last_delivered: None,
            initial: Offset::ZERO,
        }
    }

    fn topic(&self) -> Result<&Arc<MemoryTopic>> {
        // Only reachable from Started/Running, where start() has set it.
        self.topic.as_ref().ok_or_else(|| ConsumerError::InvalidState {
            operation: "decode",
            state: self.state,
        })
    }

    fn delivered(&self) -> Offset {
        self.last_delivered.unwrap_or(self.initial)
    }

    /// Wait for the payload at `offset` up to the fetch timeout.
    async fn fetch(&self, offset: i64) -> Result<Option<Arc<[u8]>>> {
        let topic = self.topic()?;
        let deadline = Instant::now() + self.config.fetch_timeout();
        loop {
            if let Some(payload) = topic.get(offset) {
                return Ok(Some(payload));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn persist(&self, offset: Offset) -> Result<()> {
        let store = self.store.as_ref().ok_or_else(|| {
            ConsumerError::Configuration(format!(
                "checkpoint storage is disabled for stream '{}'",
                self.config.stream
            ))
        })?;
        let id = CheckpointId::new(&self.config.stream, self.config.partition);
        let started = std::time::Instant::now();
        store
            .save(&id, offset)
            .await
            .map_err(|source| ConsumerError::Commit { offset, source })?;
        self.metrics
            .commit_latency(&self.config.stream, self.config.partition, started.elapsed());
        Ok(())
    }
}

#[async_trait]
impl StreamLevelConsumer for MemoryConsumer {
    async fn init(&mut self, config: &StreamConfig, metrics: Arc<dyn MetricsSink>) -> Result<()> {
        self.state.ensure("init", &[SessionState::Created])?;

        let start_offset = match config.param("start_offset") {
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                ConsumerError::Configuration(format!("invalid start_offset '{raw}': {e}"))
            })?,
            None => 0,
        };

        self.store = checkpoint::open_store(&config.checkpoint)
            .map_err(|e| ConsumerError::Configuration(format!("cannot open checkpoint store: {e}")))?;
        self.config = config.clone();
        self.metrics = metrics;
        self.cursor = start_offset;
        self.initial = Offset(start_offset);
        self.state = SessionState::Initialized;
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        self.state.ensure("start", &[SessionState::Initialized])?;

        // A topic nobody has published to behaves like an unreachable
        // transport: fail retryably and stay in Initialized.
        let topic = lookup(&self.config.stream).ok_or_else(|| {
            ConsumerError::connection(anyhow::anyhow!(
                "in-memory topic '{}' does not exist",
                self.config.stream
            ))
        })?;
        self.topic = Some(topic);
        self.state = SessionState::Started;
        tracing::debug!(stream = %self.config.stream, partition = self.config.partition, "memory consumer started");
        Ok(())
    }

    fn set_offset(&mut self, offset: Offset) -> Result<()> {
        self.state
            .ensure("set_offset", &[SessionState::Started, SessionState::Running])?;
        self.cursor = offset.value();
        Ok(())
    }

    async fn next_decoded(&mut self, destination: &mut Record) -> Result<Option<Offset>> {
        self.state
            .ensure("next_decoded", &[SessionState::Started, SessionState::Running])?;
        self.state = SessionState::Running;

        loop {
            let Some(payload) = self.fetch(self.cursor).await? else {
                return Ok(None);
            };
            let offset = Offset(self.cursor);
            match destination.decode_json(&self.schema, &payload, offset) {
                Ok(()) => {
                    self.cursor += 1;
                    self.last_delivered = Some(offset);
                    self.metrics
                        .records_consumed(&self.config.stream, self.config.partition, 1);
                    return Ok(Some(offset));
                }
                Err(err) => {
                    self.metrics
                        .decode_errors(&self.config.stream, self.config.partition, 1);
                    match self.config.decode_error_policy {
                        DecodeErrorPolicy::SkipAndAdvance => {
                            tracing::warn!(stream = %self.config.stream, %offset, error = %err, "skipping undecodable payload");
                            self.cursor += 1;
                        }
                        DecodeErrorPolicy::FailSession => return Err(err),
                    }
                }
            }
        }
    }

    async fn next_decoded_at(
        &mut self,
        offset: Offset,
        destination: &mut Record,
    ) -> Result<Option<Offset>> {
        self.state
            .ensure("next_decoded_at", &[SessionState::Started, SessionState::Running])?;

        let Some(payload) = self.fetch(offset.value()).await? else {
            return Ok(None);
        };
        // Out-of-band read: a bad payload is always an error here, the
        // skip policy only applies to the session cursor.
        destination.decode_json(&self.schema, &payload, offset)?;
        Ok(Some(offset))
    }

    fn current_offset(&self) -> Result<Offset> {
        self.state.ensure(
            "current_offset",
            &[SessionState::Initialized, SessionState::Started, SessionState::Running],
        )?;
        Ok(self.delivered())
    }

    async fn commit(&mut self) -> Result<()> {
        self.state
            .ensure("commit", &[SessionState::Started, SessionState::Running])?;
        self.persist(self.delivered()).await
    }

    async fn commit_at(&mut self, offset: Offset) -> Result<()> {
        self.state
            .ensure("commit_at", &[SessionState::Started, SessionState::Running])?;
        let delivered = self.delivered();
        if offset > delivered {
            return Err(ConsumerError::CheckpointAhead {
                requested: offset,
                delivered,
            });
        }
        self.persist(offset).await
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.state.ensure(
            "shutdown",
            &[
                SessionState::Created,
                SessionState::Initialized,
                SessionState::Started,
                SessionState::Running,
            ],
        )?;
        self.topic = None;
        self.store = None;
        self.state = SessionState::Shutdown;
        tracing::debug!(stream = %self.config.stream, "memory consumer shut down");
        Ok(())
    }
}
