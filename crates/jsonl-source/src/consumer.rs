//! Consumer factory and session over a JSONL file.

use async_trait::async_trait;
use checkpoint::{CheckpointId, CheckpointStore};
use ingest_core::{
    ConsumerError, DecodeErrorPolicy, MetricsSink, NullMetricsSink, Offset, Record, Result, Schema,
    SessionState, StreamConfig, StreamConsumerFactory, StreamLevelConsumer,
};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{sleep, Duration, Instant};

/// How often a blocked decode re-scans the file tail.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

struct Bound {
    config: StreamConfig,
    schema: Schema,
}

/// Factory for JSONL file consumer sessions.
#[derive(Default)]
pub struct JsonlConsumerFactory {
    bound: Option<Bound>,
}

impl JsonlConsumerFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamConsumerFactory for JsonlConsumerFactory {
    fn bind(&mut self, config: &StreamConfig, schema: &Schema) -> Result<()> {
        if self.bound.is_some() {
            return Err(ConsumerError::Configuration(
                "jsonl consumer factory is already bound".into(),
            ));
        }
        // Presence check only; the file itself is not touched until start().
        config.require_param("path")?;
        self.bound = Some(Bound {
            config: config.clone(),
            schema: schema.clone(),
        });
        Ok(())
    }

    fn create_consumer(&self) -> Result<Box<dyn StreamLevelConsumer>> {
        let bound = self.bound.as_ref().ok_or_else(|| {
            ConsumerError::Configuration("jsonl consumer factory is not bound".into())
        })?;
        Ok(Box::new(JsonlConsumer::new(
            bound.config.clone(),
            bound.schema.clone(),
        )))
    }
}

/// Byte positions of complete records discovered so far.
struct LineIndex {
    /// Start byte of each newline-terminated, non-blank line.
    lines: Vec<u64>,
    /// Byte position scanning resumes from. Points at the start of an
    /// unterminated trailing line, if the file currently has one.
    scan_pos: u64,
}

/// One consumer session over a JSONL file.
///
/// Offsets are record indices in file order. The file is the single
/// partition; the configured partition number only scopes the checkpoint
/// identity.
pub struct JsonlConsumer {
    config: StreamConfig,
    schema: Schema,
    state: SessionState,
    path: PathBuf,
    reader: Option<BufReader<File>>,
    index: LineIndex,
    store: Option<Arc<dyn CheckpointStore>>,
    metrics: Arc<dyn MetricsSink>,
    cursor: i64,
    last_delivered: Option<Offset>,
    initial: Offset,
}

impl JsonlConsumer {
    /// Create a session in the `Created` state.
    pub fn new(config: StreamConfig, schema: Schema) -> Self {
        let path = config.param("path").unwrap_or_default().into();
        Self {
            config,
            schema,
            state: SessionState::Created,
            path,
            reader: None,
            index: LineIndex {
                lines: Vec::new(),
                scan_pos: 0,
            },
            store: None,
            metrics: Arc::new(NullMetricsSink),
            cursor: 0,
            last_delivered: None,
            initial: Offset::ZERO,
        }
    }

    fn delivered(&self) -> Offset {
        self.last_delivered.unwrap_or(self.initial)
    }

    fn connection_err(&self, context: &str, e: std::io::Error) -> ConsumerError {
        ConsumerError::connection(anyhow::anyhow!(
            "{context} {}: {e}",
            self.path.display()
        ))
    }

    /// Scan forward from `scan_pos`, indexing complete lines appended since
    /// the last scan.
    fn refresh_index(&mut self) -> Result<()> {
        let reader = self.reader.as_mut().ok_or(ConsumerError::InvalidState {
            operation: "decode",
            state: self.state,
        })?;
        reader
            .seek(SeekFrom::Start(self.index.scan_pos))
            .map_err(|e| {
                ConsumerError::connection(anyhow::anyhow!("cannot seek in jsonl file: {e}"))
            })?;

        let mut buf = String::new();
        loop {
            let start = self.index.scan_pos;
            buf.clear();
            let n = reader
                .read_line(&mut buf)
                .map_err(|e| ConsumerError::connection(anyhow::anyhow!("read failed: {e}")))?;
            if n == 0 {
                break;
            }
            if !buf.ends_with('\n') {
                // Unterminated trailing line: a writer is mid-append.
                break;
            }
            self.index.scan_pos = start + n as u64;
            if !buf.trim().is_empty() {
                self.index.lines.push(start);
            }
        }
        Ok(())
    }

    /// Read the raw payload at record index `offset`, refreshing the index
    /// first if the offset is past what has been scanned.
    fn read_at(&mut self, offset: i64) -> Result<Option<String>> {
        if offset < 0 {
            return Ok(None);
        }
        if offset as usize >= self.index.lines.len() {
            self.refresh_index()?;
        }
        let Some(&start) = self.index.lines.get(offset as usize) else {
            return Ok(None);
        };

        let reader = self.reader.as_mut().ok_or(ConsumerError::InvalidState {
            operation: "decode",
            state: self.state,
        })?;
        reader
            .seek(SeekFrom::Start(start))
            .map_err(|e| ConsumerError::connection(anyhow::anyhow!("cannot seek: {e}")))?;
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| ConsumerError::connection(anyhow::anyhow!("read failed: {e}")))?;
        Ok(Some(line))
    }

    /// Wait for the record at `offset` up to the fetch timeout.
    async fn fetch(&mut self, offset: i64) -> Result<Option<String>> {
        let deadline = Instant::now() + self.config.fetch_timeout();
        loop {
            if let Some(line) = self.read_at(offset)? {
                return Ok(Some(line));
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
impl StreamLevelConsumer for JsonlConsumer {
    async fn init(&mut self, config: &StreamConfig, metrics: Arc<dyn MetricsSink>) -> Result<()> {
        self.state.ensure("init", &[SessionState::Created])?;

        let path: PathBuf = config.require_param("path")?.into();
        let start_offset = match config.param("start_offset") {
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                ConsumerError::Configuration(format!("invalid start_offset '{raw}': {e}"))
            })?,
            None => 0,
        };

        self.store = checkpoint::open_store(&config.checkpoint)
            .map_err(|e| ConsumerError::Configuration(format!("cannot open checkpoint store: {e}")))?;
        self.config = config.clone();
        self.path = path;
        self.metrics = metrics;
        self.cursor = start_offset;
        self.initial = Offset(start_offset);
        self.state = SessionState::Initialized;
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        self.state.ensure("start", &[SessionState::Initialized])?;

        let file = File::open(&self.path)
            .map_err(|e| self.connection_err("cannot open jsonl file", e))?;
        self.reader = Some(BufReader::new(file));
        self.index.lines.clear();
        self.index.scan_pos = 0;
        self.refresh_index()?;
        self.state = SessionState::Started;
        tracing::debug!(
            path = %self.path.display(),
            records = self.index.lines.len(),
            "jsonl consumer started"
        );
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
            let Some(line) = self.fetch(self.cursor).await? else {
                return Ok(None);
            };
            let offset = Offset(self.cursor);
            match destination.decode_json(&self.schema, line.as_bytes(), offset) {
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
                            tracing::warn!(
                                path = %self.path.display(),
                                %offset,
                                error = %err,
                                "skipping undecodable line"
                            );
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

        let Some(line) = self.fetch(offset.value()).await? else {
            return Ok(None);
        };
        destination.decode_json(&self.schema, line.as_bytes(), offset)?;
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
        self.reader = None;
        self.store = None;
        self.index.lines.clear();
        self.state = SessionState::Shutdown;
        tracing::debug!(path = %self.path.display(), "jsonl consumer shut down");
        Ok(())
    }
}
