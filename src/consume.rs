//! The consume-loop driver.
//!
//! Resolves a bound factory from the registry, creates one consumer
//! session, and drives it through its lifecycle: init → start → optional
//! seek → repeated decode with periodic commits → final commit → shutdown.

use anyhow::Context;
use checkpoint::{CheckpointId, CheckpointStore};
use ingest_core::{
    ConsumerFactoryRegistry, LogMetricsSink, Offset, Record, Schema, StreamConfig,
    StreamConsumerFactory, StreamLevelConsumer,
};
use std::sync::Arc;
use tracing::info;

/// Caller-facing knobs for one consume run.
#[derive(Debug, Clone, Default)]
pub struct ConsumeOpts {
    /// Stop after this many records; `None` runs until the stream drains.
    pub max_records: Option<u64>,
    /// Commit every N delivered records (and once more at the end).
    pub commit_every: Option<u64>,
    /// Seek to an explicit offset before the first decode.
    pub from_offset: Option<i64>,
    /// Seek to just past the stored checkpoint before the first decode.
    /// Ignored when `from_offset` is set.
    pub resume: bool,
}

/// What one consume run delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeSummary {
    /// Records decoded and delivered.
    pub records: u64,
    /// Offset of the last delivered record, if any.
    pub last_offset: Option<Offset>,
}

/// Run one consumer session to completion.
///
/// The session is always shut down before returning, whether the run
/// succeeded or failed.
pub async fn run(
    registry: &ConsumerFactoryRegistry,
    config: &StreamConfig,
    schema: &Schema,
    opts: &ConsumeOpts,
) -> anyhow::Result<ConsumeSummary> {
    let factory = registry.resolve(config, schema)?;
    let mut session = factory.create_consumer()?;

    let outcome = drive(session.as_mut(), config, opts).await;
    if let Err(e) = session.shutdown().await {
        tracing::warn!(error = %e, "session shutdown after consume run failed");
    }
    outcome
}

async fn drive(
    session: &mut dyn StreamLevelConsumer,
    config: &StreamConfig,
    opts: &ConsumeOpts,
) -> anyhow::Result<ConsumeSummary> {
    session.init(config, Arc::new(LogMetricsSink)).await?;
    session.start().await?;

    if let Some(from) = opts.from_offset {
        session.set_offset(Offset(from))?;
        info!(stream = %config.stream, offset = from, "seeking to explicit offset");
    } else if opts.resume {
        if let Some(checkpoint) = load_checkpoint(config).await? {
            // The checkpoint names the last delivered record; resume after it.
            session.set_offset(checkpoint.next())?;
            info!(stream = %config.stream, %checkpoint, "resuming past stored checkpoint");
        } else {
            info!(stream = %config.stream, "no stored checkpoint, consuming from the initial position");
        }
    }

    let mut record = Record::new();
    let mut summary = ConsumeSummary {
        records: 0,
        last_offset: None,
    };

    loop {
        let Some(offset) = session.next_decoded(&mut record).await? else {
            info!(stream = %config.stream, records = summary.records, "stream drained");
            break;
        };
        summary.records += 1;
        summary.last_offset = Some(offset);

        if let Some(every) = opts.commit_every {
            if every > 0 && summary.records % every == 0 {
                session.commit().await?;
            }
        }
        if Some(summary.records) == opts.max_records {
            info!(stream = %config.stream, records = summary.records, "record limit reached");
            break;
        }
    }

    if opts.commit_every.is_some() && summary.records > 0 {
        session.commit().await?;
    }
    Ok(summary)
}

/// Read the stored checkpoint for the configured stream partition.
pub async fn load_checkpoint(config: &StreamConfig) -> anyhow::Result<Option<Offset>> {
    let Some(store) = checkpoint::open_store(&config.checkpoint)? else {
        anyhow::bail!(
            "checkpoint storage is disabled for stream '{}'",
            config.stream
        );
    };
    let id = CheckpointId::new(&config.stream, config.partition);
    let stored = store
        .load(&id)
        .await
        .with_context(|| format!("cannot load checkpoint for {id}"))?;
    Ok(stored.map(|s| s.offset))
}
