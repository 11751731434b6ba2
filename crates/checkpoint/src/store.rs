//! Checkpoint storage trait and types.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ingest_core::Offset;
use serde::{Deserialize, Serialize};

/// Identity a checkpoint is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointId {
    /// Logical stream (topic) name
    pub stream: String,
    /// Partition within the stream
    pub partition: u32,
}

impl CheckpointId {
    pub fn new(stream: impl Into<String>, partition: u32) -> Self {
        Self {
            stream: stream.into(),
            partition,
        }
    }

    /// Stable key for file names and map lookups.
    pub fn key(&self) -> String {
        format!("{}-{}", self.stream, self.partition)
    }
}

impl std::fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.stream, self.partition)
    }
}

/// Checkpoint data as persisted in a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCheckpoint {
    /// Stream the checkpoint belongs to, for validation on load
    pub stream: String,
    /// Partition the checkpoint belongs to
    pub partition: u32,
    /// Offset of the last record delivered to the caller (inclusive)
    pub offset: Offset,
    /// When this checkpoint was persisted
    pub created_at: DateTime<Utc>,
}

/// Trait for checkpoint storage operations.
///
/// A backend holds at most one checkpoint per [`CheckpointId`]; `save`
/// replaces the previous value. Saving an identical offset again must
/// succeed and leave the stored checkpoint unchanged, and a failed save
/// must leave the previously stored checkpoint readable.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist `offset` as the checkpoint for `id`.
    async fn save(&self, id: &CheckpointId, offset: Offset) -> Result<()>;

    /// Read the checkpoint for `id`.
    ///
    /// Returns `None` if no checkpoint has been persisted.
    async fn load(&self, id: &CheckpointId) -> Result<Option<StoredCheckpoint>>;
}
