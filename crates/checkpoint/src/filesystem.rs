//! Filesystem-based checkpoint storage implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use ingest_core::Offset;
use std::path::PathBuf;

use crate::store::{CheckpointId, CheckpointStore, StoredCheckpoint};

/// Filesystem implementation of the [`CheckpointStore`] trait.
///
/// Stores one JSON file per (stream, partition) in a directory. Writes go
/// to a temporary file first and are renamed into place, so an interrupted
/// save leaves the previous checkpoint intact.
pub struct FilesystemStore {
    dir: PathBuf,
}

impl FilesystemStore {
    /// Create a new FilesystemStore rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory this store writes into.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path_for(&self, id: &CheckpointId) -> PathBuf {
        self.dir.join(format!("checkpoint_{}.json", id.key()))
    }
}

#[async_trait]
impl CheckpointStore for FilesystemStore {
    async fn save(&self, id: &CheckpointId, offset: Offset) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create checkpoint dir {}", self.dir.display()))?;

        let stored = StoredCheckpoint {
            stream: id.stream.clone(),
            partition: id.partition,
            offset,
            created_at: Utc::now(),
        };

        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&stored)?)
            .with_context(|| format!("cannot write checkpoint file {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("cannot move checkpoint into place at {}", path.display()))?;

        tracing::info!(checkpoint = %id, %offset, path = %path.display(), "stored checkpoint");
        Ok(())
    }

    async fn load(&self, id: &CheckpointId) -> Result<Option<StoredCheckpoint>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read checkpoint file {}", path.display()))?;
        let stored: StoredCheckpoint = serde_json::from_str(&content)
            .with_context(|| format!("malformed checkpoint file {}", path.display()))?;

        if stored.stream != id.stream || stored.partition != id.partition {
            anyhow::bail!(
                "checkpoint identity mismatch in {}: expected {id}, found {}/{}",
                path.display(),
                stored.stream,
                stored.partition
            );
        }
        Ok(Some(stored))
    }
}
