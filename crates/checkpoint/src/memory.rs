//! In-memory checkpoint storage.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use ingest_core::Offset;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::store::{CheckpointId, CheckpointStore, StoredCheckpoint};

/// In-memory implementation of the [`CheckpointStore`] trait.
///
/// Survives across sessions within one process, not across restarts. Unit
/// tests construct their own instances; the `memory` checkpoint backend
/// uses the process-global instance from [`MemoryStore::global`] so that
/// fresh sessions resolved from configuration see earlier commits.
#[derive(Default)]
pub struct MemoryStore {
    checkpoints: Mutex<HashMap<String, StoredCheckpoint>>,
}

impl MemoryStore {
    /// Create an empty, private store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-global store backing the `memory` checkpoint backend.
    pub fn global() -> Arc<MemoryStore> {
        static GLOBAL: OnceLock<Arc<MemoryStore>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(MemoryStore::new())))
    }

    /// Drop the checkpoint for `id`, if any. Test hygiene helper.
    pub fn remove(&self, id: &CheckpointId) {
        self.checkpoints.lock().unwrap().remove(&id.key());
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn save(&self, id: &CheckpointId, offset: Offset) -> Result<()> {
        let stored = StoredCheckpoint {
            stream: id.stream.clone(),
            partition: id.partition,
            offset,
            created_at: Utc::now(),
        };
        self.checkpoints.lock().unwrap().insert(id.key(), stored);
        tracing::debug!(checkpoint = %id, %offset, "stored in-memory checkpoint");
        Ok(())
    }

    async fn load(&self, id: &CheckpointId) -> Result<Option<StoredCheckpoint>> {
        Ok(self.checkpoints.lock().unwrap().get(&id.key()).cloned())
    }
}
