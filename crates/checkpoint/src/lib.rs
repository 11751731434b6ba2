//! Checkpoint management for stream-ingest
//!
//! Provides storage-agnostic persistence of consumption progress, one
//! checkpoint per (stream, partition).
//!
//! # Architecture
//!
//! - The [`CheckpointStore`] trait abstracts the storage backend
//! - [`FilesystemStore`] persists one JSON file per partition identity
//! - [`MemoryStore`] backs unit tests and the `memory` checkpoint backend
//! - [`open_store`] maps a [`CheckpointConfig`] to a concrete backend
//!
//! A checkpoint names the **last record delivered** to the caller
//! (inclusive). Saving the same offset twice is a no-op from the reader's
//! perspective, and a failed save never corrupts the previously persisted
//! checkpoint: the filesystem backend writes to a temporary file and renames
//! it into place.

mod filesystem;
mod memory;
pub mod store;

#[cfg(test)]
mod tests;

pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use store::{CheckpointId, CheckpointStore, StoredCheckpoint};

use ingest_core::CheckpointConfig;
use std::sync::Arc;

/// Open the checkpoint store a [`CheckpointConfig`] selects.
///
/// Returns `Ok(None)` when checkpoint storage is disabled; sessions then
/// reject `commit` as a configuration error rather than silently dropping
/// the checkpoint.
pub fn open_store(config: &CheckpointConfig) -> anyhow::Result<Option<Arc<dyn CheckpointStore>>> {
    match config {
        CheckpointConfig::Disabled => Ok(None),
        CheckpointConfig::Filesystem { dir } => {
            Ok(Some(Arc::new(FilesystemStore::new(dir.clone()))))
        }
        CheckpointConfig::Memory => Ok(Some(MemoryStore::global())),
    }
}
