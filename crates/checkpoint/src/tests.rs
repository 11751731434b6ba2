//! Unit tests for the checkpoint crate.

use ingest_core::{CheckpointConfig, Offset};
use tempfile::TempDir;

use crate::{open_store, CheckpointId, CheckpointStore, FilesystemStore, MemoryStore};

// ============================================================================
// FilesystemStore tests
// ============================================================================

#[tokio::test]
async fn filesystem_save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path());
    let id = CheckpointId::new("events", 0);

    store.save(&id, Offset(4)).await.unwrap();
    let stored = store.load(&id).await.unwrap().unwrap();

    assert_eq!(stored.offset, Offset(4));
    assert_eq!(stored.stream, "events");
    assert_eq!(stored.partition, 0);
}

#[tokio::test]
async fn filesystem_load_missing_returns_none() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path());
    let id = CheckpointId::new("events", 7);
    assert!(store.load(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn filesystem_same_value_save_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path());
    let id = CheckpointId::new("events", 0);

    store.save(&id, Offset(9)).await.unwrap();
    store.save(&id, Offset(9)).await.unwrap();

    let stored = store.load(&id).await.unwrap().unwrap();
    assert_eq!(stored.offset, Offset(9));

    // Still exactly one checkpoint file for this identity, no tmp leftovers.
    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(files, vec!["checkpoint_events-0.json".to_string()]);
}

#[tokio::test]
async fn filesystem_save_replaces_previous_value() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path());
    let id = CheckpointId::new("events", 0);

    store.save(&id, Offset(3)).await.unwrap();
    store.save(&id, Offset(12)).await.unwrap();

    assert_eq!(store.load(&id).await.unwrap().unwrap().offset, Offset(12));
}

#[tokio::test]
async fn filesystem_failed_save_preserves_previous_checkpoint() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path());
    let id = CheckpointId::new("events", 0);
    store.save(&id, Offset(3)).await.unwrap();

    // A directory occupying the temp path makes the next write fail
    // before the rename ever happens.
    let tmp = dir.path().join("checkpoint_events-0.json.tmp");
    std::fs::create_dir(&tmp).unwrap();
    assert!(store.save(&id, Offset(7)).await.is_err());

    // The previously stored checkpoint is still readable.
    assert_eq!(store.load(&id).await.unwrap().unwrap().offset, Offset(3));

    // Once the obstruction is gone, retrying the same save succeeds.
    std::fs::remove_dir(&tmp).unwrap();
    store.save(&id, Offset(7)).await.unwrap();
    assert_eq!(store.load(&id).await.unwrap().unwrap().offset, Offset(7));
}

#[tokio::test]
async fn filesystem_partitions_are_independent() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path());

    store.save(&CheckpointId::new("events", 0), Offset(5)).await.unwrap();
    store.save(&CheckpointId::new("events", 1), Offset(8)).await.unwrap();

    assert_eq!(
        store.load(&CheckpointId::new("events", 0)).await.unwrap().unwrap().offset,
        Offset(5)
    );
    assert_eq!(
        store.load(&CheckpointId::new("events", 1)).await.unwrap().unwrap().offset,
        Offset(8)
    );
}

#[tokio::test]
async fn filesystem_identity_mismatch_is_detected() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path());
    let id = CheckpointId::new("events", 0);
    store.save(&id, Offset(1)).await.unwrap();

    // Corrupt the stored identity by hand.
    let path = dir.path().join("checkpoint_events-0.json");
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("\"events\"", "\"other\"")).unwrap();

    let err = store.load(&id).await.unwrap_err();
    assert!(err.to_string().contains("identity mismatch"));
}

#[tokio::test]
async fn filesystem_malformed_file_is_an_error_not_a_silent_reset() {
    let dir = TempDir::new().unwrap();
    let store = FilesystemStore::new(dir.path());
    let id = CheckpointId::new("events", 0);

    std::fs::write(dir.path().join("checkpoint_events-0.json"), "garbage").unwrap();
    assert!(store.load(&id).await.is_err());
}

// ============================================================================
// MemoryStore tests
// ============================================================================

#[tokio::test]
async fn memory_store_roundtrip_and_remove() {
    let store = MemoryStore::new();
    let id = CheckpointId::new("t", 0);

    assert!(store.load(&id).await.unwrap().is_none());
    store.save(&id, Offset(2)).await.unwrap();
    assert_eq!(store.load(&id).await.unwrap().unwrap().offset, Offset(2));

    store.remove(&id);
    assert!(store.load(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn memory_global_store_is_shared() {
    let id = CheckpointId::new("shared-global-test", 3);
    MemoryStore::global().save(&id, Offset(17)).await.unwrap();

    let other = MemoryStore::global();
    assert_eq!(other.load(&id).await.unwrap().unwrap().offset, Offset(17));

    MemoryStore::global().remove(&id);
}

// ============================================================================
// open_store tests
// ============================================================================

#[tokio::test]
async fn open_store_maps_backends() {
    assert!(open_store(&CheckpointConfig::Disabled).unwrap().is_none());

    let dir = TempDir::new().unwrap();
    let fs = open_store(&CheckpointConfig::Filesystem {
        dir: dir.path().to_path_buf(),
    })
    .unwrap()
    .unwrap();
    let id = CheckpointId::new("events", 0);
    fs.save(&id, Offset(1)).await.unwrap();
    assert_eq!(fs.load(&id).await.unwrap().unwrap().offset, Offset(1));

    assert!(open_store(&CheckpointConfig::Memory).unwrap().is_some());
}
