//! stream-ingest library
//!
//! The pluggable boundary through which a real-time ingestion pipeline
//! consumes external append-only streams and turns raw messages into
//! schema-typed records.
//!
//! # Features
//!
//! - Plugin registry: transport adapters selected by a configured identifier
//! - Offset-tracked consumer sessions with seek and replay support
//! - Durable checkpoints: resume consumption from any point after restart
//! - Schema-driven decoding into a reusable record container
//!
//! # Built-in transport adapters
//!
//! - `stream-ingest-memory-source` - deterministic in-memory topics
//! - `stream-ingest-jsonl-source` - JSONL files as append-only logs
//!
//! # CLI Usage
//!
//! ```bash
//! # Consume a JSONL file, committing a checkpoint every 100 records
//! stream-ingest consume --config stream.toml --schema events.yaml --commit-every 100
//!
//! # Resume from the stored checkpoint
//! stream-ingest consume --config stream.toml --schema events.yaml --resume
//!
//! # Inspect the stored checkpoint
//! stream-ingest show-checkpoint --config stream.toml
//! ```

pub mod consume;

// Re-export the adapter crates for convenience
pub use stream_ingest_jsonl_source as jsonl;
pub use stream_ingest_memory_source as memory;

use ingest_core::ConsumerFactoryRegistry;

/// Build a registry with the built-in transport adapters registered.
///
/// Callers embedding the pipeline can start from this and register their
/// own adapters on top.
pub fn builtin_registry() -> ConsumerFactoryRegistry {
    let mut registry = ConsumerFactoryRegistry::new();
    registry.register(memory::PLUGIN_ID, || {
        Box::new(memory::MemoryConsumerFactory::new())
    });
    registry.register(jsonl::PLUGIN_ID, || {
        Box::new(jsonl::JsonlConsumerFactory::new())
    });
    registry
}
