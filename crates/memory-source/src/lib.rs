//! In-memory transport adapter for stream-ingest.
//!
//! This crate provides:
//! - A process-global registry of named in-memory topics that tests and
//!   demos publish raw JSON payloads into
//! - A full [`StreamLevelConsumer`](ingest_core::StreamLevelConsumer)
//!   implementation over those topics
//!
//! The adapter is deterministic: a topic is an append-only `Vec` of
//! payloads and a record's offset is its index, which makes it the
//! reference transport for exercising the offset/lifecycle contract.
//!
//! # Example
//!
//! ```rust,ignore
//! use stream_ingest_memory_source::{topic, MemoryConsumerFactory, PLUGIN_ID};
//!
//! topic("events").publish_json(serde_json::json!({"id": 0, "message": "hello"}));
//!
//! registry.register(PLUGIN_ID, || Box::new(MemoryConsumerFactory::new()));
//! let factory = registry.resolve(&config, &schema)?;
//! let mut session = factory.create_consumer()?;
//! ```

mod consumer;
mod topic;

pub use consumer::{MemoryConsumer, MemoryConsumerFactory};
pub use topic::{lookup, reset, topic, MemoryTopic};

/// Plugin identifier this adapter registers under.
pub const PLUGIN_ID: &str = "memory";
