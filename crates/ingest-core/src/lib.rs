//! Core consumer contract for the stream-ingest framework.
//!
//! This crate defines the pluggable boundary through which the ingestion
//! pipeline consumes an external append-only stream:
//!
//! - [`StreamConfig`] / [`Schema`] - What to consume and how to interpret it
//! - [`ConsumerFactoryRegistry`] - Resolves a plugin identifier to a bound factory
//! - [`StreamConsumerFactory`] - Produces consumer sessions for a bound stream
//! - [`StreamLevelConsumer`] - One session's pull/decode/checkpoint lifecycle
//! - [`Record`] / [`FieldValue`] - Reusable decode destination
//!
//! # Architecture
//!
//! ```text
//! ingest-core (this crate)
//!    │
//!    ├─── checkpoint                    (durable offset stores)
//!    ├─── stream-ingest-memory-source   (in-memory transport adapter)
//!    └─── stream-ingest-jsonl-source    (JSONL file transport adapter)
//! ```
//!
//! Transport adapters implement [`StreamConsumerFactory`] and
//! [`StreamLevelConsumer`] and register a constructor under their plugin
//! identifier; the pipeline resolves them through the registry without
//! depending on any concrete transport.
//!
//! # Example
//!
//! ```rust
//! use ingest_core::{ConsumerFactoryRegistry, StreamConfig, Schema};
//!
//! let registry = ConsumerFactoryRegistry::new();
//! // Adapters are registered at process start:
//! // registry.register("memory", || Box::new(MemoryConsumerFactory::new()));
//!
//! let config = StreamConfig::new("memory", "events", 0);
//! let schema = Schema::empty();
//!
//! // Resolution of an unregistered identifier is a fatal configuration error.
//! assert!(registry.resolve(&config, &schema).is_err());
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod offset;
pub mod record;
pub mod registry;
pub mod schema;

// Re-exports for convenience
pub use config::{CheckpointConfig, DecodeErrorPolicy, StreamConfig};
pub use consumer::{
    LogMetricsSink, MetricsSink, NullMetricsSink, SessionState, StreamConsumerFactory,
    StreamLevelConsumer,
};
pub use error::{ConsumerError, Result};
pub use offset::Offset;
pub use record::{FieldValue, Record};
pub use registry::{ConsumerFactoryRegistry, FactoryConstructor};
pub use schema::{FieldDefinition, FieldType, Schema, SchemaError};
