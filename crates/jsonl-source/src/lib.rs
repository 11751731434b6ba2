//! JSONL file transport adapter for stream-ingest.
//!
//! Treats a JSONL file as a single-partition append-only log: every
//! newline-terminated, non-blank line is one record, and a record's offset
//! is its index in file order. The session re-scans the file tail when it
//! reaches the end, so lines appended after `start` become visible to a
//! blocked decode, and an unterminated trailing line is not delivered until
//! its newline arrives.
//!
//! Configuration: the `path` parameter names the file to consume.
//!
//! ```toml
//! consumer_factory = "jsonl"
//! stream = "events"
//!
//! [params]
//! path = "/var/data/events.jsonl"
//! ```

mod consumer;

pub use consumer::{JsonlConsumer, JsonlConsumerFactory};

/// Plugin identifier this adapter registers under.
pub const PLUGIN_ID: &str = "jsonl";
