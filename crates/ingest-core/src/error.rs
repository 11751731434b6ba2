//! Error taxonomy for the consumer contract.
//!
//! The contract separates errors the caller can recover from by retrying
//! (connection loss, a failed commit) from errors that mean the pipeline
//! cannot proceed for this stream at all (unknown plugin, malformed
//! configuration, operations invoked outside their valid state). Fatal
//! errors are escalated to the caller unchanged; the contract itself never
//! retries anything.

use crate::consumer::SessionState;
use crate::offset::Offset;

/// Result alias used across the consumer contract.
pub type Result<T> = std::result::Result<T, ConsumerError>;

/// Error type for factory resolution and consumer sessions.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// Configuration names a plugin identifier no constructor is registered for.
    #[error("unknown consumer plugin '{0}'")]
    UnknownPlugin(String),

    /// Configuration is structurally invalid or incompatible with the schema.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport could not be reached or was lost mid-stream.
    #[error("connection error: {source}")]
    Connection {
        #[source]
        source: anyhow::Error,
    },

    /// A payload could not be decoded into the schema shape.
    #[error("decode error at offset {offset}: {source}")]
    Decode {
        offset: Offset,
        #[source]
        source: anyhow::Error,
    },

    /// Persisting a checkpoint failed.
    #[error("commit of offset {offset} failed: {source}")]
    Commit {
        offset: Offset,
        #[source]
        source: anyhow::Error,
    },

    /// A checkpoint was requested for data not yet delivered to the caller.
    #[error("cannot checkpoint offset {requested}: last delivered offset is {delivered}")]
    CheckpointAhead { requested: Offset, delivered: Offset },

    /// An operation was invoked outside its valid session state.
    #[error("{operation} is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

impl ConsumerError {
    /// Whether the caller may reasonably retry the failed operation.
    ///
    /// Connection errors (reconnect and call `start` again) and commit
    /// errors (the previous checkpoint is intact, save again) are
    /// retryable. Everything else requires intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConsumerError::Connection { .. } | ConsumerError::Commit { .. }
        )
    }

    /// Whether this error means the pipeline cannot start or continue for
    /// this stream until configuration or caller code is fixed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConsumerError::UnknownPlugin(_)
                | ConsumerError::Configuration(_)
                | ConsumerError::InvalidState { .. }
                | ConsumerError::CheckpointAhead { .. }
        )
    }

    /// Shorthand for wrapping a transport failure.
    pub fn connection(source: impl Into<anyhow::Error>) -> Self {
        ConsumerError::Connection {
            source: source.into(),
        }
    }
}
