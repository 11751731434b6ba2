//! Plugin resolution.
//!
//! The registry maps a configuration-supplied plugin identifier to a
//! registered constructor. Registration happens through explicit calls at
//! process start, so the set of available implementations is verified at
//! compile time rather than discovered by runtime loading.

use crate::config::StreamConfig;
use crate::consumer::StreamConsumerFactory;
use crate::error::{ConsumerError, Result};
use crate::schema::Schema;
use std::collections::HashMap;

/// Constructor for an unbound factory. Registered under a plugin identifier.
pub type FactoryConstructor = fn() -> Box<dyn StreamConsumerFactory>;

/// Resolves plugin identifiers to bound [`StreamConsumerFactory`] instances.
///
/// `resolve` constructs a fresh factory and invokes its binding step with
/// the supplied configuration and schema before returning it, so callers
/// never observe an unbound factory. An unknown identifier or a failed bind
/// is a fatal configuration error; no transport I/O occurs during
/// resolution.
#[derive(Default)]
pub struct ConsumerFactoryRegistry {
    constructors: HashMap<String, FactoryConstructor>,
}

impl ConsumerFactoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under a plugin identifier.
    ///
    /// Re-registering an identifier replaces the previous constructor; the
    /// last registration wins.
    pub fn register(&mut self, id: impl Into<String>, constructor: FactoryConstructor) {
        let id = id.into();
        tracing::debug!(plugin = %id, "registered consumer factory");
        self.constructors.insert(id, constructor);
    }

    /// Registered plugin identifiers, sorted, for diagnostics.
    pub fn registered_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve the plugin named by `config.consumer_factory`, construct it,
    /// and bind it to `(config, schema)`.
    pub fn resolve(
        &self,
        config: &StreamConfig,
        schema: &Schema,
    ) -> Result<Box<dyn StreamConsumerFactory>> {
        let constructor = self
            .constructors
            .get(&config.consumer_factory)
            .ok_or_else(|| ConsumerError::UnknownPlugin(config.consumer_factory.clone()))?;

        let mut factory = constructor();
        factory.bind(config, schema)?;

        tracing::info!(
            plugin = %config.consumer_factory,
            stream = %config.stream,
            partition = config.partition,
            "resolved and bound consumer factory"
        );
        Ok(factory)
    }
}
