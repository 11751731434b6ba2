//! Process-global registry of in-memory topics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// An append-only in-memory payload log. A record's offset is its index.
#[derive(Default)]
pub struct MemoryTopic {
    messages: Mutex<Vec<Arc<[u8]>>>,
}

impl MemoryTopic {
    /// Append a raw payload, returning its offset.
    pub fn publish(&self, payload: impl Into<Vec<u8>>) -> i64 {
        let mut messages = self.messages.lock().unwrap();
        messages.push(payload.into().into());
        (messages.len() - 1) as i64
    }

    /// Append a JSON payload, returning its offset.
    pub fn publish_json(&self, value: serde_json::Value) -> i64 {
        self.publish(value.to_string().into_bytes())
    }

    /// Read the payload at `offset`, if it exists yet.
    pub fn get(&self, offset: i64) -> Option<Arc<[u8]>> {
        if offset < 0 {
            return None;
        }
        self.messages.lock().unwrap().get(offset as usize).cloned()
    }

    /// Number of payloads published so far.
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    /// Whether nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn registry() -> &'static Mutex<HashMap<String, Arc<MemoryTopic>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<MemoryTopic>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Get or create the topic with the given name.
pub fn topic(name: &str) -> Arc<MemoryTopic> {
    let mut topics = registry().lock().unwrap();
    Arc::clone(topics.entry(name.to_string()).or_default())
}

/// Look up an existing topic without creating it.
///
/// Sessions use this at `start` so that consuming a topic nobody has
/// published to behaves like an unreachable transport.
pub fn lookup(name: &str) -> Option<Arc<MemoryTopic>> {
    registry().lock().unwrap().get(name).cloned()
}

/// Remove a topic. Test hygiene helper.
pub fn reset(name: &str) {
    registry().lock().unwrap().remove(name);
}
