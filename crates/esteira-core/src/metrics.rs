use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

/// Shared metrics sink: per-partition queue depths and the live connection
/// count. Every holder reaches it through an `Arc` handle passed at
/// construction — there is no global registry.
#[derive(Debug, Default)]
pub struct Metrics {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    queues: HashMap<String, usize>,
    active_connections: usize,
}

/// Point-in-time copy of the sink, in the exact shape served by the metrics
/// endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queues: HashMap<String, usize>,
    pub active_connections: usize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pending depth for a `"<topic>-<partition>"` key.
    pub fn set_queue_depth(&self, topic_key: &str, depth: usize) {
        self.inner.write().queues.insert(topic_key.to_string(), depth);
    }

    pub fn inc_active_connections(&self) {
        self.inner.write().active_connections += 1;
    }

    pub fn dec_active_connections(&self) {
        let mut inner = self.inner.write();
        inner.active_connections = inner.active_connections.saturating_sub(1);
    }

    /// Copy the data out so the lock is not held while the caller encodes it.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read();
        MetricsSnapshot {
            queues: inner.queues.clone(),
            active_connections: inner.active_connections,
        }
    }
}
