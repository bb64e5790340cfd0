pub mod config;
pub mod sweeper;
pub mod topic;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::info;

use crate::clock::Clock;
use crate::metrics::Metrics;

pub use config::BrokerConfig;
pub use sweeper::OrphanSweeper;
pub use topic::Topic;

/// Top of the ownership tree: `topic name → Topic → partition queues`.
/// Topics hold no back-references; the sweeper walks this tree top-down.
pub struct Broker {
    topics: RwLock<HashMap<String, Arc<Topic>>>,
    data_dir: PathBuf,
    timeout: Duration,
    metrics: Arc<Metrics>,
    clock: Arc<dyn Clock>,
}

impl Broker {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        timeout: Duration,
        metrics: Arc<Metrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            data_dir: data_dir.into(),
            timeout,
            metrics,
            clock,
        }
    }

    /// Get or create the named topic. Topic creation is purely in-memory;
    /// directories appear when the first partition is opened.
    pub fn get_topic(&self, name: &str) -> Arc<Topic> {
        if let Some(topic) = self.topics.read().get(name) {
            return Arc::clone(topic);
        }

        let mut topics = self.topics.write();
        Arc::clone(topics.entry(name.to_string()).or_insert_with(|| {
            Arc::new(Topic::new(
                name.to_string(),
                self.data_dir.clone(),
                self.timeout,
                Arc::clone(&self.metrics),
                Arc::clone(&self.clock),
            ))
        }))
    }

    /// One sweep pass over every partition of every topic. Holds only the
    /// registry read locks so dispatch traffic stays unblocked.
    pub fn requeue_orphaned(&self) {
        for topic in self.topics.read().values() {
            topic.requeue_orphaned();
        }
    }

    /// Flush every partition on shutdown.
    pub fn close(&self) {
        info!("closing broker");
        for topic in self.topics.read().values() {
            topic.close();
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
