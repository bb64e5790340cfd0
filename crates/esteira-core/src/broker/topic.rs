use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::warn;

use crate::clock::Clock;
use crate::error::{BrokerError, BrokerResult};
use crate::metrics::Metrics;
use crate::queue::PartitionQueue;

/// A named container of lazily-materialized partition queues.
pub struct Topic {
    name: String,
    data_dir: PathBuf,
    timeout: Duration,
    partitions: RwLock<HashMap<u32, Arc<PartitionQueue>>>,
    metrics: Arc<Metrics>,
    clock: Arc<dyn Clock>,
}

impl Topic {
    pub(crate) fn new(
        name: String,
        data_dir: PathBuf,
        timeout: Duration,
        metrics: Arc<Metrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name,
            data_dir,
            timeout,
            partitions: RwLock::new(HashMap::new()),
            metrics,
            clock,
        }
    }

    /// Get or create the queue for partition `id`.
    ///
    /// Creation ensures `<data_dir>/<topic>/` exists and opens the queue on
    /// `<data_dir>/<topic>/<id>.wal.log`, serialized by the write lock. A
    /// directory-creation or open failure leaves no partition behind.
    pub fn get_partition(&self, id: u32) -> BrokerResult<Arc<PartitionQueue>> {
        if let Some(queue) = self.partitions.read().get(&id) {
            return Ok(Arc::clone(queue));
        }

        let mut partitions = self.partitions.write();
        if let Some(queue) = partitions.get(&id) {
            return Ok(Arc::clone(queue));
        }

        let topic_dir = self.data_dir.join(&self.name);
        fs::create_dir_all(&topic_dir).map_err(|source| BrokerError::PartitionDir {
            path: topic_dir.clone(),
            source,
        })?;
        let wal_path = topic_dir.join(format!("{id}.wal.log"));

        let queue = Arc::new(PartitionQueue::open(
            format!("{}-{}", self.name, id),
            self.timeout,
            &wal_path,
            Arc::clone(&self.metrics),
            Arc::clone(&self.clock),
        )?);
        partitions.insert(id, Arc::clone(&queue));
        Ok(queue)
    }

    /// One sweep pass over every partition.
    pub fn requeue_orphaned(&self) {
        for queue in self.partitions.read().values() {
            queue.requeue_orphaned();
        }
    }

    /// Flush every partition's WAL.
    pub fn close(&self) {
        for (id, queue) in self.partitions.read().iter() {
            if let Err(e) = queue.close() {
                warn!(topic = %self.name, partition = id, error = %e, "failed to close partition WAL");
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
