use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{QueueResult, WalError};
use crate::message::Message;
use crate::metrics::Metrics;
use crate::wal::Wal;

/// One partition's FIFO lane: the WAL, the message index, the pending order,
/// and the in-flight visibility tracker, all behind a single mutex.
///
/// The mutex is held across WAL appends and rewrites, so a partition under
/// heavy ack traffic serializes through its fsync rate.
pub struct PartitionQueue {
    topic_key: String,
    timeout: Duration,
    state: Mutex<QueueState>,
    wal: Wal,
    metrics: Arc<Metrics>,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct QueueState {
    /// Every message that is pending or in flight. Absence means acked.
    index: HashMap<Uuid, Message>,
    /// Delivery order. May transiently hold ids already acked; `dequeue`
    /// discards those instead of scanning on every ack.
    pending: VecDeque<Uuid>,
    /// Dispatch timestamp (clock nanos) per in-flight id.
    in_flight: HashMap<Uuid, u64>,
}

impl PartitionQueue {
    /// Open the partition backed by the WAL at `wal_path`, replaying the log
    /// into memory in file order.
    ///
    /// Records that fail to decode are logged and skipped; they never abort
    /// the open. The initial depth is published before the queue is handed
    /// out.
    pub fn open(
        topic_key: impl Into<String>,
        timeout: Duration,
        wal_path: &Path,
        metrics: Arc<Metrics>,
        clock: Arc<dyn Clock>,
    ) -> QueueResult<Self> {
        let topic_key = topic_key.into();
        let wal = Wal::open(wal_path)?;
        let records = Wal::read_all(wal_path)?;

        let mut state = QueueState::default();
        for record in &records {
            match Message::from_record(record) {
                Ok(msg) => {
                    state.pending.push_back(msg.id);
                    state.index.insert(msg.id, msg);
                }
                Err(e) => {
                    warn!(topic = %topic_key, error = %e, "skipping undecodable WAL record");
                }
            }
        }
        info!(topic = %topic_key, replayed = state.pending.len(), "partition queue opened");
        metrics.set_queue_depth(&topic_key, state.pending.len());

        Ok(Self {
            topic_key,
            timeout,
            state: Mutex::new(state),
            wal,
            metrics,
            clock,
        })
    }

    /// Durably append a message, then make it deliverable.
    ///
    /// A WAL failure is returned to the caller with the in-memory state
    /// untouched.
    pub fn enqueue(&self, body: Vec<u8>) -> QueueResult<Uuid> {
        let msg = Message::new(body);
        let id = msg.id;
        let record = msg.to_record()?;

        let mut state = self.state.lock();
        self.wal.append(&record)?;
        state.pending.push_back(id);
        state.index.insert(id, msg);
        self.metrics.set_queue_depth(&self.topic_key, state.pending.len());
        Ok(id)
    }

    /// Hand the head message to a consumer and start its visibility window.
    pub fn dequeue(&self) -> Option<Message> {
        let mut state = self.state.lock();
        let dispatched = loop {
            let Some(id) = state.pending.pop_front() else {
                break None;
            };
            // An id acked while still pending has no index entry; discard it.
            if let Some(msg) = state.index.get(&id).cloned() {
                state.in_flight.insert(id, self.clock.now());
                break Some(msg);
            }
        };
        self.metrics.set_queue_depth(&self.topic_key, state.pending.len());
        dispatched
    }

    /// Acknowledge `id`: drop it from memory and compact the WAL down to the
    /// messages still in the index.
    ///
    /// Unknown ids are a no-op. A failed rewrite is logged and absorbed — the
    /// in-memory ack stands and the next ack rewrites again.
    pub fn ack(&self, id: &Uuid) {
        let mut state = self.state.lock();
        state.in_flight.remove(id);
        state.index.remove(id);
        self.metrics.set_queue_depth(&self.topic_key, state.pending.len());

        let mut records = Vec::with_capacity(state.index.len());
        for msg in state.index.values() {
            match msg.to_record() {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(topic = %self.topic_key, id = %msg.id, error = %e, "failed to serialize message for WAL rewrite");
                }
            }
        }
        debug!(topic = %self.topic_key, remaining = records.len(), "rewriting WAL after ack");
        if let Err(e) = self.wal.rewrite(&records) {
            warn!(topic = %self.topic_key, error = %e, "WAL rewrite failed; will retry on next ack");
        }
    }

    /// Return every timed-out in-flight message to the *head* of the pending
    /// order, so already-delayed messages outrank fresh arrivals. Returns how
    /// many were requeued.
    pub fn requeue_orphaned(&self) -> usize {
        let mut state = self.state.lock();
        let now = self.clock.now();
        let timeout = self.timeout.as_nanos() as u64;

        let expired: Vec<Uuid> = state
            .in_flight
            .iter()
            .filter(|&(_, &dispatched_at)| now.saturating_sub(dispatched_at) > timeout)
            .map(|(&id, _)| id)
            .collect();

        for id in &expired {
            state.in_flight.remove(id);
            state.pending.push_front(*id);
            debug!(topic = %self.topic_key, %id, "requeued orphaned message");
        }
        if !expired.is_empty() {
            self.metrics.set_queue_depth(&self.topic_key, state.pending.len());
        }
        expired.len()
    }

    /// Flush the WAL.
    pub fn close(&self) -> Result<(), WalError> {
        self.wal.close()
    }

    pub fn topic_key(&self) -> &str {
        &self.topic_key
    }

    /// Invariant check for tests: in-flight ids are indexed and not pending,
    /// and every indexed message is exactly one of pending or in-flight.
    /// Pending ids without an index entry are tolerated — they are acked
    /// leftovers that `dequeue` discards.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let state = self.state.lock();
        for id in state.in_flight.keys() {
            assert!(state.index.contains_key(id), "in-flight id missing from index");
            assert!(!state.pending.contains(id), "id both pending and in-flight");
        }
        let live_pending = state
            .pending
            .iter()
            .filter(|id| state.index.contains_key(id))
            .count();
        assert_eq!(
            live_pending + state.in_flight.len(),
            state.index.len(),
            "index must partition into pending and in-flight"
        );
    }
}
