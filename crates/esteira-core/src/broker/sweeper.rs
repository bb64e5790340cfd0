use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, info};

use crate::broker::Broker;
use crate::error::{BrokerError, BrokerResult};

/// Periodic driver that returns timed-out in-flight messages to their
/// queues.
///
/// Runs on a dedicated OS thread. Each tick walks the registries under read
/// locks and takes each queue's own mutex per call, so dispatch traffic is
/// never blocked for the duration of a whole sweep.
pub struct OrphanSweeper {
    shutdown_tx: crossbeam_channel::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl OrphanSweeper {
    /// Spawn the sweeper, ticking every `interval`.
    #[tracing::instrument(skip_all, fields(interval_ms = interval.as_millis() as u64))]
    pub fn spawn(broker: Arc<Broker>, interval: Duration) -> BrokerResult<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("esteira-sweeper".to_string())
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => broker.requeue_orphaned(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        debug!("sweeper stopping");
                        break;
                    }
                }
            })
            .map_err(|e| BrokerError::SweeperSpawn(e.to_string()))?;

        info!("orphan sweeper started");
        Ok(Self {
            shutdown_tx,
            handle: Some(handle),
        })
    }

    /// Signal the sweeper and wait for the thread to exit. The current tick,
    /// if one is in progress, completes first.
    pub fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for OrphanSweeper {
    fn drop(&mut self) {
        // If shutdown wasn't called explicitly, stop the thread here.
        if self.handle.is_some() {
            let _ = self.shutdown_tx.send(());
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }
}
