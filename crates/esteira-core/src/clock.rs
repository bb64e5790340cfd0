use std::time::{SystemTime, UNIX_EPOCH};

/// A source of timestamps for dispatch stamping and visibility-timeout
/// checks. Injected at construction so queues never read the wall clock
/// directly.
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds since the UNIX epoch.
    fn now(&self) -> u64;
}

/// Wall-clock time via `std::time::SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64
    }
}

/// A hand-advanced clock for timeout tests.
#[cfg(test)]
pub(crate) struct ManualClock(std::sync::atomic::AtomicU64);

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self(std::sync::atomic::AtomicU64::new(1))
    }

    pub(crate) fn advance(&self, by: std::time::Duration) {
        self.0
            .fetch_add(by.as_nanos() as u64, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}
