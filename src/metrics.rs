use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Request counters maintained by [`crate::Core`]
///
/// All counters use relaxed atomics; they are statistics, not synchronization.
#[derive(Debug, Default)]
pub struct CoreMetrics {
    request_count: AtomicUsize,
    not_found: AtomicUsize,
    errors: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl CoreMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a finished request and its latency
    pub fn record_request(&self, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a request whose chain was halted with an error
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn not_found_count(&self) -> usize {
        self.not_found.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// Mean latency over all recorded requests, zero before the first one
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}
