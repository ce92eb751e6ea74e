use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing gateway activity.
#[derive(Default)]
pub struct GatewayMetrics {
    chats_answered: AtomicU64,
    retrievals_served: AtomicU64,
    chunks_returned: AtomicU64,
    upstream_failures: AtomicU64,
}

impl GatewayMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed chat answer and the number of chunks used as evidence.
    pub fn record_chat(&self, chunk_count: u64) {
        self.chats_answered.fetch_add(1, Ordering::Relaxed);
        self.chunks_returned
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a raw retrieval forwarded to the caller.
    pub fn record_retrieval(&self, chunk_count: u64) {
        self.retrievals_served.fetch_add(1, Ordering::Relaxed);
        self.chunks_returned
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a failed call to either upstream service.
    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            chats_answered: self.chats_answered.load(Ordering::Relaxed),
            retrievals_served: self.retrievals_served.load(Ordering::Relaxed),
            chunks_returned: self.chunks_returned.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of gateway counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Chat requests answered since startup.
    pub chats_answered: u64,
    /// Raw retrieval requests forwarded since startup.
    pub retrievals_served: u64,
    /// Total chunks handed back across chats and retrievals.
    pub chunks_returned: u64,
    /// Upstream calls that failed.
    pub upstream_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_chats_and_retrievals() {
        let metrics = GatewayMetrics::new();
        metrics.record_chat(2);
        metrics.record_retrieval(3);
        metrics.record_upstream_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.chats_answered, 1);
        assert_eq!(snapshot.retrievals_served, 1);
        assert_eq!(snapshot.chunks_returned, 5);
        assert_eq!(snapshot.upstream_failures, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        let metrics = GatewayMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.chats_answered, 0);
        assert_eq!(snapshot.chunks_returned, 0);
    }
}
