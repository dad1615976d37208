use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_emitted: AtomicU64,
    bytes_emitted: AtomicU64,
    failure_count: AtomicU64,
    pause_count: AtomicU64,
}

/// Counters of one dump task, shared between the engine and its handle.
#[derive(Debug, Clone)]
pub struct DumpMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_emitted: u64,
    pub bytes_emitted: u64,
    pub failure_count: u64,
    pub pause_count: u64,
}

impl DumpMetrics {
    pub fn new() -> Self {
        DumpMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn record_emitted(&self, bytes: u64) {
        self.inner.records_emitted.fetch_add(1, Ordering::Relaxed);
        self.inner.bytes_emitted.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_failures(&self) {
        self.inner.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pauses(&self) {
        self.inner.pause_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_emitted(&self) -> u64 {
        self.inner.records_emitted.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_emitted: self.inner.records_emitted.load(Ordering::Relaxed),
            bytes_emitted: self.inner.bytes_emitted.load(Ordering::Relaxed),
            failure_count: self.inner.failure_count.load(Ordering::Relaxed),
            pause_count: self.inner.pause_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for DumpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = DumpMetrics::new();
        let handle = metrics.clone();
        metrics.record_emitted(10);
        metrics.record_emitted(5);
        metrics.increment_pauses();

        assert_eq!(
            handle.snapshot(),
            MetricsSnapshot {
                records_emitted: 2,
                bytes_emitted: 15,
                failure_count: 0,
                pause_count: 1,
            }
        );
    }
}
