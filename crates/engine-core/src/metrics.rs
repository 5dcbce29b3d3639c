use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_pushed: AtomicU64,
    pages_pushed: AtomicU64,
    empty_pages: AtomicU64,
    backpressure_waits: AtomicU64,
}

/// Counters for one `sync()` run.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_pushed: u64,
    pub pages_pushed: u64,
    pub empty_pages: u64,
    pub backpressure_waits: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_records(&self, count: u64) {
        self.inner.records_pushed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_pages(&self, count: u64) {
        self.inner.pages_pushed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_empty_pages(&self, count: u64) {
        self.inner.empty_pages.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_waits(&self, count: u64) {
        self.inner
            .backpressure_waits
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_pushed: self.inner.records_pushed.load(Ordering::Relaxed),
            pages_pushed: self.inner.pages_pushed.load(Ordering::Relaxed),
            empty_pages: self.inner.empty_pages.load(Ordering::Relaxed),
            backpressure_waits: self.inner.backpressure_waits.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
