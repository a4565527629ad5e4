//! Shared harvest counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every worker and read by the progress reporter.
///
/// Passed around as `Arc<HarvestStats>`; only ever incremented.
#[derive(Debug, Default)]
pub struct HarvestStats {
    pages_fetched: AtomicU64,
    bytes_fetched: AtomicU64,
    jobs_abandoned: AtomicU64,
    next_id: AtomicU64,
}

impl HarvestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a storage id no other caller will receive.
    pub fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_page(&self, bytes: usize) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.jobs_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    pub fn bytes_fetched(&self) -> u64 {
        self.bytes_fetched.load(Ordering::Relaxed)
    }

    pub fn jobs_abandoned(&self) -> u64 {
        self.jobs_abandoned.load(Ordering::Relaxed)
    }
}
