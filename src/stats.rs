use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use logbroker_protocol::GlobalStats;

/// Process-wide counters. Each field is an independent atomic; callers that
/// need a consistent multi-field snapshot use `snapshot()`, which is not
/// transactional across fields but is adequate for the health/admin reads
/// this is used for (§4.6 tolerates a consistent-enough read, not a lock
/// spanning the whole registry).
pub struct Stats {
    total_connections: AtomicU64,
    total_publishes: AtomicU64,
    total_delivered: AtomicU64,
    total_dropped: AtomicU64,
    started_at: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            total_publishes: AtomicU64::new(0),
            total_delivered: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn record_connection(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish(&self) {
        self.total_publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, count: u64) {
        self.total_delivered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.total_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn uptime_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn snapshot(&self) -> GlobalStats {
        GlobalStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            total_publishes: self.total_publishes.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_dropped: self.total_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
