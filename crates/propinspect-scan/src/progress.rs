//! Scan progress reporting.

use std::time::{Duration, Instant};

use propinspect_core::ItemId;

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of items visited so far.
    pub items_visited: u64,
    /// Number of properties read so far.
    pub properties_seen: u64,
    /// Number of distinct property keys indexed so far.
    pub distinct_keys: usize,
    /// Last item visited.
    pub current_item: Option<ItemId>,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            items_visited: 0,
            properties_seen: 0,
            distinct_keys: 0,
            current_item: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate scan rate in items per second.
    pub fn items_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.items_visited as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    interval: u64,
    items_visited: u64,
    properties_seen: u64,
    current_item: Option<ItemId>,
}

impl ProgressTracker {
    pub fn new(interval: u64) -> Self {
        Self {
            start_time: Instant::now(),
            interval: interval.max(1),
            items_visited: 0,
            properties_seen: 0,
            current_item: None,
        }
    }

    /// Record a visited item. Returns `true` when an update is due.
    pub fn record_item(&mut self, item: ItemId, properties: usize) -> bool {
        self.items_visited += 1;
        self.properties_seen += properties as u64;
        self.current_item = Some(item);
        self.items_visited % self.interval == 0
    }

    pub fn snapshot(&self, distinct_keys: usize) -> ScanProgress {
        ScanProgress {
            items_visited: self.items_visited,
            properties_seen: self.properties_seen,
            distinct_keys,
            current_item: self.current_item,
            elapsed: self.start_time.elapsed(),
        }
    }
}
