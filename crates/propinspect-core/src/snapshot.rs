//! Scan snapshot: the queryable result of one scan.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScanScope;
use crate::index::{IndexStats, PropertyIndex};
use crate::node::{ItemId, PropertyKey};
use crate::value::Value;

/// How a scan ended, or that it has not ended yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Still being written by the scan worker.
    #[default]
    Running,
    /// The whole scope was traversed.
    Completed,
    /// Stopped on request; holds everything ingested before the stop.
    Cancelled,
    /// The host model failed; holds everything ingested before the failure.
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl ScanOutcome {
    /// Check if the scan has ended.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Indexes and counters for one scan.
///
/// Only the scan worker mutates a snapshot, and only until it is finished.
/// Finished snapshots are handed out behind an `Arc` and never change again.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    /// Root set that was traversed.
    pub scope: ScanScope,
    /// Forward and reverse property indexes.
    pub index: PropertyIndex,
    /// Distinct items visited.
    pub items_visited: u64,
    /// Properties read across all visited items, duplicates included.
    pub properties_seen: u64,
    /// Deepest item visited, roots being depth 0.
    pub max_depth: u32,
    /// When the scan started.
    pub started_at: DateTime<Utc>,
    /// When the scan completed, was cancelled, or failed.
    pub finished_at: Option<DateTime<Utc>>,
    /// Current or final outcome.
    pub outcome: ScanOutcome,
}

impl ScanSnapshot {
    /// Create an empty snapshot for a scan starting now.
    pub fn new(scope: ScanScope) -> Self {
        Self {
            scope,
            index: PropertyIndex::new(),
            items_visited: 0,
            properties_seen: 0,
            max_depth: 0,
            started_at: Utc::now(),
            finished_at: None,
            outcome: ScanOutcome::Running,
        }
    }

    /// Fold one visited item and all of its properties.
    pub fn record_item(&mut self, item: ItemId, depth: u32, properties: Vec<(PropertyKey, Value)>) {
        self.items_visited += 1;
        self.max_depth = self.max_depth.max(depth);
        self.properties_seen += properties.len() as u64;
        self.index.ingest_item(item, properties);
    }

    /// Stamp the final outcome. Has no effect on a finished snapshot.
    pub fn finish(&mut self, outcome: ScanOutcome) {
        if self.outcome.is_terminal() {
            return;
        }
        self.outcome = outcome;
        self.finished_at = Some(Utc::now());
    }

    /// Check if the scan has ended.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_terminal()
    }

    /// Failure reason, if the scan failed.
    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            ScanOutcome::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Wall-clock duration of a finished scan.
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at
            .and_then(|end| (end - self.started_at).to_std().ok())
    }

    /// Distinct values for a key, sorted.
    pub fn values(&self, key: &PropertyKey) -> Vec<&Value> {
        self.index.values(key).collect()
    }

    /// Items carrying `value` under `key`, in traversal order.
    pub fn items(&self, key: &PropertyKey, value: &Value) -> Vec<ItemId> {
        self.index
            .items(key, value)
            .map(|items| items.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Index summary statistics.
    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }
}
