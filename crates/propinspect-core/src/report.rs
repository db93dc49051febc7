//! Serializable view of a scan snapshot.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::config::ScanScope;
use crate::index::IndexStats;
use crate::node::ItemId;
use crate::snapshot::{ScanOutcome, ScanSnapshot};
use crate::value::Value;

/// One distinct value and the items carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueReport {
    pub value: Value,
    pub items: Vec<ItemId>,
}

/// One property name with its distinct values, sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyReport {
    pub name: CompactString,
    pub values: Vec<ValueReport>,
}

/// One category with its properties, sorted by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub name: CompactString,
    pub properties: Vec<PropertyReport>,
}

/// Nested category → property → value → items view of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    pub scope: ScanScope,
    pub outcome: ScanOutcome,
    pub items_visited: u64,
    pub properties_seen: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats: IndexStats,
    pub categories: Vec<CategoryReport>,
}

impl IndexReport {
    /// Build a report from a snapshot.
    pub fn from_snapshot(snapshot: &ScanSnapshot) -> Self {
        let mut categories: Vec<CategoryReport> = Vec::new();

        // Keys iterate sorted by category first, so each category is contiguous.
        for (key, buckets) in snapshot.index.iter() {
            let property = PropertyReport {
                name: key.name.clone(),
                values: buckets
                    .iter()
                    .map(|(value, items)| ValueReport {
                        value: value.clone(),
                        items: items.iter().copied().collect(),
                    })
                    .collect(),
            };

            match categories.last_mut() {
                Some(category) if category.name == key.category => {
                    category.properties.push(property);
                }
                _ => categories.push(CategoryReport {
                    name: key.category.clone(),
                    properties: vec![property],
                }),
            }
        }

        Self {
            scope: snapshot.scope,
            outcome: snapshot.outcome.clone(),
            items_visited: snapshot.items_visited,
            properties_seen: snapshot.properties_seen,
            started_at: snapshot.started_at,
            finished_at: snapshot.finished_at,
            stats: snapshot.stats(),
            categories,
        }
    }
}
