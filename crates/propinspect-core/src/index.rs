//! Forward and reverse property indexes.
//!
//! Both indexes share one structure: `key -> value -> items`. The forward
//! view (distinct sorted values per key) is the key set of the inner map, and
//! the reverse view (items per key and value) is its value. A reverse entry
//! therefore always has its value present in the forward view.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::node::{ItemId, PropertyKey};
use crate::value::Value;

/// Items that produced one `(key, value)` pair, in first-observed order.
pub type ItemSet = IndexSet<ItemId>;

/// Distinct values observed for one key, sorted by [`Value`] order.
pub type ValueBuckets = BTreeMap<Value, ItemSet>;

/// Summary statistics for an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of distinct property keys.
    pub keys: usize,
    /// Number of distinct categories.
    pub categories: usize,
    /// Distinct values summed over all keys.
    pub distinct_values: usize,
    /// `(key, value, item)` triples stored.
    pub entries: usize,
}

/// Aggregated property index for one scan.
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    entries: BTreeMap<PropertyKey, ValueBuckets>,
    triples: usize,
}

impl PropertyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observed `(item, key, value)` triple into the index.
    ///
    /// Idempotent: ingesting the same triple twice leaves the index unchanged.
    /// Returns `true` if the triple was new.
    pub fn ingest(&mut self, item: ItemId, key: PropertyKey, value: Value) -> bool {
        let inserted = self
            .entries
            .entry(key)
            .or_default()
            .entry(value)
            .or_default()
            .insert(item);
        if inserted {
            self.triples += 1;
        }
        inserted
    }

    /// Fold all properties of one item. Returns the number of new triples.
    pub fn ingest_item<I>(&mut self, item: ItemId, properties: I) -> usize
    where
        I: IntoIterator<Item = (PropertyKey, Value)>,
    {
        let mut added = 0;
        for (key, value) in properties {
            if self.ingest(item, key, value) {
                added += 1;
            }
        }
        added
    }

    /// Check whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct property keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// All property keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.entries.keys()
    }

    /// Distinct category names in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        let mut last: Option<&str> = None;
        self.entries.keys().filter_map(move |key| {
            let category = key.category.as_str();
            if last == Some(category) {
                None
            } else {
                last = Some(category);
                Some(category)
            }
        })
    }

    /// Property keys belonging to one category.
    pub fn properties_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a PropertyKey> {
        self.entries
            .keys()
            .skip_while(move |key| key.category.as_str() < category)
            .take_while(move |key| key.category.as_str() == category)
    }

    /// Distinct values for `key`, sorted. Empty if the key was never seen.
    pub fn values<'a>(&'a self, key: &PropertyKey) -> impl Iterator<Item = &'a Value> + use<'a> {
        self.entries.get(key).into_iter().flat_map(|buckets| buckets.keys())
    }

    /// Value buckets for `key`: each distinct value with the items carrying it.
    pub fn buckets(&self, key: &PropertyKey) -> Option<&ValueBuckets> {
        self.entries.get(key)
    }

    /// Items that carry `value` under `key`.
    pub fn items(&self, key: &PropertyKey, value: &Value) -> Option<&ItemSet> {
        self.entries.get(key).and_then(|buckets| buckets.get(value))
    }

    /// Check whether `value` was observed under `key`.
    pub fn contains(&self, key: &PropertyKey, value: &Value) -> bool {
        self.items(key, value).is_some()
    }

    /// Check whether the exact `(item, key, value)` triple was observed.
    pub fn contains_item(&self, key: &PropertyKey, value: &Value, item: ItemId) -> bool {
        self.items(key, value).is_some_and(|items| items.contains(&item))
    }

    /// Distinct values of a property name across every category.
    pub fn values_for_name(&self, name: &str) -> BTreeSet<&Value> {
        self.entries
            .iter()
            .filter(|(key, _)| key.name == name)
            .flat_map(|(_, buckets)| buckets.keys())
            .collect()
    }

    /// Iterate over every key with its value buckets.
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &ValueBuckets)> {
        self.entries.iter()
    }

    /// Compute summary statistics.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            keys: self.entries.len(),
            categories: self.categories().count(),
            distinct_values: self.entries.values().map(BTreeMap::len).sum(),
            entries: self.triples,
        }
    }
}
