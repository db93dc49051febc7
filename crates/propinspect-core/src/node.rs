//! Model item handles and property keys.

use std::fmt;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Opaque handle to a model item owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Create a new ItemId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Grouping unit for aggregation: a property name within a category.
///
/// Ordering is case-sensitive and lexical on `(category, name)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyKey {
    /// Category the property belongs to (e.g. "Geometry").
    pub category: CompactString,
    /// Property name within the category (e.g. "Material").
    pub name: CompactString,
}

impl PropertyKey {
    /// Create a new property key.
    pub fn new(category: impl Into<CompactString>, name: impl Into<CompactString>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.name)
    }
}
