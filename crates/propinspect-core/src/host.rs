//! Read-only capabilities the scanner needs from a host model.
//!
//! The host owns its scene graph. These traits expose just enough of it to
//! walk items and read their properties, in the host's own order.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::node::ItemId;
use crate::value::RawValue;

/// A named property as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProperty {
    /// Property name within its category.
    pub name: CompactString,
    /// Raw value and type tag.
    pub value: RawValue,
}

impl RawProperty {
    /// Create a new raw property.
    pub fn new(name: impl Into<CompactString>, value: RawValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A property category as supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCategory {
    /// Category display name.
    pub name: CompactString,
    /// Properties in host order.
    #[serde(default)]
    pub properties: Vec<RawProperty>,
}

impl RawCategory {
    /// Create an empty category.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }
}

/// Access to an item's children.
pub trait ChildSource {
    /// Children of `item` in host-native order.
    fn children(&self, item: ItemId) -> Result<Vec<ItemId>, HostError>;
}

/// Access to an item's property categories.
pub trait PropertySource {
    /// Property categories of `item` in host order.
    fn categories(&self, item: ItemId) -> Result<Vec<RawCategory>, HostError>;
}

/// A complete host model: an item tree plus the current selection.
pub trait ModelHost: ChildSource + PropertySource {
    /// Top-level items of every loaded model.
    fn root_items(&self) -> Result<Vec<ItemId>, HostError>;

    /// Currently selected items, in selection order.
    fn selected_items(&self) -> Result<Vec<ItemId>, HostError>;
}
