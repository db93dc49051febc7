//! In-memory host model.
//!
//! Stands in for a live host document: tests build trees programmatically,
//! and the command-line tool loads them from a JSON [`ModelDocument`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::{HostError, ScanError};
use crate::host::{ChildSource, ModelHost, PropertySource, RawCategory, RawProperty};
use crate::node::ItemId;
use crate::value::RawValue;

/// Serialized form of a model tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDocument {
    /// Top-level items.
    #[serde(default)]
    pub items: Vec<DocumentItem>,
}

/// One item of a [`ModelDocument`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentItem {
    /// Display name.
    pub name: CompactString,
    /// Whether the item is part of the current selection.
    #[serde(default)]
    pub selected: bool,
    /// Property categories in host order.
    #[serde(default)]
    pub categories: Vec<RawCategory>,
    /// Child items in host order.
    #[serde(default)]
    pub children: Vec<DocumentItem>,
}

#[derive(Debug)]
struct MemoryItem {
    name: CompactString,
    categories: Vec<RawCategory>,
    children: Vec<ItemId>,
}

/// A host model held entirely in memory.
///
/// Item ids are dense and assigned in creation order. The model can simulate
/// a document being closed, either immediately via [`MemoryModel::dispose`]
/// or after a fixed number of property reads via [`MemoryModel::fail_after`].
#[derive(Debug, Default)]
pub struct MemoryModel {
    items: Vec<MemoryItem>,
    roots: Vec<ItemId>,
    selection: Vec<ItemId>,
    disposed: AtomicBool,
    fail_after: Option<u64>,
    property_reads: AtomicU64,
}

impl MemoryModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from a document. Ids follow document pre-order.
    pub fn from_document(document: &ModelDocument) -> Self {
        let mut model = Self::new();
        let mut stack: Vec<(Option<ItemId>, &DocumentItem)> =
            document.items.iter().rev().map(|item| (None, item)).collect();

        while let Some((parent, doc_item)) = stack.pop() {
            let id = model.push_item(doc_item.name.clone());
            model.items[id.0 as usize].categories = doc_item.categories.clone();
            match parent {
                Some(parent) => model.items[parent.0 as usize].children.push(id),
                None => model.roots.push(id),
            }
            if doc_item.selected {
                model.selection.push(id);
            }
            stack.extend(doc_item.children.iter().rev().map(|child| (Some(id), child)));
        }

        model
    }

    /// Parse a model from a JSON document string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let document: ModelDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(&document))
    }

    /// Load a model from a JSON document on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ScanError::document(path, e))?;
        Self::from_json(&json).map_err(|e| ScanError::document(path, e))
    }

    /// Add a top-level item.
    pub fn add_root(&mut self, name: impl Into<CompactString>) -> ItemId {
        let id = self.push_item(name.into());
        self.roots.push(id);
        id
    }

    /// Add a child item under `parent`.
    pub fn add_child(
        &mut self,
        parent: ItemId,
        name: impl Into<CompactString>,
    ) -> Result<ItemId, HostError> {
        self.item(parent)?;
        let id = self.push_item(name.into());
        self.items[parent.0 as usize].children.push(id);
        Ok(id)
    }

    /// Attach an existing item as an additional child of `parent`.
    ///
    /// This allows shared subtrees and cycles, which a real host may expose
    /// through instancing.
    pub fn link_child(&mut self, parent: ItemId, child: ItemId) -> Result<(), HostError> {
        self.item(child)?;
        self.item_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Append a property to `item`, creating the category if needed.
    pub fn add_property(
        &mut self,
        item: ItemId,
        category: &str,
        name: impl Into<CompactString>,
        value: RawValue,
    ) -> Result<(), HostError> {
        let categories = &mut self.item_mut(item)?.categories;
        let index = match categories.iter().position(|c| c.name == category) {
            Some(index) => index,
            None => {
                categories.push(RawCategory::new(category));
                categories.len() - 1
            }
        };
        categories[index].properties.push(RawProperty::new(name, value));
        Ok(())
    }

    /// Add `item` to the current selection.
    pub fn select(&mut self, item: ItemId) -> Result<(), HostError> {
        self.item(item)?;
        self.selection.push(item);
        Ok(())
    }

    /// Clear the current selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Display name of an item.
    pub fn name(&self, item: ItemId) -> Option<&str> {
        self.item(item).ok().map(|i| i.name.as_str())
    }

    /// Number of items in the model.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the model has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mark the document as disposed; every later read fails.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    /// Dispose the document after `reads` successful property reads.
    pub fn fail_after(&mut self, reads: u64) {
        self.fail_after = Some(reads);
    }

    /// Number of property reads served so far.
    pub fn property_reads(&self) -> u64 {
        self.property_reads.load(Ordering::SeqCst)
    }

    fn push_item(&mut self, name: CompactString) -> ItemId {
        let id = ItemId::new(self.items.len() as u64);
        self.items.push(MemoryItem {
            name,
            categories: Vec::new(),
            children: Vec::new(),
        });
        id
    }

    fn item(&self, item: ItemId) -> Result<&MemoryItem, HostError> {
        usize::try_from(item.0)
            .ok()
            .and_then(|index| self.items.get(index))
            .ok_or(HostError::ItemUnavailable { item })
    }

    fn item_mut(&mut self, item: ItemId) -> Result<&mut MemoryItem, HostError> {
        usize::try_from(item.0)
            .ok()
            .and_then(|index| self.items.get_mut(index))
            .ok_or(HostError::ItemUnavailable { item })
    }

    fn check_open(&self) -> Result<(), HostError> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(HostError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl ChildSource for MemoryModel {
    fn children(&self, item: ItemId) -> Result<Vec<ItemId>, HostError> {
        self.check_open()?;
        Ok(self.item(item)?.children.clone())
    }
}

impl PropertySource for MemoryModel {
    fn categories(&self, item: ItemId) -> Result<Vec<RawCategory>, HostError> {
        self.check_open()?;
        let served = self.property_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| served >= limit) {
            self.dispose();
            return Err(HostError::Disposed);
        }
        Ok(self.item(item)?.categories.clone())
    }
}

impl ModelHost for MemoryModel {
    fn root_items(&self) -> Result<Vec<ItemId>, HostError> {
        self.check_open()?;
        Ok(self.roots.clone())
    }

    fn selected_items(&self) -> Result<Vec<ItemId>, HostError> {
        self.check_open()?;
        Ok(self.selection.clone())
    }
}
