//! Depth-first traversal of a host item tree.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use propinspect_core::{
    CategoryFilter, HostError, ItemId, ModelHost, PropertyKey, ScanConfig, ScanError, ScanScope,
    Value,
};

/// One visited item with all of its indexed properties.
#[derive(Debug, Clone)]
pub struct VisitedItem {
    /// The item.
    pub item: ItemId,
    /// Distance from the scope root (roots are depth 0).
    pub depth: u32,
    /// `(key, value)` pairs in host category and property order.
    pub properties: Vec<(PropertyKey, Value)>,
}

/// Pre-order walker over the items of a scan scope.
///
/// Yields each reachable item once, parents before children and siblings in
/// host order. The walk uses a heap-allocated stack, so tree depth is bounded
/// only by memory. Each item is read from the host in one step: if the host
/// fails on an item, nothing from that item is yielded and the walk ends.
///
/// The cancellation token is polled between items. Once it fires, or the
/// host fails, or the tree is exhausted, the walker is finished for good.
pub struct ItemWalker<'h, H: ?Sized> {
    host: &'h H,
    filter: CategoryFilter,
    max_depth: Option<u32>,
    cancel: CancellationToken,
    stack: Vec<(ItemId, u32)>,
    visited: HashSet<ItemId>,
    items_visited: u64,
    cancelled: bool,
    finished: bool,
}

impl<'h, H: ModelHost + ?Sized> ItemWalker<'h, H> {
    /// Create a walker over `config.scope`, reading the root set from the host.
    pub fn new(
        host: &'h H,
        config: &ScanConfig,
        cancel: CancellationToken,
    ) -> Result<Self, ScanError> {
        let filter = config.category_filter()?;
        let roots = match config.scope {
            ScanScope::Full => host.root_items()?,
            ScanScope::Selection => host.selected_items()?,
        };

        Ok(Self {
            host,
            filter,
            max_depth: config.max_depth,
            cancel,
            stack: roots.into_iter().rev().map(|item| (item, 0)).collect(),
            visited: HashSet::new(),
            items_visited: 0,
            cancelled: false,
            finished: false,
        })
    }

    /// Number of items yielded so far.
    pub fn items_visited(&self) -> u64 {
        self.items_visited
    }

    /// Check if the walk stopped because of cancellation.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    fn visit(&mut self, item: ItemId, depth: u32) -> Result<VisitedItem, HostError> {
        let categories = self.host.categories(item)?;
        let descend = self.max_depth.is_none_or(|max| depth < max);
        let children = if descend {
            self.host.children(item)?
        } else {
            Vec::new()
        };

        let mut properties = Vec::new();
        for category in categories {
            if !self.filter.matches(&category.name) {
                continue;
            }
            for property in category.properties {
                let key = PropertyKey::new(category.name.clone(), property.name);
                properties.push((key, Value::classify(&property.value)));
            }
        }

        self.stack
            .extend(children.into_iter().rev().map(|child| (child, depth + 1)));

        Ok(VisitedItem {
            item,
            depth,
            properties,
        })
    }
}

impl<H: ModelHost + ?Sized> Iterator for ItemWalker<'_, H> {
    type Item = Result<VisitedItem, HostError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self.cancel.is_cancelled() {
                self.cancelled = true;
                self.finished = true;
                return None;
            }

            let Some((item, depth)) = self.stack.pop() else {
                self.finished = true;
                return None;
            };

            // Overlapping selections and instanced subtrees reach items twice.
            if !self.visited.insert(item) {
                continue;
            }

            return match self.visit(item, depth) {
                Ok(visited) => {
                    self.items_visited += 1;
                    Some(Ok(visited))
                }
                Err(err) => {
                    self.finished = true;
                    Some(Err(err))
                }
            };
        }
    }
}
