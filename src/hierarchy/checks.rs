//! Checkbox state for the loader's tree view
//!
//! Top-level items and their direct children carry a checkbox; deeper items
//! are shown but follow their ancestor. Checking an item checks its subtree.

use super::tree::{flatten_hierarchy, HierarchyItem};
use crate::constants::tree::MAX_CHECKABLE_DEPTH;

#[derive(Debug, Clone)]
struct CheckItem {
    full_path: String,
    checkable: bool,
    checked: bool,
    /// Exclusive end of this item's subtree in the flat list
    subtree_end: usize,
}

/// Checked state of every item in a hierarchy, stored in tree order
#[derive(Debug, Clone, Default)]
pub struct CheckTree {
    items: Vec<CheckItem>,
}

impl CheckTree {
    pub fn from_hierarchy(hierarchy: &[HierarchyItem]) -> Self {
        let flat = flatten_hierarchy(hierarchy);
        let mut items: Vec<CheckItem> = flat
            .iter()
            .map(|item| CheckItem {
                full_path: item.full_path.clone(),
                checkable: item.depth <= MAX_CHECKABLE_DEPTH,
                checked: false,
                subtree_end: 0,
            })
            .collect();

        // In pre-order a subtree ends at the next item no deeper than its root
        for index in 0..flat.len() {
            let depth = flat[index].depth;
            let end = (index + 1..flat.len())
                .find(|&next| flat[next].depth <= depth)
                .unwrap_or(flat.len());
            items[index].subtree_end = end;
        }

        Self { items }
    }

    fn position(&self, full_path: &str) -> Option<usize> {
        self.items.iter().position(|item| item.full_path == full_path)
    }

    /// Check or uncheck an item and every checkable item below it.
    ///
    /// Returns `false` when the item does not exist or has no checkbox.
    pub fn set_checked(&mut self, full_path: &str, checked: bool) -> bool {
        let Some(index) = self.position(full_path) else {
            return false;
        };
        if !self.items[index].checkable {
            return false;
        }

        let end = self.items[index].subtree_end;
        for item in &mut self.items[index..end] {
            if item.checkable {
                item.checked = checked;
            }
        }
        true
    }

    /// The header "select all" box
    pub fn set_all(&mut self, checked: bool) {
        for item in self.items.iter_mut().filter(|item| item.checkable) {
            item.checked = checked;
        }
    }

    pub fn is_checked(&self, full_path: &str) -> bool {
        self.position(full_path)
            .map(|index| self.items[index].checked)
            .unwrap_or(false)
    }

    pub fn is_checkable(&self, full_path: &str) -> bool {
        self.position(full_path)
            .map(|index| self.items[index].checkable)
            .unwrap_or(false)
    }

    /// Full paths of checked items in tree order, ready for `flatten_selection`
    pub fn checked_paths(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.checked)
            .map(|item| item.full_path.clone())
            .collect()
    }
}
