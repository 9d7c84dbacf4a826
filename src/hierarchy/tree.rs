//! Hierarchy tree built from a snapshot document
//!
//! The tree is the display projection of a snapshot: one item per recorded
//! node, siblings in document order. Building and flattening use explicit
//! stacks so arbitrarily deep snapshots cannot exhaust the call stack.

use crate::snapshot::{join_path, LabelMap, ParamMap, SnapshotDocument, SnapshotNode};

/// One node in the hierarchy projection
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyItem {
    pub name: String,
    pub type_name: String,
    /// Recorded container path + name, or the parent item's path + name
    pub full_path: String,
    /// 0 for top-level items
    pub depth: usize,
    pub parameters: ParamMap,
    pub parameter_labels: LabelMap,
    pub children: Vec<HierarchyItem>,
}

impl HierarchyItem {
    fn from_record(name: &str, node: &SnapshotNode, parent_path: Option<&str>, depth: usize) -> Self {
        let full_path = node
            .full_path(name)
            .or_else(|| parent_path.map(|parent| join_path(parent, name)))
            .unwrap_or_else(|| name.to_string());

        Self {
            name: name.to_string(),
            type_name: node.type_name.clone(),
            full_path,
            depth,
            parameters: node.parameters.clone(),
            parameter_labels: node.parameter_labels.clone(),
            children: Vec::new(),
        }
    }

    /// Label used in tree views: `name (type)`
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.type_name)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl Drop for HierarchyItem {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut item) = pending.pop() {
            pending.append(&mut item.children);
        }
    }
}

struct Slot {
    item: HierarchyItem,
    parent: Option<usize>,
}

/// Build the hierarchy for a document, top-level items in document order.
///
/// Both nesting keys (`children` and `grandchild`) are expanded at every level,
/// `children` entries first.
pub fn build_hierarchy(document: &SnapshotDocument) -> Vec<HierarchyItem> {
    // Every item lives in an arena; a child's slot index is always greater
    // than its parent's, which lets the tree be assembled back to front.
    let mut slots: Vec<Slot> = Vec::new();
    let mut pending: Vec<(usize, &SnapshotNode)> = Vec::new();

    for (name, node) in document.nodes.iter() {
        pending.push((slots.len(), node));
        slots.push(Slot {
            item: HierarchyItem::from_record(name, node, None, 0),
            parent: None,
        });
    }

    while let Some((index, node)) = pending.pop() {
        let parent_path = slots[index].item.full_path.clone();
        let depth = slots[index].item.depth + 1;

        for (name, child) in node.nested() {
            pending.push((slots.len(), child));
            slots.push(Slot {
                item: HierarchyItem::from_record(name, child, Some(&parent_path), depth),
                parent: Some(index),
            });
        }
    }

    let mut roots = Vec::new();
    while let Some(slot) = slots.pop() {
        let mut item = slot.item;
        // children were attached last-first
        item.children.reverse();
        match slot.parent {
            Some(parent) => slots[parent].item.children.push(item),
            None => roots.push(item),
        }
    }
    roots.reverse();
    roots
}

/// Every item of a hierarchy in depth-first order, parents before children
pub fn flatten_hierarchy(items: &[HierarchyItem]) -> Vec<&HierarchyItem> {
    let mut flat = Vec::new();
    let mut stack: Vec<&HierarchyItem> = items.iter().rev().collect();

    while let Some(item) = stack.pop() {
        flat.push(item);
        stack.extend(item.children.iter().rev());
    }
    flat
}

/// Find an item by full path
pub fn find_item<'a>(items: &'a [HierarchyItem], full_path: &str) -> Option<&'a HierarchyItem> {
    flatten_hierarchy(items)
        .into_iter()
        .find(|item| item.full_path == full_path)
}
