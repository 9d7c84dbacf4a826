//! Selection flattening
//!
//! Selecting a node selects its whole subtree. The flattened selection is the
//! list of records an import has to create and apply, parents first.

use crate::snapshot::{container_path, join_path, ParentRecord, SnapshotDocument, SnapshotNode};

/// One selected record with its resolved location
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry<'a> {
    pub name: String,
    pub full_path: String,
    /// Container path; inherited from the nearest ancestor when the record has none
    pub path: String,
    pub root: String,
    pub parent: Option<ParentRecord>,
    /// The record as stored in the document, nested records included
    pub node: &'a SnapshotNode,
}

/// Selected records in parent-before-child order.
///
/// Names are only unique among siblings, so two entries may share a name;
/// they are told apart by `full_path`. Entries borrow from the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatSelection<'a> {
    entries: Vec<FlatEntry<'a>>,
}

impl<'a> FlatSelection<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FlatEntry<'a>] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FlatEntry<'a>> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// First entry with the given name
    pub fn get(&self, name: &str) -> Option<&'a SnapshotNode> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.node)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn by_path(&self, full_path: &str) -> Option<&FlatEntry<'a>> {
        self.entries.iter().find(|entry| entry.full_path == full_path)
    }
}

impl<'s, 'a> IntoIterator for &'s FlatSelection<'a> {
    type Item = &'s FlatEntry<'a>;
    type IntoIter = std::slice::Iter<'s, FlatEntry<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Whether a selector picks an entry: names match the node name, selectors
/// starting with `/` match the full path
fn matches_selector(selector: &str, name: &str, full_path: &str) -> bool {
    if selector.starts_with('/') {
        selector.trim_end_matches('/') == full_path
    } else {
        selector == name
    }
}

struct Location {
    path: String,
    root: String,
    parent: Option<ParentRecord>,
}

impl Location {
    fn recorded(node: &SnapshotNode) -> Self {
        Self {
            path: node.path.clone(),
            root: node.root.clone(),
            parent: node.parent.clone(),
        }
    }
}

struct Visit<'a> {
    name: &'a str,
    node: &'a SnapshotNode,
    location: Location,
    full_path: String,
    in_selected_subtree: bool,
}

/// Fill in location fields a nested record did not carry
fn inherit_location(node: &SnapshotNode, parent: &Visit) -> Location {
    let mut location = Location::recorded(node);
    if location.path.is_empty() {
        location.path = container_path(&parent.full_path);
    }
    if location.root.is_empty() {
        location.root = parent.location.root.clone();
    }
    if location.parent.is_none() {
        location.parent = Some(ParentRecord {
            name: parent.name.to_string(),
            type_name: parent.node.type_name.clone(),
        });
    }
    location
}

/// Collect every selected record and all of its descendants.
///
/// Walks the document depth-first with an explicit stack. A record selected
/// both directly and through an ancestor appears once.
pub fn flatten_selection<'a, I, S>(selectors: I, document: &'a SnapshotDocument) -> FlatSelection<'a>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let selectors: Vec<S> = selectors.into_iter().collect();
    let is_selected = |name: &str, full_path: &str| {
        selectors
            .iter()
            .any(|selector| matches_selector(selector.as_ref(), name, full_path))
    };

    let mut entries = Vec::new();
    let mut stack: Vec<Visit> = Vec::new();

    for (name, node) in document.nodes.iter().rev() {
        let full_path = node.full_path(name).unwrap_or_else(|| name.to_string());
        stack.push(Visit {
            name,
            node,
            location: Location::recorded(node),
            full_path,
            in_selected_subtree: false,
        });
    }

    while let Some(visit) = stack.pop() {
        let selected = visit.in_selected_subtree || is_selected(visit.name, &visit.full_path);

        for (child_name, child) in visit.node.nested().rev() {
            let location = inherit_location(child, &visit);
            let full_path = join_path(&location.path, child_name);
            stack.push(Visit {
                name: child_name,
                node: child,
                location,
                full_path,
                in_selected_subtree: selected,
            });
        }

        if selected {
            entries.push(FlatEntry {
                name: visit.name.to_string(),
                full_path: visit.full_path,
                path: visit.location.path,
                root: visit.location.root,
                parent: visit.location.parent,
                node: visit.node,
            });
        }
    }

    FlatSelection { entries }
}
