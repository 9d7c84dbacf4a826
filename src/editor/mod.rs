//! Snapshot parameter editor
//!
//! Holds three views of the loaded nodes: the canonical copy as read from
//! disk, a working copy that edits land in, and the parameter table for the
//! selected node. Edits never touch the canonical copy, so a node can always
//! be reset to what was loaded.

pub mod file_manager;

pub use file_manager::FileManager;

use crate::constants::editor::COMPONENT_SUFFIXES;
use crate::snapshot::{join_path, NodeMap, ParamValue, SnapshotDocument, SnapshotNode};
use log::debug;

/// Editor mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// Table is read-only and follows the selection
    Viewing,
    /// The selected node's table is writable
    Editing,
}

/// One line of the parameter table
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRow {
    pub key: String,
    pub label: String,
    pub text: String,
    pub editable: bool,
}

/// Where a record sits in a nested node map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nest {
    Top,
    Children,
    Grandchildren,
}

type Route = Vec<(Nest, String)>;

/// Find the chain of keys leading to the record shown at `full_path`.
///
/// Full paths are computed the way the hierarchy tree computes them.
fn find_route(nodes: &NodeMap, full_path: &str) -> Option<Route> {
    let mut stack: Vec<(Route, String, &SnapshotNode)> = nodes
        .iter()
        .rev()
        .map(|(name, node)| {
            let path = node.full_path(name).unwrap_or_else(|| name.to_string());
            (vec![(Nest::Top, name.to_string())], path, node)
        })
        .collect();

    while let Some((route, path, node)) = stack.pop() {
        if path == full_path {
            return Some(route);
        }
        let nested = node
            .children
            .iter()
            .map(|entry| (Nest::Children, entry))
            .chain(node.grandchildren.iter().map(|entry| (Nest::Grandchildren, entry)));
        let mut next = Vec::new();
        for (nest, (name, child)) in nested {
            let child_path = child.full_path(name).unwrap_or_else(|| join_path(&path, name));
            let mut child_route = route.clone();
            child_route.push((nest, name.to_string()));
            next.push((child_route, child_path, child));
        }
        stack.extend(next.into_iter().rev());
    }
    None
}

fn walk<'a>(nodes: &'a NodeMap, route: &Route) -> Option<&'a SnapshotNode> {
    let ((_, first), rest) = route.split_first()?;
    let mut node = nodes.get(first)?;
    for (nest, name) in rest {
        node = match nest {
            Nest::Grandchildren => node.grandchildren.get(name)?,
            _ => node.children.get(name)?,
        };
    }
    Some(node)
}

fn walk_mut<'a>(nodes: &'a mut NodeMap, route: &Route) -> Option<&'a mut SnapshotNode> {
    let ((_, first), rest) = route.split_first()?;
    let mut node = nodes.get_mut(first)?;
    for (nest, name) in rest {
        node = match nest {
            Nest::Grandchildren => node.grandchildren.get_mut(name)?,
            _ => node.children.get_mut(name)?,
        };
    }
    Some(node)
}

/// Table label for a parameter.
///
/// Vector parameters often carry no label of their own; their components do
/// (`t1`, `t2`... or `tx`, `ty`...), so the first component label stands in.
fn parameter_label(node: &SnapshotNode, key: &str, value: &ParamValue) -> String {
    if let Some(label) = node.parameter_labels.get(key) {
        return label.clone();
    }

    if value.is_numeric_sequence() {
        let len = value.sequence_len().unwrap_or(0);
        let numbered = (1..=len).map(|index| format!("{}{}", key, index));
        let lettered = COMPONENT_SUFFIXES.iter().map(|suffix| format!("{}{}", key, suffix));
        if let Some(label) = numbered
            .chain(lettered)
            .find_map(|candidate| node.parameter_labels.get(&candidate))
        {
            return label.clone();
        }
    }
    key.to_string()
}

/// Interactive editing of snapshot parameters
#[derive(Debug, Clone)]
pub struct SnapshotEditor {
    canonical: NodeMap,
    working: NodeMap,
    selected: Option<String>,
    rows: Vec<ParameterRow>,
    state: EditorState,
}

impl SnapshotEditor {
    /// Start editing a loaded document; the working copy is a deep copy
    pub fn new(document: &SnapshotDocument) -> Self {
        Self {
            canonical: document.nodes.clone(),
            working: document.nodes.clone(),
            selected: None,
            rows: Vec::new(),
            state: EditorState::Viewing,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Full path of the selected node
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn rows(&self) -> &[ParameterRow] {
        &self.rows
    }

    pub fn canonical(&self) -> &NodeMap {
        &self.canonical
    }

    pub fn working(&self) -> &NodeMap {
        &self.working
    }

    /// Whether any saved edit differs from the loaded data
    pub fn is_dirty(&self) -> bool {
        self.working != self.canonical
    }

    /// The working copy as a document, ready to be applied
    pub fn working_document(&self) -> SnapshotDocument {
        SnapshotDocument::new(self.working.clone())
    }

    /// The record at `full_path` in the working copy
    pub fn working_node(&self, full_path: &str) -> Option<&SnapshotNode> {
        find_route(&self.working, full_path).and_then(|route| walk(&self.working, &route))
    }

    fn project(&mut self) {
        let editable = self.state == EditorState::Editing;
        self.rows = self
            .selected
            .as_deref()
            .and_then(|path| self.working_node(path))
            .map(|node| {
                node.parameters
                    .iter()
                    .map(|(key, value)| ParameterRow {
                        key: key.to_string(),
                        label: parameter_label(node, key, value),
                        text: value.display_text(),
                        editable,
                    })
                    .collect()
            })
            .unwrap_or_default();
    }

    /// Select a node by full path.
    ///
    /// While editing, `confirm` is asked whether the pending edits may be
    /// discarded. Declining keeps the current selection and the edits, and
    /// `false` is returned. Unknown paths are rejected the same way.
    pub fn select(&mut self, full_path: &str, confirm: impl FnOnce() -> bool) -> bool {
        if self.selected.as_deref() == Some(full_path) {
            return true;
        }
        if find_route(&self.working, full_path).is_none() {
            return false;
        }
        if self.state == EditorState::Editing {
            if !confirm() {
                debug!("Selection change to {} declined", full_path);
                return false;
            }
            self.state = EditorState::Viewing;
        }

        self.selected = Some(full_path.to_string());
        self.project();
        true
    }

    /// Make the selected node's table writable
    pub fn begin_edit(&mut self) -> bool {
        if self.selected.is_none() {
            return false;
        }
        self.state = EditorState::Editing;
        for row in &mut self.rows {
            row.editable = true;
        }
        true
    }

    /// Change one cell's text. Only possible while editing.
    pub fn set_cell(&mut self, key: &str, text: &str) -> bool {
        if self.state != EditorState::Editing {
            return false;
        }
        match self.rows.iter_mut().find(|row| row.key == key) {
            Some(row) => {
                row.text = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Write changed cells into the working copy, coerced to each parameter's
    /// original kind, and return to viewing. Returns the number of parameters written.
    pub fn save(&mut self) -> usize {
        if self.state != EditorState::Editing {
            return 0;
        }
        let Some(route) = self
            .selected
            .as_deref()
            .and_then(|path| find_route(&self.working, path))
        else {
            return 0;
        };

        let mut written = 0;
        if let Some(node) = walk_mut(&mut self.working, &route) {
            for row in &self.rows {
                let Some(original) = node.parameters.get(&row.key) else {
                    continue;
                };
                if original.display_text() == row.text {
                    continue;
                }
                let coerced = original.coerce_text(&row.text);
                if coerced.kind() != original.kind() {
                    debug!("{} kept as text: {:?}", row.key, row.text);
                }
                node.parameters.insert(row.key.clone(), coerced);
                written += 1;
            }
        }

        self.state = EditorState::Viewing;
        self.project();
        written
    }

    /// Drop unsaved cell edits and return to viewing
    pub fn cancel(&mut self) {
        self.state = EditorState::Viewing;
        self.project();
    }

    /// Restore the selected node, nested records included, from the
    /// canonical copy. Pending cell edits are dropped; the mode is unchanged.
    pub fn reset(&mut self) -> bool {
        let Some(path) = self.selected.clone() else {
            return false;
        };
        let original = find_route(&self.canonical, &path)
            .and_then(|route| walk(&self.canonical, &route).map(|node| (route, node.clone())));

        // Nodes loaded with the canonical copy share its routes
        let restored = match original {
            Some((route, node)) => match walk_mut(&mut self.working, &route) {
                Some(slot) => {
                    *slot = node;
                    true
                }
                None => false,
            },
            None => false,
        };

        self.project();
        restored
    }

    /// Deselect and return to viewing, dropping unsaved cell edits
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.state = EditorState::Viewing;
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> SnapshotDocument {
        SnapshotDocument::from_json_str(
            r#"{
                "nodes": {
                    "geo1": {
                        "type": "geo", "path": "/obj/",
                        "parameters": {"t": [1.0, 2.0, 3.0], "display": true, "copies": 4,
                                       "scale": 1.5, "label": "hero", "r": [0.0, 90.0, 0.0]},
                        "parameterLabels": {"tx": "Translate", "display": "Display", "r1": "Rotate"},
                        "children": {
                            "box1": {"type": "box", "path": "/obj/geo1/", "parameters": {"size": 2.0}}
                        }
                    },
                    "cam1": {"type": "cam", "path": "/obj/", "parameters": {"focal": 50.0}}
                }
            }"#,
        )
        .unwrap()
    }

    fn row<'a>(editor: &'a SnapshotEditor, key: &str) -> &'a ParameterRow {
        editor.rows().iter().find(|row| row.key == key).unwrap()
    }

    fn editing(path: &str) -> SnapshotEditor {
        let mut editor = SnapshotEditor::new(&document());
        assert!(editor.select(path, || true));
        assert!(editor.begin_edit());
        editor
    }

    #[test]
    fn test_projection_labels() {
        let mut editor = SnapshotEditor::new(&document());
        editor.select("/obj/geo1", || true);

        assert_eq!(row(&editor, "display").label, "Display");
        // numbered component before lettered
        assert_eq!(row(&editor, "r").label, "Rotate");
        assert_eq!(row(&editor, "t").label, "Translate");
        assert_eq!(row(&editor, "scale").label, "scale");
        assert_eq!(row(&editor, "t").text, "[1.0, 2.0, 3.0]");
        assert_eq!(row(&editor, "display").text, "True");
        assert!(editor.rows().iter().all(|row| !row.editable));
    }

    #[test]
    fn test_save_coerces_to_original_kind() {
        let mut editor = editing("/obj/geo1");
        editor.set_cell("t", "[4, 5, 6]");
        editor.set_cell("display", "Yes");
        editor.set_cell("copies", "7");
        editor.set_cell("scale", "not a number");
        assert_eq!(editor.save(), 4);

        let node = editor.working_node("/obj/geo1").unwrap();
        assert_eq!(
            node.parameters.get("t"),
            Some(&ParamValue::FloatSequence(vec![4.0, 5.0, 6.0]))
        );
        assert_eq!(node.parameters.get("display"), Some(&ParamValue::Bool(true)));
        assert_eq!(node.parameters.get("copies"), Some(&ParamValue::Int(7)));
        assert_eq!(
            node.parameters.get("scale"),
            Some(&ParamValue::Text("not a number".to_string()))
        );
        assert_eq!(editor.state(), EditorState::Viewing);
    }

    #[test]
    fn test_canonical_never_mutated() {
        let mut editor = editing("/obj/geo1/box1");
        editor.set_cell("size", "9.0");
        editor.save();

        assert!(editor.is_dirty());
        let canonical = editor.canonical().get("geo1").unwrap().children.get("box1").unwrap();
        assert_eq!(canonical.parameters.get("size"), Some(&ParamValue::Float(2.0)));
        let working = editor.working_node("/obj/geo1/box1").unwrap();
        assert_eq!(working.parameters.get("size"), Some(&ParamValue::Float(9.0)));
    }

    #[test]
    fn test_declined_selection_keeps_edit() {
        let mut editor = editing("/obj/geo1");
        editor.set_cell("copies", "12");

        assert!(!editor.select("/obj/cam1", || false));
        assert_eq!(editor.selected(), Some("/obj/geo1"));
        assert_eq!(editor.state(), EditorState::Editing);
        assert_eq!(row(&editor, "copies").text, "12");

        assert!(editor.select("/obj/cam1", || true));
        assert_eq!(editor.state(), EditorState::Viewing);
        assert_eq!(row(&editor, "focal").text, "50.0");
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_confirm_only_asked_while_editing() {
        let mut editor = SnapshotEditor::new(&document());
        assert!(editor.select("/obj/geo1", || panic!("not editing")));
        assert!(editor.select("/obj/cam1", || panic!("not editing")));
        assert!(!editor.select("/obj/missing", || true));
        assert_eq!(editor.selected(), Some("/obj/cam1"));
    }

    #[test]
    fn test_cancel_discards_cells() {
        let mut editor = editing("/obj/cam1");
        editor.set_cell("focal", "35");
        editor.cancel();

        assert_eq!(editor.state(), EditorState::Viewing);
        assert_eq!(row(&editor, "focal").text, "50.0");
        assert!(!editor.set_cell("focal", "35"));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_reset_restores_from_canonical() {
        let mut editor = editing("/obj/geo1");
        editor.set_cell("label", "villain");
        editor.save();
        assert!(editor.is_dirty());

        editor.begin_edit();
        editor.set_cell("copies", "1");
        assert!(editor.reset());

        assert_eq!(editor.state(), EditorState::Editing);
        assert_eq!(row(&editor, "label").text, "hero");
        assert_eq!(row(&editor, "copies").text, "4");
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_clear_selection() {
        let mut editor = editing("/obj/geo1");
        editor.clear_selection();
        assert!(editor.selected().is_none());
        assert!(editor.rows().is_empty());
        assert!(!editor.begin_edit());
        assert_eq!(editor.save(), 0);
    }
}
