//! Snapshot node records
//!
//! One record per exported node. Records nest: a node's `children` are full
//! records, and the host's bulk children dump for the level below lands in
//! `grandchild`.

use super::ordered_map::OrderedMap;
use super::value::ParamValue;
use super::with_stack;
use serde::{Deserialize, Serialize};

pub type ParamMap = OrderedMap<ParamValue>;
pub type LabelMap = OrderedMap<String>;
pub type NodeMap = OrderedMap<SnapshotNode>;

/// The four boolean node flags a snapshot records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Flag {
    Display,
    Render,
    Template,
    Bypass,
}

impl Flag {
    pub const ALL: [Flag; 4] = [Flag::Display, Flag::Render, Flag::Template, Flag::Bypass];

    pub fn name(&self) -> &'static str {
        match self {
            Flag::Display => "display",
            Flag::Render => "render",
            Flag::Template => "template",
            Flag::Bypass => "bypass",
        }
    }
}

/// Recorded flag states. Unknown keys in the file are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    pub display: bool,
    pub render: bool,
    pub template: bool,
    pub bypass: bool,
}

impl Flags {
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Display => self.display,
            Flag::Render => self.render,
            Flag::Template => self.template,
            Flag::Bypass => self.bypass,
        }
    }

    pub fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Display => self.display = value,
            Flag::Render => self.render = value,
            Flag::Template => self.template = value,
            Flag::Bypass => self.bypass = value,
        }
    }

    /// Flags recorded as `true`, in fixed order
    pub fn enabled(&self) -> impl Iterator<Item = Flag> + '_ {
        Flag::ALL.into_iter().filter(move |flag| self.get(*flag))
    }
}

/// Name and type of a node's immediate container, used to recreate it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRecord {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
}

/// One exported graph node.
///
/// Records nest to any depth. Cloning and comparing grow the stack as they
/// descend, and dropping walks the subtree with an explicit stack.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(from = "RawNode")]
pub struct SnapshotNode {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Container path with a trailing slash, e.g. `/obj/geo1/`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Top-level container the node was exported from, e.g. `/obj/`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRecord>,
    pub parameters: ParamMap,
    #[serde(rename = "parameterLabels", skip_serializing_if = "OrderedMap::is_empty")]
    pub parameter_labels: LabelMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<serde_json::Value>,
    pub flags: Flags,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub children: NodeMap,
    #[serde(rename = "grandchild", skip_serializing_if = "OrderedMap::is_empty")]
    pub grandchildren: NodeMap,
}

impl SnapshotNode {
    pub fn new(type_name: impl Into<String>) -> Self {
        let mut node = Self::default();
        node.type_name = type_name.into();
        node
    }

    /// Full path of this node when it is stored under `name`, if a container path was recorded
    pub fn full_path(&self, name: &str) -> Option<String> {
        if self.path.is_empty() {
            None
        } else {
            Some(join_path(&self.path, name))
        }
    }

    /// Whether the type name marks a definition-locked container
    pub fn is_locked_definition<S: AsRef<str>>(&self, suffixes: &[S]) -> bool {
        is_locked_type(&self.type_name, suffixes)
    }

    /// Direct descendants from both nesting keys, `children` first
    pub fn nested(&self) -> impl DoubleEndedIterator<Item = (&str, &SnapshotNode)> {
        self.children.iter().chain(self.grandchildren.iter())
    }

    pub fn has_nested(&self) -> bool {
        !self.children.is_empty() || !self.grandchildren.is_empty()
    }
}

impl Clone for SnapshotNode {
    fn clone(&self) -> Self {
        with_stack(|| Self {
            type_name: self.type_name.clone(),
            path: self.path.clone(),
            root: self.root.clone(),
            parent: self.parent.clone(),
            parameters: self.parameters.clone(),
            parameter_labels: self.parameter_labels.clone(),
            inputs: self.inputs.clone(),
            flags: self.flags,
            children: self.children.clone(),
            grandchildren: self.grandchildren.clone(),
        })
    }
}

impl PartialEq for SnapshotNode {
    fn eq(&self, other: &Self) -> bool {
        with_stack(|| {
            self.type_name == other.type_name
                && self.path == other.path
                && self.root == other.root
                && self.parent == other.parent
                && self.parameters == other.parameters
                && self.parameter_labels == other.parameter_labels
                && self.inputs == other.inputs
                && self.flags == other.flags
                && self.children == other.children
                && self.grandchildren == other.grandchildren
        })
    }
}

impl Drop for SnapshotNode {
    fn drop(&mut self) {
        if !self.has_nested() {
            return;
        }
        let mut pending: Vec<SnapshotNode> = take_nested(self).collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(take_nested(&mut node));
        }
    }
}

fn take_nested(node: &mut SnapshotNode) -> impl Iterator<Item = SnapshotNode> {
    let children = std::mem::take(&mut node.children);
    let grandchildren = std::mem::take(&mut node.grandchildren);
    children
        .into_iter()
        .chain(grandchildren)
        .map(|(_, child)| child)
}

pub fn is_locked_type<S: AsRef<str>>(type_name: &str, suffixes: &[S]) -> bool {
    suffixes.iter().any(|suffix| type_name.ends_with(suffix.as_ref()))
}

/// Join a container path and a node name: `/obj/geo1/` + `box1` -> `/obj/geo1/box1`
pub fn join_path(container: &str, name: &str) -> String {
    format!("{}/{}", container.trim_end_matches('/'), name)
}

/// Normalize a container path to carry exactly one trailing slash
pub fn container_path(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

/// First two path segments of a container path: `/obj/geo1/sub` -> `/obj/`.
///
/// Deeply nested selections are re-anchored at the top-level container.
pub fn root_of(path: &str) -> String {
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').take(2).collect();
    format!("{}/", segments.join("/"))
}

/// Path form handed to the graph for lookups (no trailing slash except the root itself)
pub fn lookup_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Accepts every field name older snapshot files used
#[derive(Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    type_name: Option<String>,
    path: Option<String>,
    root: Option<String>,
    parent: Option<ParentRecord>,
    root_parent: Option<ParentRecord>,
    child_parent: Option<ParentRecord>,
    parameters: Option<ParamMap>,
    parm: Option<ParamMap>,
    parms: Option<ParamMap>,
    #[serde(rename = "parameterLabels")]
    parameter_labels: Option<LabelMap>,
    parm_label: Option<LabelMap>,
    label: Option<LabelMap>,
    inputs: Option<Vec<serde_json::Value>>,
    input: Option<Vec<serde_json::Value>>,
    flags: Option<Flags>,
    flag: Option<Flags>,
    children: Option<NodeMap>,
    child: Option<NodeMap>,
    grandchild: Option<NodeMap>,
}

fn first_non_empty<V>(candidates: [Option<OrderedMap<V>>; 3]) -> OrderedMap<V> {
    candidates
        .into_iter()
        .flatten()
        .find(|map| !map.is_empty())
        .unwrap_or_default()
}

impl From<RawNode> for SnapshotNode {
    fn from(raw: RawNode) -> Self {
        Self {
            type_name: raw.type_name.unwrap_or_default(),
            path: raw.path.unwrap_or_default(),
            root: raw.root.unwrap_or_default(),
            parent: raw.parent.or(raw.root_parent).or(raw.child_parent),
            parameters: first_non_empty([raw.parameters, raw.parm, raw.parms]),
            parameter_labels: first_non_empty([raw.parameter_labels, raw.parm_label, raw.label]),
            inputs: raw.inputs.or(raw.input).unwrap_or_default(),
            flags: raw.flags.or(raw.flag).unwrap_or_default(),
            children: first_non_empty([raw.children, raw.child, None]),
            grandchildren: raw.grandchild.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_historical_field_names() {
        let json = r#"{
            "type": "geo",
            "path": "/obj/",
            "root": "/obj/",
            "root_parent": {"name": "obj", "type": "obj"},
            "parm": {"tx": 1.5},
            "parm_label": {"tx": "Translate X"},
            "input": [],
            "flag": {"display": true, "selectable": true},
            "child": {"box1": {"type": "box", "parms": {"size": [1.0, 1.0, 1.0]}}}
        }"#;

        let node: SnapshotNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.type_name, "geo");
        assert_eq!(node.parent.as_ref().map(|p| p.name.as_str()), Some("obj"));
        assert_eq!(node.parameters.get("tx"), Some(&ParamValue::Float(1.5)));
        assert_eq!(node.parameter_labels.get("tx").map(String::as_str), Some("Translate X"));
        assert!(node.flags.display);
        assert!(!node.flags.render);

        let child = node.children.get("box1").unwrap();
        assert_eq!(
            child.parameters.get("size"),
            Some(&ParamValue::FloatSequence(vec![1.0, 1.0, 1.0]))
        );
    }

    #[test]
    fn test_empty_preferred_field_falls_back() {
        let node: SnapshotNode =
            serde_json::from_str(r#"{"type": "box", "parm": {}, "parms": {"size": 2}}"#).unwrap();
        assert_eq!(node.parameters.get("size"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn test_missing_fields_default() {
        let node: SnapshotNode = serde_json::from_str("{}").unwrap();
        assert_eq!(node.type_name, "");
        assert!(node.parameters.is_empty());
        assert!(!node.has_nested());
        assert_eq!(node.flags, Flags::default());
    }

    #[test]
    fn test_writes_canonical_names() {
        let mut node = SnapshotNode::new("box");
        node.parameters.insert("size", ParamValue::Int(1));
        node.parameter_labels.insert("size", "Size".to_string());
        let written = serde_json::to_value(&node).unwrap();

        assert!(written.get("parameters").is_some());
        assert!(written.get("parameterLabels").is_some());
        assert!(written.get("parm").is_none());
        assert_eq!(written["flags"]["bypass"], serde_json::json!(false));
    }

    #[test]
    fn test_root_heuristic_takes_two_segments() {
        assert_eq!(root_of("/obj/geo1/"), "/obj/");
        assert_eq!(root_of("/obj"), "/obj/");
        assert_eq!(root_of("/obj/geo1/dopnet1/solver"), "/obj/");
        assert_eq!(root_of("/"), "/");
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(join_path("/obj/geo1/", "box1"), "/obj/geo1/box1");
        assert_eq!(join_path("/obj/geo1", "box1"), "/obj/geo1/box1");
        assert_eq!(container_path("/obj/geo1"), "/obj/geo1/");
        assert_eq!(lookup_path("/obj/"), "/obj");
        assert_eq!(lookup_path("/"), "/");
    }

    #[test]
    fn test_locked_suffixes() {
        let suffixes = ["solver", "net", "vop"];
        assert!(SnapshotNode::new("dopnet").is_locked_definition(&suffixes));
        assert!(SnapshotNode::new("pyro_solver").is_locked_definition(&suffixes));
        assert!(!SnapshotNode::new("geo").is_locked_definition(&suffixes));
    }
}
