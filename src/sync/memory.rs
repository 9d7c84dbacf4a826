//! In-memory node graph
//!
//! A plain arena of nodes implementing [`GraphCapability`]. The CLI replays
//! snapshots against it and the sync tests use it as their host; every
//! mutating capability call is appended to a call log.

use super::capability::{FlagSupport, GraphCapability};
use crate::error::GraphError;
use crate::snapshot::{
    is_locked_type, join_path, lookup_path, Flag, Flags, LabelMap, NodeMap, ParamMap, ParamValue,
    SnapshotNode,
};
use crate::constants::graph::LOCKED_TYPE_SUFFIXES;
use serde_json::Value;

/// Unique identifier for nodes in a [`MemoryGraph`]
pub type NodeId = usize;

/// The root node every graph starts with
pub const ROOT_ID: NodeId = 0;

/// A mutating capability call, as recorded by [`MemoryGraph`]
#[derive(Debug, Clone, PartialEq)]
pub enum GraphCall {
    Create {
        parent: String,
        type_name: String,
        name: String,
    },
    SetParameters(String),
    SetFlag {
        path: String,
        flag: Flag,
        value: bool,
    },
    SetChildren(String),
    SetInputs(String),
    Unlock(String),
    Relock(String),
    Tidy(String),
}

#[derive(Debug, Clone)]
struct MemoryNode {
    name: String,
    type_name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    parameters: ParamMap,
    descriptions: LabelMap,
    inputs: Vec<Value>,
    flags: Flags,
    flag_support: FlagSupport,
    locked: bool,
}

impl MemoryNode {
    fn new(name: &str, type_name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            parent,
            children: Vec::new(),
            parameters: ParamMap::new(),
            descriptions: LabelMap::new(),
            inputs: Vec::new(),
            flags: Flags::default(),
            flag_support: FlagSupport::all(),
            locked: is_locked_type(type_name, LOCKED_TYPE_SUFFIXES.as_slice()),
        }
    }
}

/// Node graph held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryGraph {
    /// Indexed by `NodeId`; nodes are never removed
    nodes: Vec<MemoryNode>,
    selection: Vec<NodeId>,
    calls: Vec<GraphCall>,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    /// Creates a graph holding only the root `/`
    pub fn new() -> Self {
        Self {
            nodes: vec![MemoryNode::new("", "root", None)],
            selection: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Creates a graph with the given top-level containers (`obj`, `stage`, ...)
    pub fn with_roots(names: &[&str]) -> Self {
        let mut graph = Self::new();
        for name in names {
            graph.insert_node(ROOT_ID, name, name);
        }
        graph
    }

    fn node(&self, id: NodeId) -> &MemoryNode {
        &self.nodes[id]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut MemoryNode {
        &mut self.nodes[id]
    }

    fn insert_node(&mut self, parent: NodeId, type_name: &str, name: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(MemoryNode::new(name, type_name, Some(parent)));
        self.node_mut(parent).children.push(id);
        id
    }

    fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).name == name)
    }

    fn check_create(&self, parent: NodeId, type_name: &str, name: &str) -> Result<(), GraphError> {
        let failure = |reason: &str| GraphError::CreateFailed {
            parent: self.path_of(parent),
            type_name: type_name.to_string(),
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if type_name.is_empty() {
            return Err(failure("no node type given"));
        }
        if name.is_empty() || name.contains('/') {
            return Err(failure("invalid node name"));
        }
        if self.node(parent).locked {
            return Err(failure("contents are locked"));
        }
        if self.child_named(parent, name).is_some() {
            return Err(failure("name already in use"));
        }
        Ok(())
    }

    /// Add a node without recording a call
    pub fn add_node(&mut self, parent_path: &str, type_name: &str, name: &str) -> Result<NodeId, GraphError> {
        let parent = self
            .node_at(parent_path)
            .ok_or_else(|| GraphError::NotFound(parent_path.to_string()))?;
        self.check_create(parent, type_name, name)?;
        Ok(self.insert_node(parent, type_name, name))
    }

    /// Resolve an absolute path to a node id
    pub fn node_at(&self, path: &str) -> Option<NodeId> {
        let path = lookup_path(path);
        if !path.starts_with('/') {
            return None;
        }
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(ROOT_ID, |current, segment| self.child_named(current, segment))
    }

    pub fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            current = node.parent;
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Every node path except the root, parents before children
    pub fn paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        let mut stack: Vec<NodeId> = self.node(ROOT_ID).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            paths.push(self.path_of(id));
            stack.extend(self.node(id).children.iter().rev());
        }
        paths
    }

    /// Number of nodes, not counting the root
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_of(&self, id: NodeId) -> &str {
        &self.node(id).type_name
    }

    pub fn parameter(&self, id: NodeId, name: &str) -> Option<&ParamValue> {
        self.node(id).parameters.get(name)
    }

    pub fn set_parameter(&mut self, id: NodeId, name: &str, value: ParamValue) {
        self.node_mut(id).parameters.insert(name, value);
    }

    pub fn set_description(&mut self, id: NodeId, name: &str, description: &str) {
        self.node_mut(id).descriptions.insert(name, description.to_string());
    }

    pub fn flags_of(&self, id: NodeId) -> Flags {
        self.node(id).flags
    }

    pub fn flags_mut(&mut self, id: NodeId) -> &mut Flags {
        &mut self.node_mut(id).flags
    }

    pub fn set_flag_support(&mut self, id: NodeId, support: FlagSupport) {
        self.node_mut(id).flag_support = support;
    }

    pub fn inputs_of(&self, id: NodeId) -> &[Value] {
        &self.node(id).inputs
    }

    /// Add a node to the current selection. Unknown paths are ignored.
    pub fn select(&mut self, path: &str) {
        if let Some(id) = self.node_at(path) {
            if !self.selection.contains(&id) {
                self.selection.push(id);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_locked(&self, path: &str) -> bool {
        self.node_at(path).map(|id| self.node(id).locked).unwrap_or(false)
    }

    /// Unlock a container without recording a call
    pub fn unlock_path(&mut self, path: &str) {
        if let Some(id) = self.node_at(path) {
            self.node_mut(id).locked = false;
        }
    }

    /// Lock a container without recording a call
    pub fn lock_path(&mut self, path: &str) {
        if let Some(id) = self.node_at(path) {
            self.node_mut(id).locked = true;
        }
    }

    pub fn calls(&self) -> &[GraphCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn record(&self, id: NodeId) -> SnapshotNode {
        let node = self.node(id);
        let mut record = SnapshotNode::new(node.type_name.clone());
        record.parameters = node.parameters.clone();
        record.inputs = node.inputs.clone();
        record.flags = node.flags;
        record
    }

    /// Dump everything below `id`, nesting under `children`
    fn dump(&self, id: NodeId) -> NodeMap {
        struct Slot {
            name: String,
            record: SnapshotNode,
            parent: Option<usize>,
            nested: Vec<(String, SnapshotNode)>,
        }

        let mut slots: Vec<Slot> = Vec::new();
        let mut pending: Vec<(NodeId, Option<usize>)> =
            self.node(id).children.iter().rev().map(|&child| (child, None)).collect();

        while let Some((child, parent)) = pending.pop() {
            let index = slots.len();
            slots.push(Slot {
                name: self.node(child).name.clone(),
                record: self.record(child),
                parent,
                nested: Vec::new(),
            });
            pending.extend(self.node(child).children.iter().rev().map(|&grand| (grand, Some(index))));
        }

        // Children always sit after their parent, so assemble back to front
        let mut top = Vec::new();
        while let Some(slot) = slots.pop() {
            let mut record = slot.record;
            record.children = slot.nested.into_iter().rev().collect();
            match slot.parent {
                Some(parent) => slots[parent].nested.push((slot.name, record)),
                None => top.push((slot.name, record)),
            }
        }
        top.into_iter().rev().collect()
    }

    /// Find or create each record below `id` and load its data
    fn load(&mut self, id: NodeId, data: &NodeMap) -> Result<(), GraphError> {
        let mut pending: Vec<(NodeId, &str, &SnapshotNode)> =
            data.iter().rev().map(|(name, record)| (id, name, record)).collect();

        while let Some((parent, name, record)) = pending.pop() {
            let child = match self.child_named(parent, name) {
                Some(existing) => existing,
                None if record.type_name.is_empty() => {
                    log::warn!("No type recorded for {}, skipped", join_path(&self.path_of(parent), name));
                    continue;
                }
                None => self.insert_node(parent, &record.type_name, name),
            };

            let node = self.node_mut(child);
            for (key, value) in record.parameters.iter() {
                node.parameters.insert(key, value.clone());
            }
            if !record.inputs.is_empty() {
                node.inputs = record.inputs.clone();
            }
            node.flags = record.flags;

            pending.extend(record.nested().rev().map(|(name, nested)| (child, name, nested)));
        }
        Ok(())
    }
}

impl GraphCapability for MemoryGraph {
    type Node = NodeId;

    fn current_selection(&self) -> Vec<NodeId> {
        self.selection.clone()
    }

    fn resolve(&self, path: &str) -> Option<NodeId> {
        self.node_at(path)
    }

    fn create_child(&mut self, parent: &NodeId, type_name: &str, name: &str) -> Result<NodeId, GraphError> {
        self.check_create(*parent, type_name, name)?;
        self.calls.push(GraphCall::Create {
            parent: self.path_of(*parent),
            type_name: type_name.to_string(),
            name: name.to_string(),
        });
        Ok(self.insert_node(*parent, type_name, name))
    }

    fn name(&self, node: &NodeId) -> String {
        self.node(*node).name.clone()
    }

    fn type_name(&self, node: &NodeId) -> String {
        self.node(*node).type_name.clone()
    }

    fn path(&self, node: &NodeId) -> String {
        self.path_of(*node)
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.node(*node).parent
    }

    /// Contents of a locked container are hidden
    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        let node = self.node(*node);
        if node.locked {
            Vec::new()
        } else {
            node.children.clone()
        }
    }

    fn parameters(&self, node: &NodeId) -> ParamMap {
        self.node(*node).parameters.clone()
    }

    /// Merges into the existing parameters
    fn set_parameters(&mut self, node: &NodeId, parameters: &ParamMap) -> Result<(), GraphError> {
        self.calls.push(GraphCall::SetParameters(self.path_of(*node)));
        let target = &mut self.node_mut(*node).parameters;
        for (key, value) in parameters.iter() {
            target.insert(key, value.clone());
        }
        Ok(())
    }

    fn parameter_description(&self, node: &NodeId, parameter: &str) -> String {
        self.node(*node)
            .descriptions
            .get(parameter)
            .cloned()
            .unwrap_or_else(|| parameter.to_string())
    }

    fn children_as_data(&self, node: &NodeId) -> NodeMap {
        if self.node(*node).locked {
            return NodeMap::new();
        }
        self.dump(*node)
    }

    fn set_children_from_data(&mut self, node: &NodeId, data: &NodeMap) -> Result<(), GraphError> {
        let path = self.path_of(*node);
        if self.node(*node).locked {
            return Err(GraphError::Operation {
                operation: "set children",
                path,
                reason: "contents are locked".to_string(),
            });
        }
        self.calls.push(GraphCall::SetChildren(path));
        self.load(*node, data)
    }

    fn inputs_as_data(&self, node: &NodeId) -> Vec<Value> {
        self.node(*node).inputs.clone()
    }

    fn set_inputs_from_data(&mut self, node: &NodeId, inputs: &[Value]) -> Result<(), GraphError> {
        self.calls.push(GraphCall::SetInputs(self.path_of(*node)));
        self.node_mut(*node).inputs = inputs.to_vec();
        Ok(())
    }

    fn supported_flags(&self, node: &NodeId) -> FlagSupport {
        self.node(*node).flag_support.clone()
    }

    fn flag(&self, node: &NodeId, flag: Flag) -> bool {
        self.node(*node).flags.get(flag)
    }

    fn set_flag(&mut self, node: &NodeId, flag: Flag, value: bool) -> Result<(), GraphError> {
        let path = self.path_of(*node);
        if !self.node(*node).flag_support.contains(flag) {
            return Err(GraphError::Operation {
                operation: "set flag",
                path,
                reason: format!("no {} flag", flag.name()),
            });
        }
        self.calls.push(GraphCall::SetFlag { path, flag, value });
        self.node_mut(*node).flags.set(flag, value);
        Ok(())
    }

    fn unlock_for_editing(&mut self, node: &NodeId) -> Result<(), GraphError> {
        self.calls.push(GraphCall::Unlock(self.path_of(*node)));
        self.node_mut(*node).locked = false;
        Ok(())
    }

    fn relock(&mut self, node: &NodeId) -> Result<(), GraphError> {
        self.calls.push(GraphCall::Relock(self.path_of(*node)));
        let target = self.node_mut(*node);
        target.locked = is_locked_type(&target.type_name, LOCKED_TYPE_SUFFIXES.as_slice());
        Ok(())
    }

    fn tidy_position(&mut self, node: &NodeId) {
        self.calls.push(GraphCall::Tidy(self.path_of(*node)));
    }
}
