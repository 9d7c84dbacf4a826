//! Import: snapshot records back into a live graph
//!
//! Runs in two phases over the flattened selection. Phase one makes sure a
//! live node exists for every record, creating missing containers from the
//! recorded parent. Phase two writes parameters, nested data, inputs and flags.
//! Both phases are best-effort per record: a record that cannot be placed is
//! logged and skipped, the rest carry on.

use super::capability::GraphCapability;
use crate::config::SyncConfig;
use crate::error::GraphError;
use crate::hierarchy::{flatten_selection, FlatEntry, FlatSelection};
use crate::snapshot::{join_path, lookup_path, Flags, NodeMap, OrderedMap, SnapshotDocument, SnapshotNode};
use log::{debug, info, warn};
use std::fmt;

/// Nodes created during one import, looked up by name.
///
/// Lets siblings that need the same missing container share the one created
/// for the first of them. Lives for a single `import_and_apply` call.
#[derive(Debug, Clone)]
pub struct CreationCache<N> {
    by_name: Vec<(String, N)>,
}

impl<N: Clone> CreationCache<N> {
    pub fn new() -> Self {
        Self { by_name: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<N> {
        self.by_name
            .iter()
            .find(|(cached, _)| cached == name)
            .map(|(_, node)| node.clone())
    }

    /// The first node remembered under a name wins
    pub fn remember(&mut self, name: &str, node: N) {
        if self.get(name).is_none() {
            self.by_name.push((name.to_string(), node));
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl<N: Clone> Default for CreationCache<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a record was left out of an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither the recorded container nor a replacement under the root could be found or made
    NoContainer,
    /// Nothing exists at the recorded path and no type was recorded to create one
    NoType,
    CreateFailed(String),
    /// The live node disappeared between placing and applying
    NotFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoContainer => write!(f, "container could not be resolved"),
            SkipReason::NoType => write!(f, "no node type recorded"),
            SkipReason::CreateFailed(reason) => write!(f, "creation failed: {}", reason),
            SkipReason::NotFound => write!(f, "live node not found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Recorded full path of the record
    pub full_path: String,
    pub reason: SkipReason,
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Live paths of every placed record, in processing order
    pub resolved: Vec<String>,
    /// Live paths of nodes created, containers included
    pub created: Vec<String>,
    /// Live paths of records that already existed
    pub reused: Vec<String>,
    /// Live paths that received data in phase two
    pub applied: Vec<String>,
    pub skipped: Vec<SkippedEntry>,
    /// Recorded full path -> live path, for records placed away from their recorded path
    placements: OrderedMap<String>,
}

impl ImportReport {
    /// Where a record ended up, by its recorded full path
    pub fn placement(&self, full_path: &str) -> Option<&str> {
        self.placements.get(full_path).map(String::as_str)
    }

    pub fn is_skipped(&self, full_path: &str) -> bool {
        self.skipped.iter().any(|entry| entry.full_path == full_path)
    }

    fn skip(&mut self, full_path: &str, reason: SkipReason) {
        warn!("Skipping {}: {}", full_path, reason);
        self.skipped.push(SkippedEntry {
            full_path: full_path.to_string(),
            reason,
        });
    }
}

/// Recreate selected records in a live graph and apply their data.
///
/// Selecting a record selects its whole subtree. Running the same import
/// twice reuses everything created the first time.
pub fn import_and_apply<I, S, G>(
    selectors: I,
    document: &SnapshotDocument,
    graph: &mut G,
    config: &SyncConfig,
) -> ImportReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    G: GraphCapability,
{
    let selection = flatten_selection(selectors, document);
    info!("Importing {} records", selection.len());

    let mut report = create_nodes(&selection, graph, config);
    apply_data(&selection, graph, config, &mut report);

    info!(
        "Import finished: {} created, {} reused, {} skipped",
        report.created.len(),
        report.reused.len(),
        report.skipped.len()
    );
    report
}

/// Phase one: find or create a live node for every entry, parents first
pub fn create_nodes<G: GraphCapability>(
    selection: &FlatSelection<'_>,
    graph: &mut G,
    config: &SyncConfig,
) -> ImportReport {
    let mut cache = CreationCache::new();
    let mut report = ImportReport::default();

    for entry in selection {
        match place_entry(entry, graph, config, &mut cache, &mut report) {
            Ok(live) => {
                let live_path = graph.path(&live);
                if live_path != entry.full_path {
                    debug!("{} placed at {}", entry.full_path, live_path);
                }
                report.placements.insert(entry.full_path.clone(), live_path.clone());
                report.resolved.push(live_path);
            }
            Err(reason) => report.skip(&entry.full_path, reason),
        }
    }
    report
}

fn place_entry<G: GraphCapability>(
    entry: &FlatEntry<'_>,
    graph: &mut G,
    config: &SyncConfig,
    cache: &mut CreationCache<G::Node>,
    report: &mut ImportReport,
) -> Result<G::Node, SkipReason> {
    if let Some(existing) = graph.resolve(&entry.full_path) {
        report.reused.push(entry.full_path.clone());
        return Ok(existing);
    }

    let container =
        resolve_container(entry, graph, config, cache, report).ok_or(SkipReason::NoContainer)?;

    // The container may be a stand-in that already holds this node from an earlier run
    let target = join_path(&graph.path(&container), &entry.name);
    if let Some(existing) = graph.resolve(&target) {
        report.reused.push(target);
        return Ok(existing);
    }

    if entry.node.type_name.is_empty() {
        return Err(SkipReason::NoType);
    }

    let created = create_inside(graph, &container, &entry.node.type_name, &entry.name, config)
        .map_err(|e| SkipReason::CreateFailed(e.to_string()))?;
    debug!("Created {} ({})", target, entry.node.type_name);
    cache.remember(&entry.name, created.clone());
    report.created.push(target);
    Ok(created)
}

/// The live container a record should be created in.
///
/// Tries the recorded container path, then a container created earlier in
/// this import, then `root + parent name`, and finally creates the parent
/// under the root from its recorded type.
fn resolve_container<G: GraphCapability>(
    entry: &FlatEntry<'_>,
    graph: &mut G,
    config: &SyncConfig,
    cache: &mut CreationCache<G::Node>,
    report: &mut ImportReport,
) -> Option<G::Node> {
    if !entry.path.is_empty() {
        if let Some(live) = graph.resolve(lookup_path(&entry.path)) {
            return Some(live);
        }
    }

    let parent = entry.parent.as_ref()?;
    if let Some(cached) = cache.get(&parent.name) {
        return Some(cached);
    }

    if entry.root.is_empty() {
        return None;
    }
    let root = graph.resolve(lookup_path(&entry.root))?;
    let candidate = join_path(&graph.path(&root), &parent.name);
    if let Some(live) = graph.resolve(&candidate) {
        return Some(live);
    }

    if parent.type_name.is_empty() {
        return None;
    }
    match create_inside(graph, &root, &parent.type_name, &parent.name, config) {
        Ok(created) => {
            info!("Created missing container {} ({})", candidate, parent.type_name);
            cache.remember(&parent.name, created.clone());
            report.created.push(candidate);
            Some(created)
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

/// Create a node, unlocking a definition-locked container around the creation
fn create_inside<G: GraphCapability>(
    graph: &mut G,
    container: &G::Node,
    type_name: &str,
    name: &str,
    config: &SyncConfig,
) -> Result<G::Node, GraphError> {
    let locked = config.is_locked_type(&graph.type_name(container));
    if locked {
        graph.unlock_for_editing(container)?;
    }

    let created = graph.create_child(container, type_name, name);

    if locked {
        log_failure(graph.relock(container));
    }
    created
}

/// Phase two: write recorded data into every placed entry
pub fn apply_data<G: GraphCapability>(
    selection: &FlatSelection<'_>,
    graph: &mut G,
    config: &SyncConfig,
    report: &mut ImportReport,
) {
    for entry in selection {
        let live = graph.resolve(&entry.full_path).or_else(|| {
            report
                .placement(&entry.full_path)
                .and_then(|path| graph.resolve(path))
        });

        let Some(live) = live else {
            if !report.is_skipped(&entry.full_path) {
                report.skip(&entry.full_path, SkipReason::NotFound);
            }
            continue;
        };

        apply_entry(entry.node, &live, graph, config);
        report.applied.push(graph.path(&live));
    }
}

fn apply_entry<G: GraphCapability>(node: &SnapshotNode, live: &G::Node, graph: &mut G, config: &SyncConfig) {
    let path = graph.path(live);
    let type_name = if node.type_name.is_empty() {
        graph.type_name(live)
    } else {
        node.type_name.clone()
    };
    let locked = config.is_locked_type(&type_name);

    if !node.parameters.is_empty() {
        log_failure(graph.set_parameters(live, &node.parameters));
    }

    apply_nested_parameters(graph, &path, &node.children);

    if !node.grandchildren.is_empty() {
        if locked {
            log_failure(graph.unlock_for_editing(live));
            log_failure(graph.set_children_from_data(live, &node.grandchildren));
        } else {
            apply_nested_parameters(graph, &path, &node.grandchildren);
        }
    }

    if !node.inputs.is_empty() {
        log_failure(graph.set_inputs_from_data(live, &node.inputs));
    }

    apply_flags(graph, live, node.flags);

    graph.tidy_position(live);
    if locked {
        log_failure(graph.relock(live));
    }
    debug!("Applied {}", path);
}

fn apply_nested_parameters<G: GraphCapability>(graph: &mut G, path: &str, nested: &NodeMap) {
    for (name, record) in nested.iter() {
        if record.parameters.is_empty() {
            continue;
        }
        let child_path = join_path(path, name);
        match graph.resolve(&child_path) {
            Some(child) => log_failure(graph.set_parameters(&child, &record.parameters)),
            None => debug!("No live node at {}, parameters skipped", child_path),
        }
    }
}

/// Flags are only ever switched on, and only where the node has them
fn apply_flags<G: GraphCapability>(graph: &mut G, live: &G::Node, flags: Flags) {
    let support = graph.supported_flags(live);
    for flag in flags.enabled().filter(|flag| support.contains(*flag)) {
        log_failure(graph.set_flag(live, flag, true));
    }
}

fn log_failure(result: Result<(), GraphError>) {
    if let Err(e) = result {
        warn!("{}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Flag, ParamValue};
    use crate::sync::capability::FlagSupport;
    use crate::sync::memory::{GraphCall, MemoryGraph};

    fn document() -> SnapshotDocument {
        SnapshotDocument::from_json_str(
            r#"{
                "nodes": {
                    "geo1": {
                        "type": "geo", "path": "/obj/", "root": "/obj/",
                        "parent": {"name": "obj", "type": "obj"},
                        "parameters": {"tx": 1.5},
                        "flags": {"display": true},
                        "children": {
                            "box1": {
                                "type": "box", "path": "/obj/geo1/", "root": "/obj/",
                                "parameters": {"size": [1.0, 2.0, 3.0]},
                                "grandchild": {"inner": {"type": "null", "parameters": {"copy": 2}}}
                            }
                        }
                    },
                    "cam1": {"type": "cam", "path": "/obj/", "root": "/obj/"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_import_creates_and_applies() {
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        let report = import_and_apply(["geo1"], &document(), &mut graph, &SyncConfig::default());

        assert_eq!(
            report.resolved,
            vec!["/obj/geo1", "/obj/geo1/box1", "/obj/geo1/box1/inner"]
        );
        assert!(report.skipped.is_empty());
        assert!(graph.node_at("/obj/cam1").is_none());

        let geo = graph.node_at("/obj/geo1").unwrap();
        assert_eq!(graph.parameter(geo, "tx"), Some(&ParamValue::Float(1.5)));
        assert!(graph.flags_of(geo).display);

        let inner = graph.node_at("/obj/geo1/box1/inner").unwrap();
        assert_eq!(graph.type_of(inner), "null");
        assert_eq!(graph.parameter(inner, "copy"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn test_import_twice_is_idempotent() {
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        let config = SyncConfig::default();
        let first = import_and_apply(["geo1", "cam1"], &document(), &mut graph, &config);
        let paths_after_first = graph.paths();

        let second = import_and_apply(["geo1", "cam1"], &document(), &mut graph, &config);
        assert_eq!(first.created.len(), 4);
        assert!(second.created.is_empty());
        assert_eq!(first.resolved, second.resolved);
        assert_eq!(graph.paths(), paths_after_first);
    }

    #[test]
    fn test_flags_are_enable_only() {
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        let geo = graph.add_node("/obj", "geo", "geo1").unwrap();
        graph.flags_mut(geo).display = true;

        let doc = SnapshotDocument::from_json_str(
            r#"{"nodes": {"geo1": {"type": "geo", "path": "/obj/", "flags": {"render": true}}}}"#,
        )
        .unwrap();
        import_and_apply(["geo1"], &doc, &mut graph, &SyncConfig::default());

        let flag_calls: Vec<&GraphCall> = graph
            .calls()
            .iter()
            .filter(|call| matches!(call, GraphCall::SetFlag { .. }))
            .collect();
        assert_eq!(
            flag_calls,
            vec![&GraphCall::SetFlag {
                path: "/obj/geo1".into(),
                flag: Flag::Render,
                value: true
            }]
        );
        assert!(graph.flags_of(geo).display);
        assert!(graph.flags_of(geo).render);
    }

    #[test]
    fn test_unsupported_recorded_flag_skipped() {
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        let geo = graph.add_node("/obj", "geo", "geo1").unwrap();
        graph.set_flag_support(geo, FlagSupport::only(&[Flag::Display]));

        let doc = SnapshotDocument::from_json_str(
            r#"{"nodes": {"geo1": {"type": "geo", "path": "/obj/", "flags": {"display": true, "bypass": true}}}}"#,
        )
        .unwrap();
        let report = import_and_apply(["geo1"], &doc, &mut graph, &SyncConfig::default());

        assert!(report.skipped.is_empty());
        assert_eq!(report.applied, vec!["/obj/geo1"]);
        let flag_calls: Vec<&GraphCall> = graph
            .calls()
            .iter()
            .filter(|call| matches!(call, GraphCall::SetFlag { .. }))
            .collect();
        assert_eq!(
            flag_calls,
            vec![&GraphCall::SetFlag {
                path: "/obj/geo1".into(),
                flag: Flag::Display,
                value: true
            }]
        );
        assert!(graph.flags_of(geo).display);
        assert!(!graph.flags_of(geo).bypass);
    }

    #[test]
    fn test_recorded_inputs_applied_only_when_present() {
        let doc = SnapshotDocument::from_json_str(
            r#"{
                "nodes": {
                    "geo1": {
                        "type": "geo", "path": "/obj/", "root": "/obj/",
                        "children": {
                            "xform1": {"type": "xform", "path": "/obj/geo1/", "root": "/obj/"},
                            "box1": {"type": "box", "path": "/obj/geo1/", "root": "/obj/",
                                     "inputs": [[0, "/obj/geo1/xform1", 0]]}
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        import_and_apply(["geo1"], &doc, &mut graph, &SyncConfig::default());

        let input_calls: Vec<&GraphCall> = graph
            .calls()
            .iter()
            .filter(|call| matches!(call, GraphCall::SetInputs(_)))
            .collect();
        assert_eq!(input_calls, vec![&GraphCall::SetInputs("/obj/geo1/box1".into())]);

        let b = graph.node_at("/obj/geo1/box1").unwrap();
        assert_eq!(graph.inputs_of(b).to_vec(), vec![serde_json::json!([0, "/obj/geo1/xform1", 0])]);
        let xform = graph.node_at("/obj/geo1/xform1").unwrap();
        assert!(graph.inputs_of(xform).is_empty());
    }

    #[test]
    fn test_missing_root_skips_only_that_record() {
        let doc = SnapshotDocument::from_json_str(
            r#"{
                "nodes": {
                    "stray": {"type": "null", "path": "/stage/set/", "root": "/stage/",
                              "parent": {"name": "set", "type": "subnet"}},
                    "geo1": {"type": "geo", "path": "/obj/", "root": "/obj/"}
                }
            }"#,
        )
        .unwrap();
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        let report = import_and_apply(["stray", "geo1"], &doc, &mut graph, &SyncConfig::default());

        assert_eq!(report.resolved, vec!["/obj/geo1"]);
        assert_eq!(
            report.skipped,
            vec![SkippedEntry {
                full_path: "/stage/set/stray".into(),
                reason: SkipReason::NoContainer
            }]
        );
    }

    #[test]
    fn test_missing_container_created_once_for_siblings() {
        let doc = SnapshotDocument::from_json_str(
            r#"{
                "nodes": {
                    "a": {"type": "null", "path": "/obj/rig/ctrl/", "root": "/obj/",
                          "parent": {"name": "ctrl", "type": "subnetwork"}},
                    "b": {"type": "null", "path": "/obj/rig/ctrl/", "root": "/obj/",
                          "parent": {"name": "ctrl", "type": "subnetwork"}}
                }
            }"#,
        )
        .unwrap();
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        let report = import_and_apply(["a", "b"], &doc, &mut graph, &SyncConfig::default());

        assert_eq!(report.resolved, vec!["/obj/ctrl/a", "/obj/ctrl/b"]);
        let container_creations = graph
            .calls()
            .iter()
            .filter(|call| matches!(call, GraphCall::Create { name, .. } if name == "ctrl"))
            .count();
        assert_eq!(container_creations, 1);
    }

    #[test]
    fn test_nested_record_reanchored_at_recorded_root() {
        // Known limitation: with the intermediate container gone, a deeply nested
        // record is rebuilt directly under the two-segment root.
        let doc = SnapshotDocument::from_json_str(
            r#"{
                "nodes": {
                    "inner": {"type": "null", "path": "/obj/geo1/box1/", "root": "/obj/",
                              "parent": {"name": "box1", "type": "box"}}
                }
            }"#,
        )
        .unwrap();
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        let report = import_and_apply(["inner"], &doc, &mut graph, &SyncConfig::default());

        assert_eq!(report.resolved, vec!["/obj/box1/inner"]);
        assert_eq!(report.placement("/obj/geo1/box1/inner"), Some("/obj/box1/inner"));
        assert!(graph.node_at("/obj/geo1").is_none());
        assert_eq!(report.applied, vec!["/obj/box1/inner"]);
    }

    #[test]
    fn test_locked_container_unlocked_for_creation() {
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        graph.add_node("/obj", "dopnet", "dopnet1").unwrap();

        let doc = SnapshotDocument::from_json_str(
            r#"{
                "nodes": {
                    "solver1": {"type": "rbdsolver", "path": "/obj/dopnet1/", "root": "/obj/",
                                "parent": {"name": "dopnet1", "type": "dopnet"}}
                }
            }"#,
        )
        .unwrap();
        let report = import_and_apply(["solver1"], &doc, &mut graph, &SyncConfig::default());

        assert_eq!(report.created, vec!["/obj/dopnet1/solver1"]);
        assert_eq!(
            &graph.calls()[..3],
            &[
                GraphCall::Unlock("/obj/dopnet1".into()),
                GraphCall::Create {
                    parent: "/obj/dopnet1".into(),
                    type_name: "rbdsolver".into(),
                    name: "solver1".into()
                },
                GraphCall::Relock("/obj/dopnet1".into()),
            ]
        );
        assert!(graph.is_locked("/obj/dopnet1"));
        // applied data ends with tidy and relock of the locked node itself
        let tail: Vec<&GraphCall> = graph.calls().iter().rev().take(2).collect();
        assert_eq!(
            tail,
            vec![
                &GraphCall::Relock("/obj/dopnet1/solver1".into()),
                &GraphCall::Tidy("/obj/dopnet1/solver1".into()),
            ]
        );
    }

    #[test]
    fn test_locked_record_loads_grandchildren_as_data() {
        let doc = SnapshotDocument::from_json_str(
            r#"{
                "nodes": {
                    "dopnet1": {"type": "dopnet", "path": "/obj/", "root": "/obj/",
                                "grandchild": {"solver1": {"type": "rbdsolver", "parameters": {"substeps": 4}}}}
                }
            }"#,
        )
        .unwrap();
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        import_and_apply(["dopnet1"], &doc, &mut graph, &SyncConfig::default());

        assert!(graph
            .calls()
            .contains(&GraphCall::SetChildren("/obj/dopnet1".into())));
        let solver = graph.node_at("/obj/dopnet1/solver1").unwrap();
        assert_eq!(graph.parameter(solver, "substeps"), Some(&ParamValue::Int(4)));
        assert!(graph.is_locked("/obj/dopnet1"));
    }

    #[test]
    fn test_typeless_record_not_created() {
        let doc = SnapshotDocument::from_json_str(
            r#"{"nodes": {"ghost": {"path": "/obj/", "parameters": {"tx": 1.0}}}}"#,
        )
        .unwrap();
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        let report = import_and_apply(["ghost"], &doc, &mut graph, &SyncConfig::default());
        assert_eq!(report.skipped[0].reason, SkipReason::NoType);
        assert!(report.applied.is_empty());

        let ghost = graph.add_node("/obj", "null", "ghost").unwrap();
        let report = import_and_apply(["ghost"], &doc, &mut graph, &SyncConfig::default());
        assert_eq!(report.reused, vec!["/obj/ghost"]);
        assert_eq!(graph.parameter(ghost, "tx"), Some(&ParamValue::Float(1.0)));
    }

    #[test]
    fn test_creation_cache_first_wins() {
        let mut cache = CreationCache::new();
        assert!(cache.is_empty());
        cache.remember("ctrl", 3usize);
        cache.remember("ctrl", 7usize);
        assert_eq!(cache.get("ctrl"), Some(3));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("other").is_none());
    }
}
