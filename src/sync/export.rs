//! Export: live selection to snapshot document

use super::capability::{FlagSupport, GraphCapability};
use crate::config::SyncConfig;
use crate::snapshot::{
    container_path, root_of, Flag, Flags, LabelMap, NodeMap, ParentRecord, SnapshotDocument,
    SnapshotNode,
};
use log::{debug, info, warn};

/// Snapshot every currently selected node.
///
/// Top-level records carry full child records; each child carries the host's
/// bulk dump of its own subtree under `grandchild`. The document is returned,
/// not written.
pub fn export_selection<G: GraphCapability>(graph: &mut G, config: &SyncConfig) -> SnapshotDocument {
    let selection = graph.current_selection();
    let mut nodes = NodeMap::new();

    for node in &selection {
        let name = graph.name(node);
        let mut record = record_node(graph, node);

        for child in read_children(graph, node, config) {
            let child_name = graph.name(&child);
            let mut child_record = record_node(graph, &child);
            child_record.grandchildren = read_children_data(graph, &child, config);
            record.children.insert(child_name, child_record);
        }

        debug!(
            "Exported {} ({}) with {} children",
            name,
            record.type_name,
            record.children.len()
        );
        nodes.insert(name, record);
    }

    info!("Exported {} selected nodes", nodes.len());
    SnapshotDocument::new(nodes)
}

/// One record without nested data
fn record_node<G: GraphCapability>(graph: &G, node: &G::Node) -> SnapshotNode {
    let container = graph.parent(node);
    let path = container
        .as_ref()
        .map(|c| container_path(&graph.path(c)))
        .unwrap_or_else(|| "/".to_string());
    // The graph root has nothing to recreate it from
    let parent = container.as_ref().filter(|c| graph.parent(c).is_some()).map(|c| ParentRecord {
        name: graph.name(c),
        type_name: graph.type_name(c),
    });

    let parameters = graph.parameters(node);
    let parameter_labels: LabelMap = parameters
        .keys()
        .map(|key| (key, graph.parameter_description(node, key)))
        .collect();

    SnapshotNode {
        type_name: graph.type_name(node),
        root: root_of(&path),
        path,
        parent,
        parameters,
        parameter_labels,
        inputs: graph.inputs_as_data(node),
        flags: read_flags(graph, node),
        children: NodeMap::new(),
        grandchildren: NodeMap::new(),
    }
}

/// Flags the node does not support read as `false`
fn read_flags<G: GraphCapability>(graph: &G, node: &G::Node) -> Flags {
    let support: FlagSupport = graph.supported_flags(node);
    let mut flags = Flags::default();
    for flag in Flag::ALL {
        if support.contains(flag) {
            flags.set(flag, graph.flag(node, flag));
        }
    }
    flags
}

/// Run a read against a node's contents, unlocking definition-locked containers around it
fn with_contents_unlocked<G, T>(
    graph: &mut G,
    node: &G::Node,
    config: &SyncConfig,
    read: impl FnOnce(&G) -> T,
) -> T
where
    G: GraphCapability,
{
    let locked = config.is_locked_type(&graph.type_name(node));
    if locked {
        if let Err(e) = graph.unlock_for_editing(node) {
            warn!("Could not unlock {}: {}", graph.path(node), e);
        }
    }

    let result = read(&*graph);

    if locked {
        if let Err(e) = graph.relock(node) {
            warn!("Could not relock {}: {}", graph.path(node), e);
        }
    }
    result
}

fn read_children<G: GraphCapability>(graph: &mut G, node: &G::Node, config: &SyncConfig) -> Vec<G::Node> {
    with_contents_unlocked(graph, node, config, |g| g.children(node))
}

fn read_children_data<G: GraphCapability>(graph: &mut G, node: &G::Node, config: &SyncConfig) -> NodeMap {
    with_contents_unlocked(graph, node, config, |g| g.children_as_data(node))
}
