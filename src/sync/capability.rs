//! Live graph capability interface
//!
//! Everything the sync layer reads from or writes to a live node graph goes
//! through this trait. Hosts implement it over their own node handles.

use crate::error::GraphError;
use crate::snapshot::{Flag, NodeMap, ParamMap};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// The flags a particular node supports, queried once per node.
///
/// Flags outside the set read as `false` and are never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSupport(BTreeSet<Flag>);

impl FlagSupport {
    pub fn all() -> Self {
        Self(Flag::ALL.into_iter().collect())
    }

    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn only(flags: &[Flag]) -> Self {
        Self(flags.iter().copied().collect())
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Read and write access to a live node graph
pub trait GraphCapability {
    /// Host handle for a live node
    type Node: Clone + Debug;

    /// Nodes currently selected by the user, in selection order
    fn current_selection(&self) -> Vec<Self::Node>;

    /// Look up a node by absolute path (`/obj/geo1`)
    fn resolve(&self, path: &str) -> Option<Self::Node>;

    fn create_child(
        &mut self,
        parent: &Self::Node,
        type_name: &str,
        name: &str,
    ) -> Result<Self::Node, GraphError>;

    fn name(&self, node: &Self::Node) -> String;

    fn type_name(&self, node: &Self::Node) -> String;

    /// Absolute path of the node itself
    fn path(&self, node: &Self::Node) -> String;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parameters(&self, node: &Self::Node) -> ParamMap;

    fn set_parameters(&mut self, node: &Self::Node, parameters: &ParamMap) -> Result<(), GraphError>;

    /// Human-readable label of a parameter
    fn parameter_description(&self, node: &Self::Node, parameter: &str) -> String;

    /// The host's bulk dump of everything below a node
    fn children_as_data(&self, node: &Self::Node) -> NodeMap;

    fn set_children_from_data(&mut self, node: &Self::Node, data: &NodeMap) -> Result<(), GraphError>;

    fn inputs_as_data(&self, node: &Self::Node) -> Vec<serde_json::Value>;

    fn set_inputs_from_data(
        &mut self,
        node: &Self::Node,
        inputs: &[serde_json::Value],
    ) -> Result<(), GraphError>;

    /// Which flags this node has. Nodes without flags need not override this.
    fn supported_flags(&self, _node: &Self::Node) -> FlagSupport {
        FlagSupport::none()
    }

    /// Only called for flags in `supported_flags`
    fn flag(&self, _node: &Self::Node, _flag: Flag) -> bool {
        false
    }

    /// Only called for flags in `supported_flags`
    fn set_flag(&mut self, _node: &Self::Node, _flag: Flag, _value: bool) -> Result<(), GraphError> {
        Ok(())
    }

    /// Allow editing the contents of a definition-locked container
    fn unlock_for_editing(&mut self, node: &Self::Node) -> Result<(), GraphError>;

    /// Return a container to its locked definition
    fn relock(&mut self, node: &Self::Node) -> Result<(), GraphError>;

    /// Move the node somewhere tidy in its network
    fn tidy_position(&mut self, node: &Self::Node);
}
