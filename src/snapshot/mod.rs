//! Snapshot data model - the JSON schema for exported node subtrees

pub mod document;
pub mod node;
pub mod ordered_map;
pub mod value;

pub use document::{SnapshotDocument, SnapshotMeta};
pub use node::{
    container_path, is_locked_type, join_path, lookup_path, root_of, Flag, Flags, LabelMap, NodeMap, ParamMap,
    ParentRecord, SnapshotNode,
};
pub use ordered_map::OrderedMap;
pub use value::{ParamKind, ParamValue};

use crate::constants::stack;

/// Run one recursive step, moving to a fresh stack segment when the current one runs low
pub(crate) fn with_stack<R>(step: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(stack::RED_ZONE, stack::SEGMENT_SIZE, step)
}
