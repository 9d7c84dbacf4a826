//! Moving snapshots in and out of a live node graph

pub mod capability;
pub mod export;
pub mod import;
pub mod memory;

pub use capability::{FlagSupport, GraphCapability};
pub use export::export_selection;
pub use import::{
    apply_data, create_nodes, import_and_apply, CreationCache, ImportReport, SkipReason, SkippedEntry,
};
pub use memory::{GraphCall, MemoryGraph, NodeId};
