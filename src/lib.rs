//! Node graph snapshots
//!
//! Exports a selection of a live node graph to a JSON snapshot, presents the
//! snapshot as a browsable hierarchy, lets its parameters be edited on a
//! working copy, and re-applies selected subtrees to a live graph.

pub mod cli;
pub mod config;
pub mod constants;
pub mod editor;
pub mod error;
pub mod hierarchy;
pub mod session;
pub mod snapshot;
pub mod sync;

// Re-export commonly used types
pub use config::SyncConfig;
pub use editor::{EditorState, ParameterRow, SnapshotEditor};
pub use error::{GraphError, SnapshotError};
pub use hierarchy::{build_hierarchy, flatten_hierarchy, flatten_selection, CheckTree, HierarchyItem};
pub use session::SnapshotSession;
pub use snapshot::{ParamValue, SnapshotDocument, SnapshotNode};
pub use sync::{export_selection, import_and_apply, GraphCapability, ImportReport, MemoryGraph};
