//! Hierarchy codec - tree projection and selection flattening over snapshots

pub mod checks;
pub mod selection;
pub mod tree;

pub use checks::CheckTree;
pub use selection::{flatten_selection, FlatEntry, FlatSelection};
pub use tree::{build_hierarchy, find_item, flatten_hierarchy, HierarchyItem};
