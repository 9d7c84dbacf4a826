//! Application-wide constants and default values
//!
//! Centralized location for all hard-coded values to improve maintainability

/// Snapshot file location defaults
pub mod file {
    /// Directory created next to the scene file for snapshots
    pub const DATA_DIR_NAME: &str = "data";

    /// Default snapshot file name
    pub const DEFAULT_FILE_NAME: &str = "nodeExportData.json";

    /// Contents written when a snapshot file has to be created from nothing
    pub const EMPTY_DOCUMENT: &str = "{\n    \"nodes\": {}\n}";

    /// Display name when no file is set
    pub const UNTITLED: &str = "Untitled";
}

/// Graph conventions shared by export and import
pub mod graph {
    /// Type-name suffixes of definition-locked containers
    pub const LOCKED_TYPE_SUFFIXES: [&str; 3] = ["solver", "net", "vop"];
}

/// Stack growth for walks over arbitrarily deep snapshots
pub mod stack {
    /// Remaining stack below which a recursive step moves to a fresh segment
    pub const RED_ZONE: usize = 64 * 1024;

    /// Size of each heap-allocated stack segment
    pub const SEGMENT_SIZE: usize = 1024 * 1024;
}

/// Tree view constants
pub mod tree {
    /// Items deeper than this cannot be checked individually
    pub const MAX_CHECKABLE_DEPTH: usize = 1;
}

/// Editor constants
pub mod editor {
    /// Component suffixes tried when a vector parameter has no label of its own
    pub const COMPONENT_SUFFIXES: [&str; 8] = ["x", "y", "z", "w", "r", "g", "b", "a"];
}

/// Metadata block keys and limits
pub mod meta {
    /// Maximum comment length in characters
    pub const COMMENT_LIMIT: usize = 500;

    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub const FILE_NAME: &str = "File Name";
    pub const FILE_PATH: &str = "File Path";
    pub const COMMENTS: &str = "Comments";
    pub const AUTHOR: &str = "Author";
    pub const CREATION: &str = "Creation";
    pub const HOST_VERSION: &str = "Host Version";
}
