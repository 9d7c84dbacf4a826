//! Error types
//!
//! Only structural problems surface as errors. Per-node problems during
//! import and apply are logged and skipped by the sync layer.

use std::path::PathBuf;
use thiserror::Error;

/// Failures loading, saving or decoding a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures reported by a live graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("no node at {0}")]
    NotFound(String),

    #[error("cannot create {type_name} node '{name}' under {parent}: {reason}")]
    CreateFailed {
        parent: String,
        type_name: String,
        name: String,
        reason: String,
    },

    #[error("{operation} failed on {path}: {reason}")]
    Operation {
        operation: &'static str,
        path: String,
        reason: String,
    },
}
