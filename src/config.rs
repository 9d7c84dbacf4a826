//! Runtime configuration for export, import and file handling

use crate::constants;
use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by the sync layer, the session and the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Type-name suffixes that mark definition-locked containers
    pub locked_type_suffixes: Vec<String>,
    /// Maximum comment length in the metadata block
    pub comment_limit: usize,
    /// Snapshot file name used when no explicit path is given
    pub file_name: String,
    /// Directory under the scene directory holding snapshots
    pub data_dir_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            locked_type_suffixes: constants::graph::LOCKED_TYPE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            comment_limit: constants::meta::COMMENT_LIMIT,
            file_name: constants::file::DEFAULT_FILE_NAME.to_string(),
            data_dir_name: constants::file::DATA_DIR_NAME.to_string(),
        }
    }
}

impl SyncConfig {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SnapshotError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_locked_type(&self, type_name: &str) -> bool {
        crate::snapshot::is_locked_type(type_name, self.locked_type_suffixes.as_slice())
    }

    /// `<scene dir>/data/nodeExportData.json`, with the home directory standing in
    /// when no scene directory is known
    pub fn default_snapshot_path(&self, scene_dir: Option<&Path>) -> PathBuf {
        let base = scene_dir
            .map(Path::to_path_buf)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        base.join(&self.data_dir_name).join(&self.file_name)
    }
}
