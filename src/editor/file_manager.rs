//! Snapshot file management
//!
//! Handles saving, loading, and file state for snapshot documents.

use crate::constants::file::UNTITLED;
use crate::error::SnapshotError;
use crate::snapshot::SnapshotDocument;
use std::path::{Path, PathBuf};

/// Tracks which snapshot file is open and whether it has unsaved edits
#[derive(Debug, Clone, Default)]
pub struct FileManager {
    /// Current file path (None if nothing has been opened or saved yet)
    current_file_path: Option<PathBuf>,
    /// Whether the document has been modified since last save
    is_modified: bool,
}

impl FileManager {
    pub fn new() -> Self {
        Self {
            current_file_path: None,
            is_modified: false,
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.is_modified
    }

    pub fn mark_modified(&mut self) {
        self.is_modified = true;
    }

    pub fn mark_saved(&mut self) {
        self.is_modified = false;
    }

    /// File name for titles, with `*` appended while there are unsaved changes
    pub fn get_file_display_name(&self) -> String {
        let name = self
            .current_file_path
            .as_ref()
            .and_then(|path| path.file_name())
            .and_then(|name| name.to_str())
            .unwrap_or(UNTITLED);

        if self.is_modified {
            format!("{}*", name)
        } else {
            name.to_string()
        }
    }

    /// Write the whole document, pretty-printed, and make `file_path` current
    pub fn save_to_file(&mut self, file_path: &Path, document: &SnapshotDocument) -> Result<(), SnapshotError> {
        let json_content = document.to_json_pretty()?;

        std::fs::write(file_path, json_content).map_err(|source| SnapshotError::Write {
            path: file_path.to_path_buf(),
            source,
        })?;

        self.current_file_path = Some(file_path.to_path_buf());
        self.is_modified = false;
        log::info!("Saved snapshot to {}", file_path.display());
        Ok(())
    }

    /// Read and parse a snapshot. Nothing changes on failure.
    pub fn load_from_file(&mut self, file_path: &Path) -> Result<SnapshotDocument, SnapshotError> {
        let file_content = std::fs::read_to_string(file_path).map_err(|source| SnapshotError::Read {
            path: file_path.to_path_buf(),
            source,
        })?;

        let document = SnapshotDocument::from_json_str(&file_content)?;

        self.current_file_path = Some(file_path.to_path_buf());
        self.is_modified = false;
        log::debug!(
            "Loaded {} top-level nodes from {}",
            document.nodes.len(),
            file_path.display()
        );
        Ok(document)
    }
}
