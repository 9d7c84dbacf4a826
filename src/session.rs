//! Snapshot session
//!
//! Ties a snapshot file to the sync layer. Every public entry point first
//! makes sure the file exists and the document is loaded.

use crate::config::SyncConfig;
use crate::constants::file::EMPTY_DOCUMENT;
use crate::editor::{FileManager, SnapshotEditor};
use crate::error::SnapshotError;
use crate::snapshot::{SnapshotDocument, SnapshotMeta};
use crate::sync::{export_selection, import_and_apply, GraphCapability, ImportReport};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// What an export wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub nodes: usize,
    /// Set the first time in this session a comment had to be cut
    pub show_comment_hint: bool,
}

/// One snapshot file and its loaded canonical document
#[derive(Debug)]
pub struct SnapshotSession {
    config: SyncConfig,
    path: PathBuf,
    files: FileManager,
    document: Option<SnapshotDocument>,
    scene_name: String,
    host_version: String,
    comment_hint_shown: bool,
}

impl SnapshotSession {
    pub fn new(path: impl Into<PathBuf>, config: SyncConfig) -> Self {
        Self {
            config,
            path: path.into(),
            files: FileManager::new(),
            document: None,
            scene_name: String::new(),
            host_version: String::new(),
            comment_hint_shown: false,
        }
    }

    /// Session on the default snapshot file of a scene directory
    pub fn for_scene(scene_dir: Option<&Path>, config: SyncConfig) -> Self {
        let path = config.default_snapshot_path(scene_dir);
        Self::new(path, config)
    }

    /// Scene file name recorded as `File Name` in exported metadata
    pub fn with_scene_name(mut self, name: impl Into<String>) -> Self {
        self.scene_name = name.into();
        self
    }

    /// Version string recorded in exported metadata
    pub fn with_host_version(mut self, version: impl Into<String>) -> Self {
        self.host_version = version.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// File name for titles, with `*` while applied edits differ from the file
    pub fn display_name(&self) -> String {
        self.files.get_file_display_name()
    }

    pub fn has_unsaved_edits(&self) -> bool {
        self.files.has_unsaved_changes()
    }

    /// Record whether an editor's working copy has drifted from the file
    pub fn track_edits(&mut self, editor: &SnapshotEditor) {
        if editor.is_dirty() {
            self.files.mark_modified();
        } else {
            self.files.mark_saved();
        }
    }

    fn ensure_directory(&self) -> Result<(), SnapshotError> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| SnapshotError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    /// Create the snapshot file when missing, then load it unless already loaded.
    ///
    /// A malformed file fails here and nothing is loaded.
    pub fn ensure_document_loaded(&mut self) -> Result<&SnapshotDocument, SnapshotError> {
        if self.document.is_none() && !self.path.exists() {
            self.ensure_directory()?;
            std::fs::write(&self.path, EMPTY_DOCUMENT).map_err(|source| SnapshotError::Write {
                path: self.path.clone(),
                source,
            })?;
            info!("Created empty snapshot {}", self.path.display());
        }
        self.open_existing()
    }

    /// Load the snapshot file unless already loaded. A missing file is a read error.
    pub fn open_existing(&mut self) -> Result<&SnapshotDocument, SnapshotError> {
        if let Some(document) = self.document.take() {
            return Ok(self.document.insert(document));
        }
        let document = self.files.load_from_file(&self.path)?;
        Ok(self.document.insert(document))
    }

    /// Drop the loaded copy and read the file again
    pub fn reload(&mut self) -> Result<&SnapshotDocument, SnapshotError> {
        self.document = None;
        self.ensure_document_loaded()
    }

    pub fn document(&mut self) -> Result<&SnapshotDocument, SnapshotError> {
        self.ensure_document_loaded()
    }

    /// An editor over the loaded document
    pub fn editor(&mut self) -> Result<SnapshotEditor, SnapshotError> {
        let document = self.ensure_document_loaded()?;
        Ok(SnapshotEditor::new(document))
    }

    /// Export the graph's current selection, overwriting the snapshot file.
    ///
    /// Whatever the file held before, unreadable contents included, is
    /// replaced. The written document becomes the loaded canonical copy.
    pub fn export_to_file<G: GraphCapability>(
        &mut self,
        graph: &mut G,
        comment: &str,
    ) -> Result<ExportSummary, SnapshotError> {
        self.ensure_directory()?;

        let mut document = export_selection(graph, &self.config);

        let mut meta = SnapshotMeta::new(self.config.comment_limit)
            .with_file(self.scene_name.clone(), self.path.display().to_string())
            .with_host_version(self.host_version.clone());

        let truncated = meta.set_comment(comment);
        let show_comment_hint = truncated && !self.comment_hint_shown;
        if show_comment_hint {
            self.comment_hint_shown = true;
            warn!("Comment longer than {} characters was cut", self.config.comment_limit);
        }
        document.meta = meta.to_map();

        self.files.save_to_file(&self.path, &document)?;
        let nodes = document.nodes.len();
        self.document = Some(document);

        Ok(ExportSummary {
            path: self.path.clone(),
            nodes,
            show_comment_hint,
        })
    }

    /// Import the selected records of the loaded document into the graph
    pub fn import_selected<I, S, G>(&mut self, selectors: I, graph: &mut G) -> Result<ImportReport, SnapshotError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        G: GraphCapability,
    {
        let config = self.config.clone();
        let document = self.ensure_document_loaded()?;
        Ok(import_and_apply(selectors, document, graph, &config))
    }

    /// Apply an editor's working copy. The snapshot file is left untouched.
    pub fn apply_edits<I, S, G>(
        &mut self,
        editor: &SnapshotEditor,
        selectors: I,
        graph: &mut G,
    ) -> Result<ImportReport, SnapshotError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        G: GraphCapability,
    {
        self.ensure_document_loaded()?;
        let report = import_and_apply(selectors, &editor.working_document(), graph, &self.config);
        self.track_edits(editor);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::meta;
    use crate::snapshot::ParamValue;
    use crate::sync::MemoryGraph;

    fn scene() -> MemoryGraph {
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        let geo = graph.add_node("/obj", "geo", "geo1").unwrap();
        graph.set_parameter(geo, "scale", ParamValue::Float(2.0));
        graph.add_node("/obj/geo1", "box", "box1").unwrap();
        graph.select("/obj/geo1");
        graph
    }

    #[test]
    fn test_missing_file_created_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nodeExportData.json");
        let mut session = SnapshotSession::new(&path, SyncConfig::default());

        assert!(session.ensure_document_loaded().unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), EMPTY_DOCUMENT);
        assert_eq!(session.display_name(), "nodeExportData.json");
    }

    #[test]
    fn test_malformed_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(&path, r#"{"items": []}"#).unwrap();

        let mut session = SnapshotSession::new(&path, SyncConfig::default());
        assert!(matches!(session.document(), Err(SnapshotError::Malformed(_))));
        let mut graph = MemoryGraph::with_roots(&["obj"]);
        assert!(session.import_selected(["geo1"], &mut graph).is_err());
        assert!(graph.calls().is_empty());
    }

    #[test]
    fn test_export_writes_nodes_and_meta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let mut session = SnapshotSession::new(&path, SyncConfig::default())
            .with_scene_name("shot010.hip")
            .with_host_version("20.5.332");

        let summary = session.export_to_file(&mut scene(), "  first pass  ").unwrap();
        assert_eq!(summary.nodes, 1);
        assert!(!summary.show_comment_hint);

        let document = session.reload().unwrap();
        assert!(document.nodes.get("geo1").unwrap().children.contains_key("box1"));
        assert_eq!(document.meta.get(meta::COMMENTS).map(String::as_str), Some("first pass"));
        assert_eq!(document.meta.get(meta::FILE_NAME).map(String::as_str), Some("shot010.hip"));
        let recorded_path = path.display().to_string();
        assert_eq!(document.meta.get(meta::FILE_PATH), Some(&recorded_path));
        assert_eq!(document.meta.get(meta::HOST_VERSION).map(String::as_str), Some("20.5.332"));
        let keys: Vec<&str> = document.meta.keys().collect();
        assert_eq!(
            keys,
            vec!["File Name", "File Path", "Comments", "Author", "Creation", "Host Version"]
        );
    }

    #[test]
    fn test_long_comment_hint_shown_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SnapshotSession::new(dir.path().join("snap.json"), SyncConfig::default());
        let comment = "x".repeat(600);

        assert!(session.export_to_file(&mut scene(), &comment).unwrap().show_comment_hint);
        assert!(!session.export_to_file(&mut scene(), &comment).unwrap().show_comment_hint);

        let stored = session.document().unwrap().meta.get(meta::COMMENTS).unwrap().clone();
        assert_eq!(stored.chars().count(), 500);
    }

    #[test]
    fn test_export_then_import_into_fresh_graph() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = SnapshotSession::new(dir.path().join("snap.json"), SyncConfig::default());
        session.export_to_file(&mut scene(), "").unwrap();

        let mut fresh = MemoryGraph::with_roots(&["obj"]);
        let report = session.import_selected(["geo1"], &mut fresh).unwrap();
        assert_eq!(report.resolved, vec!["/obj/geo1", "/obj/geo1/box1"]);
        let geo = fresh.node_at("/obj/geo1").unwrap();
        assert_eq!(fresh.parameter(geo, "scale"), Some(&ParamValue::Float(2.0)));
    }

    #[test]
    fn test_apply_edits_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let mut session = SnapshotSession::new(&path, SyncConfig::default());
        let mut graph = scene();
        session.export_to_file(&mut graph, "").unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();

        let mut editor = session.editor().unwrap();
        editor.select("/obj/geo1", || true);
        editor.begin_edit();
        editor.set_cell("scale", "3.5");
        editor.save();

        session.apply_edits(&editor, ["geo1"], &mut graph).unwrap();
        let geo = graph.node_at("/obj/geo1").unwrap();
        assert_eq!(graph.parameter(geo, "scale"), Some(&ParamValue::Float(3.5)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);

        assert!(session.has_unsaved_edits());
        assert_eq!(session.display_name(), "snap.json*");
        session.export_to_file(&mut graph, "").unwrap();
        assert_eq!(session.display_name(), "snap.json");
    }

    #[test]
    fn test_export_replaces_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let mut session = SnapshotSession::new(&path, SyncConfig::default());
        assert!(matches!(session.document(), Err(SnapshotError::Malformed(_))));

        let summary = session.export_to_file(&mut scene(), "").unwrap();
        assert_eq!(summary.nodes, 1);
        let reread = SnapshotDocument::from_json_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(reread.nodes.contains_key("geo1"));
        assert!(session.document().unwrap().nodes.contains_key("geo1"));
    }

    #[test]
    fn test_open_existing_does_not_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nodeExportData.json");
        let mut session = SnapshotSession::new(&path, SyncConfig::default());

        assert!(matches!(session.open_existing(), Err(SnapshotError::Read { .. })));
        assert!(!path.exists());
        assert!(!dir.path().join("data").exists());
    }
}
