//! Command line surface of the `nodesnap` binary

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::SyncConfig;
use crate::hierarchy::{build_hierarchy, flatten_hierarchy, flatten_selection};
use crate::session::SnapshotSession;
use crate::snapshot::SnapshotDocument;
use crate::sync::MemoryGraph;

#[derive(Parser, Debug)]
#[command(
    name = "nodesnap",
    version,
    about = "Inspect and replay node graph snapshots",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Snapshot file; defaults to <scene>/data/nodeExportData.json
    #[arg(long, global = true)]
    file: Option<PathBuf>,
    /// Scene directory used to locate the default snapshot file
    #[arg(long, global = true)]
    scene: Option<PathBuf>,
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Print the node hierarchy
    Tree,
    /// Load the snapshot and report what it holds
    Check,
    /// Print every record a selection expands to
    Select {
        /// Node names, or full paths starting with `/`
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Import into an empty in-memory graph and print where records land
    Replay {
        /// Node names or full paths; all top-level nodes when omitted
        names: Vec<String>,
        /// Top-level containers the graph starts with; taken from the records when omitted
        #[arg(long, value_delimiter = ',')]
        roots: Vec<String>,
    },
}

/// Top-level container names the records were exported from (`/obj/` -> `obj`)
fn recorded_roots(document: &SnapshotDocument) -> Vec<String> {
    let mut roots: Vec<String> = Vec::new();
    for node in document.nodes.values() {
        let root = node.root.trim_matches('/');
        if !root.is_empty() && !roots.iter().any(|known| known == root) {
            roots.push(root.to_string());
        }
    }
    roots
}

fn open_session(cli: &Cli) -> Result<SnapshotSession> {
    let config = match &cli.config {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };
    Ok(match &cli.file {
        Some(path) => SnapshotSession::new(path, config),
        None => SnapshotSession::for_scene(cli.scene.as_deref(), config),
    })
}

/// Read-only commands never create the snapshot file
fn load(session: &mut SnapshotSession) -> Result<SnapshotDocument> {
    let path: PathBuf = session.path().to_path_buf();
    let document = session
        .open_existing()
        .with_context(|| format!("cannot load snapshot {}", display(&path)))?;
    Ok(document.clone())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut session = open_session(&cli)?;
    let document = load(&mut session)?;

    match cli.cmd {
        Cmd::Tree => {
            for item in flatten_hierarchy(&build_hierarchy(&document)) {
                println!("{}{}", "  ".repeat(item.depth), item.display_label());
            }
        }
        Cmd::Check => {
            let tree = build_hierarchy(&document);
            println!("Snapshot {}", display(session.path()));
            println!("  top-level nodes = {}", document.nodes.len());
            println!("  total nodes     = {}", flatten_hierarchy(&tree).len());
            for (key, value) in document.meta.iter() {
                println!("  {:<15} = {}", key, value);
            }
        }
        Cmd::Select { names } => {
            let selection = flatten_selection(&names, &document);
            for entry in &selection {
                println!("{}", entry.full_path);
            }
            log::info!("{} records selected", selection.len());
        }
        Cmd::Replay { names, roots } => {
            let names: Vec<String> = if names.is_empty() {
                document.nodes.keys().map(str::to_string).collect()
            } else {
                names
            };
            let roots = if roots.is_empty() { recorded_roots(&document) } else { roots };
            let root_names: Vec<&str> = roots.iter().map(String::as_str).collect();

            let mut graph = MemoryGraph::with_roots(&root_names);
            let report = session.import_selected(&names, &mut graph)?;
            for path in &report.resolved {
                let marker = if report.created.contains(path) { "+" } else { " " };
                println!("{} {}", marker, path);
            }
            for skipped in &report.skipped {
                println!("! {} ({})", skipped.full_path, skipped.reason);
            }
        }
    }
    Ok(())
}
