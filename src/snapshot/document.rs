//! Snapshot document and its metadata block

use super::node::NodeMap;
use super::ordered_map::OrderedMap;
use crate::constants::meta as keys;
use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};

/// Root container of a snapshot file: `{"nodes": {...}, "meta": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub nodes: NodeMap,
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub meta: OrderedMap<String>,
}

impl SnapshotDocument {
    pub fn new(nodes: NodeMap) -> Self {
        Self {
            nodes,
            meta: OrderedMap::new(),
        }
    }

    /// Parse a snapshot. A missing `nodes` key or any structural mismatch is an error.
    ///
    /// Nesting depth is unbounded; the parser grows its stack onto the heap as needed.
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        deserializer.disable_recursion_limit();
        let document = Self::deserialize(serde_stacker::Deserializer::new(&mut deserializer))
            .map_err(SnapshotError::Malformed)?;
        deserializer.end().map_err(SnapshotError::Malformed)?;
        Ok(document)
    }

    /// Pretty-printed JSON, keys in document order
    pub fn to_json_pretty(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(SnapshotError::Serialize)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builder for the free-form `meta` block written next to exported nodes
#[derive(Debug, Clone)]
pub struct SnapshotMeta {
    file_name: String,
    file_path: String,
    comments: String,
    author: String,
    creation: String,
    host_version: String,
    comment_limit: usize,
    truncation_reported: bool,
}

impl SnapshotMeta {
    /// Author and creation time are taken from the current user and clock
    pub fn new(comment_limit: usize) -> Self {
        Self {
            file_name: String::new(),
            file_path: String::new(),
            comments: " ".to_string(),
            author: current_user(),
            creation: timestamp_now(),
            host_version: String::new(),
            comment_limit,
            truncation_reported: false,
        }
    }

    pub fn with_file(mut self, file_name: impl Into<String>, file_path: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self.file_path = file_path.into();
        self
    }

    pub fn with_host_version(mut self, version: impl Into<String>) -> Self {
        self.host_version = version.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_creation(mut self, creation: impl Into<String>) -> Self {
        self.creation = creation.into();
        self
    }

    /// Store the comment, cut to the character limit.
    ///
    /// Returns `true` the first time a comment had to be cut, so the caller can
    /// show its hint once; later truncations return `false`.
    pub fn set_comment(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        let truncated = trimmed.chars().count() > self.comment_limit;

        self.comments = if trimmed.is_empty() {
            " ".to_string()
        } else if truncated {
            trimmed.chars().take(self.comment_limit).collect()
        } else {
            trimmed.to_string()
        };

        if truncated && !self.truncation_reported {
            self.truncation_reported = true;
            log::info!("Comment cut to {} characters", self.comment_limit);
            return true;
        }
        false
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn creation(&self) -> &str {
        &self.creation
    }

    pub fn to_map(&self) -> OrderedMap<String> {
        let mut map = OrderedMap::new();
        map.insert(keys::FILE_NAME, self.file_name.clone());
        map.insert(keys::FILE_PATH, self.file_path.clone());
        map.insert(keys::COMMENTS, self.comments.clone());
        map.insert(keys::AUTHOR, self.author.clone());
        map.insert(keys::CREATION, self.creation.clone());
        map.insert(keys::HOST_VERSION, self.host_version.clone());
        map
    }
}

/// Login name of the invoking user
pub fn current_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|name| !name.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Local time as `YYYY-MM-DD HH:MM:SS`
pub fn timestamp_now() -> String {
    chrono::Local::now().format(keys::TIMESTAMP_FORMAT).to_string()
}
