//! Durable storage of the activity forest
//!
//! The forest is stored as a JSON array of process records at
//! `<local data dir>/SlothsTimeTracker/processes.json`. Each record carries
//! `name`, `time` (seconds), `children` and `startTime`. Parent links are not
//! stored; they are rebuilt while the records are attached to a new forest.
//!
//! Writes go straight to the target file. The in-memory forest is the source
//! of truth between saves, and a failed save is simply retried at the next
//! autosave.

use crate::tree::{ActivityForest, NodeId};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory created under the per-user local data directory
pub const APP_DIR_NAME: &str = "SlothsTimeTracker";

/// File holding the serialized forest
pub const DATA_FILE_NAME: &str = "processes.json";

/// Errors that can occur while saving or loading the forest
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt activity file {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize activity forest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No per-user data directory available on this platform")]
    NoDataDir,
}

/// Result type for persistence operations
pub type Result<T> = std::result::Result<T, PersistError>;

/// On-disk shape of one node and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub name: String,
    /// Cumulative seconds
    pub time: u64,
    #[serde(default)]
    pub children: Vec<ProcessRecord>,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Local>,
}

impl ProcessRecord {
    /// Snapshot a forest into records, preserving root and child order
    pub fn from_forest(forest: &ActivityForest) -> Vec<Self> {
        forest
            .roots()
            .iter()
            .map(|&id| Self::from_node(forest, id))
            .collect()
    }

    fn from_node(forest: &ActivityForest, id: NodeId) -> Self {
        let node = forest.node(id);
        Self {
            name: node.name().to_string(),
            time: node.cumulative_seconds(),
            children: node
                .children()
                .iter()
                .map(|&child| Self::from_node(forest, child))
                .collect(),
            start_time: node.first_seen(),
        }
    }

    /// Rebuild a forest, assigning each child's parent as it is attached
    pub fn into_forest(records: Vec<Self>) -> ActivityForest {
        let mut forest = ActivityForest::new();
        for record in records {
            record.attach_to(&mut forest, None);
        }
        forest
    }

    fn attach_to(self, forest: &mut ActivityForest, parent: Option<NodeId>) {
        let id = forest.attach(parent, &self.name, self.time, self.start_time);
        for child in self.children {
            child.attach_to(forest, Some(id));
        }
    }
}

/// Reads and writes the forest at a fixed path
#[derive(Debug, Clone)]
pub struct ForestStore {
    path: PathBuf,
}

impl ForestStore {
    /// Store backed by an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store using `processes.json` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DATA_FILE_NAME))
    }

    /// Store at the well-known per-user location
    pub fn default_location() -> Result<Self> {
        let base = dirs::data_local_dir().ok_or(PersistError::NoDataDir)?;
        Ok(Self::in_dir(base.join(APP_DIR_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the forest and overwrite the file
    pub fn save(&self, forest: &ActivityForest) -> Result<()> {
        let json = serde_json::to_string(&ProcessRecord::from_forest(forest))?;
        self.ensure_parent_dir()?;
        fs::write(&self.path, json).map_err(|source| self.io_error(source))?;
        tracing::debug!(path = %self.path.display(), roots = forest.roots().len(), "Saved activity forest");
        Ok(())
    }

    /// Load the forest
    ///
    /// A missing file is created holding an empty forest. A file with no
    /// content yields an empty forest rather than an error.
    pub fn load(&self) -> Result<ActivityForest> {
        if !self.path.exists() {
            let empty = ActivityForest::new();
            self.save(&empty)?;
            tracing::info!(path = %self.path.display(), "Created new activity file");
            return Ok(empty);
        }

        let content = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        if content.trim().is_empty() {
            return Ok(ActivityForest::new());
        }

        let records: Vec<ProcessRecord> =
            serde_json::from_str(&content).map_err(|source| PersistError::Deserialize {
                path: self.path.clone(),
                source,
            })?;
        Ok(ProcessRecord::into_forest(records))
    }

    /// Load the forest, setting a corrupt file aside instead of failing
    ///
    /// The unreadable file is renamed to `processes.json.corrupt-<unix secs>`
    /// so the next save does not destroy it, and tracking starts empty.
    pub fn load_or_recover(&self) -> Result<ActivityForest> {
        match self.load() {
            Err(PersistError::Deserialize { source, .. }) => {
                let backup = self.backup_path();
                fs::rename(&self.path, &backup).map_err(|source| self.io_error(source))?;
                tracing::warn!(
                    error = %source,
                    backup = %backup.display(),
                    "Activity file was corrupt; starting with an empty forest"
                );
                Ok(ActivityForest::new())
            }
            other => other,
        }
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".corrupt-{}", Local::now().timestamp()));
        PathBuf::from(name)
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).map_err(|source| PersistError::Io {
                    path: dir.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }

    fn io_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
