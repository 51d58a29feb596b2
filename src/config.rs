//! Tracker configuration
//!
//! Defaults can be overridden by a TOML file, which in turn can be
//! overridden from the command line. Keys missing from the file keep their
//! defaults.
//!
//! ```toml
//! sample_interval_ms = 1000
//! autosave_ticks = 300
//! noise_tokens = ["youtube", "twitch"]
//! attribution = "root"
//! data_dir = "/home/me/.local/share/SlothsTimeTracker"
//! ```

use crate::aggregator::AttributionPolicy;
use crate::persistence::{self, ForestStore};
use crate::segmenter::DEFAULT_NOISE_TOKENS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for sampling, autosave and title filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Time between sample ticks; each recorded tick credits one second
    pub sample_interval_ms: u64,

    /// Sample ticks between autosaves (300 ticks = 5 minutes at 1s)
    pub autosave_ticks: u64,

    /// Title segments containing any of these (case-insensitive) are dropped
    pub noise_tokens: Vec<String>,

    /// Which nodes receive time on each tick
    pub attribution: AttributionPolicy,

    /// Directory holding `processes.json`; per-user data dir when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1000,
            autosave_ticks: 300,
            noise_tokens: DEFAULT_NOISE_TOKENS.iter().map(|s| s.to_string()).collect(),
            attribution: AttributionPolicy::Root,
            data_dir: None,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_interval_ms == 0 {
            return Err("sample_interval_ms must be > 0".to_string());
        }

        if self.autosave_ticks == 0 {
            return Err("autosave_ticks must be > 0".to_string());
        }

        if let Some(token) = self.noise_tokens.iter().find(|t| t.trim().is_empty()) {
            return Err(format!("noise_tokens must not contain blank entries, got {:?}", token));
        }

        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.saturating_mul(self.autosave_ticks))
    }

    /// Store for the configured data directory
    pub fn store(&self) -> persistence::Result<ForestStore> {
        match &self.data_dir {
            Some(dir) => Ok(ForestStore::in_dir(dir)),
            None => ForestStore::default_location(),
        }
    }
}
