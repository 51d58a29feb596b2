//! CLI argument parsing for sloth-tracker

use crate::aggregator::AttributionPolicy;
use crate::config::TrackerConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for `--report`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Indented `hh:mm:ss - name` tree (default)
    #[default]
    Text,
    /// JSON in the persisted record shape
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "sloth-tracker")]
#[command(version)]
#[command(about = "Track time spent in each foreground application and window context", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding processes.json (overrides config and the per-user default)
    #[arg(short = 'd', long = "data-dir", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Milliseconds between samples
    #[arg(short = 'i', long = "interval-ms", value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Samples between autosaves
    #[arg(long = "autosave-ticks", value_name = "TICKS")]
    pub autosave_ticks: Option<u64>,

    /// Title noise token, may be repeated (replaces the configured list)
    #[arg(short = 'n', long = "noise", value_name = "TOKEN")]
    pub noise: Vec<String>,

    /// Which nodes are credited on each sample
    #[arg(short = 'a', long = "attribution", value_enum)]
    pub attribution: Option<AttributionPolicy>,

    /// Print the stored activity tree and exit
    #[arg(short = 'r', long = "report")]
    pub report: bool,

    /// Output format for --report
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Replay JSON-lines window snapshots instead of watching the desktop
    #[arg(long = "replay", value_name = "FILE", conflicts_with = "report")]
    pub replay: Option<PathBuf>,

    /// Print the activity tree to stdout after every save
    #[arg(long = "show-tree")]
    pub show_tree: bool,

    /// Enable trace-level logging on stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut TrackerConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if let Some(ms) = self.interval_ms {
            config.sample_interval_ms = ms;
        }
        if let Some(ticks) = self.autosave_ticks {
            config.autosave_ticks = ticks;
        }
        if !self.noise.is_empty() {
            config.noise_tokens = self.noise.clone();
        }
        if let Some(policy) = self.attribution {
            config.attribution = policy;
        }
    }
}
