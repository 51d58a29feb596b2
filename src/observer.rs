//! Active window observation
//!
//! The tracker only needs to know which process owns the foreground window
//! and what that window's title is. Platform adapters implement
//! [`WindowObserver`]; [`ReplayObserver`] feeds recorded snapshots instead of
//! a live desktop.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// What was in the foreground at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Owning process name, empty when nothing is focused
    #[serde(default)]
    pub process_name: String,
    /// Raw window title, may be empty
    #[serde(default)]
    pub window_title: String,
}

impl WindowSnapshot {
    pub fn new(process_name: impl Into<String>, window_title: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
            window_title: window_title.into(),
        }
    }
}

/// Errors reported by a window observer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObserverError {
    /// No foreground window, or its process vanished mid-query
    #[error("Active window unavailable: {0}")]
    Unavailable(String),

    /// A finite snapshot source has nothing left to report
    #[error("Observer has no more snapshots")]
    Exhausted,
}

/// Source of foreground window snapshots
pub trait WindowObserver {
    /// Report the current foreground window
    fn active_window(&mut self) -> std::result::Result<WindowSnapshot, ObserverError>;
}

/// Replays snapshots recorded as JSON lines
///
/// Each non-blank line is an object with `process_name` and `window_title`.
/// After the last snapshot every call returns [`ObserverError::Exhausted`].
#[derive(Debug, Clone, Default)]
pub struct ReplayObserver {
    pending: VecDeque<WindowSnapshot>,
}

impl ReplayObserver {
    pub fn new(snapshots: impl IntoIterator<Item = WindowSnapshot>) -> Self {
        Self {
            pending: snapshots.into_iter().collect(),
        }
    }

    /// Parse JSON-lines snapshots from a reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut pending = VecDeque::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read replay input")?;
            if line.trim().is_empty() {
                continue;
            }
            let snapshot: WindowSnapshot = serde_json::from_str(&line)
                .with_context(|| format!("Invalid snapshot on replay line {}", index + 1))?;
            pending.push_back(snapshot);
        }
        Ok(Self { pending })
    }

    /// Load JSON-lines snapshots from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = fs::File::open(path.as_ref()).with_context(|| {
            format!("Failed to open replay file: {}", path.as_ref().display())
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Snapshots not yet handed out
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl WindowObserver for ReplayObserver {
    fn active_window(&mut self) -> std::result::Result<WindowSnapshot, ObserverError> {
        self.pending.pop_front().ok_or(ObserverError::Exhausted)
    }
}

/// X11 observer backed by the `xdotool` command
///
/// Window id, pid and title come from a single chained `xdotool` call; the
/// process name is the file name of `/proc/<pid>/exe`, or `/proc/<pid>/comm`
/// when the executable link cannot be read.
#[derive(Debug, Default)]
pub struct XdotoolObserver {
    spawn_failure_reported: bool,
}

impl XdotoolObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowObserver for XdotoolObserver {
    fn active_window(&mut self) -> std::result::Result<WindowSnapshot, ObserverError> {
        let output = match Command::new("xdotool")
            .args(["getactivewindow", "getwindowpid", "getwindowname"])
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                if !self.spawn_failure_reported {
                    tracing::warn!(error = %err, "Cannot run xdotool; no windows will be recorded");
                    self.spawn_failure_reported = true;
                }
                return Err(ObserverError::Unavailable(format!("xdotool: {}", err)));
            }
        };

        if !output.status.success() {
            return Err(ObserverError::Unavailable(format!(
                "xdotool exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (pid, title) = parse_xdotool_output(&stdout)?;
        let process_name = process_name_for_pid(pid)?;

        Ok(WindowSnapshot::new(process_name, title))
    }
}

/// Split `"<pid>\n<title>\n"` into its parts
fn parse_xdotool_output(stdout: &str) -> std::result::Result<(u32, String), ObserverError> {
    let (pid_line, rest) = stdout.split_once('\n').unwrap_or((stdout, ""));
    let pid = pid_line
        .trim()
        .parse::<u32>()
        .map_err(|_| ObserverError::Unavailable(format!("invalid pid {:?}", pid_line.trim())))?;
    let title = rest.strip_suffix('\n').unwrap_or(rest).to_string();
    Ok((pid, title))
}

fn process_name_for_pid(pid: u32) -> std::result::Result<String, ObserverError> {
    process_name_in(Path::new(&format!("/proc/{}", pid)))
        .map_err(|err| ObserverError::Unavailable(format!("process {} gone: {}", pid, err)))
}

/// Resolve a process name from its `/proc/<pid>` directory
///
/// `comm` is truncated to 15 bytes by the kernel, so the executable's file
/// name is preferred. Other users' `exe` links are unreadable; `comm` is not.
fn process_name_in(proc_dir: &Path) -> std::io::Result<String> {
    if let Ok(exe) = fs::read_link(proc_dir.join("exe")) {
        if let Some(name) = exe.file_name().and_then(|name| name.to_str()) {
            let name = name.strip_suffix(" (deleted)").unwrap_or(name);
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }
    }
    let comm = fs::read_to_string(proc_dir.join("comm"))?;
    Ok(comm.trim().to_string())
}
