//! Environment snapshot — tool presence and git state at session start.
//!
//! Written atomically to `.agents/ao/environment.json` so hooks can decide
//! what to skip without probing the machine themselves. Probes never fail
//! the snapshot: an absent tool is recorded as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::layout::AgentsLayout;

/// Tools the hook layer cares about by default.
pub const DEFAULT_TOOLS: &[&str] = &["git", "go", "pytest", "npm", "make", "jq"];

/// Git repository state, when git is present and the base is a repo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitState {
    pub branch: Option<String>,
    pub dirty: Option<bool>,
}

/// The persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// Tool name → present on PATH.
    pub tools: BTreeMap<String, bool>,
    pub git: GitState,
    pub captured_at: DateTime<Utc>,
}

impl EnvironmentSnapshot {
    /// Probe the default tool set and git state under `base`.
    pub fn capture(base: impl AsRef<Path>) -> Self {
        Self::capture_tools(base, DEFAULT_TOOLS)
    }

    /// Probe a specific tool list.
    pub fn capture_tools(base: impl AsRef<Path>, tools: &[&str]) -> Self {
        let tools = tools
            .iter()
            .map(|t| ((*t).to_string(), on_path(t)))
            .collect();
        Self {
            tools,
            git: git_state(base.as_ref()),
            captured_at: Utc::now(),
        }
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.get(name).copied().unwrap_or(false)
    }

    /// Write the snapshot atomically to `.agents/ao/environment.json`.
    pub fn write(&self, base: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let path = AgentsLayout::new(base).environment_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Read a previously written snapshot, if one exists and decodes.
    pub fn read(base: impl AsRef<Path>) -> Option<Self> {
        let path = AgentsLayout::new(base).environment_file();
        let text = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }
}

/// PATH lookup without spawning a shell.
fn on_path(binary: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| {
        let candidate = dir.join(binary);
        candidate.is_file()
    })
}

/// Probe git state with array-form invocations; any failure degrades to
/// an empty state.
fn git_state(base: &Path) -> GitState {
    let branch = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(base)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .current_dir(base)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| !o.stdout.is_empty());

    GitState { branch, dirty }
}
