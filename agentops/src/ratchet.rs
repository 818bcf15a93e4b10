//! RPI ratchet — the append-only chain of completed workflow steps.
//!
//! The ratchet enforces forward progress through Research → Plan →
//! Pre-mortem → Implement → Vibe → Post-mortem. Writers emit the canonical
//! line form (`step` + `status`); the reader also accepts the two legacy
//! forms (`gate` instead of `step`, and `locked: true` instead of
//! `status: "locked"`). The chain rotates once it grows past
//! `AGENTOPS_CHAIN_MAX_LINES`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::OpsConfig;
use crate::layout::AgentsLayout;

/// The six RPI phases, in ratchet order.
pub const RPI_PHASES: [&str; 6] = [
    "research",
    "plan",
    "pre_mortem",
    "implement",
    "vibe",
    "post_mortem",
];

/// Outcome of one workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    Blocked,
    Locked,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Blocked => write!(f, "blocked"),
            Self::Locked => write!(f, "locked"),
        }
    }
}

/// One ratchet entry, canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatchetStep {
    pub step: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
}

impl RatchetStep {
    pub fn completed(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Completed,
            output: None,
            time: Utc::now(),
            attempt: None,
        }
    }

    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }
}

/// Ratchet failures.
#[derive(Debug, Error)]
pub enum RatchetError {
    /// The `rpi/KILL` file is present; recording is refused.
    #[error("kill switch engaged at {path}")]
    KillSwitch { path: PathBuf },

    #[error("ratchet I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ratchet JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handle on one repository's ratchet chain.
pub struct RatchetChain {
    path: PathBuf,
    kill_switch: PathBuf,
    /// Rotation cap override; `None` reads the environment per operation.
    max_lines: Option<usize>,
}

impl RatchetChain {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let layout = AgentsLayout::new(base);
        Self {
            path: layout.ratchet_chain(),
            kill_switch: layout.kill_switch(),
            max_lines: None,
        }
    }

    /// Pin the rotation cap instead of reading `AGENTOPS_CHAIN_MAX_LINES`.
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = Some(max_lines);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one step in the canonical form, rotating first if the chain
    /// has outgrown the configured line cap. Refuses while the kill switch
    /// file exists.
    pub fn record(&self, step: &RatchetStep) -> Result<(), RatchetError> {
        if self.kill_switch.exists() {
            return Err(RatchetError::KillSwitch {
                path: self.kill_switch.clone(),
            });
        }

        // Read the knob fresh on every operation unless pinned.
        let max_lines = self
            .max_lines
            .unwrap_or_else(|| OpsConfig::from_env().chain_max_lines);
        self.rotate_if_needed(max_lines)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(step)?)?;
        debug!(step = %step.step, status = %step.status, "ratchet step recorded");
        Ok(())
    }

    /// Every readable step, canonical and legacy forms alike. Lines that
    /// fit neither form are skipped.
    pub fn status(&self) -> Result<Vec<RatchetStep>, RatchetError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(std::fs::File::open(&self.path)?);
        Ok(reader
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| parse_step_line(&line))
            .collect())
    }

    /// The first RPI phase not yet completed or skipped, if any.
    pub fn next_phase(&self) -> Result<Option<&'static str>, RatchetError> {
        let steps = self.status()?;
        Ok(RPI_PHASES.iter().copied().find(|phase| {
            !steps.iter().any(|s| {
                s.step == *phase
                    && matches!(s.status, StepStatus::Completed | StepStatus::Skipped)
            })
        }))
    }

    fn rotate_if_needed(&self, max_lines: usize) -> Result<(), RatchetError> {
        if !self.path.exists() {
            return Ok(());
        }
        let lines = BufReader::new(std::fs::File::open(&self.path)?)
            .lines()
            .count();
        if lines < max_lines {
            return Ok(());
        }

        let mut n = 1u32;
        let archived = loop {
            let candidate = self.path.with_file_name(format!("chain-{n}.jsonl"));
            if !candidate.exists() {
                break candidate;
            }
            n += 1;
        };
        std::fs::rename(&self.path, &archived)?;
        warn!(lines, archived = %archived.display(), "ratchet chain rotated");
        Ok(())
    }
}

/// Parse one chain line: canonical first, then the legacy `gate` and
/// `locked: true` forms.
fn parse_step_line(line: &str) -> Option<RatchetStep> {
    if let Ok(step) = serde_json::from_str::<RatchetStep>(line) {
        return Some(step);
    }

    let value: Value = serde_json::from_str(line).ok()?;
    let obj = value.as_object()?;

    let step = obj
        .get("step")
        .or_else(|| obj.get("gate"))
        .and_then(Value::as_str)?
        .to_string();

    let status = if obj.get("locked").and_then(Value::as_bool) == Some(true) {
        StepStatus::Locked
    } else {
        match obj.get("status").and_then(Value::as_str)? {
            "completed" => StepStatus::Completed,
            "skipped" => StepStatus::Skipped,
            "blocked" => StepStatus::Blocked,
            "locked" => StepStatus::Locked,
            _ => return None,
        }
    };

    let time = obj
        .get("time")
        .and_then(Value::as_str)
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Some(RatchetStep {
        step,
        status,
        output: obj
            .get("output")
            .and_then(Value::as_str)
            .map(String::from),
        time,
        attempt: obj
            .get("attempt")
            .and_then(Value::as_u64)
            .map(|a| a as u32),
    })
}
