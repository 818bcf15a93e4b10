//! Environment-variable configuration.
//!
//! Every knob is read fresh from the environment at the start of the
//! operation that consults it. Nothing here is cached across operations, so
//! hook tests can flip a variable and observe the change on the very next
//! call.

use serde::{Deserialize, Serialize};

/// Enforcement mode for the MemRL policy engine (`MEMRL_MODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemrlMode {
    /// Evaluate but do not enforce (legacy behavior).
    Off,
    /// Evaluate and record.
    Observe,
    /// Evaluate, record, and drive retry/escalate at the orchestrator layer.
    Enforce,
}

impl MemrlMode {
    /// Read `MEMRL_MODE`. Unknown values fall back to `Off`.
    pub fn from_env() -> Self {
        match std::env::var("MEMRL_MODE").as_deref() {
            Ok("observe") => Self::Observe,
            Ok("enforce") => Self::Enforce,
            _ => Self::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Observe => "observe",
            Self::Enforce => "enforce",
        }
    }
}

impl std::fmt::Display for MemrlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knowledge availability tier (`KNOWLEDGE_TIER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnowledgeTier {
    /// Requires MCP availability; missing infrastructure blocks.
    Strict,
    /// Default behavior.
    Standard,
    /// Bare-minimum knowledge surface.
    Minimal,
}

impl KnowledgeTier {
    /// Read `KNOWLEDGE_TIER`. Unknown values fall back to `Standard`.
    pub fn from_env() -> Self {
        match std::env::var("KNOWLEDGE_TIER").as_deref() {
            Ok("STRICT") => Self::Strict,
            Ok("MINIMAL") => Self::Minimal,
            _ => Self::Standard,
        }
    }
}

/// Batch feedback knobs (`AGENTOPS_BATCH_FEEDBACK_*`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchFeedbackConfig {
    /// Look back this many days of sessions.
    pub days: u32,
    /// Cap on sessions processed per run.
    pub max_sessions: u32,
    /// Wall-clock budget for a batch run, in seconds.
    pub runtime_secs: u64,
    /// Reward applied to batch-confirmed citations.
    pub reward: f64,
}

impl Default for BatchFeedbackConfig {
    fn default() -> Self {
        Self {
            days: 7,
            max_sessions: 20,
            runtime_secs: 300,
            reward: 1.0,
        }
    }
}

/// Snapshot of every environment knob, taken at one instant.
///
/// Callers construct this at operation start and drop it at operation end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    pub memrl_mode: MemrlMode,
    pub knowledge_tier: KnowledgeTier,
    /// Global hook kill switch (`AGENTOPS_HOOKS_DISABLED`).
    pub hooks_disabled: bool,
    /// Ratchet chain rotation threshold (`AGENTOPS_CHAIN_MAX_LINES`).
    pub chain_max_lines: usize,
    /// Context-guard token budget (`AGENTOPS_CONTEXT_MAX_TOKENS`), if set.
    pub context_max_tokens: Option<u64>,
    /// Auto-prune `.agents/` when file count exceeds 500
    /// (`AGENTOPS_PRUNE_AUTO`).
    pub prune_auto: bool,
    /// Disable maturity expire/evict (`AGENTOPS_EVICTION_DISABLED`).
    pub eviction_disabled: bool,
    pub batch_feedback: BatchFeedbackConfig,
}

/// Default rotation threshold for the ratchet chain.
pub const DEFAULT_CHAIN_MAX_LINES: usize = 200;

/// `.agents/` file count above which auto-prune engages.
pub const PRUNE_FILE_THRESHOLD: usize = 500;

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes")
    )
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl OpsConfig {
    /// Read every knob from the environment right now.
    pub fn from_env() -> Self {
        let defaults = BatchFeedbackConfig::default();
        Self {
            memrl_mode: MemrlMode::from_env(),
            knowledge_tier: KnowledgeTier::from_env(),
            hooks_disabled: env_flag("AGENTOPS_HOOKS_DISABLED"),
            chain_max_lines: env_parse("AGENTOPS_CHAIN_MAX_LINES")
                .unwrap_or(DEFAULT_CHAIN_MAX_LINES),
            context_max_tokens: env_parse("AGENTOPS_CONTEXT_MAX_TOKENS"),
            prune_auto: env_flag("AGENTOPS_PRUNE_AUTO"),
            eviction_disabled: env_flag("AGENTOPS_EVICTION_DISABLED"),
            batch_feedback: BatchFeedbackConfig {
                days: env_parse("AGENTOPS_BATCH_FEEDBACK_DAYS").unwrap_or(defaults.days),
                max_sessions: env_parse("AGENTOPS_BATCH_FEEDBACK_MAX_SESSIONS")
                    .unwrap_or(defaults.max_sessions),
                runtime_secs: env_parse("AGENTOPS_BATCH_FEEDBACK_RUNTIME_SECS")
                    .unwrap_or(defaults.runtime_secs),
                reward: env_parse("AGENTOPS_BATCH_FEEDBACK_REWARD").unwrap_or(defaults.reward),
            },
        }
    }

    /// Per-hook kill switch: `AGENTOPS_<HOOK>_DISABLED`, with the hook name
    /// upper-cased and dashes mapped to underscores. The global switch wins.
    pub fn hook_disabled(&self, hook: &str) -> bool {
        if self.hooks_disabled {
            return true;
        }
        let var = format!(
            "AGENTOPS_{}_DISABLED",
            hook.to_ascii_uppercase().replace('-', "_")
        );
        env_flag(&var)
    }
}
