//! The policy contract: rule table, failure-class taxonomy, validation,
//! and the built-in default contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rollback::{default_rollback_matrix, RollbackTrigger};
use crate::config::MemrlMode;

/// Wildcard value accepted in a rule's `failure_class` / `attempt_bucket`.
pub const WILDCARD: &str = "*";

/// The closed failure-class taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    PreMortemFail,
    CrankBlocked,
    CrankPartial,
    VibeFail,
    PhaseTimeout,
    PhaseStall,
    PhaseExitError,
}

impl FailureClass {
    pub const ALL: [FailureClass; 7] = [
        Self::PreMortemFail,
        Self::CrankBlocked,
        Self::CrankPartial,
        Self::VibeFail,
        Self::PhaseTimeout,
        Self::PhaseStall,
        Self::PhaseExitError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreMortemFail => "pre_mortem_fail",
            Self::CrankBlocked => "crank_blocked",
            Self::CrankPartial => "crank_partial",
            Self::VibeFail => "vibe_fail",
            Self::PhaseTimeout => "phase_timeout",
            Self::PhaseStall => "phase_stall",
            Self::PhaseExitError => "phase_exit_error",
        }
    }

    /// Whether `value` names a known failure class.
    pub fn is_known(value: &str) -> bool {
        Self::ALL.iter().any(|c| c.as_str() == value)
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the policy tells the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Retry,
    Escalate,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::Escalate => "escalate",
        }
    }
}

impl std::fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the rule table. `failure_class` and `attempt_bucket` are
/// exact taxonomy strings or the wildcard; `mode` always matches exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub rule_id: String,
    pub mode: MemrlMode,
    pub failure_class: String,
    pub attempt_bucket: String,
    pub action: PolicyAction,
    pub priority: i32,
}

impl PolicyRule {
    /// Count of non-wildcard match fields; higher is more specific.
    pub fn specificity(&self) -> u32 {
        u32::from(self.failure_class != WILDCARD) + u32::from(self.attempt_bucket != WILDCARD)
    }

    pub fn matches(&self, mode: MemrlMode, failure_class: &str, bucket: &str) -> bool {
        self.mode == mode
            && (self.failure_class == WILDCARD || self.failure_class == failure_class)
            && (self.attempt_bucket == WILDCARD || self.attempt_bucket == bucket)
    }
}

/// Contract validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("schema_version must be at least 1, got {0}")]
    InvalidSchemaVersion(u32),

    #[error("contract has no rules")]
    NoRules,

    #[error("contract has no tie-break rules")]
    NoTieBreakRules,

    #[error("contract has an empty rollback matrix")]
    EmptyRollbackMatrix,

    #[error("rollback trigger {index} has an invalid {field}")]
    InvalidRollbackTrigger { index: usize, field: &'static str },

    #[error("rule {rule_id} has an empty rule_id or blank match field")]
    MalformedRule { rule_id: String },

    #[error("rule {rule_id} names unknown failure class {value:?}")]
    UnknownFailureClass { rule_id: String, value: String },

    #[error("rule {rule_id} names unknown attempt bucket {value:?}")]
    UnknownBucket { rule_id: String, value: String },
}

const KNOWN_BUCKETS: [&str; 4] = ["initial", "middle", "final", "overflow"];

/// The complete MemRL policy contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyContract {
    pub schema_version: u32,
    pub default_mode: MemrlMode,
    pub unknown_failure_class_action: PolicyAction,
    pub missing_metadata_action: PolicyAction,
    pub tie_break_rules: Vec<String>,
    pub rules: Vec<PolicyRule>,
    pub rollback_matrix: Vec<RollbackTrigger>,
}

impl PolicyContract {
    /// Structural validation. A contract that passes here evaluates without
    /// surprises.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.schema_version < 1 {
            return Err(ContractError::InvalidSchemaVersion(self.schema_version));
        }
        if self.rules.is_empty() {
            return Err(ContractError::NoRules);
        }
        if self.tie_break_rules.is_empty() {
            return Err(ContractError::NoTieBreakRules);
        }
        if self.rollback_matrix.is_empty() {
            return Err(ContractError::EmptyRollbackMatrix);
        }
        for (index, trigger) in self.rollback_matrix.iter().enumerate() {
            if let Some(field) = trigger.invalid_field() {
                return Err(ContractError::InvalidRollbackTrigger { index, field });
            }
        }
        for rule in &self.rules {
            if rule.rule_id.is_empty()
                || rule.failure_class.is_empty()
                || rule.attempt_bucket.is_empty()
            {
                return Err(ContractError::MalformedRule {
                    rule_id: rule.rule_id.clone(),
                });
            }
            if rule.failure_class != WILDCARD && !FailureClass::is_known(&rule.failure_class) {
                return Err(ContractError::UnknownFailureClass {
                    rule_id: rule.rule_id.clone(),
                    value: rule.failure_class.clone(),
                });
            }
            if rule.attempt_bucket != WILDCARD
                && !KNOWN_BUCKETS.contains(&rule.attempt_bucket.as_str())
            {
                return Err(ContractError::UnknownBucket {
                    rule_id: rule.rule_id.clone(),
                    value: rule.attempt_bucket.clone(),
                });
            }
        }
        Ok(())
    }
}

/// The built-in schema-version-1 contract.
///
/// Every `(mode, class, bucket)` combination gets an explicit rule: retry
/// on initial/middle, escalate on final/overflow, and escalate regardless
/// of bucket for `enforce` × `crank_blocked`. A per-mode wildcard fallback
/// at priority 0 keeps the table closed under buckets added later.
pub fn default_contract() -> PolicyContract {
    let modes = [MemrlMode::Off, MemrlMode::Observe, MemrlMode::Enforce];
    let mut rules = Vec::new();

    for mode in modes {
        for class in FailureClass::ALL {
            for bucket in KNOWN_BUCKETS {
                let escalate_bucket = matches!(bucket, "final" | "overflow");
                let crank_override =
                    mode == MemrlMode::Enforce && class == FailureClass::CrankBlocked;
                let action = if escalate_bucket || crank_override {
                    PolicyAction::Escalate
                } else {
                    PolicyAction::Retry
                };
                rules.push(PolicyRule {
                    rule_id: format!("{mode}.{class}.{bucket}"),
                    mode,
                    failure_class: class.as_str().to_string(),
                    attempt_bucket: bucket.to_string(),
                    action,
                    priority: 10,
                });
            }
        }
        rules.push(PolicyRule {
            rule_id: format!("{mode}.fallback"),
            mode,
            failure_class: WILDCARD.to_string(),
            attempt_bucket: WILDCARD.to_string(),
            action: PolicyAction::Escalate,
            priority: 0,
        });
    }

    PolicyContract {
        schema_version: 1,
        default_mode: MemrlMode::Off,
        unknown_failure_class_action: PolicyAction::Escalate,
        missing_metadata_action: PolicyAction::Escalate,
        tie_break_rules: vec![
            "specificity desc".to_string(),
            "priority desc".to_string(),
            "rule_id asc".to_string(),
        ],
        rules,
        rollback_matrix: default_rollback_matrix(),
    }
}
