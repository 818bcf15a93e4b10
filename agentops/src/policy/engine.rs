//! Pure policy evaluation: bucketing and rule resolution.

use serde::{Deserialize, Serialize};

use super::contract::{FailureClass, PolicyAction, PolicyContract, PolicyRule};
use crate::config::MemrlMode;

/// Position of an attempt within its retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptBucket {
    Initial,
    Middle,
    Final,
    Overflow,
}

impl AttemptBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Middle => "middle",
            Self::Final => "final",
            Self::Overflow => "overflow",
        }
    }
}

impl std::fmt::Display for AttemptBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket an attempt number against its cap. A non-positive cap or an
/// attempt beyond it lands in `overflow`.
pub fn bucket(attempt: i32, max_attempts: i32) -> AttemptBucket {
    if max_attempts <= 0 || attempt > max_attempts {
        AttemptBucket::Overflow
    } else if attempt <= 1 {
        AttemptBucket::Initial
    } else if attempt == max_attempts {
        AttemptBucket::Final
    } else {
        AttemptBucket::Middle
    }
}

/// Input to one policy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyInput {
    pub mode: MemrlMode,
    pub failure_class: String,
    pub attempt_bucket: String,
    pub metadata_present: bool,
}

impl PolicyInput {
    pub fn new(mode: MemrlMode, failure_class: impl Into<String>, bucket: AttemptBucket) -> Self {
        Self {
            mode,
            failure_class: failure_class.into(),
            attempt_bucket: bucket.as_str().to_string(),
            metadata_present: true,
        }
    }

    /// Build the input from raw attempt counters.
    pub fn from_attempts(
        mode: MemrlMode,
        failure_class: impl Into<String>,
        attempt: i32,
        max_attempts: i32,
    ) -> Self {
        Self::new(mode, failure_class, bucket(attempt, max_attempts))
    }

    pub fn without_metadata(mut self) -> Self {
        self.metadata_present = false;
        self
    }
}

/// The outcome of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: PolicyAction,
    pub rule_id: String,
    pub reason: String,
}

/// Evaluate the contract against one input. Pure and deterministic: no
/// clock, no environment, no I/O.
///
/// Resolution order: missing metadata short-circuits, then unknown failure
/// classes, then exact/wildcard rule matching with the single best rule
/// chosen by specificity (desc), priority (desc), and rule id (asc).
pub fn evaluate(contract: &PolicyContract, input: &PolicyInput) -> Decision {
    if !input.metadata_present
        || input.failure_class.trim().is_empty()
        || input.attempt_bucket.trim().is_empty()
    {
        return Decision {
            action: contract.missing_metadata_action,
            rule_id: "default.missing_metadata".to_string(),
            reason: "missing_metadata".to_string(),
        };
    }

    if !FailureClass::is_known(&input.failure_class) {
        return Decision {
            action: contract.unknown_failure_class_action,
            rule_id: "default.unknown_failure_class".to_string(),
            reason: "unknown_failure_class".to_string(),
        };
    }

    let mut candidates: Vec<&PolicyRule> = contract
        .rules
        .iter()
        .filter(|r| r.matches(input.mode, &input.failure_class, &input.attempt_bucket))
        .collect();

    if candidates.is_empty() {
        return Decision {
            action: contract.unknown_failure_class_action,
            rule_id: "default.no_matching_rule".to_string(),
            reason: "no_matching_rule".to_string(),
        };
    }

    candidates.sort_by(|a, b| {
        b.specificity()
            .cmp(&a.specificity())
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });
    let best = candidates[0];

    Decision {
        action: best.action,
        rule_id: best.rule_id.clone(),
        reason: "rule_match".to_string(),
    }
}
