//! Rollback matrix — operator runbook entries that accompany the contract.
//!
//! Each trigger names the metric to watch, where the number comes from,
//! how much data makes it trustworthy, and what the operator does when it
//! fires. Validation refuses triggers with blank fields or useless sample
//! sizes.

use serde::{Deserialize, Serialize};

/// One rollback trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackTrigger {
    pub trigger_id: String,
    pub metric: String,
    pub source_command: String,
    pub lookback_window: String,
    pub min_sample_size: u32,
    pub threshold: String,
    pub operator_action: String,
    pub verification_command: String,
}

impl RollbackTrigger {
    /// The field that makes this trigger invalid, if any.
    pub fn invalid_field(&self) -> Option<&'static str> {
        if self.trigger_id.is_empty() {
            return Some("trigger_id");
        }
        if self.metric.is_empty() {
            return Some("metric");
        }
        if self.source_command.is_empty() {
            return Some("source_command");
        }
        if self.lookback_window.is_empty() {
            return Some("lookback_window");
        }
        if self.min_sample_size == 0 {
            return Some("min_sample_size");
        }
        if self.threshold.is_empty() {
            return Some("threshold");
        }
        if self.operator_action.is_empty() {
            return Some("operator_action");
        }
        if self.verification_command.is_empty() {
            return Some("verification_command");
        }
        None
    }
}

/// The three required triggers of the default contract.
pub fn default_rollback_matrix() -> Vec<RollbackTrigger> {
    vec![
        RollbackTrigger {
            trigger_id: "escalation-rate-high".to_string(),
            metric: "escalations / decisions over the lookback window".to_string(),
            source_command: "ao flywheel status --json".to_string(),
            lookback_window: "24h".to_string(),
            min_sample_size: 20,
            threshold: "> 0.5".to_string(),
            operator_action: "set MEMRL_MODE=observe and file a contract review".to_string(),
            verification_command: "ao ratchet status".to_string(),
        },
        RollbackTrigger {
            trigger_id: "unknown-failure-class-ratio-high".to_string(),
            metric: "unknown_failure_class decisions / total decisions".to_string(),
            source_command: "grep unknown_failure_class .agents/ao/chain.jsonl | wc -l".to_string(),
            lookback_window: "7d".to_string(),
            min_sample_size: 10,
            threshold: "> 0.2".to_string(),
            operator_action: "extend the failure-class taxonomy before re-enabling enforce"
                .to_string(),
            verification_command: "ao ratchet status".to_string(),
        },
        RollbackTrigger {
            trigger_id: "missing-metadata-detected".to_string(),
            metric: "missing_metadata decisions in the lookback window".to_string(),
            source_command: "grep missing_metadata .agents/ao/chain.jsonl | wc -l".to_string(),
            lookback_window: "24h".to_string(),
            min_sample_size: 1,
            threshold: ">= 1".to_string(),
            operator_action: "fix the phase hook emitting bare failures, then clear the log"
                .to_string(),
            verification_command: "ao ratchet status".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matrix_has_three_valid_triggers() {
        let matrix = default_rollback_matrix();
        assert_eq!(matrix.len(), 3);
        for trigger in &matrix {
            assert_eq!(trigger.invalid_field(), None, "{}", trigger.trigger_id);
            assert!(trigger.min_sample_size > 0);
        }
    }

    #[test]
    fn test_blank_field_detected() {
        let mut trigger = default_rollback_matrix().remove(0);
        trigger.metric = String::new();
        assert_eq!(trigger.invalid_field(), Some("metric"));
    }

    #[test]
    fn test_zero_sample_size_detected() {
        let mut trigger = default_rollback_matrix().remove(0);
        trigger.min_sample_size = 0;
        assert_eq!(trigger.invalid_field(), Some("min_sample_size"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let matrix = default_rollback_matrix();
        let json = serde_json::to_string(&matrix).unwrap();
        let back: Vec<RollbackTrigger> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, matrix);
    }
}
