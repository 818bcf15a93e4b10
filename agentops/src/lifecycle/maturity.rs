//! CASS maturity — provisional / candidate / established / anti-pattern.
//!
//! Transitions are driven by utility, feedback counts, and the recent
//! balance of helpful vs. harmful citations. Confidence is a saturating
//! function of reward volume, discounted by time since the last decay
//! pass.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::OpsConfig;
use crate::pool::{Candidate, Maturity};

/// Weekly confidence decay rate.
pub const CONFIDENCE_DECAY_RATE: f64 = 0.1;

/// Helpful citations required to leave `provisional`.
const PROMOTE_HELPFUL_MIN: u32 = 3;

/// Utility floor for promotion to `candidate` and `established`.
const PROMOTE_UTILITY_MIN: f64 = 0.7;

/// Additional feedbacks over which high utility must be sustained before
/// `candidate` becomes `established`.
const ESTABLISH_EXTRA_FEEDBACK: u32 = 3;

/// Harmful citations and utility ceiling that brand an anti-pattern.
const ANTI_PATTERN_HARMFUL_MIN: u32 = 5;
const ANTI_PATTERN_UTILITY_MAX: f64 = 0.2;

/// Utility floor below which demotion triggers, once feedback is
/// sufficient.
const DEMOTE_UTILITY_MAX: f64 = 0.3;
const DEMOTE_FEEDBACK_MIN: u32 = 3;

/// A maturity transition that was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaturityChange {
    pub from: Maturity,
    pub to: Maturity,
}

/// Record one feedback outcome on the candidate's counters.
pub(super) fn record_feedback(candidate: &mut Candidate, helpful: bool) {
    if helpful {
        candidate.helpful_count += 1;
    } else {
        candidate.harmful_count += 1;
    }
}

/// Evaluate and apply at most one maturity transition. Returns the change,
/// if any. Honors `AGENTOPS_EVICTION_DISABLED` for the anti-pattern and
/// demotion paths, which are the evicting transitions.
pub fn advance_maturity(candidate: &mut Candidate) -> Option<MaturityChange> {
    advance_maturity_with(candidate, OpsConfig::from_env().eviction_disabled)
}

/// `advance_maturity` with the eviction switch passed explicitly.
pub fn advance_maturity_with(
    candidate: &mut Candidate,
    eviction_disabled: bool,
) -> Option<MaturityChange> {
    let from = candidate.maturity;
    let feedbacks = candidate.helpful_count + candidate.harmful_count;

    let to = if !eviction_disabled
        && candidate.harmful_count >= ANTI_PATTERN_HARMFUL_MIN
        && candidate.utility < ANTI_PATTERN_UTILITY_MAX
        && from != Maturity::AntiPattern
    {
        Maturity::AntiPattern
    } else if !eviction_disabled
        && candidate.utility < DEMOTE_UTILITY_MAX
        && candidate.reward_count >= DEMOTE_FEEDBACK_MIN
        && matches!(from, Maturity::Candidate | Maturity::Established)
    {
        // Demotion steps down one stage at a time.
        match from {
            Maturity::Established => Maturity::Candidate,
            _ => Maturity::Provisional,
        }
    } else if from == Maturity::Provisional
        && candidate.helpful_count >= PROMOTE_HELPFUL_MIN
        && candidate.utility >= PROMOTE_UTILITY_MIN
    {
        Maturity::Candidate
    } else if from == Maturity::Candidate
        && candidate.utility >= PROMOTE_UTILITY_MIN
        && feedbacks >= PROMOTE_HELPFUL_MIN + ESTABLISH_EXTRA_FEEDBACK
    {
        Maturity::Established
    } else {
        return None;
    };

    candidate.maturity = to;
    debug!(id = %candidate.id, %from, %to, "maturity transition");
    Some(MaturityChange { from, to })
}

/// Confidence as of `now`: `(1 - e^(-reward_count/5)) * decay_factor`,
/// where the decay factor loses [`CONFIDENCE_DECAY_RATE`] per week since
/// the last decay pass (or the extraction time before any pass ran).
pub fn confidence(candidate: &Candidate, now: DateTime<Utc>) -> f64 {
    let base = 1.0 - (-f64::from(candidate.reward_count) / 5.0).exp();
    let anchor = candidate.last_decay_at.unwrap_or(candidate.extracted_at);
    let weeks = (now - anchor).num_seconds().max(0) as f64 / (7.0 * 86_400.0);
    let decay_factor = (1.0 - CONFIDENCE_DECAY_RATE * weeks).max(0.0);
    base * decay_factor
}

/// Run a decay pass: recompute stored confidence and advance the decay
/// bookkeeping.
pub fn decay_confidence(candidate: &mut Candidate, now: DateTime<Utc>) {
    candidate.confidence = confidence(candidate, now);
    candidate.last_decay_at = Some(now);
    candidate.decay_count += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::KnowledgeType;
    use chrono::Duration;

    fn cand() -> Candidate {
        Candidate::new("m1", KnowledgeType::Learning, "lesson")
    }

    #[test]
    fn test_provisional_to_candidate() {
        let mut c = cand();
        c.helpful_count = 3;
        c.utility = 0.75;
        let change = advance_maturity_with(&mut c, false).unwrap();
        assert_eq!(change.from, Maturity::Provisional);
        assert_eq!(change.to, Maturity::Candidate);
    }

    #[test]
    fn test_provisional_stays_below_thresholds() {
        let mut c = cand();
        c.helpful_count = 2;
        c.utility = 0.9;
        assert!(advance_maturity_with(&mut c, false).is_none());

        c.helpful_count = 5;
        c.utility = 0.6;
        assert!(advance_maturity_with(&mut c, false).is_none());
    }

    #[test]
    fn test_candidate_to_established_needs_sustained_feedback() {
        let mut c = cand();
        c.maturity = Maturity::Candidate;
        c.utility = 0.8;
        c.helpful_count = 4;
        assert!(advance_maturity_with(&mut c, false).is_none());

        c.helpful_count = 6;
        let change = advance_maturity_with(&mut c, false).unwrap();
        assert_eq!(change.to, Maturity::Established);
    }

    #[test]
    fn test_anti_pattern_branding() {
        let mut c = cand();
        c.maturity = Maturity::Established;
        c.harmful_count = 5;
        c.utility = 0.1;
        let change = advance_maturity_with(&mut c, false).unwrap();
        assert_eq!(change.to, Maturity::AntiPattern);
    }

    #[test]
    fn test_demotion_one_step() {
        let mut c = cand();
        c.maturity = Maturity::Established;
        c.utility = 0.25;
        c.reward_count = 4;
        let change = advance_maturity_with(&mut c, false).unwrap();
        assert_eq!(change.to, Maturity::Candidate);

        let change = advance_maturity_with(&mut c, false).unwrap();
        assert_eq!(change.to, Maturity::Provisional);
    }

    #[test]
    fn test_eviction_disabled_blocks_demotion() {
        let mut c = Candidate::new("m2", KnowledgeType::Learning, "x");
        c.maturity = Maturity::Established;
        c.utility = 0.1;
        c.reward_count = 10;
        c.harmful_count = 9;
        assert!(advance_maturity_with(&mut c, true).is_none());
    }

    #[test]
    fn test_confidence_saturates_with_rewards() {
        let mut c = cand();
        let now = Utc::now();
        c.last_decay_at = Some(now);

        c.reward_count = 0;
        assert!(confidence(&c, now) < 1e-9);

        c.reward_count = 5;
        let mid = confidence(&c, now);
        assert!(mid > 0.6 && mid < 0.7);

        c.reward_count = 50;
        assert!(confidence(&c, now) > 0.99);
    }

    #[test]
    fn test_confidence_decays_over_weeks() {
        let mut c = cand();
        let now = Utc::now();
        c.reward_count = 50;
        c.last_decay_at = Some(now - Duration::weeks(2));

        let decayed = confidence(&c, now);
        assert!((decayed - 0.8).abs() < 0.01);

        // Far enough in the past, confidence bottoms out at zero.
        c.last_decay_at = Some(now - Duration::weeks(52));
        assert_eq!(confidence(&c, now), 0.0);
    }

    #[test]
    fn test_decay_pass_bookkeeping() {
        let mut c = cand();
        let now = Utc::now();
        decay_confidence(&mut c, now);
        assert_eq!(c.decay_count, 1);
        assert_eq!(c.last_decay_at, Some(now));
    }
}
