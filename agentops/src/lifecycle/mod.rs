//! Knowledge lifecycle — what happens to a candidate after promotion.
//!
//! Supersession chains, expiry, MemRL utility updates, CASS maturity, the
//! citations log, and the flywheel metrics that say whether captured
//! knowledge is compounding or decaying.

mod citations;
mod expiry;
mod flywheel;
mod maturity;
mod supersession;
mod utility;

pub use citations::{CitationEvent, CitationKind, CitationLog};
pub use expiry::{is_expired, update_expiry_status};
pub use flywheel::{
    ArtifactStat, FlywheelMetrics, DEFAULT_WEEKLY_DECAY, STALE_AFTER_DAYS,
};
pub use maturity::{
    advance_maturity, advance_maturity_with, confidence, decay_confidence, MaturityChange,
    CONFIDENCE_DECAY_RATE,
};
pub use supersession::{supersede, SupersessionError, MAX_SUPERSESSION_DEPTH};
pub use utility::{apply_reward, UtilityUpdate, DEFAULT_ALPHA};

use chrono::Utc;

use crate::pool::Candidate;

/// Apply one citation-with-feedback to a candidate and produce the
/// corresponding log event, with utility captured before and after for
/// auditability.
pub fn cite_with_feedback(
    candidate: &mut Candidate,
    artifact_path: impl Into<String>,
    session_id: impl Into<String>,
    kind: CitationKind,
    reward: u8,
) -> CitationEvent {
    let update = apply_reward(candidate, reward, DEFAULT_ALPHA);
    maturity::record_feedback(candidate, reward > 0);
    CitationEvent {
        artifact_path: artifact_path.into(),
        session_id: session_id.into(),
        cited_at: Utc::now(),
        citation_type: kind,
        query: None,
        feedback_given: true,
        feedback_reward: Some(reward),
        utility_before: Some(update.before),
        utility_after: Some(update.after),
        feedback_at: Some(Utc::now()),
    }
}

/// Catch-up pass over citations that never received live feedback.
///
/// Walks the log over the configured lookback window, matches each
/// feedback-less citation to the candidate whose artifact it names, and
/// applies the configured reward. Session and citation caps bound the run.
/// Returns the feedback events produced; the caller appends them to the
/// log and persists the candidates.
pub fn run_batch_feedback(
    log: &CitationLog,
    candidates: &mut [Candidate],
    config: &crate::config::BatchFeedbackConfig,
    now: chrono::DateTime<Utc>,
) -> std::io::Result<Vec<CitationEvent>> {
    let window_start = now - chrono::Duration::days(i64::from(config.days));
    let reward = u8::from(config.reward >= 0.5);

    let mut sessions_seen = std::collections::BTreeSet::new();
    let mut produced = Vec::new();

    for citation in log.read_window(window_start, now)? {
        if citation.feedback_given {
            continue;
        }
        if !sessions_seen.contains(&citation.session_id)
            && sessions_seen.len() >= config.max_sessions as usize
        {
            continue;
        }

        let Some(candidate) = candidates
            .iter_mut()
            .find(|c| c.location_path == citation.artifact_path)
        else {
            continue;
        };

        sessions_seen.insert(citation.session_id.clone());
        let event = cite_with_feedback(
            candidate,
            citation.artifact_path.clone(),
            citation.session_id.clone(),
            citation.citation_type,
            reward,
        );
        produced.push(event);
    }

    Ok(produced)
}
