//! Flywheel metrics — is captured knowledge compounding?
//!
//! σ approximates retrieval effectiveness (share of artifacts ever cited in
//! the window), ρ the citation rate per artifact-week, and δ the assumed
//! weekly decay of unused knowledge. The flywheel is healthy when σρ > δ.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::citations::CitationEvent;
use crate::pool::{PoolEntry, PoolStatus, Tier};

/// Default weekly knowledge decay δ.
pub const DEFAULT_WEEKLY_DECAY: f64 = 0.17;

/// An artifact unused this long counts as stale.
pub const STALE_AFTER_DAYS: i64 = 90;

/// One promoted artifact as the flywheel sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactStat {
    pub path: String,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
    pub utility: f64,
}

impl ArtifactStat {
    /// Archived pool entries are the promoted artifacts.
    pub fn from_pool_entries(entries: &[PoolEntry]) -> Vec<Self> {
        entries
            .iter()
            .filter(|e| e.status == PoolStatus::Archived)
            .map(|e| Self {
                path: e.candidate.location_path.clone(),
                tier: e.candidate.tier,
                created_at: e.updated_at,
                utility: e.candidate.utility,
            })
            .collect()
    }
}

/// Windowed flywheel summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlywheelMetrics {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,

    pub total_artifacts: usize,
    pub new_artifacts: usize,
    pub stale_artifacts: usize,
    pub citation_count: usize,
    pub unique_cited: usize,
    pub tier_counts: BTreeMap<String, usize>,
    pub utility_mean: f64,
    pub utility_variance: f64,

    /// Assumed weekly decay δ.
    pub delta: f64,
    /// Retrieval effectiveness σ.
    pub sigma: f64,
    /// Citation rate ρ per artifact-week.
    pub rho: f64,
    pub sigma_rho: f64,
    /// σρ − δ.
    pub velocity: f64,
    pub above_escape_velocity: bool,
}

impl FlywheelMetrics {
    /// Compute the summary for `[start, end]` with the default δ.
    pub fn compute(
        artifacts: &[ArtifactStat],
        citations: &[CitationEvent],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self::compute_with_delta(artifacts, citations, start, end, DEFAULT_WEEKLY_DECAY)
    }

    pub fn compute_with_delta(
        artifacts: &[ArtifactStat],
        citations: &[CitationEvent],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        delta: f64,
    ) -> Self {
        let in_window: Vec<&CitationEvent> = citations
            .iter()
            .filter(|c| c.cited_at >= start && c.cited_at <= end)
            .collect();
        let citation_count = in_window.len();
        let unique_cited = in_window
            .iter()
            .map(|c| c.artifact_path.as_str())
            .collect::<HashSet<_>>()
            .len();

        let total = artifacts.len();
        let new_artifacts = artifacts
            .iter()
            .filter(|a| a.created_at >= start && a.created_at <= end)
            .count();

        let stale_cutoff = end - Duration::days(STALE_AFTER_DAYS);
        let recently_cited: HashSet<&str> = citations
            .iter()
            .filter(|c| c.cited_at >= stale_cutoff)
            .map(|c| c.artifact_path.as_str())
            .collect();
        let stale_artifacts = artifacts
            .iter()
            .filter(|a| a.created_at < stale_cutoff && !recently_cited.contains(a.path.as_str()))
            .count();

        let mut tier_counts: BTreeMap<String, usize> = BTreeMap::new();
        for artifact in artifacts {
            *tier_counts.entry(artifact.tier.to_string()).or_insert(0) += 1;
        }

        let utility_mean = if total == 0 {
            0.0
        } else {
            artifacts.iter().map(|a| a.utility).sum::<f64>() / total as f64
        };
        let utility_variance = if total == 0 {
            0.0
        } else {
            artifacts
                .iter()
                .map(|a| (a.utility - utility_mean).powi(2))
                .sum::<f64>()
                / total as f64
        };

        let weeks = ((end - start).num_seconds().max(1) as f64) / (7.0 * 86_400.0);
        let sigma = if total == 0 {
            0.0
        } else {
            unique_cited as f64 / total as f64
        };
        let rho = if total == 0 {
            0.0
        } else {
            citation_count as f64 / (total as f64 * weeks)
        };
        let sigma_rho = sigma * rho;
        let velocity = sigma_rho - delta;

        Self {
            window_start: start,
            window_end: end,
            total_artifacts: total,
            new_artifacts,
            stale_artifacts,
            citation_count,
            unique_cited,
            tier_counts,
            utility_mean,
            utility_variance,
            delta,
            sigma,
            rho,
            sigma_rho,
            velocity,
            above_escape_velocity: sigma_rho > delta,
        }
    }

    /// Human-facing health label.
    pub fn escape_velocity_status(&self) -> &'static str {
        if self.velocity > 0.0 {
            "COMPOUNDING"
        } else if self.velocity > -0.05 {
            "NEAR ESCAPE"
        } else {
            "DECAYING"
        }
    }
}
