//! Candidate, scoring, and pool entry types.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::error::{PoolError, PoolResult};

/// Maximum candidate id length.
pub const MAX_ID_LENGTH: usize = 128;

/// Maximum length of review notes and rejection reasons.
pub const MAX_REVIEW_NOTES: usize = 1000;

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("id pattern compiles"));

/// Validate a candidate id at an ingress point. Path separators, traversal
/// sequences, and anything outside `[A-Za-z0-9_-]` are rejected before the
/// id ever reaches a filesystem path.
pub fn validate_id(id: &str) -> PoolResult<()> {
    if id.len() > MAX_ID_LENGTH {
        return Err(PoolError::IdTooLong { max: MAX_ID_LENGTH });
    }
    if id.is_empty() || !ID_PATTERN.is_match(id) {
        return Err(PoolError::invalid_id(id));
    }
    Ok(())
}

/// The five knowledge types. A closed set; adding one is a contract bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    Decision,
    Solution,
    Learning,
    Failure,
    Reference,
}

impl KnowledgeType {
    /// Header prefix for the promoted artifact.
    pub fn artifact_header(&self) -> &'static str {
        match self {
            Self::Decision => "# Decision:",
            Self::Solution => "# Solution:",
            Self::Learning => "# Learning:",
            Self::Failure => "# Failure:",
            Self::Reference => "# Reference:",
        }
    }
}

impl std::fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decision => write!(f, "decision"),
            Self::Solution => write!(f, "solution"),
            Self::Learning => write!(f, "learning"),
            Self::Failure => write!(f, "failure"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

/// Quality tier. Declared in ascending order so the derived ordering gives
/// `Discard < Bronze < Silver < Gold`, which staging thresholds rely on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Discard,
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    /// Tier boundaries: gold ≥ 0.85, silver ≥ 0.70, bronze ≥ 0.50.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            Self::Gold
        } else if score >= 0.70 {
            Self::Silver
        } else if score >= 0.50 {
            Self::Bronze
        } else {
            Self::Discard
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gold => write!(f, "gold"),
            Self::Silver => write!(f, "silver"),
            Self::Bronze => write!(f, "bronze"),
            Self::Discard => write!(f, "discard"),
        }
    }
}

/// Pool entry lifecycle status. `Archived` is a status, not a directory:
/// promoted entries keep their file in `staged/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Pending,
    Staged,
    Archived,
    Rejected,
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Staged => write!(f, "staged"),
            Self::Archived => write!(f, "archived"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Expiry status of a candidate's knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Active,
    Expired,
    Archived,
}

/// CASS maturity stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Maturity {
    Provisional,
    Candidate,
    Established,
    AntiPattern,
}

impl std::fmt::Display for Maturity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provisional => write!(f, "provisional"),
            Self::Candidate => write!(f, "candidate"),
            Self::Established => write!(f, "established"),
            Self::AntiPattern => write!(f, "anti-pattern"),
        }
    }
}

/// Where a piece of knowledge lives in the deployment topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Crew,
    Rig,
    Town,
    Plugins,
}

/// Provenance of a candidate: where in which transcript it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateSource {
    pub transcript_path: String,
    pub message_index: usize,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub session_id: String,
}

/// The unit of knowledge moving through the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(rename = "type")]
    pub knowledge_type: KnowledgeType,
    pub content: String,
    #[serde(default)]
    pub context: String,

    // Provenance
    #[serde(default)]
    pub source: CandidateSource,
    #[serde(default)]
    pub provenance_ids: Vec<String>,
    pub extracted_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    // Scoring
    pub raw_score: f64,
    pub tier: Tier,

    // Supersession
    #[serde(default)]
    pub superseded_by: Option<String>,
    #[serde(default)]
    pub supersedes: Option<String>,
    pub is_current: bool,
    #[serde(default)]
    pub supersession_depth: u32,

    // Expiry
    #[serde(default)]
    pub valid_until: Option<String>,
    pub expiry_status: ExpiryStatus,

    // Utility (MemRL)
    pub utility: f64,
    #[serde(default)]
    pub last_reward: u8,
    #[serde(default)]
    pub reward_count: u32,
    #[serde(default)]
    pub last_reward_at: Option<DateTime<Utc>>,

    // Maturity (CASS)
    pub maturity: Maturity,
    pub confidence: f64,
    #[serde(default)]
    pub last_decay_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub decay_count: u32,
    #[serde(default)]
    pub helpful_count: u32,
    #[serde(default)]
    pub harmful_count: u32,

    // Location
    pub location: Location,
    #[serde(default)]
    pub location_path: String,
}

impl Candidate {
    /// A fresh candidate with neutral lifecycle state: utility 0.5,
    /// provisional maturity, current in its own (empty) supersession chain.
    pub fn new(id: impl Into<String>, knowledge_type: KnowledgeType, content: impl Into<String>) -> Self {
        let raw_score = 0.0;
        Self {
            id: id.into(),
            knowledge_type,
            content: content.into(),
            context: String::new(),
            source: CandidateSource::default(),
            provenance_ids: Vec::new(),
            extracted_at: Utc::now(),
            metadata: BTreeMap::new(),
            raw_score,
            tier: Tier::from_score(raw_score),
            superseded_by: None,
            supersedes: None,
            is_current: true,
            supersession_depth: 0,
            valid_until: None,
            expiry_status: ExpiryStatus::Active,
            utility: 0.5,
            last_reward: 0,
            reward_count: 0,
            last_reward_at: None,
            maturity: Maturity::Provisional,
            confidence: 0.5,
            last_decay_at: None,
            decay_count: 0,
            helpful_count: 0,
            harmful_count: 0,
            location: Location::Crew,
            location_path: String::new(),
        }
    }

    /// Set the raw score and the tier it implies (builder pattern).
    pub fn with_score(mut self, raw_score: f64) -> Self {
        self.raw_score = raw_score;
        self.tier = Tier::from_score(raw_score);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_source(mut self, source: CandidateSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_valid_until(mut self, valid_until: impl Into<String>) -> Self {
        self.valid_until = Some(valid_until.into());
        self
    }
}

/// Scoring rubric weights. They sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringRubric {
    pub specificity: f64,
    pub actionability: f64,
    pub novelty: f64,
    pub context: f64,
    pub confidence: f64,
}

impl Default for ScoringRubric {
    fn default() -> Self {
        Self {
            specificity: 0.30,
            actionability: 0.25,
            novelty: 0.20,
            context: 0.15,
            confidence: 0.10,
        }
    }
}

/// Outcome of scoring one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub raw_score: f64,
    pub tier_assignment: Tier,
    pub rubric: ScoringRubric,
    /// When set, the entry needs a human review before promotion.
    pub gate_required: bool,
    pub scored_at: DateTime<Utc>,
}

impl ScoringResult {
    pub fn new(raw_score: f64) -> Self {
        Self {
            raw_score,
            tier_assignment: Tier::from_score(raw_score),
            rubric: ScoringRubric::default(),
            gate_required: false,
            scored_at: Utc::now(),
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate_required = true;
        self
    }
}

/// A recorded human review. Immutable once `reviewed` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanReview {
    pub reviewed: bool,
    pub approved: bool,
    pub reviewer: String,
    pub notes: String,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl HumanReview {
    /// The unreviewed placeholder installed when an entry is gated at add
    /// time.
    pub fn unreviewed() -> Self {
        Self {
            reviewed: false,
            approved: false,
            reviewer: String::new(),
            notes: String::new(),
            reviewed_at: None,
        }
    }
}

/// One candidate plus its pool bookkeeping — the JSON persisted per file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub candidate: Candidate,
    pub scoring: ScoringResult,
    #[serde(default)]
    pub human_review: Option<HumanReview>,
    pub status: PoolStatus,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PoolEntry {
    /// Whether a human has recorded a review on this entry.
    pub fn is_reviewed(&self) -> bool {
        self.human_review.as_ref().map(|r| r.reviewed).unwrap_or(false)
    }
}
