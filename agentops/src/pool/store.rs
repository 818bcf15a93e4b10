//! The filesystem-backed candidate pool.
//!
//! Directory layout under `<base>/.agents/pool/`:
//!
//! ```text
//! pool/
//!   pending/<id>.json
//!   staged/<id>.json
//!   rejected/<id>.json
//!   chain.jsonl
//! ```
//!
//! A candidate file lives in exactly one of the three directories between
//! operations. Same-filesystem rename is the commit unit for transitions;
//! the JSON is rewritten (read-modify-write through a temp file) before the
//! rename. A single mutex serializes all mutations within the process;
//! cross-process writers must hold an external lock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::chain::{append_event, read_chain, ChainEvent, ChainOp};
use super::error::{PoolError, PoolResult};
use super::promote::write_artifact;
use super::types::{
    validate_id, Candidate, HumanReview, PoolEntry, PoolStatus, ScoringResult, Tier,
    MAX_REVIEW_NOTES,
};
use crate::layout::AgentsLayout;

/// Floor for the bulk-approve age threshold.
pub fn min_bulk_approve_threshold() -> Duration {
    Duration::hours(1)
}

/// Listing filters. All optional; unset filters pass everything.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub tier: Option<Tier>,
    pub status: Option<PoolStatus>,
    pub reviewed: Option<bool>,
    pub min_tier: Option<Tier>,
    pub limit: Option<usize>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub total: usize,
    pub entries: Vec<PoolEntry>,
    pub offset: usize,
    pub limit: usize,
}

/// The pool: three status directories plus the audit chain.
pub struct CandidatePool {
    pool_root: PathBuf,
    agents_root: PathBuf,
    lock: Mutex<()>,
}

impl CandidatePool {
    /// Build a pool handle for a repository root. No filesystem access.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let layout = AgentsLayout::new(base);
        Self {
            pool_root: layout.pool_dir(),
            agents_root: layout.root().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Create the three status directories.
    pub fn init(&self) -> PoolResult<()> {
        for status in [PoolStatus::Pending, PoolStatus::Staged, PoolStatus::Rejected] {
            std::fs::create_dir_all(self.dir_for(status))?;
        }
        Ok(())
    }

    fn dir_for(&self, status: PoolStatus) -> PathBuf {
        let name = match status {
            PoolStatus::Pending => "pending",
            // Archived entries keep their file in staged/.
            PoolStatus::Staged | PoolStatus::Archived => "staged",
            PoolStatus::Rejected => "rejected",
        };
        self.pool_root.join(name)
    }

    fn chain_path(&self) -> PathBuf {
        self.pool_root.join("chain.jsonl")
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Add a candidate to the pool in `pending`. Gated entries (scoring
    /// says `gate_required`) carry an initialized, unreviewed review block.
    pub fn add(&self, candidate: Candidate, scoring: ScoringResult) -> PoolResult<()> {
        self.add_at(candidate, scoring, Utc::now())
    }

    /// `add` with an explicit `added_at` (backfill / test clock).
    pub fn add_at(
        &self,
        candidate: Candidate,
        scoring: ScoringResult,
        added_at: DateTime<Utc>,
    ) -> PoolResult<()> {
        validate_id(&candidate.id)?;
        let _guard = self.lock.lock().map_err(|_| PoolError::LockPoisoned)?;

        if self.locate(&candidate.id)?.is_some() {
            return Err(PoolError::DuplicateId {
                id: candidate.id.clone(),
            });
        }

        let id = candidate.id.clone();
        let tier = candidate.tier;
        let human_review = scoring.gate_required.then(HumanReview::unreviewed);
        let entry = PoolEntry {
            candidate,
            scoring,
            human_review,
            status: PoolStatus::Pending,
            added_at,
            updated_at: added_at,
        };

        let path = self.dir_for(PoolStatus::Pending).join(format!("{id}.json"));
        write_entry(&path, &entry)?;
        append_event(
            &self.chain_path(),
            &ChainEvent::new(ChainOp::Add, &id).with_tier(tier),
        )?;
        debug!(id = %id, tier = %tier, "candidate added");
        Ok(())
    }

    /// Fetch one entry, scanning all three directories.
    pub fn get(&self, id: &str) -> PoolResult<PoolEntry> {
        validate_id(id)?;
        match self.locate(id)? {
            Some((_, entry)) => Ok(entry),
            None => Err(PoolError::not_found(id)),
        }
    }

    /// List entries matching the filters, ordered by `added_at` then id.
    pub fn list(&self, opts: &ListOptions) -> PoolResult<Vec<PoolEntry>> {
        let mut entries = self.scan_all()?;
        entries.retain(|e| {
            opts.tier.map_or(true, |t| e.candidate.tier == t)
                && opts.status.map_or(true, |s| e.status == s)
                && opts.reviewed.map_or(true, |r| e.is_reviewed() == r)
                && opts.min_tier.map_or(true, |t| e.candidate.tier >= t)
        });
        if let Some(limit) = opts.limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    /// Paginated listing. An offset at or past the total yields an empty
    /// page with `total` intact.
    pub fn list_paginated(
        &self,
        opts: &ListOptions,
        offset: usize,
        limit: usize,
    ) -> PoolResult<Page> {
        let all = self.list(&ListOptions {
            limit: None,
            ..opts.clone()
        })?;
        let total = all.len();
        let entries = if offset >= total {
            Vec::new()
        } else {
            all.into_iter().skip(offset).take(limit).collect()
        };
        Ok(Page {
            total,
            entries,
            offset,
            limit,
        })
    }

    /// Move an entry to `staged` if its tier meets the threshold.
    /// Rejection is terminal; staging a rejected entry always fails.
    pub fn stage(&self, id: &str, min_tier: Tier) -> PoolResult<()> {
        validate_id(id)?;
        let _guard = self.lock.lock().map_err(|_| PoolError::LockPoisoned)?;

        let (path, mut entry) = self.locate(id)?.ok_or_else(|| PoolError::not_found(id))?;
        if entry.status == PoolStatus::Rejected {
            return Err(PoolError::StageRejected { id: id.to_string() });
        }
        if entry.candidate.tier < min_tier {
            return Err(PoolError::BelowThreshold {
                id: id.to_string(),
                tier: entry.candidate.tier.to_string(),
                min_tier: min_tier.to_string(),
            });
        }

        entry.status = PoolStatus::Staged;
        entry.updated_at = Utc::now();
        write_entry(&path, &entry)?;

        let dest = self.dir_for(PoolStatus::Staged).join(format!("{id}.json"));
        if path != dest {
            std::fs::rename(&path, &dest)?;
        }

        append_event(
            &self.chain_path(),
            &ChainEvent::new(ChainOp::Stage, id).with_tier(entry.candidate.tier),
        )?;
        debug!(id, "candidate staged");
        Ok(())
    }

    /// Promote a staged entry: write the typed artifact into the knowledge
    /// tree, mark the entry archived, and return the artifact path.
    pub fn promote(&self, id: &str) -> PoolResult<PathBuf> {
        validate_id(id)?;
        let _guard = self.lock.lock().map_err(|_| PoolError::LockPoisoned)?;

        let (path, mut entry) = self.locate(id)?.ok_or_else(|| PoolError::not_found(id))?;
        match entry.status {
            PoolStatus::Staged => {}
            PoolStatus::Rejected => {
                return Err(PoolError::PromoteRejected { id: id.to_string() })
            }
            other => {
                return Err(PoolError::NotStaged {
                    id: id.to_string(),
                    status: other.to_string(),
                })
            }
        }

        let artifact = write_artifact(&self.agents_root, &entry.candidate)?;
        entry.status = PoolStatus::Archived;
        entry.candidate.location_path = artifact.to_string_lossy().to_string();
        entry.updated_at = Utc::now();
        write_entry(&path, &entry)?;

        append_event(
            &self.chain_path(),
            &ChainEvent::new(ChainOp::Promote, id)
                .with_reason(artifact.to_string_lossy().to_string()),
        )?;
        debug!(id, artifact = %artifact.display(), "candidate promoted");
        Ok(artifact)
    }

    /// Reject an entry. Terminal: no later transition can leave `rejected`.
    pub fn reject(&self, id: &str, reason: &str, reviewer: &str) -> PoolResult<()> {
        validate_id(id)?;
        if reason.len() > MAX_REVIEW_NOTES {
            return Err(PoolError::ReasonTooLong {
                max: MAX_REVIEW_NOTES,
            });
        }
        let _guard = self.lock.lock().map_err(|_| PoolError::LockPoisoned)?;

        let (path, mut entry) = self.locate(id)?.ok_or_else(|| PoolError::not_found(id))?;
        if entry.status == PoolStatus::Rejected {
            let prior = entry
                .human_review
                .as_ref()
                .map(|r| r.reviewer.clone())
                .unwrap_or_default();
            return Err(PoolError::AlreadyReviewed {
                id: id.to_string(),
                reviewer: prior,
            });
        }

        entry.status = PoolStatus::Rejected;
        entry.updated_at = Utc::now();
        entry.human_review = Some(HumanReview {
            reviewed: true,
            approved: false,
            reviewer: reviewer.to_string(),
            notes: reason.to_string(),
            reviewed_at: Some(Utc::now()),
        });
        write_entry(&path, &entry)?;

        let dest = self.dir_for(PoolStatus::Rejected).join(format!("{id}.json"));
        if path != dest {
            std::fs::rename(&path, &dest)?;
        }

        append_event(
            &self.chain_path(),
            &ChainEvent::new(ChainOp::Reject, id)
                .with_reason(reason)
                .with_reviewer(reviewer),
        )?;
        debug!(id, reviewer, "candidate rejected");
        Ok(())
    }

    /// Record an approving human review. Reviews are write-once.
    pub fn approve(&self, id: &str, note: &str, reviewer: &str) -> PoolResult<()> {
        validate_id(id)?;
        if note.len() > MAX_REVIEW_NOTES {
            return Err(PoolError::ReasonTooLong {
                max: MAX_REVIEW_NOTES,
            });
        }
        let _guard = self.lock.lock().map_err(|_| PoolError::LockPoisoned)?;
        self.approve_locked(id, note, reviewer, ChainOp::Approve)
    }

    fn approve_locked(
        &self,
        id: &str,
        note: &str,
        reviewer: &str,
        op: ChainOp,
    ) -> PoolResult<()> {
        let (path, mut entry) = self.locate(id)?.ok_or_else(|| PoolError::not_found(id))?;
        if let Some(prior) = entry.human_review.as_ref().filter(|r| r.reviewed) {
            return Err(PoolError::AlreadyReviewed {
                id: id.to_string(),
                reviewer: prior.reviewer.clone(),
            });
        }

        entry.human_review = Some(HumanReview {
            reviewed: true,
            approved: true,
            reviewer: reviewer.to_string(),
            notes: note.to_string(),
            reviewed_at: Some(Utc::now()),
        });
        entry.updated_at = Utc::now();
        write_entry(&path, &entry)?;

        append_event(
            &self.chain_path(),
            &ChainEvent::new(op, id).with_reviewer(reviewer),
        )?;
        debug!(id, reviewer, "candidate approved");
        Ok(())
    }

    /// Bronze entries still waiting on a human review.
    pub fn list_pending_review(&self) -> PoolResult<Vec<PoolEntry>> {
        Ok(self
            .scan_all()?
            .into_iter()
            .filter(|e| {
                e.candidate.tier == Tier::Bronze
                    && !e.is_reviewed()
                    && e.status != PoolStatus::Rejected
            })
            .collect())
    }

    /// Approve every unreviewed entry older than `threshold`. The dry run
    /// is read-only and, like the real path, skips already-reviewed
    /// entries. Returns the affected ids.
    pub fn bulk_approve(
        &self,
        threshold: Duration,
        reviewer: &str,
        dry_run: bool,
    ) -> PoolResult<Vec<String>> {
        self.bulk_approve_with_cancel(threshold, reviewer, dry_run, &CancellationToken::new())
    }

    /// `bulk_approve` that stops at the next record boundary when the token
    /// fires, returning the already-approved ids inside the error.
    pub fn bulk_approve_with_cancel(
        &self,
        threshold: Duration,
        reviewer: &str,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> PoolResult<Vec<String>> {
        if threshold < min_bulk_approve_threshold() {
            return Err(PoolError::ThresholdTooLow);
        }
        let _guard = self.lock.lock().map_err(|_| PoolError::LockPoisoned)?;

        let now = Utc::now();
        let eligible: Vec<String> = self
            .scan_all()?
            .into_iter()
            .filter(|e| {
                !e.is_reviewed()
                    && e.status != PoolStatus::Rejected
                    && now - e.added_at >= threshold
            })
            .map(|e| e.candidate.id)
            .collect();

        if dry_run {
            return Ok(eligible);
        }

        let mut approved = Vec::with_capacity(eligible.len());
        for id in eligible {
            if cancel.is_cancelled() {
                return Err(PoolError::Cancelled { completed: approved });
            }
            self.approve_locked(&id, "bulk approved", reviewer, ChainOp::BulkApprove)?;
            approved.push(id);
        }
        Ok(approved)
    }

    /// The parsed audit chain; malformed lines are skipped.
    pub fn chain(&self) -> PoolResult<Vec<ChainEvent>> {
        read_chain(&self.chain_path())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Find an entry's file across the three directories.
    fn locate(&self, id: &str) -> PoolResult<Option<(PathBuf, PoolEntry)>> {
        for status in [PoolStatus::Pending, PoolStatus::Staged, PoolStatus::Rejected] {
            let path = self.dir_for(status).join(format!("{id}.json"));
            if path.is_file() {
                if let Some(entry) = load_entry(&path) {
                    return Ok(Some((path, entry)));
                }
            }
        }
        Ok(None)
    }

    /// Every decodable entry in the pool, ordered by `added_at` then id so
    /// listings and pages are stable.
    fn scan_all(&self) -> PoolResult<Vec<PoolEntry>> {
        let mut entries = Vec::new();
        for status in [PoolStatus::Pending, PoolStatus::Staged, PoolStatus::Rejected] {
            let dir = self.dir_for(status);
            if !dir.is_dir() {
                continue;
            }
            for dirent in std::fs::read_dir(&dir)? {
                let dirent = dirent?;
                let path = dirent.path();
                if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Some(entry) = load_entry(&path) {
                    entries.push(entry);
                }
            }
        }
        entries.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        });
        Ok(entries)
    }
}

/// Decode one entry file; undecodable content is skipped, not fatal.
fn load_entry(path: &Path) -> Option<PoolEntry> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Pretty-printed JSON through a temp file plus rename, so a crash cannot
/// leave a half-written entry at the real path.
fn write_entry(path: &Path, entry: &PoolEntry) -> PoolResult<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(entry)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::KnowledgeType;
    use tempfile::tempdir;

    fn pool() -> (CandidatePool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool = CandidatePool::new(dir.path());
        pool.init().unwrap();
        (pool, dir)
    }

    fn candidate(id: &str, score: f64) -> Candidate {
        Candidate::new(id, KnowledgeType::Learning, format!("content of {id}")).with_score(score)
    }

    fn add(pool: &CandidatePool, id: &str, score: f64) {
        pool.add(candidate(id, score), ScoringResult::new(score))
            .unwrap();
    }

    #[test]
    fn test_add_then_get_roundtrip() {
        let (pool, _dir) = pool();
        let cand = candidate("c1", 0.9);
        pool.add(cand.clone(), ScoringResult::new(0.9)).unwrap();

        let entry = pool.get("c1").unwrap();
        assert_eq!(entry.candidate, cand);
        assert_eq!(entry.status, PoolStatus::Pending);
        assert!(entry.human_review.is_none());
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let (pool, _dir) = pool();
        add(&pool, "c1", 0.9);
        let err = pool
            .add(candidate("c1", 0.9), ScoringResult::new(0.9))
            .unwrap_err();
        assert!(matches!(err, PoolError::DuplicateId { .. }));
    }

    #[test]
    fn test_add_invalid_id() {
        let (pool, _dir) = pool();
        let err = pool
            .add(candidate("../bad", 0.9), ScoringResult::new(0.9))
            .unwrap_err();
        assert!(matches!(err, PoolError::InvalidId { .. }));
        // Nothing was written and no chain event recorded.
        assert!(pool.chain().unwrap().is_empty());
    }

    #[test]
    fn test_gated_add_initializes_review() {
        let (pool, _dir) = pool();
        pool.add(candidate("g1", 0.6), ScoringResult::new(0.6).gated())
            .unwrap();
        let entry = pool.get("g1").unwrap();
        let review = entry.human_review.unwrap();
        assert!(!review.reviewed);
        assert_eq!(entry.status, PoolStatus::Pending);
    }

    #[test]
    fn test_stage_moves_file() {
        let (pool, dir) = pool();
        add(&pool, "c1", 0.9);
        pool.stage("c1", Tier::Bronze).unwrap();

        let base = dir.path().join(".agents/pool");
        assert!(!base.join("pending/c1.json").exists());
        assert!(base.join("staged/c1.json").exists());
        assert_eq!(pool.get("c1").unwrap().status, PoolStatus::Staged);
    }

    #[test]
    fn test_stage_below_threshold() {
        let (pool, _dir) = pool();
        add(&pool, "b1", 0.55); // bronze
        let err = pool.stage("b1", Tier::Silver).unwrap_err();
        assert!(matches!(err, PoolError::BelowThreshold { .. }));
        assert_eq!(pool.get("b1").unwrap().status, PoolStatus::Pending);
    }

    #[test]
    fn test_rejected_is_terminal() {
        let (pool, _dir) = pool();
        add(&pool, "r1", 0.6);
        pool.reject("r1", "too vague", "alice").unwrap();

        assert!(matches!(
            pool.stage("r1", Tier::Bronze).unwrap_err(),
            PoolError::StageRejected { .. }
        ));
        assert!(matches!(
            pool.promote("r1").unwrap_err(),
            PoolError::PromoteRejected { .. }
        ));

        let entry = pool.get("r1").unwrap();
        assert_eq!(entry.status, PoolStatus::Rejected);
        assert_eq!(entry.human_review.unwrap().reviewer, "alice");
    }

    #[test]
    fn test_promote_requires_staged() {
        let (pool, _dir) = pool();
        add(&pool, "p1", 0.9);
        assert!(matches!(
            pool.promote("p1").unwrap_err(),
            PoolError::NotStaged { .. }
        ));

        pool.stage("p1", Tier::Bronze).unwrap();
        let artifact = pool.promote("p1").unwrap();
        assert!(artifact.exists());
        assert_eq!(pool.get("p1").unwrap().status, PoolStatus::Archived);

        // Promotion is not idempotent.
        assert!(matches!(
            pool.promote("p1").unwrap_err(),
            PoolError::NotStaged { .. }
        ));
    }

    #[test]
    fn test_promote_artifact_contains_content() {
        let (pool, _dir) = pool();
        add(&pool, "p2", 0.9);
        pool.stage("p2", Tier::Bronze).unwrap();
        let artifact = pool.promote("p2").unwrap();
        let body = std::fs::read_to_string(artifact).unwrap();
        assert!(body.contains("content of p2"));
    }

    #[test]
    fn test_reject_reason_length_boundary() {
        let (pool, _dir) = pool();
        add(&pool, "r2", 0.6);
        add(&pool, "r3", 0.6);

        pool.reject("r2", &"x".repeat(1000), "bob").unwrap();
        let err = pool.reject("r3", &"x".repeat(1001), "bob").unwrap_err();
        assert!(matches!(err, PoolError::ReasonTooLong { .. }));
        assert_eq!(pool.get("r3").unwrap().status, PoolStatus::Pending);
    }

    #[test]
    fn test_approve_is_write_once() {
        let (pool, _dir) = pool();
        add(&pool, "a1", 0.6);
        pool.approve("a1", "looks useful", "alice").unwrap();

        let err = pool.approve("a1", "again", "bob").unwrap_err();
        match err {
            PoolError::AlreadyReviewed { reviewer, .. } => assert_eq!(reviewer, "alice"),
            other => panic!("expected AlreadyReviewed, got {other:?}"),
        }

        let review = pool.get("a1").unwrap().human_review.unwrap();
        assert_eq!(review.reviewer, "alice");
        assert!(review.approved);
    }

    #[test]
    fn test_list_filters() {
        let (pool, _dir) = pool();
        add(&pool, "gold1", 0.9);
        add(&pool, "silver1", 0.75);
        add(&pool, "bronze1", 0.55);

        let golds = pool
            .list(&ListOptions {
                tier: Some(Tier::Gold),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(golds.len(), 1);

        let at_least_silver = pool
            .list(&ListOptions {
                min_tier: Some(Tier::Silver),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(at_least_silver.len(), 2);

        let limited = pool
            .list(&ListOptions {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[test]
    fn test_list_paginated() {
        let (pool, _dir) = pool();
        let base = Utc::now();
        for i in 0..5 {
            pool.add_at(
                candidate(&format!("c{i}"), 0.9),
                ScoringResult::new(0.9),
                base + Duration::seconds(i),
            )
            .unwrap();
        }

        let page = pool
            .list_paginated(&ListOptions::default(), 2, 2)
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].candidate.id, "c2");

        // Offset past the end: empty page, total unchanged.
        let empty = pool
            .list_paginated(&ListOptions::default(), 10, 2)
            .unwrap();
        assert_eq!(empty.total, 5);
        assert!(empty.entries.is_empty());
    }

    #[test]
    fn test_list_pending_review() {
        let (pool, _dir) = pool();
        add(&pool, "bronze1", 0.55);
        add(&pool, "bronze2", 0.6);
        add(&pool, "gold1", 0.9);
        pool.approve("bronze2", "fine", "alice").unwrap();

        let pending = pool.list_pending_review().unwrap();
        let ids: Vec<&str> = pending.iter().map(|e| e.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["bronze1"]);
    }

    #[test]
    fn test_bulk_approve_threshold_floor() {
        let (pool, _dir) = pool();
        let err = pool
            .bulk_approve(Duration::hours(1) - Duration::seconds(1), "ops", false)
            .unwrap_err();
        assert!(matches!(err, PoolError::ThresholdTooLow));

        // Exactly one hour is accepted.
        assert!(pool.bulk_approve(Duration::hours(1), "ops", false).is_ok());
    }

    #[test]
    fn test_bulk_approve_ages_and_dry_run() {
        let (pool, _dir) = pool();
        let old = Utc::now() - Duration::hours(25);
        for id in ["old1", "old2", "old3"] {
            pool.add_at(candidate(id, 0.55), ScoringResult::new(0.55), old)
                .unwrap();
        }
        add(&pool, "fresh", 0.55);

        let preview = pool.bulk_approve(Duration::hours(2), "ops", true).unwrap();
        assert_eq!(preview.len(), 3);
        // Dry run mutated nothing.
        assert!(!pool.get("old1").unwrap().is_reviewed());

        let approved = pool.bulk_approve(Duration::hours(2), "ops", false).unwrap();
        assert_eq!(approved.len(), 3);
        assert!(pool.get("old1").unwrap().is_reviewed());
        assert!(!pool.get("fresh").unwrap().is_reviewed());
        assert!(pool.list_pending_review().unwrap().is_empty());
    }

    #[test]
    fn test_bulk_approve_dry_run_skips_reviewed() {
        let (pool, _dir) = pool();
        let old = Utc::now() - Duration::hours(25);
        pool.add_at(candidate("seen", 0.55), ScoringResult::new(0.55), old)
            .unwrap();
        pool.approve("seen", "done", "alice").unwrap();

        let preview = pool.bulk_approve(Duration::hours(2), "ops", true).unwrap();
        assert!(preview.is_empty());
    }

    #[test]
    fn test_bulk_approve_cancellation_partial() {
        let (pool, _dir) = pool();
        let old = Utc::now() - Duration::hours(25);
        for id in ["x1", "x2"] {
            pool.add_at(candidate(id, 0.55), ScoringResult::new(0.55), old)
                .unwrap();
        }
        let token = CancellationToken::new();
        token.cancel();
        let err = pool
            .bulk_approve_with_cancel(Duration::hours(2), "ops", false, &token)
            .unwrap_err();
        match err {
            PoolError::Cancelled { completed } => assert!(completed.is_empty()),
            other => panic!("expected Cancelled, got {other:?}"),
        }
        assert!(!pool.get("x1").unwrap().is_reviewed());
    }

    #[test]
    fn test_chain_records_every_mutation_in_order() {
        let (pool, _dir) = pool();
        add(&pool, "c1", 0.9);
        pool.stage("c1", Tier::Bronze).unwrap();
        pool.promote("c1").unwrap();

        let ops: Vec<ChainOp> = pool.chain().unwrap().iter().map(|e| e.op).collect();
        assert_eq!(ops, vec![ChainOp::Add, ChainOp::Stage, ChainOp::Promote]);
    }

    #[test]
    fn test_scan_skips_foreign_files() {
        let (pool, dir) = pool();
        add(&pool, "c1", 0.9);

        let pending = dir.path().join(".agents/pool/pending");
        std::fs::write(pending.join("README.txt"), "not an entry").unwrap();
        std::fs::write(pending.join("broken.json"), "{nope").unwrap();
        std::fs::create_dir(pending.join("subdir.json")).unwrap();

        let entries = pool.list(&ListOptions::default()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_get_invalid_id_same_error_kind() {
        let (pool, _dir) = pool();
        for result in [
            pool.get("a/b").map(|_| ()),
            pool.stage("a/b", Tier::Bronze),
            pool.reject("a/b", "r", "v"),
            pool.approve("a/b", "n", "v"),
            pool.promote("a/b").map(|_| ()),
        ] {
            assert!(matches!(result.unwrap_err(), PoolError::InvalidId { .. }));
        }
    }
}
