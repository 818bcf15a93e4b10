//! Candidate pool — the filesystem-backed knowledge state machine.
//!
//! A pool owns `pending/`, `staged/`, and `rejected/` under
//! `<base>/.agents/pool/`, plus the append-only `chain.jsonl` audit log.
//! File locations are the authoritative state; rename within the pool
//! directory is the unit of commit, and every mutation appends exactly one
//! chain event before reporting success.

mod chain;
mod error;
mod promote;
mod store;
mod types;

pub use chain::{ChainEvent, ChainOp};
pub use error::{PoolError, PoolResult};
pub use promote::artifact_dir_for;
pub use store::{min_bulk_approve_threshold, CandidatePool, ListOptions, Page};
pub use types::{
    validate_id, Candidate, CandidateSource, ExpiryStatus, HumanReview, KnowledgeType, Location,
    Maturity, PoolEntry, PoolStatus, ScoringResult, ScoringRubric, Tier, MAX_ID_LENGTH,
    MAX_REVIEW_NOTES,
};
