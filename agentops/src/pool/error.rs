//! Pool error taxonomy.
//!
//! Every variant has a stable identity so hooks and orchestrators can match
//! on kind rather than message substrings. Pool mutations that fail leave
//! the pool in its prior state; transient I/O is not retried here.

use thiserror::Error;

/// Result type alias for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors produced by candidate pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Candidate id is empty or contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid candidate id: {id:?}")]
    InvalidId { id: String },

    /// Candidate id exceeds the 128-character cap.
    #[error("candidate id exceeds {max} characters")]
    IdTooLong { max: usize },

    /// An entry with this id already exists somewhere in the pool.
    #[error("candidate already in pool: {id}")]
    DuplicateId { id: String },

    /// No entry with this id in any pool directory.
    #[error("candidate not found: {id}")]
    NotFound { id: String },

    /// `stage` on a rejected entry; rejection is terminal.
    #[error("candidate {id} is rejected and cannot be staged")]
    StageRejected { id: String },

    /// `promote` on a rejected entry; rejection is terminal.
    #[error("candidate {id} is rejected and cannot be promoted")]
    PromoteRejected { id: String },

    /// `promote` requires the entry to be staged.
    #[error("candidate {id} is {status}, not staged")]
    NotStaged { id: String, status: String },

    /// Entry tier is below the staging threshold.
    #[error("candidate {id} tier {tier} is below the {min_tier} threshold")]
    BelowThreshold {
        id: String,
        tier: String,
        min_tier: String,
    },

    /// Review already recorded; reviews are immutable.
    #[error("candidate {id} already reviewed by {reviewer}")]
    AlreadyReviewed { id: String, reviewer: String },

    /// Review reason/notes exceed the 1000-character cap.
    #[error("review text exceeds {max} characters")]
    ReasonTooLong { max: usize },

    /// `bulk_approve` threshold below the one-hour floor.
    #[error("bulk approve threshold below the minimum of one hour")]
    ThresholdTooLow,

    /// Operation cancelled at a record boundary; no partial write remains.
    /// Carries the ids already processed before the signal.
    #[error("operation cancelled after {} records", completed.len())]
    Cancelled { completed: Vec<String> },

    /// Another thread panicked while holding the pool mutex.
    #[error("pool lock poisoned")]
    LockPoisoned,

    #[error("pool I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pool entry JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PoolError {
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId { id: id.into() }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_stable() {
        let err = PoolError::StageRejected {
            id: "r1".to_string(),
        };
        assert_eq!(err.to_string(), "candidate r1 is rejected and cannot be staged");

        let err = PoolError::AlreadyReviewed {
            id: "c1".to_string(),
            reviewer: "alice".to_string(),
        };
        assert!(err.to_string().contains("already reviewed by alice"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PoolError = io.into();
        assert!(matches!(err, PoolError::Io(_)));
    }
}
