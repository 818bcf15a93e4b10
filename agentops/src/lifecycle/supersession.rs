//! Supersession chains — a forward linked list with a backward pointer.
//!
//! Links are ids, never real pointers, and the depth cap is enforced at
//! insert time so traversals stay bounded.

use thiserror::Error;
use tracing::debug;

use crate::pool::Candidate;

/// Longest permitted chain depth.
pub const MAX_SUPERSESSION_DEPTH: u32 = 3;

/// Why a supersession was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupersessionError {
    /// Only the current head of a chain can be superseded.
    #[error("candidate {id} is not current and cannot be superseded")]
    NotCurrent { id: String },

    /// The new link would push the chain past the depth cap.
    #[error("supersession chain {chain_id} would reach depth {depth} (cap {MAX_SUPERSESSION_DEPTH})")]
    DepthExceeded { chain_id: String, depth: u32 },
}

/// Replace `older` with `newer` as the current head of the chain.
///
/// On success: `older` loses currency and points forward to `newer`;
/// `newer` points back at `older` and carries the incremented depth. At
/// most one candidate per chain is current afterwards.
pub fn supersede(older: &mut Candidate, newer: &mut Candidate) -> Result<(), SupersessionError> {
    if !older.is_current {
        return Err(SupersessionError::NotCurrent {
            id: older.id.clone(),
        });
    }

    let new_depth = older.supersession_depth + 1;
    if new_depth > MAX_SUPERSESSION_DEPTH {
        return Err(SupersessionError::DepthExceeded {
            chain_id: older.id.clone(),
            depth: new_depth,
        });
    }

    older.superseded_by = Some(newer.id.clone());
    older.is_current = false;
    newer.supersedes = Some(older.id.clone());
    newer.is_current = true;
    newer.supersession_depth = new_depth;

    debug!(older = %older.id, newer = %newer.id, depth = new_depth, "superseded");
    Ok(())
}
