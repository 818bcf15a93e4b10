//! MemRL policy engine — the deterministic retry-vs-escalate contract.
//!
//! A closed rule table maps `(mode, failure_class, attempt_bucket)` to an
//! action. Evaluation is a pure function with no hidden state: the same
//! input produces the same decision in every process, every time.

mod contract;
mod engine;
mod rollback;

pub use contract::{
    default_contract, ContractError, FailureClass, PolicyAction, PolicyContract, PolicyRule,
    WILDCARD,
};
pub use engine::{bucket, evaluate, AttemptBucket, Decision, PolicyInput};
pub use rollback::{default_rollback_matrix, RollbackTrigger};
