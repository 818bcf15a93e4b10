//! AgentOps core library
//!
//! The operations substrate for AI-assisted development: transcripts go in,
//! reusable knowledge comes out, and a deterministic policy decides when
//! the workflow retries versus escalates.
//!
//! # Components
//!
//! ## Knowledge pipeline
//! - `transcript`: streaming JSONL parser with checksum fingerprinting
//! - `extract`: rule-based extraction of candidate knowledge snippets
//! - `pool`: filesystem state machine (pending → staged → archived |
//!   rejected) with review gates and an append-only audit chain
//! - `lifecycle`: supersession, expiry, utility, maturity, citations,
//!   flywheel metrics
//!
//! ## Policy
//! - `policy`: the MemRL retry/escalate contract and its pure evaluator
//!
//! ## Collaborator surfaces
//! - `ratchet`: RPI forward-progress chain with legacy-schema reads
//! - `handoff`: one-shot memory packets between sessions
//! - `environment`, `hooklog`, `command_guard`: the files and validation
//!   the shell hook layer relies on
//!
//! # Usage
//!
//! ```rust,no_run
//! use agentops::extract::extract_best;
//! use agentops::pool::{CandidatePool, Candidate, KnowledgeType, ScoringResult, Tier};
//! use agentops::transcript::TranscriptParser;
//!
//! let parsed = TranscriptParser::default().parse_file("session.jsonl")?;
//! let pool = CandidatePool::new(".");
//! pool.init()?;
//!
//! for message in &parsed.messages {
//!     if let Some(hit) = extract_best(message) {
//!         let id = format!("cand-{}", message.message_index);
//!         let candidate = Candidate::new(&id, hit.knowledge_type, &message.content)
//!             .with_score(hit.score);
//!         pool.add(candidate, ScoringResult::new(hit.score))?;
//!         pool.stage(&id, Tier::Bronze)?;
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod command_guard;
pub mod config;
pub mod environment;
pub mod extract;
pub mod handoff;
pub mod hooklog;
pub mod layout;
pub mod lifecycle;
pub mod policy;
pub mod pool;
pub mod ratchet;
pub mod transcript;

// Re-export key transcript types
pub use transcript::{ParseResult, ParserConfig, TranscriptMessage, TranscriptParser};

// Re-export key extraction types
pub use extract::{extract, extract_best, ExtractionResult};

// Re-export key pool types
pub use pool::{
    Candidate, CandidatePool, ChainEvent, ChainOp, HumanReview, KnowledgeType, ListOptions, Page,
    PoolEntry, PoolError, PoolResult, PoolStatus, ScoringResult, Tier,
};

// Re-export key lifecycle types
pub use lifecycle::{
    supersede, CitationEvent, CitationKind, CitationLog, FlywheelMetrics, SupersessionError,
};

// Re-export key policy types
pub use policy::{
    bucket, default_contract, evaluate, AttemptBucket, Decision, FailureClass, PolicyAction,
    PolicyContract, PolicyInput,
};

// Re-export configuration and layout
pub use config::{KnowledgeTier, MemrlMode, OpsConfig};
pub use layout::AgentsLayout;

// Re-export ratchet and handoff types
pub use handoff::{HandoffQueue, MemoryPacket};
pub use ratchet::{RatchetChain, RatchetStep, StepStatus};
