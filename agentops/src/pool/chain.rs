//! Append-only audit chain (`chain.jsonl`).
//!
//! One line per pool mutation. The chain is the audit record, not the
//! authoritative state; readers skip malformed lines rather than failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use super::error::PoolResult;
use super::types::Tier;

/// Pool mutations recorded in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainOp {
    Add,
    Stage,
    Promote,
    Reject,
    Approve,
    BulkApprove,
}

impl std::fmt::Display for ChainOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Stage => write!(f, "stage"),
            Self::Promote => write!(f, "promote"),
            Self::Reject => write!(f, "reject"),
            Self::Approve => write!(f, "approve"),
            Self::BulkApprove => write!(f, "bulk_approve"),
        }
    }
}

/// One audit line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub op: ChainOp,
    pub candidate_id: String,
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
}

impl ChainEvent {
    pub fn new(op: ChainOp, candidate_id: impl Into<String>) -> Self {
        Self {
            op,
            candidate_id: candidate_id.into(),
            ts: Utc::now(),
            reason: None,
            reviewer: None,
            tier: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_reviewer(mut self, reviewer: impl Into<String>) -> Self {
        self.reviewer = Some(reviewer.into());
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }
}

/// Append one event. Called with the pool mutex held so appends are
/// totally ordered per pool.
pub(super) fn append_event(path: &Path, event: &ChainEvent) -> PoolResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(event)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Read the whole chain, skipping malformed lines.
pub(super) fn read_chain(path: &Path) -> PoolResult<Vec<ChainEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(std::fs::File::open(path)?);
    let events = reader
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect();
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chain.jsonl");

        append_event(&path, &ChainEvent::new(ChainOp::Add, "c1").with_tier(Tier::Gold)).unwrap();
        append_event(&path, &ChainEvent::new(ChainOp::Stage, "c1")).unwrap();

        let chain = read_chain(&path).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].op, ChainOp::Add);
        assert_eq!(chain[0].tier, Some(Tier::Gold));
        assert_eq!(chain[1].op, ChainOp::Stage);
    }

    #[test]
    fn test_each_append_is_one_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chain.jsonl");

        for i in 0..5 {
            append_event(&path, &ChainEvent::new(ChainOp::Add, format!("c{i}"))).unwrap();
            let text = std::fs::read_to_string(&path).unwrap();
            assert_eq!(text.lines().count(), i + 1);
        }
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chain.jsonl");

        append_event(&path, &ChainEvent::new(ChainOp::Add, "c1")).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{half a line").unwrap();
        }
        append_event(&path, &ChainEvent::new(ChainOp::Reject, "c1")).unwrap();

        let chain = read_chain(&path).unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_missing_file_is_empty_chain() {
        let dir = tempdir().unwrap();
        let chain = read_chain(&dir.path().join("absent.jsonl")).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_wire_format() {
        let event = ChainEvent::new(ChainOp::BulkApprove, "c9")
            .with_reviewer("ops")
            .with_reason("aged out");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"op\":\"bulk_approve\""));
        assert!(json.contains("\"candidate_id\":\"c9\""));
        assert!(json.contains("\"ts\":"));
        // Unset optionals stay off the wire.
        assert!(!json.contains("\"tier\""));
    }
}
