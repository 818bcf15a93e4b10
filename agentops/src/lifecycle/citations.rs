//! Citations log — append-only JSONL at `.agents/ao/citations.jsonl`.
//!
//! One line per citation. Per-session dedup belongs to the hook layer; the
//! core accepts every append. Readers tolerate concurrent appends by
//! working at line boundaries and skipping anything that does not decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// How the artifact was used in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    PassiveRead,
    Retrieved,
    Applied,
    Reference,
}

/// One citation, optionally carrying its feedback outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationEvent {
    pub artifact_path: String,
    pub session_id: String,
    pub cited_at: DateTime<Utc>,
    pub citation_type: CitationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub feedback_given: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_reward: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utility_before: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utility_after: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_at: Option<DateTime<Utc>>,
}

impl CitationEvent {
    /// A bare citation without feedback.
    pub fn new(
        artifact_path: impl Into<String>,
        session_id: impl Into<String>,
        citation_type: CitationKind,
    ) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            session_id: session_id.into(),
            cited_at: Utc::now(),
            citation_type,
            query: None,
            feedback_given: false,
            feedback_reward: None,
            utility_before: None,
            utility_after: None,
            feedback_at: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Handle on one citations log file.
pub struct CitationLog {
    path: PathBuf,
}

impl CitationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as one line.
    pub fn append(&self, event: &CitationEvent) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")
    }

    /// Every decodable event in the log.
    pub fn read_all(&self) -> std::io::Result<Vec<CitationEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(std::fs::File::open(&self.path)?);
        Ok(reader
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect())
    }

    /// Events cited within `[start, end]`.
    pub fn read_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> std::io::Result<Vec<CitationEvent>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.cited_at >= start && e.cited_at <= end)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn log() -> (CitationLog, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let log = CitationLog::new(dir.path().join("ao/citations.jsonl"));
        (log, dir)
    }

    #[test]
    fn test_append_and_read() {
        let (log, _dir) = log();
        log.append(&CitationEvent::new("patterns/a.md", "s1", CitationKind::Applied))
            .unwrap();
        log.append(
            &CitationEvent::new("learnings/b.md", "s1", CitationKind::Retrieved)
                .with_query("rename atomicity"),
        )
        .unwrap();

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].citation_type, CitationKind::Applied);
        assert_eq!(events[1].query.as_deref(), Some("rename atomicity"));
    }

    #[test]
    fn test_events_totally_ordered_per_file() {
        let (log, _dir) = log();
        for i in 0..10 {
            log.append(&CitationEvent::new(
                format!("p/{i}.md"),
                "s1",
                CitationKind::PassiveRead,
            ))
            .unwrap();
        }
        let paths: Vec<String> = log
            .read_all()
            .unwrap()
            .into_iter()
            .map(|e| e.artifact_path)
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("p/{i}.md")).collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn test_window_filter() {
        let (log, _dir) = log();
        let now = Utc::now();
        let mut old = CitationEvent::new("p/old.md", "s1", CitationKind::Applied);
        old.cited_at = now - Duration::days(30);
        log.append(&old).unwrap();
        log.append(&CitationEvent::new("p/new.md", "s1", CitationKind::Applied))
            .unwrap();

        let window = log
            .read_window(now - Duration::days(7), now + Duration::days(1))
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].artifact_path, "p/new.md");
    }

    #[test]
    fn test_partial_trailing_line_tolerated() {
        let (log, _dir) = log();
        log.append(&CitationEvent::new("p/a.md", "s1", CitationKind::Applied))
            .unwrap();
        // Simulate a concurrent writer caught mid-append.
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        write!(file, "{{\"artifact_path\":\"p/half").unwrap();

        assert_eq!(log.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (log, _dir) = log();
        assert!(log.read_all().unwrap().is_empty());
    }
}
