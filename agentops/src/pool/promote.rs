//! Promotion artifacts — typed Markdown written into the knowledge tree.
//!
//! Artifacts are created atomically (temp file + rename) and filename
//! collisions get a numeric suffix rather than overwriting. The pool never
//! reads the knowledge tree back; promotion is write-only.

use chrono::Utc;
use std::path::{Path, PathBuf};

use super::error::PoolResult;
use super::types::{Candidate, KnowledgeType};

/// Title length cap for the artifact header line.
const MAX_TITLE_CHARS: usize = 80;

/// Knowledge tree directory receiving artifacts of this type.
pub fn artifact_dir_for(knowledge_type: KnowledgeType) -> &'static str {
    match knowledge_type {
        KnowledgeType::Decision | KnowledgeType::Solution | KnowledgeType::Reference => "patterns",
        KnowledgeType::Learning | KnowledgeType::Failure => "learnings",
    }
}

/// Write the artifact for a candidate under `<agents_root>/<dir>/` and
/// return its path. Called with the pool mutex held.
pub(super) fn write_artifact(agents_root: &Path, candidate: &Candidate) -> PoolResult<PathBuf> {
    let dir = agents_root.join(artifact_dir_for(candidate.knowledge_type));
    std::fs::create_dir_all(&dir)?;

    let date = Utc::now().format("%Y-%m-%d");
    let slug = slugify(&candidate.id);
    let path = unique_path(&dir, &format!("{date}-{slug}"));

    let body = render(candidate);
    let tmp = path.with_extension("md.tmp");
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

/// Find an unused `<stem>.md`, appending `-2`, `-3`, ... on collision.
fn unique_path(dir: &Path, stem: &str) -> PathBuf {
    let first = dir.join(format!("{stem}.md"));
    if !first.exists() {
        return first;
    }
    let mut n = 2u32;
    loop {
        let next = dir.join(format!("{stem}-{n}.md"));
        if !next.exists() {
            return next;
        }
        n += 1;
    }
}

/// Lowercase the id and replace anything outside `[a-z0-9._-]` with `-`.
fn slugify(id: &str) -> String {
    id.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Title derived from the first content line, word-truncated to 80 chars.
fn title_of(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= MAX_TITLE_CHARS {
        return first_line.to_string();
    }
    let capped: String = first_line.chars().take(MAX_TITLE_CHARS).collect();
    let cut = capped.rfind(' ').unwrap_or(capped.len());
    format!("{}…", capped[..cut].trim_end())
}

fn render(candidate: &Candidate) -> String {
    let mut out = String::new();
    out.push_str(candidate.knowledge_type.artifact_header());
    out.push(' ');
    out.push_str(&title_of(&candidate.content));
    out.push_str("\n\n");
    out.push_str(&candidate.content);
    out.push('\n');

    if !candidate.context.is_empty() {
        out.push_str("\n## Context\n\n");
        out.push_str(&candidate.context);
        out.push('\n');
    }

    out.push_str("\n---\n");
    out.push_str(&format!(
        "source: session `{}`, `{}` message {}\n",
        candidate.source.session_id,
        candidate.source.transcript_path,
        candidate.source.message_index,
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::CandidateSource;
    use tempfile::tempdir;

    fn candidate(id: &str, content: &str) -> Candidate {
        Candidate::new(id, KnowledgeType::Decision, content)
            .with_source(CandidateSource {
                transcript_path: "/logs/session.jsonl".to_string(),
                message_index: 7,
                timestamp: None,
                session_id: "sess-9".to_string(),
            })
    }

    #[test]
    fn test_artifact_dirs() {
        assert_eq!(artifact_dir_for(KnowledgeType::Decision), "patterns");
        assert_eq!(artifact_dir_for(KnowledgeType::Solution), "patterns");
        assert_eq!(artifact_dir_for(KnowledgeType::Reference), "patterns");
        assert_eq!(artifact_dir_for(KnowledgeType::Learning), "learnings");
        assert_eq!(artifact_dir_for(KnowledgeType::Failure), "learnings");
    }

    #[test]
    fn test_write_artifact_layout() {
        let dir = tempdir().unwrap();
        let cand = candidate("ol-cand-s1", "Use context cancellation for graceful shutdown.");

        let path = write_artifact(dir.path(), &cand).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        let date = Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(name, format!("{date}-ol-cand-s1.md"));
        assert!(path.parent().unwrap().ends_with("patterns"));

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("# Decision: Use context cancellation"));
        assert!(body.contains("graceful shutdown"));
        assert!(body.contains("sess-9"));
        assert!(body.contains("message 7"));
    }

    #[test]
    fn test_context_section_only_when_present() {
        let dir = tempdir().unwrap();
        let bare = write_artifact(dir.path(), &candidate("a1", "no context here")).unwrap();
        assert!(!std::fs::read_to_string(bare).unwrap().contains("## Context"));

        let with = write_artifact(
            dir.path(),
            &candidate("a2", "has context").with_context("shutdown work"),
        )
        .unwrap();
        let body = std::fs::read_to_string(with).unwrap();
        assert!(body.contains("## Context\n\nshutdown work"));
    }

    #[test]
    fn test_collision_suffix() {
        let dir = tempdir().unwrap();
        let cand = candidate("dup", "first");
        let p1 = write_artifact(dir.path(), &cand).unwrap();
        let p2 = write_artifact(dir.path(), &cand).unwrap();
        let p3 = write_artifact(dir.path(), &cand).unwrap();

        assert_ne!(p1, p2);
        assert_ne!(p2, p3);
        assert!(p2.to_string_lossy().ends_with("-2.md"));
        assert!(p3.to_string_lossy().ends_with("-3.md"));
        // The first artifact is untouched.
        assert!(std::fs::read_to_string(p1).unwrap().contains("first"));
    }

    #[test]
    fn test_title_word_truncation() {
        let long = "word ".repeat(40);
        let title = title_of(&long);
        assert!(title.chars().count() <= MAX_TITLE_CHARS + 1);
        assert!(title.ends_with('…'));
        // Cut lands on a word boundary, not inside a word.
        assert!(!title.trim_end_matches('…').ends_with("wor"));
    }

    #[test]
    fn test_title_short_line_untouched() {
        assert_eq!(title_of("short title\nrest"), "short title");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("OL-Cand_s1.v2"), "ol-cand_s1.v2");
        assert_eq!(slugify("weird id!"), "weird-id-");
    }
}
