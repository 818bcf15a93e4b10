//! Rule-based knowledge extraction from transcript messages.
//!
//! Keywords are scanned before regexes; a regex hit replaces a keyword hit
//! for the same type because it carries the larger bonus, and scanning
//! stops after the first regex hit per type. Callers can therefore rely on
//! at most one result per knowledge type.

mod rules;

pub use rules::{TypeRules, KEYWORD_BONUS, REGEX_BONUS, RULE_TABLE};

use serde::{Deserialize, Serialize};

use crate::pool::KnowledgeType;
use crate::transcript::TranscriptMessage;

/// One scored extraction from a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub knowledge_type: KnowledgeType,
    /// In `[0, 1]`: the type's `min_score` plus the match bonus.
    pub score: f64,
    /// Keyword phrase that hit, if the winning match was a keyword.
    pub matched_keyword: Option<String>,
    /// Regex source that hit, if the winning match was a pattern.
    pub matched_pattern: Option<String>,
    /// Byte range of the match within `message.content`.
    pub start_index: usize,
    pub end_index: usize,
}

/// Extract every candidate snippet from a message, at most one per
/// knowledge type, in rule-table order.
pub fn extract(message: &TranscriptMessage) -> Vec<ExtractionResult> {
    extract_text(&message.content)
}

/// Extraction over raw text; `extract` is the message-facing wrapper.
pub fn extract_text(content: &str) -> Vec<ExtractionResult> {
    let mut results = Vec::new();
    if content.is_empty() {
        return results;
    }

    for rules in RULE_TABLE.iter() {
        let mut best: Option<ExtractionResult> = None;

        for (phrase, re) in &rules.keywords {
            if let Some(m) = re.find(content) {
                best = Some(ExtractionResult {
                    knowledge_type: rules.knowledge_type,
                    score: clamp(rules.min_score + KEYWORD_BONUS),
                    matched_keyword: Some((*phrase).to_string()),
                    matched_pattern: None,
                    start_index: m.start(),
                    end_index: m.end(),
                });
                break;
            }
        }

        for (source, re) in &rules.patterns {
            if let Some(m) = re.find(content) {
                let score = clamp(rules.min_score + REGEX_BONUS);
                let replace = best.as_ref().map(|b| score > b.score).unwrap_or(true);
                if replace {
                    best = Some(ExtractionResult {
                        knowledge_type: rules.knowledge_type,
                        score,
                        matched_keyword: None,
                        matched_pattern: Some((*source).to_string()),
                        start_index: m.start(),
                        end_index: m.end(),
                    });
                }
                break;
            }
        }

        if let Some(result) = best {
            results.push(result);
        }
    }

    results
}

/// The single highest-scored extraction, or `None` when nothing matched.
/// Equal scores resolve to the earlier knowledge type in rule-table order,
/// so repeated calls always return the same result.
pub fn extract_best(message: &TranscriptMessage) -> Option<ExtractionResult> {
    extract(message)
        .into_iter()
        .reduce(|best, next| if next.score > best.score { next } else { best })
}

fn clamp(score: f64) -> f64 {
    score.min(1.0)
}
