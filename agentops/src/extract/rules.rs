//! The extraction rule table.
//!
//! One closed rule set per knowledge type: case-insensitive keyword phrases
//! for cheap markers and anchored regexes for the stronger idioms. The
//! table is fixed; new knowledge types require a contract-version bump.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::pool::KnowledgeType;

/// Score added on top of `min_score` for a keyword hit.
pub const KEYWORD_BONUS: f64 = 0.1;

/// Score added on top of `min_score` for a regex hit.
pub const REGEX_BONUS: f64 = 0.2;

/// Rules for one knowledge type.
pub struct TypeRules {
    pub knowledge_type: KnowledgeType,
    pub min_score: f64,
    /// Keyword phrase and its compiled case-insensitive matcher.
    pub keywords: Vec<(&'static str, Regex)>,
    /// Regex source and its compiled matcher.
    pub patterns: Vec<(&'static str, Regex)>,
}

fn keyword(phrase: &'static str) -> (&'static str, Regex) {
    let re = RegexBuilder::new(&regex::escape(phrase))
        .case_insensitive(true)
        .build()
        .expect("escaped keyword always compiles");
    (phrase, re)
}

fn pattern(source: &'static str) -> (&'static str, Regex) {
    let re = RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .expect("rule table regex compiles");
    (source, re)
}

/// The full table, in evaluation order. Evaluation order is the tie-break
/// order for equal scores, so it must stay stable.
pub static RULE_TABLE: LazyLock<Vec<TypeRules>> = LazyLock::new(|| {
    vec![
        TypeRules {
            knowledge_type: KnowledgeType::Decision,
            min_score: 0.6,
            keywords: vec![
                keyword("**decision:**"),
                keyword("decided to"),
                keyword("went with"),
                keyword("opted for"),
                keyword("settled on"),
                keyword("we'll use"),
            ],
            patterns: vec![
                pattern(r"\*\*decision:?\*\*"),
                pattern(r"decided to use [\w`.-]+ (?:because|since|over)"),
                pattern(r"(?:went with|opted for) [\w`.-]+ (?:because|since|over|instead)"),
            ],
        },
        TypeRules {
            knowledge_type: KnowledgeType::Solution,
            min_score: 0.7,
            keywords: vec![
                keyword("fixed by"),
                keyword("the fix was"),
                keyword("solved by"),
                keyword("resolved by"),
                keyword("workaround"),
            ],
            patterns: vec![
                pattern(r"fixed (?:it|this|the [\w`-]+) by"),
                pattern(r"root cause (?:was|turned out to be)"),
                pattern(r"the (?:fix|solution) (?:was|is) to"),
            ],
        },
        TypeRules {
            knowledge_type: KnowledgeType::Learning,
            min_score: 0.5,
            keywords: vec![
                keyword("learned that"),
                keyword("turns out"),
                keyword("realized that"),
                keyword("worth noting"),
                keyword("keep in mind"),
                keyword("gotcha"),
            ],
            patterns: vec![
                pattern(r"(?:turns out|learned) that [\w`]"),
                pattern(r"note for (?:the )?future"),
                pattern(r"the lesson (?:here )?(?:was|is)"),
            ],
        },
        TypeRules {
            knowledge_type: KnowledgeType::Failure,
            min_score: 0.6,
            keywords: vec![
                keyword("didn't work"),
                keyword("did not work"),
                keyword("doesn't work"),
                keyword("failed because"),
                keyword("dead end"),
            ],
            patterns: vec![
                pattern(r"did(?:n't| not) work (?:because|since|due to)"),
                pattern(r"failed (?:with|because|due to)"),
                pattern(r"turned out to be a dead end"),
            ],
        },
        TypeRules {
            knowledge_type: KnowledgeType::Reference,
            min_score: 0.4,
            keywords: vec![
                keyword("https://"),
                keyword("http://"),
                keyword("see docs"),
                keyword("see the documentation"),
                keyword("man page"),
            ],
            patterns: vec![
                pattern(r"https?://[^\s)>\]]+"),
                pattern(r"see (?:the )?(?:docs|documentation|readme) (?:at|in|for)"),
            ],
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_all_types() {
        let types: Vec<KnowledgeType> = RULE_TABLE.iter().map(|r| r.knowledge_type).collect();
        assert_eq!(
            types,
            vec![
                KnowledgeType::Decision,
                KnowledgeType::Solution,
                KnowledgeType::Learning,
                KnowledgeType::Failure,
                KnowledgeType::Reference,
            ]
        );
    }

    #[test]
    fn test_min_scores() {
        for rules in RULE_TABLE.iter() {
            let expected = match rules.knowledge_type {
                KnowledgeType::Decision => 0.6,
                KnowledgeType::Solution => 0.7,
                KnowledgeType::Learning => 0.5,
                KnowledgeType::Failure => 0.6,
                KnowledgeType::Reference => 0.4,
            };
            assert_eq!(rules.min_score, expected, "{}", rules.knowledge_type);
        }
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let decision = &RULE_TABLE[0];
        let (_, re) = &decision.keywords[1];
        assert!(re.is_match("We DECIDED TO ship it"));
        assert!(re.is_match("we decided to ship it"));
    }

    #[test]
    fn test_decision_marker_regex() {
        let decision = &RULE_TABLE[0];
        let (_, re) = &decision.patterns[0];
        assert!(re.is_match("**Decision:** Use context cancellation"));
        assert!(re.is_match("**decision** lowercase no colon"));
    }

    #[test]
    fn test_url_pattern_stops_at_whitespace() {
        let reference = RULE_TABLE.last().unwrap();
        let (_, re) = &reference.patterns[0];
        let m = re.find("docs at https://docs.rs/tokio next word").unwrap();
        assert_eq!(m.as_str(), "https://docs.rs/tokio");
    }
}
