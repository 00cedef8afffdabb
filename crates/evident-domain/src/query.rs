//! Query classification and decomposition

use serde::{Deserialize, Serialize};

/// Broad intent of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Why/impact/evaluation questions
    Analytical,
    /// X versus Y questions
    Comparative,
    /// How-to and setup questions
    Procedural,
    /// Direct lookups
    Factual,
}

impl QueryType {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Analytical => "analytical",
            QueryType::Comparative => "comparative",
            QueryType::Procedural => "procedural",
            QueryType::Factual => "factual",
        }
    }

    /// Parse a lowercase name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "analytical" => Some(QueryType::Analytical),
            "comparative" => Some(QueryType::Comparative),
            "procedural" => Some(QueryType::Procedural),
            "factual" => Some(QueryType::Factual),
            _ => None,
        }
    }
}

/// Lowercase, trim, and collapse internal whitespace
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

const STOP_WORDS: &[&str] = &[
    "how", "do", "does", "i", "what", "what's", "whats", "is", "are", "the", "a", "an", "for", "to",
    "of", "in", "on", "at", "with", "and", "or", "my", "our", "can", "we", "you", "your", "it",
];

/// Significant terms of a query: lowercase, longer than 2 characters, not
/// stop-words, deduplicated in first-seen order
pub fn key_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for raw in query.split(|c: char| !(c.is_alphanumeric() || c == '.' || c == '%' || c == '\'')) {
        let term = raw.trim_matches(|c: char| c == '.' || c == '\'').to_lowercase();
        if term.chars().count() > 2 && !STOP_WORDS.contains(&term.as_str()) && !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Whether a word is a query stop-word
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word.to_lowercase().as_str())
}

/// Classify a query by keyword cues
pub fn classify_query(query: &str) -> QueryType {
    let q = format!(" {} ", normalize_query(query));
    let any = |cues: &[&str]| cues.iter().any(|c| q.contains(c));

    if any(&[" compare", " versus ", " vs ", " vs. ", "difference between", " better than "]) {
        QueryType::Comparative
    } else if any(&[" how to ", " how do ", " how can ", " steps ", " setup ", " set up ", " configure ", " process for "]) {
        QueryType::Procedural
    } else if any(&[" why ", " analy", " impact ", " should ", " evaluate ", " trend", " affect"]) {
        QueryType::Analytical
    } else {
        QueryType::Factual
    }
}

/// Whether a query warrants multi-step reasoning
pub fn is_complex(query: &str) -> bool {
    let normalized = normalize_query(query);
    let word_count = normalized.split(' ').filter(|w| !w.is_empty()).count();
    let question_marks = query.matches('?').count();

    matches!(classify_query(query), QueryType::Comparative | QueryType::Analytical)
        || word_count > 20
        || question_marks > 1
        || joins_two_questions(&normalized)
}

const QUESTION_WORDS: &[&str] = &[
    "what", "what's", "how", "why", "when", "where", "which", "who", "can", "does", "do", "is", "are",
];

/// "what are the fees and how do i dispute them"
fn joins_two_questions(normalized: &str) -> bool {
    let starts_question = |part: &str| {
        part.split_whitespace()
            .next()
            .is_some_and(|w| QUESTION_WORDS.contains(&w))
    };
    normalized
        .split(" and ")
        .collect::<Vec<_>>()
        .windows(2)
        .any(|pair| starts_question(pair[0]) && starts_question(pair[1]))
}

/// One ordered sub-query of a decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuery {
    /// 1-based position
    pub id: usize,
    /// The sub-question text
    pub question: String,
    /// Ids of sub-queries this one depends on
    #[serde(default)]
    pub depends_on: Vec<usize>,
    /// Intent of the sub-question
    pub query_type: QueryType,
}

/// A query decomposed into a dependency-ordered list of sub-queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    /// The original query
    pub query: String,
    /// Intent of the original query
    pub query_type: QueryType,
    /// Ordered sub-queries (ids contiguous from 1)
    pub sub_queries: Vec<SubQuery>,
}

impl Decomposition {
    /// Degenerate decomposition: a single step equal to the original query
    pub fn single(query: &str) -> Self {
        let query_type = classify_query(query);
        Self {
            query: query.to_string(),
            query_type,
            sub_queries: vec![SubQuery {
                id: 1,
                question: query.to_string(),
                depends_on: Vec::new(),
                query_type,
            }],
        }
    }

    /// Build from raw questions, renumbering and dropping forward or self dependencies
    pub fn from_parts(query: &str, parts: Vec<(String, Vec<usize>, QueryType)>) -> Self {
        let sub_queries = parts
            .into_iter()
            .enumerate()
            .map(|(idx, (question, deps, query_type))| {
                let id = idx + 1;
                SubQuery {
                    id,
                    question,
                    depends_on: deps.into_iter().filter(|d| *d >= 1 && *d < id).collect(),
                    query_type,
                }
            })
            .collect();

        Self {
            query: query.to_string(),
            query_type: classify_query(query),
            sub_queries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  What's   the Refund\tPolicy "), "what's the refund policy");
    }

    #[test]
    fn test_key_terms() {
        assert_eq!(key_terms("What's the refund policy?"), vec!["refund", "policy"]);
        assert_eq!(key_terms("fees of 2.5% for POS"), vec!["fees", "2.5%", "pos"]);
        assert!(key_terms("how do I").is_empty());
    }

    #[test]
    fn test_classify_query() {
        assert_eq!(classify_query("Compare Clover vs Square fees"), QueryType::Comparative);
        assert_eq!(classify_query("How do I set up a terminal"), QueryType::Procedural);
        assert_eq!(classify_query("Why did interchange rates rise"), QueryType::Analytical);
        assert_eq!(classify_query("what's the refund policy"), QueryType::Factual);
    }

    #[test]
    fn test_query_type_parse() {
        assert_eq!(QueryType::parse(" Comparative"), Some(QueryType::Comparative));
        assert_eq!(QueryType::parse("speculative"), None);
    }

    #[test]
    fn test_is_complex() {
        assert!(is_complex("Compare TSYS versus Fiserv pricing"));
        assert!(is_complex("What is the fee? And who pays it?"));
        assert!(!is_complex("what's the refund policy"));
        assert!(is_complex("What are the monthly fees and how do I cancel the contract"));
        assert!(!is_complex("What fees and charges apply to refunds"));
    }

    #[test]
    fn test_from_parts_drops_forward_dependencies() {
        let d = Decomposition::from_parts(
            "q",
            vec![
                ("a".into(), vec![2], QueryType::Factual),
                ("b".into(), vec![1, 2], QueryType::Factual),
            ],
        );
        assert!(d.sub_queries[0].depends_on.is_empty());
        assert_eq!(d.sub_queries[1].depends_on, vec![1]);
        assert_eq!(d.sub_queries[1].id, 2);
    }
}
