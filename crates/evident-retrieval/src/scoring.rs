//! Candidate scoring for the FAQ and document tiers

use evident_domain::{key_terms, normalize_query, EvidenceItem, EvidenceTier, QaEntry};

/// Merchant-services vocabulary that earns a relevance boost
pub const DOMAIN_TERMS: &[&str] = &[
    "merchant", "processing", "processor", "payment", "payments", "transaction", "terminal", "pos",
    "gateway", "interchange", "chargeback", "refund", "refunds", "settlement", "statement", "fee",
    "fees", "rate", "rates", "pricing", "contract", "agreement", "equipment", "ach", "emv", "pci",
    "surcharge", "surcharging", "dispute", "batch", "funding", "deposit", "tsys", "fiserv",
    "clover", "worldpay", "square", "stripe", "shift4", "elavon", "heartland",
];

/// Terms too broad to count as a meaningful match on their own
const GENERIC_TERMS: &[&str] = &[
    "information", "info", "help", "question", "questions", "thing", "things", "about", "details",
    "general", "document", "documents", "need", "want", "know", "tell",
];

const FAQ_DOMAIN_BOOST: f64 = 0.05;
const FAQ_DOMAIN_BOOST_CAP: f64 = 0.15;
const EXACT_PHRASE_BONUS: f64 = 0.3;
const DOMAIN_TERM_BONUS: f64 = 0.1;
const DOMAIN_TERM_BONUS_CAP: f64 = 0.3;
const NAME_TERM_STEP: f64 = 0.1;
const GENERIC_MATCH_PENALTY: f64 = 0.2;

fn domain_terms_in<'a>(terms: &'a [String]) -> impl Iterator<Item = &'a String> {
    terms.iter().filter(|t| DOMAIN_TERMS.contains(&t.as_str()))
}

/// Score a curated Q&A entry against a query
///
/// 0.9 when the question contains the whole query, 0.7 when the answer does,
/// otherwise the matched fraction of key terms capped at 0.6. Domain terms
/// found in the entry add 0.05 each, up to 0.15.
pub fn faq_score(query: &str, entry: &QaEntry) -> f64 {
    let normalized = normalize_query(query);
    if normalized.is_empty() {
        return 0.0;
    }
    let question = normalize_query(&entry.question);
    let answer = normalize_query(&entry.answer);
    let terms = key_terms(query);

    let base = if question.contains(&normalized) {
        0.9
    } else if answer.contains(&normalized) {
        0.7
    } else if terms.is_empty() {
        0.0
    } else {
        let matched = terms
            .iter()
            .filter(|t| question.contains(t.as_str()) || answer.contains(t.as_str()))
            .count();
        (matched as f64 / terms.len() as f64).min(0.6)
    };

    let boost = domain_terms_in(&terms)
        .filter(|t| question.contains(t.as_str()) || answer.contains(t.as_str()))
        .count() as f64
        * FAQ_DOMAIN_BOOST;

    (base + boost.min(FAQ_DOMAIN_BOOST_CAP)).clamp(0.0, 1.0)
}

/// Score a document candidate against a query
///
/// Starts from the incoming relevance, adds the exact-phrase and domain-term
/// bonuses, scales by matched name terms, and subtracts the generic-match
/// penalty when nothing specific matched.
pub fn document_score(query: &str, item: &EvidenceItem) -> f64 {
    let normalized = normalize_query(query);
    let snippet = normalize_query(&item.snippet);
    let name = normalize_query(&item.document_name);
    let terms = key_terms(query);

    let mut score = item.relevance;

    if !normalized.is_empty() && (snippet.contains(&normalized) || name.contains(&normalized)) {
        score += EXACT_PHRASE_BONUS;
    }

    let domain_hits = domain_terms_in(&terms).filter(|t| snippet.contains(t.as_str())).count();
    score += (domain_hits as f64 * DOMAIN_TERM_BONUS).min(DOMAIN_TERM_BONUS_CAP);

    let name_hits = terms.iter().filter(|t| name.contains(t.as_str())).count();
    if name_hits > 0 {
        score *= 1.0 + NAME_TERM_STEP * name_hits as f64;
    }

    let matched: Vec<&String> = terms
        .iter()
        .filter(|t| snippet.contains(t.as_str()) || name.contains(t.as_str()))
        .collect();
    let generic_only = matched.is_empty()
        || (matched.len() == 1 && GENERIC_TERMS.contains(&matched[0].as_str()));
    if generic_only {
        score -= GENERIC_MATCH_PENALTY;
    }

    score.clamp(0.0, 1.0)
}

/// Merge scored Q&A entries sharing a normalized question into FAQ evidence
///
/// Distinct answers are joined; the merged item takes the best score.
/// Output is sorted by score, highest first.
pub fn merge_faq_entries(scored: Vec<(QaEntry, f64)>) -> Vec<EvidenceItem> {
    let mut groups: Vec<(String, QaEntry, Vec<String>, f64)> = Vec::new();
    for (entry, score) in scored {
        let key = normalize_query(entry.question.trim_end_matches('?'));
        match groups.iter_mut().find(|(k, ..)| *k == key) {
            Some((_, _, answers, best)) => {
                if !answers.iter().any(|a| a == &entry.answer) {
                    answers.push(entry.answer.clone());
                }
                *best = best.max(score);
            }
            None => {
                let answers = vec![entry.answer.clone()];
                groups.push((key, entry, answers, score));
            }
        }
    }

    let mut items: Vec<EvidenceItem> = groups
        .into_iter()
        .map(|(_, entry, answers, score)| {
            let snippet = format!("Q: {}\nA: {}", entry.question, answers.join("\n\n"));
            EvidenceItem::new(format!("faq-{}", entry.id), "FAQ Knowledge Base", snippet, score, EvidenceTier::Faq)
                .with_last_verified(entry.updated_at)
        })
        .collect();
    items.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal));
    items
}
