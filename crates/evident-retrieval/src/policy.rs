//! Business-appropriateness policy for web search
//!
//! A query reaches the web tier only when it is free of excluded topics and
//! carries enough merchant-services or business vocabulary.

use evident_domain::normalize_query;

const EXCLUDED_KEYWORDS: &[&str] = &[
    "adult", "porn", "xxx", "escort", "gambling", "casino", "bet", "politics", "political",
    "election", "candidate", "religion", "religious", "church", "mosque", "temple", "drugs",
    "illegal", "weapon", "gun", "violence", "hate", "discrimination", "racist", "terrorism",
    "extremist", "explicit", "nsfw", "marijuana", "cannabis", "cbd", "thc", "alcohol", "tobacco",
    "dating", "hookup", "cryptocurrency scam", "pyramid scheme", "mlm",
];

const MERCHANT_KEYWORDS: &[&str] = &[
    "payment", "merchant", "processing", "pos", "terminal", "transaction", "gateway", "acquiring",
    "commerce", "fintech", "card", "credit", "debit", "interchange", "settlement", "rate sheet",
    "pricing", "compliance", "pci", "api", "integration", "sdk", "developer", "documentation",
    "security", "fraud", "chargeback", "iso", "reseller", "partner", "emv", "contactless",
    "mobile payments", "digital wallet", "tokenization", "encryption", "moto",
    "card not present", "point of sale", "merchant services", "payment processor",
    "acquiring bank", "issuing bank", "authorization", "capture", "void", "refund",
];

const BUSINESS_TERMS: &[&str] = &[
    "revenue", "growth", "expansion", "acquisition", "merger", "ipo", "funding", "partnership",
    "collaboration", "product launch", "feature update", "security update", "regulation",
    "industry news", "market trends", "competition", "customer success", "case study",
    "white paper", "webinar", "conference", "certification", "award", "recognition",
    "leadership change", "executive", "quarterly results", "earnings", "financial", "investment",
    "innovation",
];

/// Outcome of an appropriateness check
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDecision {
    /// Whether the query may be sent to the web
    pub passed: bool,
    /// Confidence in the decision
    pub confidence: f64,
    /// Human-readable reason
    pub reason: String,
    /// Keywords that contributed to the score
    pub matched: Vec<String>,
}

/// Keyword allow-list and deny-list filter
#[derive(Debug, Clone)]
pub struct AppropriatenessPolicy {
    excluded: Vec<String>,
    merchant_keywords: Vec<String>,
    business_terms: Vec<String>,
}

impl Default for AppropriatenessPolicy {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            excluded: owned(EXCLUDED_KEYWORDS),
            merchant_keywords: owned(MERCHANT_KEYWORDS),
            business_terms: owned(BUSINESS_TERMS),
        }
    }
}

/// Lowercase words padded with spaces so phrase checks respect word edges
fn padded_words(text: &str) -> String {
    let cleaned: String = normalize_query(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    format!(" {} ", cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn contains_phrase(padded: &str, phrase: &str) -> bool {
    padded.contains(&format!(" {} ", phrase))
}

impl AppropriatenessPolicy {
    /// Add a term to the deny list
    pub fn exclude(mut self, keyword: impl Into<String>) -> Self {
        self.excluded.push(keyword.into().to_lowercase());
        self
    }

    /// Evaluate `text` against the policy
    ///
    /// Matching is on whole words, so "bet" does not reject "better rates".
    pub fn evaluate(&self, text: &str) -> PolicyDecision {
        let padded = padded_words(text);

        if let Some(excluded) = self.excluded.iter().find(|k| contains_phrase(&padded, k)) {
            return PolicyDecision {
                passed: false,
                confidence: 0.9,
                reason: format!("Content contains excluded keyword: {}", excluded),
                matched: vec![excluded.clone()],
            };
        }

        let mut matched = Vec::new();
        let mut score: f64 = 0.0;
        for keyword in &self.merchant_keywords {
            if contains_phrase(&padded, keyword) {
                score += 1.0;
                matched.push(keyword.clone());
            }
        }
        for term in &self.business_terms {
            if contains_phrase(&padded, term) {
                score += 0.5;
                matched.push(term.clone());
            }
        }

        if score >= 1.0 {
            PolicyDecision {
                passed: true,
                confidence: (score / 5.0).min(0.95),
                reason: format!(
                    "Relevant content with keywords: {}",
                    matched.iter().take(5).cloned().collect::<Vec<_>>().join(", ")
                ),
                matched,
            }
        } else {
            PolicyDecision {
                passed: false,
                confidence: 0.8,
                reason: "Content does not contain sufficient merchant services keywords".to_string(),
                matched,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merchant_query_passes() {
        let decision = AppropriatenessPolicy::default().evaluate("Latest interchange pricing for card payment processing");
        assert!(decision.passed);
        assert!(decision.confidence > 0.5 && decision.confidence <= 0.95);
        assert!(decision.matched.contains(&"interchange".to_string()));
    }

    #[test]
    fn test_excluded_keyword_rejects() {
        let decision = AppropriatenessPolicy::default().evaluate("payment processing for a casino");
        assert!(!decision.passed);
        assert_eq!(decision.reason, "Content contains excluded keyword: casino");
    }

    #[test]
    fn test_insufficient_keywords_rejects() {
        let decision = AppropriatenessPolicy::default().evaluate("what's the weather tomorrow");
        assert!(!decision.passed);
        assert_eq!(decision.reason, "Content does not contain sufficient merchant services keywords");
    }

    #[test]
    fn test_whole_word_matching() {
        let decision = AppropriatenessPolicy::default().evaluate("better terminal options");
        assert!(decision.passed);
    }

    #[test]
    fn test_business_terms_count_half() {
        let policy = AppropriatenessPolicy::default();
        assert!(!policy.evaluate("quarterly results").passed);
        assert!(policy.evaluate("quarterly results and earnings").passed);
    }

    #[test]
    fn test_custom_exclusion() {
        let policy = AppropriatenessPolicy::default().exclude("vape");
        assert!(!policy.evaluate("vape shop merchant account").passed);
    }
}
