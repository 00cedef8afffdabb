//! Query expansion for the document tier
//!
//! Generates variants of a query by swapping industry abbreviations,
//! payment processor aliases, and common synonyms.

use evident_domain::key_terms;

/// Processor aliases: (short name, full name, alternates)
const PROCESSORS: &[(&str, &str, &[&str])] = &[
    ("tsys", "total system services", &["vital", "global payments"]),
    ("fiserv", "first data", &["clover"]),
    ("worldpay", "world pay", &["vantiv", "fis"]),
    ("square", "block", &["square payments", "square terminal"]),
    ("clover", "clover pos", &["clover flex", "clover mini"]),
    ("shift4", "shift 4", &["shift four", "harbortouch"]),
    ("stripe", "stripe payments", &["stripe terminal", "stripe connect"]),
    ("helcim", "helcim payments", &[]),
    ("paypal", "paypal here", &["paypal zettle", "braintree"]),
    ("chase", "chase paymentech", &["paymentech"]),
    ("elavon", "elavon merchant", &["us bank", "converge"]),
    ("hubwallet", "hub wallet", &["tracer hub wallet"]),
    ("quantic", "quantic pos", &["quantic retail"]),
    ("clearent", "clearent payments", &["tsys clearent"]),
];

/// Case-insensitive replacement of every occurrence of `pattern`
///
/// `pattern` must be lowercase ASCII.
fn replace_ci(text: &str, pattern: &str, replacement: &str) -> String {
    replace_matching(text, pattern, replacement, false)
}

/// Like [`replace_ci`] but only where `pattern` is a whole word
fn replace_word_ci(text: &str, pattern: &str, replacement: &str) -> String {
    replace_matching(text, pattern, replacement, true)
}

fn replace_matching(text: &str, pattern: &str, replacement: &str, whole_word: bool) -> String {
    if pattern.is_empty() {
        return text.to_string();
    }
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let is_word = |i: usize| bytes.get(i).is_some_and(|b| b.is_ascii_alphanumeric());

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut from = 0;
    while let Some(pos) = lower[from..].find(pattern) {
        let start = from + pos;
        let end = start + pattern.len();
        let bounded = !whole_word || ((start == 0 || !is_word(start - 1)) && !is_word(end));
        if bounded {
            out.push_str(&text[last..start]);
            out.push_str(replacement);
            last = end;
        }
        from = end;
    }
    out.push_str(&text[last..]);
    out
}

fn push_unique(variants: &mut Vec<String>, candidate: String) {
    let candidate = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
    if !candidate.is_empty() && !variants.iter().any(|v| v.eq_ignore_ascii_case(&candidate)) {
        variants.push(candidate);
    }
}

/// Generate search variants of `query`
///
/// The original query is always first, followed by at most `max_expansions`
/// distinct rewrites.
pub fn query_variants(query: &str, max_expansions: usize) -> Vec<String> {
    let mut variants = Vec::new();
    push_unique(&mut variants, query.to_string());
    if variants.is_empty() {
        return variants;
    }
    let lower = query.to_ascii_lowercase();

    if lower.contains("auth.net") || lower.contains("authnet") {
        for target in ["authorize.net", "authorize net", "authorize"] {
            let swapped = replace_ci(&replace_ci(query, "auth.net", target), "authnet", target);
            push_unique(&mut variants, swapped);
        }
    } else if lower.contains("authorize") {
        let pattern = if lower.contains("authorize.net") { "authorize.net" } else { "authorize" };
        push_unique(&mut variants, replace_ci(query, pattern, "auth.net"));
        push_unique(&mut variants, replace_ci(query, pattern, "authnet"));
    }

    for (short, full, alternates) in PROCESSORS {
        if lower.contains(short) {
            push_unique(&mut variants, replace_ci(query, short, full));
            for alt in *alternates {
                push_unique(&mut variants, replace_ci(query, short, alt));
            }
        }
        if lower.contains(full) {
            push_unique(&mut variants, replace_ci(query, full, short));
            for alt in *alternates {
                push_unique(&mut variants, replace_ci(query, full, alt));
            }
        }
    }

    if lower.contains("pricing") || lower.contains("rates") || lower.contains("price") {
        push_unique(&mut variants, replace_ci(query, "pricing", "rates"));
        push_unique(&mut variants, replace_ci(query, "rates", "pricing"));
        for target in ["fees", "cost"] {
            let swapped = ["pricing", "prices", "price"]
                .iter()
                .fold(query.to_string(), |q, form| replace_ci(&q, form, target));
            push_unique(&mut variants, swapped);
        }
    }

    if lower.contains("setup") || lower.contains("set up") {
        for target in ["install", "configure", "integrate"] {
            push_unique(&mut variants, replace_ci(&replace_ci(query, "set up", target), "setup", target));
        }
    }

    if lower.contains("pos") {
        push_unique(&mut variants, replace_word_ci(query, "pos", "point of sale"));
        push_unique(&mut variants, replace_word_ci(query, "pos", "terminal"));
    }

    if lower.contains("ecommerce") || lower.contains("e-commerce") {
        for target in ["online", "website", "virtual terminal"] {
            push_unique(&mut variants, replace_ci(&replace_ci(query, "e-commerce", target), "ecommerce", target));
        }
    }

    variants.truncate(max_expansions + 1);
    variants
}

/// Search terms for keyword matching
///
/// Key terms of the query, with the whole query prepended when it is shorter
/// than 30 characters.
pub fn search_terms(query: &str) -> Vec<String> {
    let mut terms = key_terms(query);
    let trimmed = query.trim().to_lowercase();
    if !trimmed.is_empty() && trimmed.chars().count() < 30 && !terms.contains(&trimmed) {
        terms.insert(0, trimmed);
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_query_first() {
        let variants = query_variants("TSYS pricing", 15);
        assert_eq!(variants[0], "TSYS pricing");
        assert!(variants.contains(&"total system services pricing".to_string()));
        assert!(variants.contains(&"TSYS rates".to_string()));
        assert!(variants.contains(&"TSYS fees".to_string()));
    }

    #[test]
    fn test_auth_net_variants() {
        let variants = query_variants("auth.net setup", 15);
        assert!(variants.contains(&"authorize.net setup".to_string()));
        assert!(variants.contains(&"auth.net install".to_string()));
    }

    #[test]
    fn test_pos_is_word_bounded() {
        let variants = query_variants("best pos for retail", 15);
        assert!(variants.contains(&"best point of sale for retail".to_string()));

        let variants = query_variants("deposit timing", 15);
        assert_eq!(variants, vec!["deposit timing".to_string()]);
    }

    #[test]
    fn test_expansion_cap() {
        let variants = query_variants("square clover pricing setup pos ecommerce", 3);
        assert_eq!(variants.len(), 4);
    }

    #[test]
    fn test_empty_query() {
        assert!(query_variants("   ", 15).is_empty());
    }

    #[test]
    fn test_search_terms_prepends_short_query() {
        assert_eq!(search_terms("refund policy"), vec!["refund policy", "refund", "policy"]);
        let long = "what is the chargeback dispute process for card not present";
        assert_eq!(search_terms(long)[0], "chargeback");
    }

    #[test]
    fn test_replace_ci_preserves_surrounding_text() {
        assert_eq!(replace_ci("Worldpay Rates", "worldpay", "vantiv"), "vantiv Rates");
        assert_eq!(replace_word_ci("POS and repos", "pos", "terminal"), "terminal and repos");
    }
}
