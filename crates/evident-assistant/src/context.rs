//! Prompt context, sources, and follow-up suggestions

use evident_domain::{truncate_chars, ClaimStatus, EvidenceItem, Personalization, QueryType, SourceRef};

/// Context line used when nothing was retrieved
pub const NO_DOCUMENTS: &str = "No relevant documents found.";

fn flatten(text: &str, max_chars: usize) -> String {
    truncate_chars(&text.replace('\n', " "), max_chars).trim().to_string()
}

/// Numbered evidence lines for the system prompt
pub fn document_context(evidence: &[EvidenceItem], items: usize, snippet_chars: usize) -> String {
    if evidence.is_empty() {
        return NO_DOCUMENTS.to_string();
    }
    evidence
        .iter()
        .take(items)
        .enumerate()
        .map(|(i, item)| format!("{}. {}: {}...", i + 1, item.document_name, flatten(&item.snippet, snippet_chars)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sources returned with an answer
pub fn source_refs(evidence: &[EvidenceItem], snippet_chars: usize) -> Vec<SourceRef> {
    evidence
        .iter()
        .map(|item| SourceRef {
            source_id: item.source_id.clone(),
            name: item.document_name.clone(),
            snippet: format!("{}...", flatten(&item.snippet, snippet_chars)),
            score: item.relevance,
            tier: item.tier,
            url: item.metadata.url.clone(),
        })
        .collect()
}

/// System prompt for a direct answer
pub fn system_prompt(role: &str, context: &str, personalization: &Personalization) -> String {
    let mut prompt = format!(
        "You are an expert merchant services assistant helping a {}.\n\
         Answer using the documents below. Say so when they do not cover the question.\n\
         {}\n",
        role,
        personalization.preferred_style.instruction()
    );
    for hint in &personalization.prompt_hints {
        prompt.push_str(hint);
        prompt.push('\n');
    }
    prompt.push_str("\nRelevant documents:\n");
    prompt.push_str(context);
    prompt
}

/// Follow-up suggestions for an answer
pub fn suggestions(query_type: QueryType, evidence_found: bool, status: Option<ClaimStatus>) -> Vec<String> {
    let mut out: Vec<String> = if evidence_found {
        vec![
            "Review the found documents for more details".to_string(),
            "Save important information to your personal folder".to_string(),
            "Create a summary for your client".to_string(),
        ]
    } else {
        vec![
            "Try searching with different keywords".to_string(),
            "Upload relevant documents to the system".to_string(),
            "Check the FAQ Knowledge Base".to_string(),
        ]
    };

    match query_type {
        QueryType::Comparative => out.push("Ask for a side-by-side rate and feature comparison".to_string()),
        QueryType::Procedural => out.push("Ask for a step-by-step setup checklist".to_string()),
        QueryType::Analytical => out.push("Ask how this affects the merchant's monthly processing costs".to_string()),
        QueryType::Factual => {}
    }

    match status {
        Some(ClaimStatus::Contradicted) => {
            out.push("Sources disagree on this answer; confirm against the latest documents".to_string())
        }
        Some(ClaimStatus::Unverified) => {
            out.push("This answer could not be verified; check it with your processor".to_string())
        }
        _ => {}
    }
    out
}
