//! Prompts for document graph analysis

use evident_domain::{CompletionRequest, Document};

const ANALYST_SYSTEM: &str =
    "You analyze merchant services documents. Respond with a single JSON value and nothing else.";

/// Builds the analysis requests sent to the completion service
pub struct PromptBuilder {
    temperature: f32,
}

impl PromptBuilder {
    /// Create a builder using `temperature` for every request
    pub fn new(temperature: f32) -> Self {
        Self { temperature }
    }

    fn request(&self, user: String) -> CompletionRequest {
        CompletionRequest::new(ANALYST_SYSTEM, user).with_temperature(self.temperature)
    }

    /// Relationship judgment between two documents
    pub fn relationship(&self, a: &Document, b: &Document, preview_chars: usize) -> CompletionRequest {
        let mut prompt = String::from("Analyze the relationship between these two documents:\n\n");
        prompt.push_str(&format!("Document A: {}\nContent Preview: {}...\n\n", a.name, a.preview(preview_chars)));
        prompt.push_str(&format!("Document B: {}\nContent Preview: {}...\n\n", b.name, b.preview(preview_chars)));
        prompt.push_str(RELATIONSHIP_INSTRUCTIONS);
        self.request(prompt)
    }

    /// Conflict judgment between two documents
    pub fn conflict(&self, a: &Document, b: &Document, preview_chars: usize) -> CompletionRequest {
        let mut prompt = String::from("Analyze these two documents for conflicts or contradictions:\n\n");
        prompt.push_str(&format!("Document A: {}\nContent: {}...\n\n", a.name, a.preview(preview_chars)));
        prompt.push_str(&format!("Document B: {}\nContent: {}...\n\n", b.name, b.preview(preview_chars)));
        prompt.push_str(CONFLICT_INSTRUCTIONS);
        self.request(prompt)
    }

    /// Key entity extraction
    pub fn entities(&self, doc: &Document, preview_chars: usize) -> CompletionRequest {
        self.request(format!(
            "Extract key entities from this merchant services document:\n\n{}\n\n{}",
            doc.preview(preview_chars),
            ENTITY_INSTRUCTIONS
        ))
    }

    /// Main topic extraction
    pub fn topics(&self, doc: &Document, preview_chars: usize) -> CompletionRequest {
        self.request(format!(
            "Identify the main topics covered in this document:\n\n{}\n\n\
             Return 5-8 specific topics as JSON: {{\"topics\": [\"topic1\", \"topic2\"]}}",
            doc.preview(preview_chars)
        ))
    }

    /// Factual claim extraction
    pub fn claims(&self, doc: &Document, preview_chars: usize) -> CompletionRequest {
        self.request(format!(
            "Extract specific factual claims from this document:\n\n{}\n\n{}",
            doc.preview(preview_chars),
            CLAIM_INSTRUCTIONS
        ))
    }
}

const RELATIONSHIP_INSTRUCTIONS: &str = r#"Determine if there is a significant relationship and classify it:
- references: Document A cites or mentions Document B
- contradicts: Documents contain conflicting information
- supports: Documents reinforce each other's claims
- extends: Document A builds upon Document B
- supersedes: Document A replaces or updates Document B

Return JSON format:
{
  "hasRelationship": boolean,
  "relationshipType": "references|contradicts|supports|extends|supersedes",
  "confidence": 0-100,
  "description": "brief explanation"
}"#;

const CONFLICT_INSTRUCTIONS: &str = r#"Look for:
1. Factual contradictions (different numbers, dates, procedures)
2. Policy conflicts (contradictory rules or guidelines)
3. Numerical discrepancies (rates, fees, percentages)
4. Procedural differences (conflicting steps or requirements)

Return JSON format:
{
  "hasConflict": boolean,
  "conflictType": "factual|numerical|procedural|policy",
  "severity": "low|medium|high|critical",
  "description": "specific conflict description",
  "evidenceSnippets": ["conflicting text excerpts"],
  "resolutionSuggestion": "how to resolve"
}"#;

const ENTITY_INSTRUCTIONS: &str = r#"Focus on:
- Company names
- Product names
- Technical terms
- Financial terms
- Key people/roles
- Specific rates/fees
- Important dates

Return JSON format: {"entities": ["entity1", "entity2"]}"#;

const CLAIM_INSTRUCTIONS: &str = r#"Focus on:
- Specific rates, fees, percentages
- Concrete procedures or requirements
- Definitive statements about capabilities
- Specific timeframes or deadlines

Return JSON format:
{
  "claims": [
    {
      "claim": "specific factual statement",
      "confidence": 0-100,
      "supportingEvidence": ["text excerpts that support this"]
    }
  ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_prompt_truncates_previews() {
        let a = Document::new("Fee Schedule", "x".repeat(900));
        let b = Document::new("Merchant Agreement", "short");
        let request = PromptBuilder::new(0.1).relationship(&a, &b, 500);
        let text = request.full_text();

        assert!(text.contains("Document A: Fee Schedule"));
        assert!(text.contains(&format!("{}...", "x".repeat(500))));
        assert!(!text.contains(&"x".repeat(501)));
        assert!(text.contains("hasRelationship"));
        assert_eq!(request.temperature, 0.1);
    }

    #[test]
    fn test_conflict_prompt_names_both_documents() {
        let a = Document::new("Rates 2023", "Swipe rate 2.5%");
        let b = Document::new("Rates 2024", "Swipe rate 3.1%");
        let text = PromptBuilder::new(0.1).conflict(&a, &b, 1000).full_text();
        assert!(text.contains("Rates 2023") && text.contains("Rates 2024"));
        assert!(text.contains("evidenceSnippets"));
    }

    #[test]
    fn test_extraction_prompts() {
        let doc = Document::new("Guide", "Clover Flex supports tap to pay.");
        let builder = PromptBuilder::new(0.1);
        assert!(builder.entities(&doc, 2000).full_text().contains("\"entities\""));
        assert!(builder.topics(&doc, 1500).full_text().contains("5-8 specific topics"));
        assert!(builder.claims(&doc, 2000).full_text().contains("supportingEvidence"));
    }
}
