//! Prompts for multi-step reasoning

use evident_domain::{CompletionRequest, EvidenceItem, InferenceKind, ReasoningStep};

const REASONING_SYSTEM: &str = "You are a careful analyst for merchant services questions. \
     Respond with a single JSON object and nothing else.";

fn request(user: String, temperature: f32) -> CompletionRequest {
    CompletionRequest::new(REASONING_SYSTEM, user).with_temperature(temperature)
}

/// Decompose a query into ordered sub-queries
pub fn decomposition(query: &str, temperature: f32) -> CompletionRequest {
    request(
        format!(
            r#"Break down this complex query into logical sub-components:

Query: "{}"

Decompose into 3-5 sub-queries that build upon each other logically.
Identify dependencies between sub-queries.
Classify the overall query type.

Return JSON format:
{{
  "subQueries": ["What is...", "How does...", "Why would..."],
  "dependencies": [{{"from": 1, "to": 2}}, {{"from": 2, "to": 3}}],
  "queryType": "analytical|comparative|procedural|factual"
}}"#,
            query
        ),
        temperature,
    )
}

/// Execute one step given the prior steps and retrieved evidence
pub fn step(
    step_number: usize,
    question: &str,
    previous: &[ReasoningStep],
    evidence: &[EvidenceItem],
    temperature: f32,
) -> CompletionRequest {
    let context = previous
        .iter()
        .map(|s| format!("Step {}: {}", s.step_number, s.output))
        .collect::<Vec<_>>()
        .join("\n");
    let information = evidence
        .iter()
        .map(|e| format!("- {}: {}", e.document_name, e.snippet))
        .collect::<Vec<_>>()
        .join("\n");

    request(
        format!(
            r#"Execute this reasoning step systematically:

Sub-Query: "{}"
Step Number: {}

Previous Context:
{}

Available Information:
{}

Return JSON format:
{{
  "reasoning": "step-by-step logical process",
  "conclusion": "specific answer to sub-query",
  "confidence": 85,
  "sources": ["document names used"],
  "assumptions": ["any assumptions made"]
}}"#,
            question, step_number, context, information
        ),
        temperature,
    )
}

/// Check a step conclusion against its evidence
pub fn verification(conclusion: &str, evidence: &[EvidenceItem], temperature: f32) -> CompletionRequest {
    let listed = evidence
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {}", i + 1, e.snippet))
        .collect::<Vec<_>>()
        .join("\n");

    request(
        format!(
            "Verify this conclusion against the provided evidence:\n\n\
             Conclusion: \"{}\"\n\nEvidence:\n{}\n\n\
             Return JSON: {{\"supports\": boolean, \"contradicts\": boolean, \"confidence\": 0-100}}",
            conclusion, listed
        ),
        temperature,
    )
}

/// Synthesize a final answer from the executed steps
pub fn synthesis(query: &str, steps: &[ReasoningStep], temperature: f32) -> CompletionRequest {
    let listed = steps
        .iter()
        .map(|s| {
            format!(
                "Step {}: {}\n  Conclusion: {}\n  Confidence: {}%\n  Status: {}",
                s.step_number,
                s.description,
                s.output,
                (s.confidence * 100.0).round() as i64,
                s.status.as_str()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    request(
        format!(
            r#"Synthesize a final conclusion from these reasoning steps:

Original Query: "{}"

Reasoning Steps:
{}

Provide a final answer that addresses the original query, integrates every step,
and acknowledges uncertainties or conflicts.

Return JSON format:
{{
  "conclusion": "comprehensive final answer",
  "confidence": 85
}}"#,
            query, listed
        ),
        temperature,
    )
}

fn kind_name(kind: InferenceKind) -> &'static str {
    match kind {
        InferenceKind::Deductive => "deductive",
        InferenceKind::Inductive => "inductive",
        InferenceKind::Abductive => "abductive",
    }
}

/// Draw a conclusion of the given kind from premises
pub fn inference(premises: &[String], kind: InferenceKind, temperature: f32) -> CompletionRequest {
    let name = kind_name(kind);
    let listed = premises
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Premise {}: \"{}\"", i + 1, p))
        .collect::<Vec<_>>()
        .join("\n");

    request(
        format!(
            r#"Perform {name} logical inference:

{listed}
Inference Type: {name}

- Deductive: If premises are true, conclusion must be true
- Inductive: Conclusion is probable based on premises
- Abductive: Best explanation given the premises

Return JSON format:
{{
  "conclusion": "logical conclusion",
  "validity": 85,
  "soundness": 75,
  "explanation": "reasoning process"
}}"#
        ),
        temperature,
    )
}
