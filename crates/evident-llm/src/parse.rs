//! Typed parsing of JSON completion output
//!
//! Models often wrap JSON in markdown fences or surround it with prose. The
//! helpers here strip that framing and deserialize into an explicit struct,
//! so every completion is either a validated value or a
//! `MalformedCompletionOutput` error.

use evident_domain::{CompletionClient, CompletionRequest, PipelineError, PipelineResult};
use serde::de::DeserializeOwned;

/// Extract the JSON payload from a completion
///
/// Handles ```json fenced blocks, bare fences, and JSON embedded in prose
/// (first opening bracket through the last matching closing bracket).
pub fn extract_json(response: &str) -> PipelineResult<String> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(PipelineError::MalformedCompletionOutput("Empty code block".to_string()));
        }
        // Skip first line (```json or ```) and the closing fence
        let end = if lines.last().map(|l| l.trim_start().starts_with("```")).unwrap_or(false) {
            lines.len() - 1
        } else {
            lines.len()
        };
        return Ok(lines[1..end].join("\n"));
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed.to_string());
    }

    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(s), Some(e)) if e > s => Ok(trimmed[s..=e].to_string()),
        _ => Err(PipelineError::MalformedCompletionOutput(format!(
            "No JSON found in response: {}",
            preview(trimmed)
        ))),
    }
}

/// Parse completion text into `T`
pub fn parse_completion<T: DeserializeOwned>(response: &str) -> PipelineResult<T> {
    let json = extract_json(response)?;
    serde_json::from_str(&json).map_err(|e| {
        PipelineError::MalformedCompletionOutput(format!("{} in: {}", e, preview(&json)))
    })
}

/// Run a completion and parse its text into `T`
///
/// Returns the parsed value and the model that produced it.
pub async fn complete_json<T: DeserializeOwned>(
    client: &dyn CompletionClient,
    request: &CompletionRequest,
) -> PipelineResult<(T, String)> {
    let completion = client.complete(request).await?;
    let value = parse_completion(&completion.text)?;
    Ok((value, completion.model_used))
}

fn preview(text: &str) -> String {
    evident_domain::truncate_chars(text, 120)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProvider;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Judgment {
        supports: bool,
        #[serde(default)]
        confidence: f64,
    }

    #[test]
    fn test_extract_plain_json() {
        assert_eq!(extract_json(r#"  {"a": 1} "#).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_fenced_json() {
        let response = "```json\n{\"supports\": true}\n```";
        assert_eq!(extract_json(response).unwrap(), "{\"supports\": true}");
    }

    #[test]
    fn test_extract_embedded_json() {
        let response = "Sure! Here is the result: {\"supports\": false, \"confidence\": 40} Hope that helps.";
        let judgment: Judgment = parse_completion(response).unwrap();
        assert_eq!(judgment, Judgment { supports: false, confidence: 40.0 });
    }

    #[test]
    fn test_parse_failure_is_malformed() {
        let result: PipelineResult<Judgment> = parse_completion("I cannot answer that");
        assert!(matches!(result, Err(PipelineError::MalformedCompletionOutput(_))));

        let result: PipelineResult<Judgment> = parse_completion(r#"{"confidence": 3}"#);
        assert!(matches!(result, Err(PipelineError::MalformedCompletionOutput(_))));
    }

    #[tokio::test]
    async fn test_complete_json() {
        let provider = MockProvider::new(r#"{"supports": true, "confidence": 85}"#);
        let (judgment, model): (Judgment, String) =
            complete_json(&provider, &CompletionRequest::new("s", "u")).await.unwrap();
        assert!(judgment.supports);
        assert_eq!(model, "mock-model");
    }
}
