//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use evident_domain::{
    truncate_chars, AnswerResponse, Citation, Conflict, DocumentRelationship, EvidenceItem,
    ReasoningChain, VerificationVerdict,
};
use evident_learning::FeedbackOutcome;
use evident_retrieval::SearchOutcome;
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

const SNIPPET_CHARS: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format an assistant answer.
    pub fn format_answer(&self, answer: &AnswerResponse) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(answer)?),
            OutputFormat::Quiet => Ok(answer.message.clone()),
            OutputFormat::Table => {
                let mut out = vec![answer.message.clone(), String::new()];

                if !answer.sources.is_empty() {
                    let mut builder = Builder::default();
                    builder.push_record(["Source", "Tier", "Score", "Snippet"]);
                    for source in &answer.sources {
                        builder.push_record([
                            source.name.clone(),
                            label(&source.tier),
                            format!("{:.2}", source.score),
                            truncate_chars(&source.snippet, SNIPPET_CHARS),
                        ]);
                    }
                    out.push(self.table(builder));
                }

                if let Some(metrics) = &answer.confidence_metrics {
                    out.push(format!(
                        "Confidence: {} ({})",
                        self.score(metrics.overall),
                        label(&metrics.level)
                    ));
                    for warning in &metrics.warnings {
                        out.push(self.warning(warning));
                    }
                }
                if let Some(verdict) = &answer.fact_verification {
                    out.push(format!("Verification: {}", verdict.status.as_str()));
                }
                if !answer.suggestions.is_empty() {
                    out.push(String::new());
                    out.push("Suggestions:".to_string());
                    out.extend(answer.suggestions.iter().map(|s| format!("  - {}", s)));
                }
                Ok(out.join("\n"))
            }
        }
    }

    /// Format a search outcome.
    pub fn format_search(&self, outcome: &SearchOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "tier": label(&outcome.tier),
                    "reason": outcome.reason,
                    "evidence": outcome.evidence,
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(outcome
                .evidence
                .iter()
                .map(|e| e.source_id.clone())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if outcome.evidence.is_empty() {
                    let reason = outcome.reason.as_deref().unwrap_or("No evidence found.");
                    return Ok(self.colorize(reason, "yellow"));
                }
                let mut out = vec![self.info(&format!(
                    "{} result(s) from the {} tier",
                    outcome.evidence.len(),
                    label(&outcome.tier)
                ))];
                out.push(self.evidence_table(&outcome.evidence));
                Ok(out.join("\n"))
            }
        }
    }

    /// Format a verification verdict.
    pub fn format_verdict(&self, verdict: &VerificationVerdict) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(verdict)?),
            OutputFormat::Quiet => Ok(verdict.status.as_str().to_string()),
            OutputFormat::Table => {
                let mut out = vec![
                    format!("Claim: {}", verdict.claim),
                    format!(
                        "Status: {} (confidence {})",
                        self.status(verdict.status.as_str()),
                        self.score(verdict.confidence)
                    ),
                    format!("Source reliability: {:.2}", verdict.source_reliability),
                ];

                if !verdict.supporting.is_empty() || !verdict.contradicting.is_empty() {
                    let mut builder = Builder::default();
                    builder.push_record(["Source", "Support", "Relevance", "Reliability", "Contradiction"]);
                    for assessed in verdict.supporting.iter().chain(&verdict.contradicting) {
                        let contradiction = if assessed.is_contradiction {
                            format!("{:.2}", assessed.contradiction_confidence)
                        } else {
                            "-".to_string()
                        };
                        builder.push_record([
                            assessed.item.document_name.clone(),
                            label(&assessed.support),
                            format!("{:.2}", assessed.item.relevance),
                            format!("{:.2}", assessed.item.reliability),
                            contradiction,
                        ]);
                    }
                    out.push(self.table(builder));
                }

                out.extend(verdict.flags.iter().map(|f| self.warning(f)));
                out.extend(verdict.recommendations.iter().map(|r| format!("  - {}", r)));
                Ok(out.join("\n"))
            }
        }
    }

    /// Format a citation.
    pub fn format_citation(&self, citation: &Citation) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(citation)?),
            OutputFormat::Quiet => Ok(label(&citation.verification_status)),
            OutputFormat::Table => {
                let mut out = vec![
                    format!("Claim: {}", citation.claim),
                    format!(
                        "Status: {} | Strength: {} | Confidence: {} [{:.2}, {:.2}]",
                        self.status(&label(&citation.verification_status)),
                        label(&citation.evidence_strength),
                        self.score(citation.overall_confidence),
                        citation.confidence_interval.lower,
                        citation.confidence_interval.upper
                    ),
                ];

                let mut builder = Builder::default();
                builder.push_record(["Rank", "Source", "Reliability", "Score", "Snippets"]);
                let ranked = citation
                    .primary_sources
                    .iter()
                    .map(|s| ("primary", s))
                    .chain(citation.secondary_sources.iter().map(|s| ("secondary", s)));
                let mut rows = 0;
                for (rank, source) in ranked {
                    builder.push_record([
                        rank.to_string(),
                        source.evidence.document_name.clone(),
                        format!("{:.2}", source.reliability()),
                        format!("{:.2}", source.rank_score),
                        source.supporting_snippets.len().to_string(),
                    ]);
                    rows += 1;
                }
                if rows > 0 {
                    out.push(self.table(builder));
                }

                for flag in &citation.warning_flags {
                    out.push(self.warning(&format!("[{}] {}", flag.severity.as_str(), flag.message)));
                }
                out.extend(citation.recommendations.iter().map(|r| format!("  - {}", r)));
                Ok(out.join("\n"))
            }
        }
    }

    /// Format a reasoning chain.
    pub fn format_chain(&self, chain: &ReasoningChain) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(chain)?),
            OutputFormat::Quiet => Ok(chain.final_conclusion.clone()),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["#", "Sub-question", "Conclusion", "Confidence", "Status"]);
                for step in &chain.steps {
                    builder.push_record([
                        step.step_number.to_string(),
                        step.description.clone(),
                        truncate_chars(&step.output, SNIPPET_CHARS),
                        format!("{:.2}", step.confidence),
                        step.status.as_str().to_string(),
                    ]);
                }

                let mut out = vec![
                    format!("Query ({}): {}", chain.query_type.as_str(), chain.query),
                    self.table(builder),
                    format!("Conclusion: {}", chain.final_conclusion),
                    format!("Confidence: {}", self.score(chain.overall_confidence)),
                ];
                if !chain.cited_sources.is_empty() {
                    out.push(format!("Sources: {}", chain.cited_sources.join(", ")));
                }
                out.extend(chain.potential_issues.iter().map(|i| self.warning(i)));
                Ok(out.join("\n"))
            }
        }
    }

    /// Format detected conflicts.
    pub fn format_conflicts(&self, conflicts: &[Conflict]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(conflicts)?),
            OutputFormat::Quiet => Ok(conflicts
                .iter()
                .map(|c| format!("{} {}", c.documents_involved[0], c.documents_involved[1]))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if conflicts.is_empty() {
                    return Ok(self.success("No conflicts found."));
                }
                let mut builder = Builder::default();
                builder.push_record(["Documents", "Type", "Severity", "Description", "Resolution"]);
                for conflict in conflicts {
                    builder.push_record([
                        format!(
                            "{}\n{}",
                            short_id(&conflict.documents_involved[0].to_string()),
                            short_id(&conflict.documents_involved[1].to_string())
                        ),
                        label(&conflict.conflict_type),
                        self.severity(conflict.severity.as_str()),
                        conflict.description.clone(),
                        conflict.resolution_suggestion.clone().unwrap_or_default(),
                    ]);
                }
                Ok(self.table(builder))
            }
        }
    }

    /// Format document relationships.
    pub fn format_relationships(&self, relationships: &[DocumentRelationship]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(relationships)?),
            OutputFormat::Quiet => Ok(relationships
                .iter()
                .map(|r| r.target.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if relationships.is_empty() {
                    return Ok(self.colorize("No related documents found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["ID", "Document", "Relationship", "Confidence", "Description"]);
                for r in relationships {
                    builder.push_record([
                        short_id(&r.target.to_string()),
                        r.target_name.clone(),
                        label(&r.relationship_type),
                        format!("{}%", r.confidence),
                        r.description.clone(),
                    ]);
                }
                Ok(self.table(builder))
            }
        }
    }

    /// Format the result of recording feedback.
    pub fn format_feedback(&self, outcome: &FeedbackOutcome) -> Result<String> {
        let profile = &outcome.profile;
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "profile": profile,
                    "improvement": outcome.improvement,
                    "errors": outcome.errors,
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(format!("{:.3} {:.3}", profile.accuracy, profile.satisfaction_score)),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["User", "Interactions", "Accuracy", "Satisfaction", "Adjustment", "Style"]);
                builder.push_record([
                    profile.user_id.clone(),
                    profile.total_interactions.to_string(),
                    format!("{:.3}", profile.accuracy),
                    format!("{:.3}", profile.satisfaction_score),
                    format!("{:+.3}", profile.confidence_adjustment),
                    label(&profile.preferred_style),
                ]);

                let mut out = vec![self.success("Feedback recorded"), self.table(builder)];
                if let Some(candidate) = &outcome.improvement {
                    out.push(self.info(&format!(
                        "Improvement proposed for review ({}): {}",
                        label(&candidate.category),
                        candidate.description
                    )));
                }
                out.extend(outcome.errors.iter().map(|e| self.warning(e)));
                Ok(out.join("\n"))
            }
        }
    }

    fn evidence_table(&self, evidence: &[EvidenceItem]) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Source", "Type", "Relevance", "Snippet"]);
        for item in evidence {
            builder.push_record([
                item.document_name.clone(),
                item.document_type.as_str().to_string(),
                format!("{:.2}", item.relevance),
                truncate_chars(&item.snippet.replace('\n', " "), SNIPPET_CHARS),
            ]);
        }
        self.table(builder)
    }

    fn table(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Format bulk import result.
    pub fn imported(&self, what: &str, count: usize) -> String {
        self.success(&format!("Imported {} {}", count, what))
    }

    fn score(&self, score: f64) -> String {
        let text = format!("{:.2}", score);
        let color = if score >= 0.8 {
            "green"
        } else if score >= 0.5 {
            "yellow"
        } else {
            "red"
        };
        self.colorize(&text, color)
    }

    fn status(&self, status: &str) -> String {
        let color = match status {
            "verified" | "fully_verified" => "green",
            "partially_verified" => "cyan",
            "contradicted" | "conflicted" => "red",
            _ => "yellow",
        };
        self.colorize(status, color)
    }

    fn severity(&self, severity: &str) -> String {
        let color = match severity {
            "critical" | "high" => "red",
            "medium" => "yellow",
            _ => "cyan",
        };
        self.colorize(severity, color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "magenta" => text.magenta().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Serialized name of a unit enum value.
pub fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use evident_retrieval::OutcomeTier;
    use evident_domain::{
        ClaimStatus, ConflictType, DocumentId, EvidenceTier, LearningProfile, Severity, StepStatus,
        QueryType, ReasoningStep,
    };

    fn outcome() -> SearchOutcome {
        SearchOutcome {
            evidence: vec![EvidenceItem::new(
                "qa-1",
                "FAQ Knowledge Base",
                "Q: What is the refund policy?\nA: Refunds within 30 days.",
                0.9,
                EvidenceTier::Faq,
            )],
            tier: OutcomeTier::Faq,
            reason: None,
        }
    }

    #[test]
    fn test_search_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_search(&outcome()).unwrap();
        assert!(output.contains("\"tier\": \"faq\""));
        assert!(output.contains("FAQ Knowledge Base"));
    }

    #[test]
    fn test_search_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        assert_eq!(formatter.format_search(&outcome()).unwrap(), "qa-1");
    }

    #[test]
    fn test_search_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_search(&outcome()).unwrap();
        assert!(output.contains("Relevance"));
        assert!(output.contains("1 result(s) from the faq tier"));
    }

    #[test]
    fn test_empty_search_shows_reason() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let empty = SearchOutcome {
            evidence: Vec::new(),
            tier: OutcomeTier::None,
            reason: Some("No relevant information found".to_string()),
        };
        assert_eq!(formatter.format_search(&empty).unwrap(), "No relevant information found");
    }

    #[test]
    fn test_answer_formats() {
        let answer = AnswerResponse::degraded("Try again later.", "Service unavailable");

        let quiet = Formatter::new(OutputFormat::Quiet, false);
        assert_eq!(quiet.format_answer(&answer).unwrap(), "Try again later.");

        let table = Formatter::new(OutputFormat::Table, false);
        let output = table.format_answer(&answer).unwrap();
        assert!(output.contains("Confidence: 0.20 (low)"));
        assert!(output.contains("⚠ Service unavailable"));

        let json = Formatter::new(OutputFormat::Json, false);
        assert!(json.format_answer(&answer).unwrap().contains("confidenceMetrics"));
    }

    #[test]
    fn test_verdict_quiet_is_status() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let verdict = VerificationVerdict::failsafe("Fees are 2.5%");
        assert_eq!(formatter.format_verdict(&verdict).unwrap(), ClaimStatus::Unverified.as_str());
    }

    #[test]
    fn test_conflict_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let conflicts = vec![Conflict {
            documents_involved: [DocumentId::new(), DocumentId::new()],
            conflict_type: ConflictType::Numerical,
            severity: Severity::High,
            description: "2.5% vs 3.1%".to_string(),
            evidence_snippets: Vec::new(),
            resolution_suggestion: Some("Confirm the current rate".to_string()),
        }];
        let output = formatter.format_conflicts(&conflicts).unwrap();
        assert!(output.contains("numerical"));
        assert!(output.contains("high"));
        assert!(formatter.format_conflicts(&[]).unwrap().contains("No conflicts found"));
    }

    #[test]
    fn test_chain_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let chain = ReasoningChain {
            query: "Why?".to_string(),
            query_type: QueryType::Analytical,
            steps: vec![ReasoningStep {
                step_number: 1,
                description: "fees".to_string(),
                output: "They rose".to_string(),
                confidence: 0.7,
                sources: Vec::new(),
                status: StepStatus::Verified,
                reasoning: String::new(),
                assumptions: Vec::new(),
            }],
            final_conclusion: "Fees rose".to_string(),
            overall_confidence: 0.7,
            cited_sources: vec!["Fee Schedule".to_string()],
            potential_issues: Vec::new(),
            audit_trail: Vec::new(),
        };
        let output = formatter.format_chain(&chain).unwrap();
        assert!(output.contains("Conclusion: Fees rose"));
        assert!(output.contains("Sources: Fee Schedule"));
    }

    #[test]
    fn test_feedback_quiet() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let outcome = FeedbackOutcome {
            profile: LearningProfile::new("alice"),
            improvement: None,
            errors: Vec::new(),
        };
        assert_eq!(formatter.format_feedback(&outcome).unwrap(), "0.700 0.700");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let msg = formatter.success("test");
        assert_eq!(msg, "✓ test");
    }

    #[test]
    fn test_label_uses_serde_names() {
        assert_eq!(label(&EvidenceTier::Document), "document");
        assert_eq!(label(&Severity::Critical), "critical");
    }
}
