//! Citations with per-source confidence intervals

use crate::config::CitationConfig;
use crate::reliability::{ReliabilityModel, SourceFeedback};
use chrono::{DateTime, Utc};
use evident_domain::{
    truncate_chars, Citation, CitationSource, CitationStatus, ClaimStatus, CompletionClient,
    CompletionRequest, ConfidenceInterval, EvidenceItem, EvidenceStrength, PipelineError,
    PipelineResult, Severity, SnippetKind, SnippetStrength, SupportingSnippet, VerificationVerdict,
    WarningFlag, WarningKind,
};
use evident_llm::complete_json;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const CITATION_SYSTEM: &str =
    "You extract evidence from merchant services documents. Respond with a single JSON object and nothing else.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnippet {
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    evidence_type: Option<String>,
    #[serde(default)]
    strength: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnippetList {
    #[serde(default)]
    evidence: Vec<RawSnippet>,
}

fn snippet_kind(s: Option<&str>) -> SnippetKind {
    match s.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("direct_quote") => SnippetKind::DirectQuote,
        Some("numerical_data") => SnippetKind::NumericalData,
        Some("procedural_step") => SnippetKind::ProceduralStep,
        _ => SnippetKind::Paraphrase,
    }
}

fn snippet_strength(s: Option<&str>) -> SnippetStrength {
    match s.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("strong") => SnippetStrength::Strong,
        Some("moderate") => SnippetStrength::Moderate,
        _ => SnippetStrength::Weak,
    }
}

fn strong_snippets(source: &CitationSource) -> usize {
    source
        .supporting_snippets
        .iter()
        .filter(|s| s.strength == SnippetStrength::Strong)
        .count()
}

/// Margin of error around a source's `reliability × relevance`
pub fn margin_of_error(reliability: f64, relevance: f64, strong_snippets: usize) -> f64 {
    let mut margin: f64 = 0.1;
    if reliability < 0.5 {
        margin += 0.15;
    }
    if reliability < 0.3 {
        margin += 0.2;
    }
    if relevance < 0.7 {
        margin += 0.1;
    }
    if relevance < 0.5 {
        margin += 0.15;
    }
    if strong_snippets >= 2 {
        margin -= 0.05;
    }
    if strong_snippets >= 3 {
        margin -= 0.1;
    }
    margin.clamp(0.05, 0.4)
}

/// Strength of the evidence behind a claim
///
/// `sources` are all ranked sources before the primary/secondary cut.
pub fn evidence_strength(sources: &[CitationSource], contradicted: bool, primary_reliability: f64) -> EvidenceStrength {
    if contradicted {
        return EvidenceStrength::Weak;
    }
    if sources.len() < 2 {
        return EvidenceStrength::Insufficient;
    }
    let reliable = sources.iter().filter(|s| s.reliability() > primary_reliability).count();
    let strong: usize = sources.iter().map(strong_snippets).sum();
    if reliable >= 2 && strong >= 3 {
        EvidenceStrength::Strong
    } else if reliable >= 1 && strong >= 2 {
        EvidenceStrength::Moderate
    } else {
        EvidenceStrength::Weak
    }
}

fn status_from(verdict: Option<&VerificationVerdict>, strength: EvidenceStrength) -> CitationStatus {
    match verdict.map(|v| v.status) {
        Some(ClaimStatus::Verified) => CitationStatus::FullyVerified,
        Some(ClaimStatus::PartiallyVerified) => CitationStatus::PartiallyVerified,
        Some(ClaimStatus::Contradicted) => CitationStatus::Conflicted,
        Some(ClaimStatus::Unverified) => CitationStatus::Unverified,
        None => match strength {
            EvidenceStrength::Strong => CitationStatus::FullyVerified,
            EvidenceStrength::Moderate => CitationStatus::PartiallyVerified,
            EvidenceStrength::Weak | EvidenceStrength::Insufficient => CitationStatus::Unverified,
        },
    }
}

/// Builds citations for claims from ranked evidence
pub struct CitationEngine {
    llm: Arc<dyn CompletionClient>,
    reliability: Arc<ReliabilityModel>,
    config: CitationConfig,
}

impl CitationEngine {
    /// Create an engine
    pub fn new(llm: Arc<dyn CompletionClient>, reliability: Arc<ReliabilityModel>, config: CitationConfig) -> Self {
        Self {
            llm,
            reliability,
            config,
        }
    }

    /// Record feedback about a cited source
    ///
    /// The adjustment applies to every later citation that uses the source.
    pub fn update_source_reliability(&self, source_id: &str, feedback: SourceFeedback) -> f64 {
        self.reliability.update_source_reliability(source_id, feedback)
    }

    /// Build a citation for a claim; never fails
    ///
    /// When a verdict from the fact verifier is supplied it decides the
    /// citation status and contributes contradiction warnings.
    pub async fn cite(&self, claim: &str, evidence: &[EvidenceItem], verdict: Option<&VerificationVerdict>) -> Citation {
        match self.try_cite(claim, evidence, verdict, Utc::now()).await {
            Ok(citation) => {
                info!(
                    "Citation complete: {} primary, {} secondary, {:?} evidence",
                    citation.primary_sources.len(),
                    citation.secondary_sources.len(),
                    citation.evidence_strength
                );
                citation
            }
            Err(e) => {
                warn!("Citation for '{}' failed: {}", claim, e);
                Citation::failsafe(claim, &e.to_string())
            }
        }
    }

    async fn try_cite(
        &self,
        claim: &str,
        evidence: &[EvidenceItem],
        verdict: Option<&VerificationVerdict>,
        now: DateTime<Utc>,
    ) -> PipelineResult<Citation> {
        let mut ranked = Vec::with_capacity(evidence.len());
        for item in evidence {
            let reliability = self.reliability.assess(item, now).await?;
            let item = item.clone().with_reliability(reliability);
            let snippets = self.extract_snippets(claim, &item).await;
            let strong = snippets.iter().filter(|s| s.strength == SnippetStrength::Strong).count();
            let base = reliability * item.relevance;
            let interval = ConfidenceInterval::around(base, margin_of_error(reliability, item.relevance, strong));
            ranked.push(CitationSource {
                evidence: item.with_interval(interval),
                rank_score: base,
                supporting_snippets: snippets,
            });
        }
        ranked.sort_by(|a, b| b.rank_score.partial_cmp(&a.rank_score).unwrap_or(std::cmp::Ordering::Equal));

        let contradicted = verdict.is_some_and(|v| !v.contradicting.is_empty());
        let strength = evidence_strength(&ranked, contradicted, self.config.primary_reliability);
        let warnings = self.warnings(&ranked, verdict, now);

        let threshold = self.config.primary_reliability;
        let primary: Vec<CitationSource> = ranked
            .iter()
            .filter(|s| s.reliability() > threshold)
            .take(self.config.max_primary)
            .cloned()
            .collect();
        let secondary: Vec<CitationSource> = ranked
            .iter()
            .filter(|s| s.reliability() <= threshold)
            .take(self.config.max_secondary)
            .cloned()
            .collect();

        let (overall, interval) = overall_confidence(&primary, &secondary, strength);
        let status = status_from(verdict, strength);
        let recommendations = self.recommendations(status, strength, overall);

        Ok(Citation {
            claim: claim.to_string(),
            primary_sources: primary,
            secondary_sources: secondary,
            verification_status: status,
            overall_confidence: overall,
            confidence_interval: interval,
            evidence_strength: strength,
            warning_flags: warnings,
            recommendations,
        })
    }

    async fn extract_snippets(&self, claim: &str, item: &EvidenceItem) -> Vec<SupportingSnippet> {
        let request = CompletionRequest::new(
            CITATION_SYSTEM,
            format!(
                "Extract supporting evidence for this claim from the content:\n\n\
                 Claim: \"{}\"\nContent: \"{}\"\n\n\
                 Keep each snippet under 100 characters.\n\n\
                 Return JSON format:\n{{\n  \"evidence\": [\n    {{\n      \"snippet\": \"exact text from content\",\n      \
                 \"evidenceType\": \"direct_quote|paraphrase|numerical_data|procedural_step\",\n      \
                 \"strength\": \"strong|moderate|weak\"\n    }}\n  ]\n}}",
                claim,
                truncate_chars(&item.snippet, self.config.extraction_chars)
            ),
        )
        .with_temperature(self.config.temperature);

        let result = timeout(self.config.call_timeout(), complete_json::<SnippetList>(self.llm.as_ref(), &request))
            .await
            .map_err(|_| PipelineError::ExternalServiceFailure("snippet extraction timed out".to_string()))
            .and_then(|r| r);

        match result {
            Ok((list, _)) => list
                .evidence
                .into_iter()
                .filter(|s| !s.snippet.trim().is_empty())
                .map(|s| SupportingSnippet {
                    kind: snippet_kind(s.evidence_type.as_deref()),
                    strength: snippet_strength(s.strength.as_deref()),
                    snippet: s.snippet,
                })
                .collect(),
            Err(e) => {
                debug!("Snippet extraction failed for {}: {}", item.source_id, e);
                Vec::new()
            }
        }
    }

    fn warnings(&self, sources: &[CitationSource], verdict: Option<&VerificationVerdict>, now: DateTime<Utc>) -> Vec<WarningFlag> {
        let mut warnings = Vec::new();

        if let Some(v) = verdict.filter(|v| !v.contradicting.is_empty()) {
            warnings.push(WarningFlag::new(
                WarningKind::ConflictingSources,
                Severity::High,
                format!("Found {} contradicting sources", v.contradicting.len()),
            ));
        }

        let low = sources.iter().filter(|s| s.reliability() < self.config.low_reliability).count();
        if low * 2 > sources.len() {
            warnings.push(WarningFlag::new(
                WarningKind::LowSourceReliability,
                Severity::Medium,
                "Majority of sources have low reliability scores",
            ));
        }

        let outdated = sources
            .iter()
            .filter(|s| s.evidence.age_days(now) > self.config.outdated_after_days)
            .count();
        if outdated > 0 {
            warnings.push(WarningFlag::new(
                WarningKind::PotentiallyOutdated,
                Severity::Low,
                format!("{} sources may contain outdated information", outdated),
            ));
        }

        if sources.len() < 2 {
            warnings.push(WarningFlag::new(
                WarningKind::InsufficientSources,
                Severity::Medium,
                "Limited number of sources to verify this claim",
            ));
        }
        warnings
    }

    fn recommendations(&self, status: CitationStatus, strength: EvidenceStrength, confidence: f64) -> Vec<String> {
        let mut out = Vec::new();
        match status {
            CitationStatus::Conflicted => {
                out.push("Investigate contradicting sources and resolve conflicts".to_string());
                out.push("Verify which information is most current and authoritative".to_string());
            }
            CitationStatus::Unverified => {
                out.push("Seek additional authoritative sources".to_string());
                out.push("Consider manual verification by subject matter expert".to_string());
            }
            CitationStatus::FullyVerified | CitationStatus::PartiallyVerified => {}
        }
        if strength <= EvidenceStrength::Weak {
            out.push("Add more supporting documentation to knowledge base".to_string());
            out.push("Cross-reference with external authoritative sources".to_string());
        }
        if confidence < self.config.review_below {
            out.push("Flag for manual review due to low confidence".to_string());
            out.push("Request additional context or clarification".to_string());
        }
        out
    }
}

/// Overall confidence and its interval
///
/// Primary sources decide when present, then secondary sources. With no
/// sources at all the confidence is 0.3.
fn overall_confidence(
    primary: &[CitationSource],
    secondary: &[CitationSource],
    strength: EvidenceStrength,
) -> (f64, ConfidenceInterval) {
    let deciding = if primary.is_empty() { secondary } else { primary };
    if deciding.is_empty() {
        return (0.3, ConfidenceInterval::around(0.3, 0.2));
    }

    let n = deciding.len() as f64;
    let mean = deciding.iter().map(|s| s.evidence.confidence_interval.midpoint()).sum::<f64>() / n;
    let bonus = match strength {
        EvidenceStrength::Strong => 0.1,
        EvidenceStrength::Moderate => 0.05,
        EvidenceStrength::Weak | EvidenceStrength::Insufficient => 0.0,
    };
    let ceiling = primary
        .iter()
        .chain(secondary.iter())
        .map(|s| s.evidence.confidence_interval.midpoint())
        .fold(0.0, f64::max)
        + 0.2;
    let overall = (mean + bonus).min(ceiling).min(1.0);

    let margin = deciding.iter().map(|s| s.evidence.confidence_interval.width() / 2.0).sum::<f64>() / n;
    (overall, ConfidenceInterval::around(overall, margin))
}
