//! The feedback loop
//!
//! Each step of [`LearningLoop::process_feedback`] fails on its own: an
//! error is recorded in the outcome and the remaining steps still run.

use crate::config::LearningConfig;
use crate::smoothing::{apply_feedback, success_rate};
use chrono::{DateTime, Utc};
use evident_domain::{
    AuditEvent, AuditSink, CompletionClient, CompletionRequest, FeedbackKind, FeedbackRecord,
    FeedbackStore, ImprovementCandidate, ImprovementCategory, LearningProfile, Personalization,
    PipelineError, PipelineResult, ProfileStore, ResponseStyle, ReviewStatus,
};
use evident_llm::complete_json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const LEARNING_SYSTEM: &str =
    "You study feedback on a merchant services assistant. Respond with a single JSON object and nothing else.";
const PROMPT_SAMPLE: usize = 10;
const DEFAULT_IMPROVEMENT: &str = "Repeated negative feedback on recent answers";
const DEFAULT_ACCURACY: f64 = 0.7;
const DEFAULT_SATISFACTION: f64 = 0.6;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternReply {
    #[serde(default)]
    successful_patterns: Vec<String>,
    #[serde(default)]
    unsuccessful_patterns: Vec<String>,
    #[serde(default)]
    preferred_style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TemplateReply {
    #[serde(default)]
    template: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImprovementReply {
    #[serde(default)]
    is_system_issue: Option<bool>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Result of folding one feedback record into the system
#[derive(Debug, Clone)]
pub struct FeedbackOutcome {
    /// The user's profile after the update
    pub profile: LearningProfile,
    /// Improvement proposed for review, if any
    pub improvement: Option<ImprovementCandidate>,
    /// Steps that failed, in order
    pub errors: Vec<String>,
}

/// Aggregates over all profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningMetrics {
    /// Profiles considered
    pub profiles: usize,
    /// Feedback events folded into those profiles
    pub total_interactions: u64,
    /// Mean smoothed accuracy
    pub average_accuracy: f64,
    /// Mean smoothed satisfaction
    pub average_satisfaction: f64,
}

impl Default for LearningMetrics {
    fn default() -> Self {
        Self {
            profiles: 0,
            total_interactions: 0,
            average_accuracy: DEFAULT_ACCURACY,
            average_satisfaction: DEFAULT_SATISFACTION,
        }
    }
}

/// Folds user feedback into profiles and proposes system improvements
pub struct LearningLoop {
    feedback: Arc<dyn FeedbackStore>,
    profiles: Arc<dyn ProfileStore>,
    audit: Arc<dyn AuditSink>,
    llm: Arc<dyn CompletionClient>,
    config: LearningConfig,
}

impl LearningLoop {
    /// Create a loop over the given stores
    pub fn new(
        feedback: Arc<dyn FeedbackStore>,
        profiles: Arc<dyn ProfileStore>,
        audit: Arc<dyn AuditSink>,
        llm: Arc<dyn CompletionClient>,
        config: LearningConfig,
    ) -> Self {
        Self {
            feedback,
            profiles,
            audit,
            llm,
            config,
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: &CompletionRequest) -> PipelineResult<T> {
        let (value, _) = timeout(self.config.call_timeout(), complete_json::<T>(self.llm.as_ref(), request))
            .await
            .map_err(|_| PipelineError::ExternalServiceFailure("learning call timed out".to_string()))??;
        Ok(value)
    }

    /// Process one feedback record
    pub async fn process_feedback(&self, record: FeedbackRecord) -> FeedbackOutcome {
        let now = Utc::now();
        let mut errors = Vec::new();

        if let Err(e) = self.feedback.append(&record).await {
            errors.push(format!("store feedback: {}", e));
        }
        if let Err(e) = self.audit.record(AuditEvent::Feedback(record.clone())).await {
            errors.push(format!("audit feedback: {}", e));
        }

        let recent = match self
            .feedback
            .recent(
                &record.user_id,
                now - self.config.analysis_window(),
                self.config.max_analysis_records,
            )
            .await
        {
            Ok(records) => records,
            Err(e) => {
                errors.push(format!("load recent feedback: {}", e));
                Vec::new()
            }
        };
        debug!("Analyzing {} recent records for {}", recent.len(), record.user_id);

        let patterns = match self.analyze_patterns(&recent).await {
            Ok(patterns) => patterns,
            Err(e) => {
                errors.push(format!("analyze patterns: {}", e));
                PatternReply::default()
            }
        };

        let current = match self.profiles.load(&record.user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => LearningProfile::new(&record.user_id),
            Err(e) => {
                errors.push(format!("load profile: {}", e));
                LearningProfile::new(&record.user_id)
            }
        };

        let mut profile = apply_feedback(&current, record.feedback, success_rate(&recent), now);
        merge_patterns(&mut profile, patterns);

        if self.config.generate_prompt_templates {
            match self.prompt_template(&profile).await {
                Ok(Some(template)) => profile.prompt_template = Some(template),
                Ok(None) => {}
                Err(e) => errors.push(format!("generate prompt template: {}", e)),
            }
        }

        if let Err(e) = self.profiles.save(&profile).await {
            errors.push(format!("save profile: {}", e));
        }

        let improvement = if record.feedback == FeedbackKind::Negative {
            match self.propose_improvement(&record, &recent, now).await {
                Ok(candidate) => candidate,
                Err(e) => {
                    errors.push(format!("propose improvement: {}", e));
                    None
                }
            }
        } else {
            None
        };

        if !errors.is_empty() {
            warn!("Feedback for {} processed with {} errors", record.user_id, errors.len());
        }
        info!(
            "Feedback processing complete: {} (accuracy {:.3}, satisfaction {:.3})",
            record.user_id, profile.accuracy, profile.satisfaction_score
        );

        FeedbackOutcome {
            profile,
            improvement,
            errors,
        }
    }

    async fn analyze_patterns(&self, recent: &[FeedbackRecord]) -> PipelineResult<PatternReply> {
        let positive: Vec<&FeedbackRecord> = recent.iter().filter(|r| r.feedback == FeedbackKind::Positive).collect();
        let negative: Vec<&FeedbackRecord> = recent.iter().filter(|r| r.feedback == FeedbackKind::Negative).collect();

        let positive_lines: Vec<String> = positive
            .iter()
            .take(PROMPT_SAMPLE)
            .map(|r| format!("Query: \"{}\" → Response worked well", r.query))
            .collect();
        let negative_lines: Vec<String> = negative
            .iter()
            .take(PROMPT_SAMPLE)
            .map(|r| {
                format!(
                    "Query: \"{}\" → Correction: {}",
                    r.query,
                    r.corrected_response.as_deref().unwrap_or("Not specified")
                )
            })
            .collect();

        let request = CompletionRequest::new(
            LEARNING_SYSTEM,
            format!(
                "Analyze user feedback patterns to identify learning opportunities:\n\n\
                 POSITIVE FEEDBACK ({} items):\n{}\n\n\
                 NEGATIVE FEEDBACK ({} items):\n{}\n\n\
                 Identify patterns in successful responses, patterns in unsuccessful responses, \
                 and the user's preferred response style.\n\n\
                 Return JSON format:\n{{\n  \"successfulPatterns\": [\"pattern\"],\n  \
                 \"unsuccessfulPatterns\": [\"issue\"],\n  \
                 \"preferredStyle\": \"concise|detailed|technical|conversational\"\n}}",
                positive.len(),
                positive_lines.join("\n"),
                negative.len(),
                negative_lines.join("\n")
            ),
        )
        .with_temperature(self.config.analysis_temperature);

        self.call(&request).await
    }

    async fn prompt_template(&self, profile: &LearningProfile) -> PipelineResult<Option<String>> {
        let request = CompletionRequest::new(
            LEARNING_SYSTEM,
            format!(
                "Create a personalized prompt template for merchant services questions:\n\n\
                 Preferred style: {}\nWhat works: {}\nWhat to avoid: {}\n\n\
                 Return JSON: {{\"template\": \"prompt text\"}}",
                profile.preferred_style.instruction(),
                profile.successful_patterns.join(", "),
                profile.unsuccessful_patterns.join(", ")
            ),
        )
        .with_temperature(self.config.template_temperature);

        let reply: TemplateReply = self.call(&request).await?;
        Ok(reply.template.filter(|t| !t.trim().is_empty()))
    }

    async fn propose_improvement(
        &self,
        record: &FeedbackRecord,
        recent: &[FeedbackRecord],
        now: DateTime<Utc>,
    ) -> PipelineResult<Option<ImprovementCandidate>> {
        let since = now - self.config.improvement_window();
        let negatives: Vec<&FeedbackRecord> = recent
            .iter()
            .filter(|r| r.feedback == FeedbackKind::Negative && r.timestamp >= since)
            .collect();
        if negatives.len() < self.config.improvement_min_negatives {
            return Ok(None);
        }

        let history: Vec<String> = negatives.iter().map(|r| format!("Query: \"{}\"", r.query)).collect();
        let request = CompletionRequest::new(
            LEARNING_SYSTEM,
            format!(
                "Analyze feedback patterns to identify system improvements:\n\n\
                 Recent Negative Feedback:\n{}\n\n\
                 Current Feedback:\nQuery: \"{}\"\nCorrection: {}\n\n\
                 Return JSON format:\n{{\n  \"isSystemIssue\": boolean,\n  \
                 \"category\": \"prompt_optimization|response_quality|accuracy_enhancement|personalization\",\n  \
                 \"description\": \"specific issue description\"\n}}",
                history.join("\n"),
                record.query,
                record.corrected_response.as_deref().unwrap_or("Not provided")
            ),
        )
        .with_temperature(self.config.analysis_temperature);

        let (category, description) = match self.call::<ImprovementReply>(&request).await {
            Ok(reply) if reply.is_system_issue == Some(false) => {
                debug!("Negative feedback for {} is not a system issue", record.user_id);
                return Ok(None);
            }
            Ok(reply) => (
                reply
                    .category
                    .as_deref()
                    .and_then(ImprovementCategory::parse)
                    .unwrap_or(ImprovementCategory::ResponseQuality),
                reply
                    .description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_IMPROVEMENT.to_string()),
            ),
            Err(e) => {
                debug!("Improvement analysis failed, using defaults: {}", e);
                (ImprovementCategory::ResponseQuality, DEFAULT_IMPROVEMENT.to_string())
            }
        };

        let candidate = ImprovementCandidate {
            category,
            description,
            evidence: negatives.iter().map(|r| r.query.clone()).collect(),
            status: ReviewStatus::PendingReview,
            created_at: now,
        };
        self.audit.record(AuditEvent::Improvement(candidate.clone())).await?;
        info!("Improvement proposed for review: {}", candidate.description);
        Ok(Some(candidate))
    }

    /// Personalization signals for a user, neutral when no profile exists
    pub async fn personalization(&self, user_id: &str) -> Personalization {
        let profile = match self.profiles.load(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return Personalization::default(),
            Err(e) => {
                warn!("Failed to load profile for {}: {}", user_id, e);
                return Personalization::default();
            }
        };

        let mut prompt_hints = Vec::new();
        if !profile.successful_patterns.is_empty() {
            prompt_hints.push(format!("Favor: {}", profile.successful_patterns.join("; ")));
        }
        if !profile.unsuccessful_patterns.is_empty() {
            prompt_hints.push(format!("Avoid: {}", profile.unsuccessful_patterns.join("; ")));
        }
        if let Some(template) = profile.prompt_template {
            prompt_hints.push(template);
        }

        Personalization {
            preferred_style: profile.preferred_style,
            confidence_adjustment: profile.confidence_adjustment,
            prompt_hints,
        }
    }

    /// Averages over all stored profiles
    pub async fn metrics(&self) -> LearningMetrics {
        let profiles = match self.profiles.all().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("Failed to load profiles for metrics: {}", e);
                return LearningMetrics::default();
            }
        };
        if profiles.is_empty() {
            return LearningMetrics::default();
        }

        let n = profiles.len() as f64;
        LearningMetrics {
            profiles: profiles.len(),
            total_interactions: profiles.iter().map(|p| p.total_interactions).sum(),
            average_accuracy: profiles.iter().map(|p| p.accuracy).sum::<f64>() / n,
            average_satisfaction: profiles.iter().map(|p| p.satisfaction_score).sum::<f64>() / n,
        }
    }
}

/// Replace patterns and style with the analysis when it produced any
fn merge_patterns(profile: &mut LearningProfile, patterns: PatternReply) {
    if !patterns.successful_patterns.is_empty() {
        profile.successful_patterns = patterns.successful_patterns;
    }
    if !patterns.unsuccessful_patterns.is_empty() {
        profile.unsuccessful_patterns = patterns.unsuccessful_patterns;
    }
    if let Some(style) = patterns.preferred_style.as_deref().and_then(ResponseStyle::parse) {
        profile.preferred_style = style;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_existing_on_empty_analysis() {
        let mut profile = LearningProfile::new("u1");
        profile.successful_patterns = vec!["step lists".to_string()];
        profile.preferred_style = ResponseStyle::Technical;

        merge_patterns(&mut profile, PatternReply::default());
        assert_eq!(profile.successful_patterns, vec!["step lists"]);
        assert_eq!(profile.preferred_style, ResponseStyle::Technical);
    }

    #[test]
    fn test_merge_replaces_and_ignores_unknown_style() {
        let mut profile = LearningProfile::new("u1");
        merge_patterns(
            &mut profile,
            PatternReply {
                successful_patterns: vec!["rate tables".to_string()],
                unsuccessful_patterns: vec!["vague answers".to_string()],
                preferred_style: Some("professional".to_string()),
            },
        );
        assert_eq!(profile.successful_patterns, vec!["rate tables"]);
        assert_eq!(profile.unsuccessful_patterns, vec!["vague answers"]);
        assert_eq!(profile.preferred_style, ResponseStyle::Detailed);
    }

    #[test]
    fn test_default_metrics() {
        let metrics = LearningMetrics::default();
        assert_eq!(metrics.average_accuracy, 0.7);
        assert_eq!(metrics.average_satisfaction, 0.6);
    }
}
