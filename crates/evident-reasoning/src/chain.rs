//! Pure chain assembly: issues, overall confidence, audit trail

use evident_domain::{ReasoningStep, StepStatus};

/// Output text of a step whose completion failed
pub const FAILED_STEP_OUTPUT: &str = "Unable to process this step";

/// Confidence given to failed and failsafe steps
pub const FAILSAFE_CONFIDENCE: f64 = 0.3;

/// A step standing in for one that could not be executed
pub fn failed_step(step_number: usize, description: &str) -> ReasoningStep {
    ReasoningStep {
        step_number,
        description: description.to_string(),
        output: FAILED_STEP_OUTPUT.to_string(),
        confidence: FAILSAFE_CONFIDENCE,
        sources: Vec::new(),
        status: StepStatus::Unverified,
        reasoning: "Error in reasoning process".to_string(),
        assumptions: Vec::new(),
    }
}

/// Issues found in a finished set of steps
pub fn chain_issues(steps: &[ReasoningStep], low_confidence: f64) -> Vec<String> {
    let mut issues = Vec::new();
    for step in steps {
        if step.confidence < low_confidence {
            issues.push(format!("Step {} has low confidence", step.step_number));
        }
        if step.status == StepStatus::Conflicted {
            issues.push(format!("Step {} has conflicting evidence", step.step_number));
        }
    }

    let unverified = steps.iter().filter(|s| s.status == StepStatus::Unverified).count();
    if unverified * 2 > steps.len() {
        issues.push("Majority of reasoning steps lack verification".to_string());
    }
    issues
}

/// Mean step confidence plus up to 0.2 for verified steps, capped at 1
///
/// Never exceeds the highest step confidence by more than 0.2.
pub fn overall_confidence(steps: &[ReasoningStep]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    let n = steps.len() as f64;
    let mean = steps.iter().map(|s| s.confidence).sum::<f64>() / n;
    let verified = steps.iter().filter(|s| s.status == StepStatus::Verified).count() as f64;
    (mean + verified / n * 0.2).min(1.0)
}

/// One line per step: `Step N: description → output (X% confidence, status)`
pub fn audit_trail(steps: &[ReasoningStep]) -> Vec<String> {
    steps
        .iter()
        .map(|s| {
            format!(
                "Step {}: {} → {} ({}% confidence, {})",
                s.step_number,
                s.description,
                s.output,
                (s.confidence * 100.0).round() as i64,
                s.status.as_str()
            )
        })
        .collect()
}

/// Sources of all steps, deduplicated in first-seen order
pub fn cited_sources(steps: &[ReasoningStep]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for source in steps.iter().flat_map(|s| s.sources.iter()) {
        if !sources.contains(source) {
            sources.push(source.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn step(n: usize, confidence: f64, status: StepStatus, sources: &[&str]) -> ReasoningStep {
        ReasoningStep {
            step_number: n,
            description: format!("question {}", n),
            output: format!("answer {}", n),
            confidence,
            sources: sources.iter().map(|s| s.to_string()).collect(),
            status,
            reasoning: String::new(),
            assumptions: Vec::new(),
        }
    }

    #[test]
    fn test_overall_confidence() {
        let steps = vec![
            step(1, 0.8, StepStatus::Verified, &[]),
            step(2, 0.6, StepStatus::Unverified, &[]),
        ];
        // mean 0.7 + half verified * 0.2
        assert!((overall_confidence(&steps) - 0.8).abs() < 1e-9);
        assert_eq!(overall_confidence(&[]), 0.0);
    }

    #[test]
    fn test_chain_issues() {
        let steps = vec![
            step(1, 0.4, StepStatus::Unverified, &[]),
            step(2, 0.9, StepStatus::Conflicted, &[]),
            step(3, 0.7, StepStatus::Unverified, &[]),
        ];
        assert_eq!(
            chain_issues(&steps, 0.5),
            vec![
                "Step 1 has low confidence",
                "Step 2 has conflicting evidence",
                "Majority of reasoning steps lack verification",
            ]
        );
    }

    #[test]
    fn test_half_unverified_is_not_majority() {
        let steps = vec![
            step(1, 0.9, StepStatus::Verified, &[]),
            step(2, 0.9, StepStatus::Unverified, &[]),
        ];
        assert!(chain_issues(&steps, 0.5).is_empty());
    }

    #[test]
    fn test_audit_trail_format() {
        let trail = audit_trail(&[step(1, 0.85, StepStatus::Verified, &[])]);
        assert_eq!(trail, vec!["Step 1: question 1 → answer 1 (85% confidence, verified)"]);
    }

    #[test]
    fn test_cited_sources_first_seen_order() {
        let steps = vec![
            step(1, 0.5, StepStatus::Verified, &["Fee Schedule", "Agreement"]),
            step(2, 0.5, StepStatus::Verified, &["Agreement", "FAQ"]),
        ];
        assert_eq!(cited_sources(&steps), vec!["Fee Schedule", "Agreement", "FAQ"]);
    }

    #[test]
    fn test_failed_step_shape() {
        let s = failed_step(2, "why");
        assert_eq!(s.output, FAILED_STEP_OUTPUT);
        assert_eq!(s.confidence, 0.3);
        assert_eq!(s.status, StepStatus::Unverified);
    }

    fn arb_status() -> impl Strategy<Value = StepStatus> {
        prop_oneof![
            Just(StepStatus::Verified),
            Just(StepStatus::Unverified),
            Just(StepStatus::Conflicted),
        ]
    }

    proptest! {
        #[test]
        fn prop_overall_bounded_by_max_plus_bonus(
            raw in prop::collection::vec((0.0f64..=1.0, arb_status()), 1..6)
        ) {
            let steps: Vec<ReasoningStep> = raw
                .iter()
                .enumerate()
                .map(|(i, (c, st))| step(i + 1, *c, *st, &[]))
                .collect();
            let max = steps.iter().map(|s| s.confidence).fold(0.0, f64::max);
            let overall = overall_confidence(&steps);
            prop_assert!(overall <= max + 0.2 + 1e-9);
            prop_assert!((0.0..=1.0).contains(&overall));
        }
    }
}
