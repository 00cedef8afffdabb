//! Feedback command implementation.

use crate::cli::FeedbackArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::pipeline::Pipeline;
use evident_domain::FeedbackRecord;

/// Execute the feedback command.
pub async fn execute_feedback(args: FeedbackArgs, pipeline: &Pipeline, formatter: &Formatter) -> Result<()> {
    if args.user.trim().is_empty() {
        return Err(CliError::InvalidInput("User must not be empty".to_string()));
    }

    let mut record = FeedbackRecord::new(args.user, args.query, args.response, args.rating.into());
    if let Some(correction) = args.correction {
        record = record.with_correction(correction);
    }

    let outcome = pipeline.learning.process_feedback(record).await;
    println!("{}", formatter.format_feedback(&outcome)?);
    Ok(())
}
