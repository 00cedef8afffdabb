//! Reason command implementation.

use crate::cli::ReasonArgs;
use crate::commands::joined;
use crate::error::Result;
use crate::output::Formatter;
use crate::pipeline::Pipeline;

/// Execute the reason command.
pub async fn execute_reason(args: ReasonArgs, pipeline: &Pipeline, formatter: &Formatter) -> Result<()> {
    let question = joined(&args.question, "Question")?;
    let chain = pipeline.reasoning.reason(&question).await;
    println!("{}", formatter.format_chain(&chain)?);
    Ok(())
}
