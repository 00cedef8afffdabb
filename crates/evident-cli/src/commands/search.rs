//! Search command implementation.

use crate::cli::SearchArgs;
use crate::commands::joined;
use crate::error::Result;
use crate::output::Formatter;
use crate::pipeline::Pipeline;

/// Execute the search command.
pub async fn execute_search(args: SearchArgs, pipeline: &Pipeline, formatter: &Formatter) -> Result<()> {
    let query = joined(&args.query, "Query")?;
    let outcome = pipeline.orchestrator.search(&query).await;
    println!("{}", formatter.format_search(&outcome)?);
    Ok(())
}
