//! Ask command implementation.

use crate::cli::AskArgs;
use crate::commands::joined;
use crate::error::Result;
use crate::output::Formatter;
use crate::pipeline::Pipeline;
use evident_domain::{AnswerResponse, ChatMessage};

/// Execute the ask command.
///
/// Returns the answer so the REPL can extend its conversation history.
pub async fn execute_ask(
    args: AskArgs,
    pipeline: &Pipeline,
    history: &[ChatMessage],
    formatter: &Formatter,
) -> Result<AnswerResponse> {
    let question = joined(&args.question, "Question")?;
    let answer = pipeline.assistant.answer(&args.user, &question, history).await;
    println!("{}", formatter.format_answer(&answer)?);
    Ok(answer)
}
