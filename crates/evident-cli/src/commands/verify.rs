//! Verify and cite command implementations.

use crate::cli::ClaimArgs;
use crate::commands::joined;
use crate::error::Result;
use crate::output::Formatter;
use crate::pipeline::Pipeline;
use evident_domain::EvidenceItem;

/// Execute the verify command.
pub async fn execute_verify(args: ClaimArgs, pipeline: &Pipeline, formatter: &Formatter) -> Result<()> {
    let claim = joined(&args.claim, "Claim")?;
    let verdict = pipeline.verifier.verify(&claim).await;
    println!("{}", formatter.format_verdict(&verdict)?);
    Ok(())
}

/// Execute the cite command.
///
/// The claim is verified first so the citation can carry the verdict.
pub async fn execute_cite(args: ClaimArgs, pipeline: &Pipeline, formatter: &Formatter) -> Result<()> {
    let claim = joined(&args.claim, "Claim")?;
    let verdict = pipeline.verifier.verify(&claim).await;
    let evidence: Vec<EvidenceItem> = verdict
        .supporting
        .iter()
        .chain(&verdict.contradicting)
        .map(|assessed| assessed.item.clone())
        .collect();

    let citation = pipeline.citations.cite(&claim, &evidence, Some(&verdict)).await;
    println!("{}", formatter.format_citation(&citation)?);
    Ok(())
}
