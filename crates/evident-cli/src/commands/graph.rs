//! Conflict and relationship command implementations.

use crate::cli::{ConflictsArgs, RelationshipsArgs};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::pipeline::Pipeline;
use evident_domain::DocumentId;

/// Execute the conflicts command.
pub async fn execute_conflicts(args: ConflictsArgs, pipeline: &Pipeline, formatter: &Formatter) -> Result<()> {
    let ids = args
        .ids
        .iter()
        .map(|id| parse_id(id))
        .collect::<Result<Vec<_>>>()?;

    if ids.len() < 2 {
        return Err(CliError::InvalidInput(
            "At least two document IDs are needed to detect conflicts".to_string(),
        ));
    }

    let conflicts = pipeline.graph.detect_conflicts(&ids).await;
    println!("{}", formatter.format_conflicts(&conflicts)?);
    Ok(())
}

/// Execute the relationships command.
pub async fn execute_relationships(
    args: RelationshipsArgs,
    pipeline: &Pipeline,
    formatter: &Formatter,
) -> Result<()> {
    let id = parse_id(&args.id)?;
    let relationships = pipeline.graph.relationships(id).await?;
    println!("{}", formatter.format_relationships(&relationships)?);
    Ok(())
}

fn parse_id(id: &str) -> Result<DocumentId> {
    DocumentId::from_string(id.trim()).map_err(CliError::InvalidInput)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = DocumentId::new();
        assert_eq!(parse_id(&format!(" {} ", id)).unwrap(), id);
        assert!(matches!(parse_id("not-an-id"), Err(CliError::InvalidInput(_))));
    }
}
