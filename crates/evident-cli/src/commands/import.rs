//! Import command implementations.

use crate::cli::{ImportDocArgs, ImportFaqArgs};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::pipeline::Pipeline;
use evident_domain::{Document, QaEntry};
use serde::Deserialize;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing::info;

/// Execute the import-faq command.
///
/// A file name of `-` reads the JSON array from stdin.
pub async fn execute_import_faq(args: ImportFaqArgs, pipeline: &Pipeline, formatter: &Formatter) -> Result<()> {
    let json_data = read_input(&args.file)?;
    let entries = parse_faq(&json_data)?;

    for entry in &entries {
        pipeline.store.insert_qa(entry).await?;
    }

    info!("FAQ import complete: {} entries", entries.len());
    println!("{}", formatter.imported("Q&A entries", entries.len()));
    Ok(())
}

/// Execute the import-doc command.
pub async fn execute_import_doc(args: ImportDocArgs, pipeline: &Pipeline, formatter: &Formatter) -> Result<()> {
    let content = read_input(&args.file)?;
    if content.trim().is_empty() {
        return Err(CliError::InvalidInput(format!("'{}' has no text content", args.file)));
    }

    let name = match args.name {
        Some(name) => name,
        None => Path::new(&args.file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CliError::InvalidInput("Use --name when importing from stdin".to_string()))?,
    };

    let mut document = Document::new(name, content);
    if let Some(doc_type) = args.doc_type {
        document = document.with_type(doc_type.into());
    }
    if let Some(folder) = args.folder {
        document = document.in_folder(folder);
    }

    let chunks = pipeline.store.insert_document(&document).await?;
    println!(
        "{}",
        formatter.success(&format!(
            "Imported '{}' as {} ({} chunks, {})",
            document.name,
            document.id,
            chunks,
            document.document_type.as_str()
        ))
    );
    Ok(())
}

/// Curated entry as written in an import file.
#[derive(Debug, Deserialize)]
struct FaqDefinition {
    question: String,
    answer: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    priority: i32,
}

impl FaqDefinition {
    fn into_entry(self) -> Result<QaEntry> {
        if self.question.trim().is_empty() || self.answer.trim().is_empty() {
            return Err(CliError::InvalidInput(
                "Q&A entries need a question and an answer".to_string(),
            ));
        }
        let mut entry = QaEntry::new(self.question, self.answer);
        entry.category = self.category;
        entry.priority = self.priority;
        Ok(entry)
    }
}

fn parse_faq(json_data: &str) -> Result<Vec<QaEntry>> {
    let definitions: Vec<FaqDefinition> = serde_json::from_str(json_data)?;
    if definitions.is_empty() {
        return Err(CliError::InvalidInput("No Q&A entries provided".to_string()));
    }
    definitions.into_iter().map(FaqDefinition::into_entry).collect()
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_faq() {
        let entries = parse_faq(
            r#"[
                {"question": "What is the refund policy?", "answer": "Refunds within 30 days.", "category": "refunds"},
                {"question": "Do you support Clover?", "answer": "Yes.", "priority": 5}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category.as_deref(), Some("refunds"));
        assert_eq!(entries[1].priority, 5);
    }

    #[test]
    fn test_parse_faq_rejects_empty() {
        assert!(matches!(parse_faq("[]"), Err(CliError::InvalidInput(_))));
        assert!(matches!(
            parse_faq(r#"[{"question": " ", "answer": "x"}]"#),
            Err(CliError::InvalidInput(_))
        ));
        assert!(matches!(parse_faq("{"), Err(CliError::Serialization(_))));
    }
}
