//! Command implementations.

pub mod ask;
pub mod feedback;
pub mod graph;
pub mod import;
pub mod profile;
pub mod reason;
pub mod search;
pub mod verify;

pub use self::ask::execute_ask;
pub use self::feedback::execute_feedback;
pub use self::graph::{execute_conflicts, execute_relationships};
pub use self::import::{execute_import_doc, execute_import_faq};
pub use self::profile::execute_profile;
pub use self::reason::execute_reason;
pub use self::search::execute_search;
pub use self::verify::{execute_cite, execute_verify};

use crate::error::{CliError, Result};

/// Join free-form words into one non-empty text argument.
pub(crate) fn joined(words: &[String], what: &str) -> Result<String> {
    let text = words.join(" ").trim().to_string();
    if text.is_empty() {
        return Err(CliError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(text)
}
