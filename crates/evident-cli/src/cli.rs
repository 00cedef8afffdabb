//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use evident_domain::{DocumentType, FeedbackKind};

/// Evident CLI - Evidence-backed answers for merchant services teams.
#[derive(Debug, Parser)]
#[command(name = "evident")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Profile to use
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(flatten)]
    pub keys: KeyArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Provider credentials, read from the environment.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct KeyArgs {
    /// API key for the primary completion provider
    #[arg(long, env = "EVIDENT_PRIMARY_API_KEY", hide_env_values = true, global = true)]
    pub primary_api_key: Option<String>,

    /// API key for the fallback completion provider
    #[arg(long, env = "EVIDENT_FALLBACK_API_KEY", hide_env_values = true, global = true)]
    pub fallback_api_key: Option<String>,

    /// API key for web search
    #[arg(long, env = "EVIDENT_WEB_API_KEY", hide_env_values = true, global = true)]
    pub web_api_key: Option<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (answer text or IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask a question and get an evidence-backed answer
    Ask(AskArgs),

    /// Run the search hierarchy and show the evidence
    Search(SearchArgs),

    /// Verify a claim against the document index
    Verify(ClaimArgs),

    /// Build a ranked citation for a claim
    Cite(ClaimArgs),

    /// Detect conflicts between documents
    Conflicts(ConflictsArgs),

    /// Show documents related to a document
    Relationships(RelationshipsArgs),

    /// Answer a complex question through a reasoning chain
    Reason(ReasonArgs),

    /// Record feedback on an answer
    Feedback(FeedbackArgs),

    /// Manage configuration profiles
    Profile(ProfileArgs),

    /// Import curated Q&A entries from a JSON file
    ImportFaq(ImportFaqArgs),

    /// Import a document into the index
    ImportDoc(ImportDocArgs),

    /// Enter interactive REPL mode
    Repl,
}

/// Arguments for the ask command.
#[derive(Debug, Parser)]
pub struct AskArgs {
    /// Question text
    #[arg(required = true)]
    pub question: Vec<String>,

    /// User the answer is personalized for
    #[arg(short, long, default_value = "cli")]
    pub user: String,

    /// Disable the web search tier
    #[arg(long)]
    pub no_web: bool,
}

/// Arguments for the search command.
#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query text
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Disable the web search tier
    #[arg(long)]
    pub no_web: bool,
}

/// Arguments for the verify and cite commands.
#[derive(Debug, Parser)]
pub struct ClaimArgs {
    /// Claim text
    #[arg(required = true)]
    pub claim: Vec<String>,
}

/// Arguments for the conflicts command.
#[derive(Debug, Parser)]
pub struct ConflictsArgs {
    /// Document IDs to compare pairwise
    #[arg(required = true, num_args = 2..)]
    pub ids: Vec<String>,
}

/// Arguments for the relationships command.
#[derive(Debug, Parser)]
pub struct RelationshipsArgs {
    /// Document ID
    pub id: String,
}

/// Arguments for the reason command.
#[derive(Debug, Parser)]
pub struct ReasonArgs {
    /// Question text
    #[arg(required = true)]
    pub question: Vec<String>,
}

/// Arguments for the feedback command.
#[derive(Debug, Parser)]
pub struct FeedbackArgs {
    /// User giving the feedback
    #[arg(short, long)]
    pub user: String,

    /// Question that was asked
    #[arg(short, long)]
    pub query: String,

    /// Answer that was given
    #[arg(short, long)]
    pub response: String,

    /// Rating of the answer
    #[arg(long, value_enum)]
    pub rating: RatingArg,

    /// Corrected answer, if the given one was wrong
    #[arg(long)]
    pub correction: Option<String>,
}

/// Arguments for the import-faq command.
#[derive(Debug, Parser)]
pub struct ImportFaqArgs {
    /// JSON file containing an array of Q&A entries
    pub file: String,
}

/// Arguments for the import-doc command.
#[derive(Debug, Parser)]
pub struct ImportDocArgs {
    /// Text file to import
    pub file: String,

    /// Display name (defaults to the file name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Document type (inferred from the name when omitted)
    #[arg(short = 't', long = "type", value_enum)]
    pub doc_type: Option<DocTypeArg>,

    /// Folder to place the document in
    #[arg(long)]
    pub folder: Option<String>,
}

/// Arguments for profile management.
#[derive(Debug, Parser)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileAction,
}

/// Profile management actions.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// List all profiles
    List,

    /// Show active profile
    Show,

    /// Switch to a different profile
    Switch {
        /// Profile name
        name: String,
    },

    /// Create or update a profile
    Set(ProfileSetArgs),

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
    },
}

/// Arguments for creating or updating a profile.
#[derive(Debug, Parser)]
pub struct ProfileSetArgs {
    /// Profile name
    pub name: String,

    /// SQLite database path
    #[arg(short, long)]
    pub database: Option<String>,

    /// Primary provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Primary model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Primary endpoint override
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Fallback provider
    #[arg(long, value_enum, requires = "fallback_model")]
    pub fallback_provider: Option<ProviderArg>,

    /// Fallback model
    #[arg(long)]
    pub fallback_model: Option<String>,

    /// Enable or disable the web search tier
    #[arg(long)]
    pub web: Option<bool>,

    /// Web search model
    #[arg(long)]
    pub web_model: Option<String>,
}

/// Feedback rating argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum RatingArg {
    /// The answer helped
    Positive,
    /// The answer was wrong or unhelpful
    Negative,
    /// Neither
    Neutral,
}

/// Completion provider argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ProviderArg {
    /// Anthropic messages API
    Anthropic,
    /// OpenAI-compatible API
    Openai,
    /// Local Ollama server
    Ollama,
}

/// Document type argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum DocTypeArg {
    /// Merchant agreement or contract
    Contract,
    /// Policy document
    Policy,
    /// Equipment or product manual
    Manual,
    /// Processing statement
    Statement,
    /// How-to guide
    Guide,
    /// Anything else
    Other,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<RatingArg> for FeedbackKind {
    fn from(rating: RatingArg) -> Self {
        match rating {
            RatingArg::Positive => FeedbackKind::Positive,
            RatingArg::Negative => FeedbackKind::Negative,
            RatingArg::Neutral => FeedbackKind::Neutral,
        }
    }
}

impl From<ProviderArg> for evident_llm::ProviderKind {
    fn from(provider: ProviderArg) -> Self {
        match provider {
            ProviderArg::Anthropic => evident_llm::ProviderKind::Anthropic,
            ProviderArg::Openai => evident_llm::ProviderKind::OpenAi,
            ProviderArg::Ollama => evident_llm::ProviderKind::Ollama,
        }
    }
}

impl From<DocTypeArg> for DocumentType {
    fn from(doc_type: DocTypeArg) -> Self {
        match doc_type {
            DocTypeArg::Contract => DocumentType::Contract,
            DocTypeArg::Policy => DocumentType::Policy,
            DocTypeArg::Manual => DocumentType::Manual,
            DocTypeArg::Statement => DocumentType::Statement,
            DocTypeArg::Guide => DocumentType::Guide,
            DocTypeArg::Other => DocumentType::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_enters_repl() {
        let cli = Cli::parse_from(["evident"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_ask_command() {
        let cli = Cli::parse_from([
            "evident",
            "ask",
            "What",
            "is",
            "the",
            "refund",
            "policy?",
            "--user",
            "alice",
            "--no-web",
        ]);
        match cli.command {
            Some(Command::Ask(args)) => {
                assert_eq!(args.question.join(" "), "What is the refund policy?");
                assert_eq!(args.user, "alice");
                assert!(args.no_web);
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_conflicts_needs_two_ids() {
        assert!(Cli::try_parse_from(["evident", "conflicts", "only-one"]).is_err());
        let cli = Cli::parse_from(["evident", "conflicts", "a", "b", "c"]);
        match cli.command {
            Some(Command::Conflicts(args)) => assert_eq!(args.ids.len(), 3),
            _ => panic!("Expected Conflicts command"),
        }
    }

    #[test]
    fn test_feedback_command() {
        let cli = Cli::parse_from([
            "evident",
            "feedback",
            "--user",
            "bob",
            "--query",
            "Fee?",
            "--response",
            "2.5%",
            "--rating",
            "negative",
            "--correction",
            "2.9%",
        ]);
        match cli.command {
            Some(Command::Feedback(args)) => {
                assert!(matches!(FeedbackKind::from(args.rating), FeedbackKind::Negative));
                assert_eq!(args.correction.as_deref(), Some("2.9%"));
            }
            _ => panic!("Expected Feedback command"),
        }
    }

    #[test]
    fn test_import_doc_type() {
        let cli = Cli::parse_from([
            "evident",
            "import-doc",
            "policy.txt",
            "--type",
            "policy",
            "--folder",
            "team",
        ]);
        match cli.command {
            Some(Command::ImportDoc(args)) => {
                assert!(matches!(args.doc_type.map(DocumentType::from), Some(DocumentType::Policy)));
                assert_eq!(args.folder.as_deref(), Some("team"));
            }
            _ => panic!("Expected ImportDoc command"),
        }
    }

    #[test]
    fn test_profile_set_fallback_requires_model() {
        assert!(Cli::try_parse_from(["evident", "profile", "set", "p", "--fallback-provider", "openai"]).is_err());
    }
}
