//! Interactive REPL (Read-Eval-Print Loop) mode.

use crate::cli::{
    AskArgs, ClaimArgs, Command, ConflictsArgs, FeedbackArgs, ImportDocArgs, ImportFaqArgs, ProfileAction,
    ProfileArgs, RatingArg, ReasonArgs, RelationshipsArgs, SearchArgs,
};
use crate::commands;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::pipeline::{ApiKeys, Pipeline};
use evident_domain::ChatMessage;
use evident_retrieval::CacheSweeper;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// Conversation messages kept for follow-up questions.
const MAX_CONVERSATION: usize = 10;

/// State carried between REPL lines.
struct Session {
    pipeline: Pipeline,
    sweeper: JoinHandle<()>,
    user: String,
    conversation: Vec<ChatMessage>,
    last_exchange: Option<(String, String)>,
}

impl Session {
    fn open(config: &Config, keys: &ApiKeys) -> Result<Self> {
        let profile = config.get_active_profile()?;
        let pipeline = Pipeline::open(profile, keys, true)?;
        let sweeper = spawn_sweeper(&pipeline, profile);
        Ok(Self {
            pipeline,
            sweeper,
            user: "repl".to_string(),
            conversation: Vec::new(),
            last_exchange: None,
        })
    }

    fn remember(&mut self, question: String, answer: String) {
        self.conversation.push(ChatMessage::user(question.clone()));
        self.conversation.push(ChatMessage::assistant(answer.clone()));
        let excess = self.conversation.len().saturating_sub(MAX_CONVERSATION);
        self.conversation.drain(..excess);
        self.last_exchange = Some((question, answer));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

fn spawn_sweeper(pipeline: &Pipeline, profile: &crate::config::Profile) -> JoinHandle<()> {
    let cache_config = profile.engines.orchestrator.cache.clone();
    let period = cache_config.sweep_interval();
    let mut sweeper = CacheSweeper::new(pipeline.orchestrator.cache(), &cache_config);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            sweeper.run_cycles(1).await;
        }
    })
}

/// Run the interactive REPL.
pub async fn run_repl(config: &mut Config, keys: &ApiKeys, formatter: &Formatter) -> Result<()> {
    println!("{}", formatter.info("Evident REPL - Type a question, 'help' for commands, 'exit' to quit"));
    println!();

    // Initialize readline editor
    let editor_config = rustyline::Config::builder()
        .max_history_size(config.settings.history_size)
        .map_err(|e| CliError::Config(format!("Invalid history size: {}", e)))?
        .auto_add_history(false)
        .build();
    let mut editor = DefaultEditor::with_config(editor_config)
        .map_err(|e| CliError::Io(std::io::Error::other(format!("Failed to initialize editor: {}", e))))?;

    // Load history
    let history_path = get_history_path()?;
    let _ = editor.load_history(&history_path);

    let mut session = Session::open(config, keys)?;

    loop {
        let prompt = format!("evident ({})> ", config.active_profile);

        match editor.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                editor.add_history_entry(line).ok();

                match parse_repl_command(line, &session) {
                    Ok(ReplCommand::Exit) => {
                        println!("{}", formatter.info("Goodbye!"));
                        break;
                    }
                    Ok(ReplCommand::Help) => {
                        print_help(formatter);
                    }
                    Ok(ReplCommand::Clear) => {
                        session.conversation.clear();
                        session.last_exchange = None;
                        session.pipeline.assistant.clear_cache();
                        println!("{}", formatter.success("Conversation and answer cache cleared"));
                    }
                    Ok(ReplCommand::User(user)) => {
                        println!("{}", formatter.success(&format!("Answering as '{}'", user)));
                        session.user = user;
                    }
                    Ok(ReplCommand::Command(cmd)) => {
                        if let Err(e) = execute_repl_command(cmd, &mut session, config, keys, formatter).await {
                            eprintln!("{}", formatter.error(&e.to_string()));
                        }
                    }
                    Err(e) => {
                        eprintln!("{}", formatter.error(&e.to_string()));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", formatter.info("Use 'exit' to quit"));
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("{}", formatter.error(&format!("Error: {}", err)));
                break;
            }
        }
    }

    // Save history
    editor.save_history(&history_path).ok();

    Ok(())
}

/// REPL command type.
#[derive(Debug)]
enum ReplCommand {
    Exit,
    Help,
    Clear,
    User(String),
    Command(Command),
}

/// Parse a REPL command line.
///
/// Lines that do not start with a known command are asked as questions.
fn parse_repl_command(line: &str, session: &Session) -> Result<ReplCommand> {
    parse_line(line, &session.user, session.last_exchange.as_ref())
}

fn parse_line(line: &str, user: &str, last_exchange: Option<&(String, String)>) -> Result<ReplCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.is_empty() {
        return Err(CliError::InvalidInput("Empty command".to_string()));
    }

    let rest = || words(&parts[1..]);
    let command = match parts[0] {
        "exit" | "quit" | "q" => return Ok(ReplCommand::Exit),
        "help" | "?" => return Ok(ReplCommand::Help),
        "clear" => return Ok(ReplCommand::Clear),
        "user" => {
            let name = parts.get(1).ok_or_else(|| usage("user <name>"))?;
            return Ok(ReplCommand::User(name.to_string()));
        }
        "ask" => Command::Ask(ask(require(rest(), "ask <question>")?, user)),
        "search" => Command::Search(SearchArgs {
            query: require(rest(), "search <query>")?,
            no_web: false,
        }),
        "verify" => Command::Verify(ClaimArgs {
            claim: require(rest(), "verify <claim>")?,
        }),
        "cite" => Command::Cite(ClaimArgs {
            claim: require(rest(), "cite <claim>")?,
        }),
        "reason" => Command::Reason(ReasonArgs {
            question: require(rest(), "reason <question>")?,
        }),
        "conflicts" => {
            if parts.len() < 3 {
                return Err(usage("conflicts <doc-id> <doc-id> [doc-id...]"));
            }
            Command::Conflicts(ConflictsArgs { ids: rest() })
        }
        "relationships" => {
            let id = parts.get(1).ok_or_else(|| usage("relationships <doc-id>"))?;
            Command::Relationships(RelationshipsArgs { id: id.to_string() })
        }
        "good" | "bad" => {
            let (query, response) = last_exchange
                .cloned()
                .ok_or_else(|| CliError::InvalidInput("Ask a question before rating an answer".to_string()))?;
            let correction = (parts.len() > 1).then(|| parts[1..].join(" "));
            Command::Feedback(FeedbackArgs {
                user: user.to_string(),
                query,
                response,
                rating: if parts[0] == "good" { RatingArg::Positive } else { RatingArg::Negative },
                correction,
            })
        }
        "import-faq" => {
            let file = parts.get(1).ok_or_else(|| usage("import-faq <file>"))?;
            Command::ImportFaq(ImportFaqArgs { file: file.to_string() })
        }
        "import-doc" => {
            let file = parts.get(1).ok_or_else(|| usage("import-doc <file> [folder]"))?;
            Command::ImportDoc(ImportDocArgs {
                file: file.to_string(),
                name: None,
                doc_type: None,
                folder: parts.get(2).map(|s| s.to_string()),
            })
        }
        "profile" => parse_profile_command(&parts[1..])?,
        _ => Command::Ask(ask(words(&parts), user)),
    };

    Ok(ReplCommand::Command(command))
}

/// Execute a REPL command.
async fn execute_repl_command(
    cmd: Command,
    session: &mut Session,
    config: &mut Config,
    keys: &ApiKeys,
    formatter: &Formatter,
) -> Result<()> {
    let pipeline = &session.pipeline;
    match cmd {
        Command::Ask(args) => {
            let question = args.question.join(" ");
            let answer = commands::execute_ask(args, pipeline, &session.conversation, formatter).await?;
            session.remember(question, answer.message);
        }
        Command::Search(args) => commands::execute_search(args, pipeline, formatter).await?,
        Command::Verify(args) => commands::execute_verify(args, pipeline, formatter).await?,
        Command::Cite(args) => commands::execute_cite(args, pipeline, formatter).await?,
        Command::Reason(args) => commands::execute_reason(args, pipeline, formatter).await?,
        Command::Conflicts(args) => commands::execute_conflicts(args, pipeline, formatter).await?,
        Command::Relationships(args) => commands::execute_relationships(args, pipeline, formatter).await?,
        Command::Feedback(args) => commands::execute_feedback(args, pipeline, formatter).await?,
        Command::ImportFaq(args) => commands::execute_import_faq(args, pipeline, formatter).await?,
        Command::ImportDoc(args) => commands::execute_import_doc(args, pipeline, formatter).await?,
        Command::Profile(args) => {
            let switching = matches!(args.action, ProfileAction::Switch { .. });
            commands::execute_profile(args, config, formatter).await?;
            if switching {
                *session = Session::open(config, keys)?;
            }
        }
        Command::Repl => {}
    }

    Ok(())
}

fn parse_profile_command(args: &[&str]) -> Result<Command> {
    if args.is_empty() {
        return Ok(Command::Profile(ProfileArgs {
            action: ProfileAction::Show,
        }));
    }

    let action = match args[0] {
        "list" => ProfileAction::List,
        "show" => ProfileAction::Show,
        "switch" => {
            if args.len() < 2 {
                return Err(usage("profile switch <name>"));
            }
            ProfileAction::Switch {
                name: args[1].to_string(),
            }
        }
        _ => return Err(CliError::InvalidInput(format!("Unknown profile action: {}", args[0]))),
    };

    Ok(Command::Profile(ProfileArgs { action }))
}

fn ask(question: Vec<String>, user: &str) -> AskArgs {
    AskArgs {
        question,
        user: user.to_string(),
        no_web: false,
    }
}

fn words(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn require(words: Vec<String>, usage_line: &str) -> Result<Vec<String>> {
    if words.is_empty() {
        return Err(usage(usage_line));
    }
    Ok(words)
}

fn usage(line: &str) -> CliError {
    CliError::InvalidInput(format!("Usage: {}", line))
}

fn get_history_path() -> Result<PathBuf> {
    let evident_dir = Config::home()?;
    std::fs::create_dir_all(&evident_dir)?;
    Ok(evident_dir.join("history.txt"))
}

fn print_help(formatter: &Formatter) {
    println!("{}", formatter.info("Available commands:"));
    println!();
    println!("  <question>                     - Ask a question (same as 'ask')");
    println!("  ask <question>                 - Ask with conversation context");
    println!("  search <query>                 - Show evidence from the search hierarchy");
    println!("  verify <claim>                 - Verify a claim against documents");
    println!("  cite <claim>                   - Rank sources for a claim");
    println!("  reason <question>              - Answer through a reasoning chain");
    println!("  conflicts <id> <id> [id...]    - Detect conflicts between documents");
    println!("  relationships <id>             - Show related documents");
    println!("  good | bad [correction]        - Rate the last answer");
    println!("  import-faq <file>              - Import Q&A entries from JSON");
    println!("  import-doc <file> [folder]     - Import a text document");
    println!("  user <name>                    - Personalize answers for a user");
    println!("  clear                          - Forget the conversation and cached answers");
    println!("  profile [list|show|switch]     - Manage profiles");
    println!("  help, ?                        - Show this help");
    println!("  exit, quit, q                  - Exit REPL");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ReplCommand {
        parse_line(line, "alice", None).unwrap()
    }

    #[test]
    fn test_free_text_is_a_question() {
        match parse("what does clover cost") {
            ReplCommand::Command(Command::Ask(args)) => {
                assert_eq!(args.question.join(" "), "what does clover cost");
                assert_eq!(args.user, "alice");
            }
            other => panic!("Expected Ask, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_commands() {
        assert!(matches!(parse("exit"), ReplCommand::Exit));
        assert!(matches!(parse("?"), ReplCommand::Help));
        assert!(matches!(parse("clear"), ReplCommand::Clear));
        assert!(matches!(parse("user bob"), ReplCommand::User(name) if name == "bob"));
        assert!(matches!(parse("verify fee is 2.5%"), ReplCommand::Command(Command::Verify(_))));
        assert!(matches!(
            parse("profile"),
            ReplCommand::Command(Command::Profile(ProfileArgs { action: ProfileAction::Show }))
        ));
    }

    #[test]
    fn test_usage_errors() {
        assert!(parse_line("search", "alice", None).is_err());
        assert!(parse_line("conflicts one", "alice", None).is_err());
        assert!(parse_line("profile switch", "alice", None).is_err());
    }

    #[test]
    fn test_rating_needs_a_previous_answer() {
        assert!(parse_line("bad", "alice", None).is_err());

        let last = ("Fee?".to_string(), "2.5%".to_string());
        match parse_line("bad it is 2.9%", "alice", Some(&last)).unwrap() {
            ReplCommand::Command(Command::Feedback(args)) => {
                assert_eq!(args.query, "Fee?");
                assert_eq!(args.response, "2.5%");
                assert!(matches!(args.rating, RatingArg::Negative));
                assert_eq!(args.correction.as_deref(), Some("it is 2.9%"));
            }
            other => panic!("Expected Feedback, got {:?}", other),
        }
    }
}
