//! Evident CLI - Command-line interface for the Evident answer pipeline.

use clap::Parser;
use evident_cli::commands;
use evident_cli::repl;
use evident_cli::{ApiKeys, Cli, Command, Config, Formatter, Pipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays clean for JSON output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> evident_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    let keys = ApiKeys::from(cli.keys);

    // Load or create config
    let path = match &cli.config {
        Some(path) => PathBuf::from(path),
        None => Config::path()?,
    };
    let first_run = !path.exists();
    let mut config = Config::load_from(&path)?;
    if first_run {
        config.save().ok();
    }

    // Override profile if specified
    if let Some(profile_name) = cli.profile {
        config.switch_profile(profile_name)?;
    }

    // Determine output format
    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;

    // Create formatter
    let formatter = Formatter::new(format, color_enabled);

    // Handle commands
    match cli.command {
        None | Some(Command::Repl) => {
            // Enter REPL mode
            repl::run_repl(&mut config, &keys, &formatter).await?;
        }
        Some(Command::Profile(args)) => {
            commands::execute_profile(args, &mut config, &formatter).await?;
        }
        Some(cmd) => {
            // Commands that need the pipeline
            let allow_web = match &cmd {
                Command::Ask(args) => !args.no_web,
                Command::Search(args) => !args.no_web,
                _ => true,
            };
            let profile = config.get_active_profile()?;
            let pipeline = Pipeline::open(profile, &keys, allow_web)?;

            match cmd {
                Command::Ask(args) => {
                    commands::execute_ask(args, &pipeline, &[], &formatter).await?;
                }
                Command::Search(args) => {
                    commands::execute_search(args, &pipeline, &formatter).await?;
                }
                Command::Verify(args) => {
                    commands::execute_verify(args, &pipeline, &formatter).await?;
                }
                Command::Cite(args) => {
                    commands::execute_cite(args, &pipeline, &formatter).await?;
                }
                Command::Conflicts(args) => {
                    commands::execute_conflicts(args, &pipeline, &formatter).await?;
                }
                Command::Relationships(args) => {
                    commands::execute_relationships(args, &pipeline, &formatter).await?;
                }
                Command::Reason(args) => {
                    commands::execute_reason(args, &pipeline, &formatter).await?;
                }
                Command::Feedback(args) => {
                    commands::execute_feedback(args, &pipeline, &formatter).await?;
                }
                Command::ImportFaq(args) => {
                    commands::execute_import_faq(args, &pipeline, &formatter).await?;
                }
                Command::ImportDoc(args) => {
                    commands::execute_import_doc(args, &pipeline, &formatter).await?;
                }
                Command::Profile(_) | Command::Repl => unreachable!(),
            }
        }
    }

    Ok(())
}
