//! Profile command implementation.

use crate::cli::{ProfileAction, ProfileArgs, ProfileSetArgs};
use crate::config::{Config, Profile};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use evident_llm::{LlmConfig, ProviderKind};

/// Execute the profile command.
pub async fn execute_profile(args: ProfileArgs, config: &mut Config, formatter: &Formatter) -> Result<()> {
    match args.action {
        ProfileAction::List => list_profiles(config, formatter),
        ProfileAction::Show => show_active_profile(config, formatter),
        ProfileAction::Switch { name } => switch_profile(config, name, formatter),
        ProfileAction::Set(set) => set_profile(config, set, formatter),
        ProfileAction::Delete { name } => delete_profile(config, name, formatter),
    }
}

/// List all profiles.
fn list_profiles(config: &Config, formatter: &Formatter) -> Result<()> {
    if config.profiles.is_empty() {
        println!("{}", formatter.info("No profiles configured"));
        return Ok(());
    }

    let mut names: Vec<&String> = config.profiles.keys().collect();
    names.sort();

    println!("Available profiles:");
    for name in names {
        let profile = &config.profiles[name];
        if name == &config.active_profile {
            println!("* {}", formatter.success(name));
        } else {
            println!("  {}", name);
        }
        print_profile(profile, "    ");
    }

    Ok(())
}

/// Show the active profile.
fn show_active_profile(config: &Config, formatter: &Formatter) -> Result<()> {
    let profile = config.get_active_profile()?;
    println!("Active profile: {}", formatter.success(&config.active_profile));
    print_profile(profile, "  ");
    Ok(())
}

fn print_profile(profile: &Profile, indent: &str) {
    println!("{}Database: {}", indent, profile.database);
    println!("{}Primary: {}", indent, describe(&profile.primary));
    if let Some(fallback) = &profile.fallback {
        println!("{}Fallback: {}", indent, describe(fallback));
    }
    let web = match (&profile.web_search, &profile.web_model) {
        (true, Some(model)) => format!("enabled ({})", model),
        (true, None) => "enabled".to_string(),
        (false, _) => "disabled".to_string(),
    };
    println!("{}Web search: {}", indent, web);
}

fn describe(llm: &LlmConfig) -> String {
    let provider = match llm.provider {
        ProviderKind::Anthropic => "anthropic",
        ProviderKind::OpenAi => "openai",
        ProviderKind::Ollama => "ollama",
    };
    match &llm.endpoint {
        Some(endpoint) => format!("{}/{} at {}", provider, llm.model, endpoint),
        None => format!("{}/{}", provider, llm.model),
    }
}

/// Switch to a different profile.
fn switch_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<()> {
    config.switch_profile(name.clone())?;
    config.save()?;
    println!("{}", formatter.success(&format!("Switched to profile '{}'", name)));
    Ok(())
}

/// Create or update a profile.
///
/// Unset options keep the existing profile's values, or the local defaults
/// for a new profile.
fn set_profile(config: &mut Config, args: ProfileSetArgs, formatter: &Formatter) -> Result<()> {
    let existing = config.profiles.get(&args.name).cloned();
    let action = if existing.is_some() { "Updated" } else { "Created" };

    let mut profile = match existing {
        Some(profile) => profile,
        None => {
            let database = args
                .database
                .clone()
                .ok_or_else(|| CliError::InvalidInput("--database is required for a new profile".to_string()))?;
            Profile::local(database)
        }
    };

    if let Some(database) = args.database {
        profile.database = database;
    }
    if let Some(provider) = args.provider {
        let model = args.model.clone().unwrap_or_else(|| profile.primary.model.clone());
        profile.primary = provider_config(provider.into(), model);
    }
    if let Some(model) = args.model {
        profile.primary.model = model;
    }
    if let Some(endpoint) = args.endpoint {
        profile.primary.endpoint = Some(endpoint);
    }
    if let (Some(provider), Some(model)) = (args.fallback_provider, args.fallback_model) {
        profile.fallback = Some(provider_config(provider.into(), model));
    }
    if let Some(web) = args.web {
        profile.web_search = web;
    }
    if let Some(web_model) = args.web_model {
        profile.web_model = Some(web_model);
    }

    profile.validate().map_err(CliError::InvalidInput)?;
    config.set_profile(args.name.clone(), profile);
    config.save()?;

    println!("{}", formatter.success(&format!("{} profile '{}'", action, args.name)));
    Ok(())
}

fn provider_config(provider: ProviderKind, model: String) -> LlmConfig {
    match provider {
        ProviderKind::Anthropic => LlmConfig::anthropic(model),
        ProviderKind::OpenAi => LlmConfig::openai(model),
        ProviderKind::Ollama => LlmConfig::ollama(model),
    }
}

/// Delete a profile.
fn delete_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<()> {
    if name == config.active_profile {
        return Err(CliError::NotPermitted("Cannot delete the active profile".to_string()));
    }

    if config.profiles.remove(&name).is_some() {
        config.save()?;
        println!("{}", formatter.success(&format!("Deleted profile '{}'", name)));
    } else {
        println!("{}", formatter.warning(&format!("Profile '{}' does not exist", name)));
    }

    Ok(())
}
