//! `llmrelay providers`: manage configured vendors from the CLI.
//!
//! - `llmrelay providers add <name> --key <KEY>`: add or update a vendor
//! - `llmrelay providers remove <name>`: drop a vendor
//! - `llmrelay providers list`: show configured vendors in fallback order
//! - `llmrelay providers models <name>`: query a vendor's model catalogue

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tracing::warn;

use llmrelay_core::config::{save_config, Config};
use llmrelay_core::credentials::{mask_api_key, validate_key_format};
use llmrelay_core::types::ProviderName;
use llmrelay_providers::build_provider;

// ─────────────────────────────────────────────
// Subcommand enum
// ─────────────────────────────────────────────

#[derive(Subcommand)]
pub enum ProvidersCommands {
    /// Add a vendor, or update its key
    Add {
        /// Vendor name (gemini, deepseek, mistral, openai, groq)
        name: String,

        /// API key
        #[arg(short, long)]
        key: String,

        /// Known models (comma-separated). Omit to discover at startup.
        #[arg(short, long, value_delimiter = ',')]
        models: Vec<String>,

        /// Custom API base URL
        #[arg(long)]
        api_base: Option<String>,

        /// Save without checking the key against the vendor
        #[arg(long, default_value_t = false)]
        no_validate: bool,
    },

    /// Remove a vendor
    Remove {
        /// Vendor name
        name: String,
    },

    /// List configured vendors in fallback order
    List,

    /// Query a configured vendor for its models
    Models {
        /// Vendor name
        name: String,
    },
}

// ─────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────

pub async fn dispatch(cmd: ProvidersCommands, mut config: Config, config_path: &Path) -> Result<()> {
    match cmd {
        ProvidersCommands::Add {
            name,
            key,
            models,
            api_base,
            no_validate,
        } => {
            let name = parse_name(&name)?;
            add(&mut config, name, &key, models, api_base, !no_validate).await?;
            save(&config, config_path)
        }
        ProvidersCommands::Remove { name } => {
            let name = parse_name(&name)?;
            if !config.remove_provider(name) {
                bail!("{name} is not configured");
            }
            save(&config, config_path)?;
            println!("  {} removed {}", "✓".green(), name);
            Ok(())
        }
        ProvidersCommands::List => {
            list(&config);
            Ok(())
        }
        ProvidersCommands::Models { name } => models(&config, parse_name(&name)?).await,
    }
}

fn parse_name(raw: &str) -> Result<ProviderName> {
    raw.parse::<ProviderName>()
        .with_context(|| format!("supported vendors: {}", supported_names()))
}

fn supported_names() -> String {
    ProviderName::ALL.map(|n| n.as_str()).join(", ")
}

fn save(config: &Config, path: &Path) -> Result<()> {
    save_config(config, Some(path)).with_context(|| format!("failed to write {}", path.display()))
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

async fn add(
    config: &mut Config,
    name: ProviderName,
    key: &str,
    models: Vec<String>,
    api_base: Option<String>,
    validate: bool,
) -> Result<()> {
    if !validate_key_format(name, key) {
        warn!(provider = %name, "API key does not match the vendor's usual format");
        println!(
            "  {} key for {} does not look like a {} key",
            "!".yellow(),
            mask_api_key(key),
            name
        );
    }

    if validate {
        let provider = build_provider(name, key, api_base.as_deref())?;
        if !provider.validate_key().await {
            bail!("{name} rejected the key {}", mask_api_key(key));
        }
        println!("  {} {} accepted the key", "✓".green(), name);
    }

    let models = if models.is_empty() { None } else { Some(models) };
    config.add_provider(name, key, models);
    if let Some(base) = api_base {
        if let Some(entry) = config.providers.iter_mut().find(|p| p.name == name) {
            entry.api_base = Some(base);
        }
    }

    let position = config.provider_order().iter().position(|n| *n == name).unwrap_or(0) + 1;
    println!("  {} saved {} (fallback position {})", "✓".green(), name, position);
    Ok(())
}

fn list(config: &Config) {
    println!();
    if config.providers.is_empty() {
        println!("  {}", "No providers configured.".dimmed());
        println!("  Supported: {}", supported_names());
        println!();
        return;
    }
    for (i, entry) in config.providers.iter().enumerate() {
        let models = if entry.models.is_empty() {
            "(discover at startup)".dimmed().to_string()
        } else {
            entry.models.join(", ")
        };
        println!(
            "  {}. {:<10} {:<14} {}",
            i + 1,
            entry.name.as_str().bold(),
            mask_api_key(&entry.api_key),
            models
        );
    }
    println!();
}

async fn models(config: &Config, name: ProviderName) -> Result<()> {
    let Some(entry) = config.provider(name) else {
        bail!("{name} is not configured; run `llmrelay providers add {name} --key <KEY>`");
    };
    let provider = build_provider(name, &entry.api_key, entry.api_base.as_deref())?;
    let models = provider.discover_models().await;

    println!();
    println!("  {}", format!("{name} models:").bold());
    for model in models {
        println!("    {model}");
    }
    println!();
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
