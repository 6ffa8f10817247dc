//! `llmrelay onboard`: write a default config if none exists.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use llmrelay_core::config::{save_config, Config};
use llmrelay_core::credentials::mask_api_key;
use llmrelay_providers::VENDORS;

const TITLE: &str = "⇄ llmrelay Setup";

/// Run the onboard command.
pub fn run(config_path: &Path) -> Result<()> {
    println!();
    println!("{}", TITLE.cyan().bold());
    println!();

    if ensure_config(config_path)? {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!("  {} config already exists at {}", "✓".green(), config_path.display());
    }

    // Keys already present in the environment
    let found: Vec<String> = VENDORS
        .iter()
        .filter_map(|spec| {
            std::env::var(spec.env_key)
                .ok()
                .filter(|k| !k.is_empty())
                .map(|k| format!("{} ({})", spec.name, mask_api_key(&k)))
        })
        .collect();
    if !found.is_empty() {
        println!("  {} keys found in environment: {}", "✓".green(), found.join(", "));
    }

    println!();
    println!("  Next steps:");
    println!("    llmrelay providers add gemini --key <KEY>");
    println!("    llmrelay serve");
    println!();

    Ok(())
}

/// Create a default config at `path` unless one exists. Returns whether it was created.
fn ensure_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
