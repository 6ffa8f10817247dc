//! `llmrelay status`: show configuration and provider status.
//!
//! With `--check`, every configured key is also validated against its vendor.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use llmrelay_core::config::Config;
use llmrelay_core::credentials::{mask_api_key, validate_key_format};
use llmrelay_providers::{build_provider, VENDORS};

use crate::helpers::mark;

/// Run the status command.
pub async fn run(config: &Config, config_path: &Path, check: bool) -> Result<()> {
    println!();
    println!("{}", "⇄ llmrelay Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );

    let fb = &config.fallback;
    println!(
        "  {:<18} {} | retries: {} | timeout: {}s | deadline: {}s | low water: {}",
        "Fallback:".bold(),
        if fb.enabled { "on".green() } else { "off".yellow() },
        fb.max_retries,
        fb.timeout_secs,
        fb.attempt_timeout_secs,
        fb.rate_limit_low_water,
    );
    println!(
        "  {:<18} {}:{} {}",
        "Server:".bold(),
        config.server.host,
        config.server.port,
        format!("(log: {})", config.server.log_level).dimmed()
    );

    println!();
    println!("  {}", "Providers (fallback order):".bold());
    if config.providers.is_empty() {
        println!("    {}", "none configured".dimmed());
    }
    for (i, entry) in config.providers.iter().enumerate() {
        let mut line = format!(
            "    {}. {:<10} {}",
            i + 1,
            entry.name.as_str(),
            mask_api_key(&entry.api_key)
        );
        if !entry.is_configured() {
            line.push_str(&format!(" {}", "(no key)".red()));
        } else if !validate_key_format(entry.name, &entry.api_key) {
            line.push_str(&format!(" {}", "(unusual key format)".yellow()));
        }
        if let Some(base) = &entry.api_base {
            line.push_str(&format!(" {}", format!("@ {base}").dimmed()));
        }
        if check && entry.is_configured() {
            let valid = match build_provider(entry.name, &entry.api_key, entry.api_base.as_deref()) {
                Ok(provider) => provider.validate_key().await,
                Err(_) => false,
            };
            line.push_str(&format!(
                " {}",
                if valid { "key ok".green() } else { "key rejected".red() }
            ));
        }
        println!("{line}");
    }

    let unconfigured: Vec<&str> = VENDORS
        .iter()
        .filter(|spec| config.provider(spec.name).is_none())
        .map(|spec| spec.display_name)
        .collect();
    if !unconfigured.is_empty() {
        println!();
        println!("  {} {}", mark(false), format!("available: {}", unconfigured.join(", ")).dimmed());
    }

    println!();
    Ok(())
}
