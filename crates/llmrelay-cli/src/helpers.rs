//! Shared CLI helpers: path expansion, output formatting, banner.

use std::path::PathBuf;

use colored::Colorize;

use llmrelay_core::error::RelayError;
use llmrelay_core::types::GenerationSuccess;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Green check or dimmed dot.
pub fn mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "·".dimmed().to_string()
    }
}

/// One-line attempt summary, e.g. `"3 attempts, fallback used"`.
pub fn attempts_summary(attempts: u32, fallback_used: bool) -> String {
    let noun = if attempts == 1 { "attempt" } else { "attempts" };
    if fallback_used {
        format!("{attempts} {noun}, fallback used")
    } else {
        format!("{attempts} {noun}")
    }
}

/// Print a successful generation to stdout.
pub fn print_generation(success: &GenerationSuccess, attempts: u32, fallback_used: bool) {
    println!();
    println!(
        "{} {}",
        format!("⇄ {}", success.provider_used).cyan().bold(),
        format!(
            "({} · {:.2}s · {})",
            success.model_used,
            success.latency.as_secs_f64(),
            attempts_summary(attempts, fallback_used)
        )
        .dimmed()
    );
    if success.text.is_empty() {
        println!("{}", "(no response)".dimmed());
    } else {
        println!("{}", success.text);
    }
    println!();
}

/// Print a failed walk, one line per attempt.
pub fn print_failure(error: &RelayError, attempts: u32) {
    eprintln!();
    eprintln!("{} {}", "✗".red().bold(), error.to_string().red());
    for detail in error.details() {
        eprintln!("    {}", detail.dimmed());
    }
    eprintln!("  {}", attempts_summary(attempts, attempts > 1).dimmed());
    eprintln!();
}

/// Print the banner shown when a long-running command starts.
pub fn print_banner(mode: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("{}  v{}", "⇄ llmrelay".cyan().bold(), version.dimmed());
    println!("  Mode: {mode}");
    println!();
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
