//! llmrelay CLI: entry point.
//!
//! # Commands
//!
//! - `llmrelay serve`: HTTP gateway (`POST /generate`, `GET /status`)
//! - `llmrelay generate -p PROMPT`: one-shot generation with fallback
//! - `llmrelay status [--check]`: show configuration and provider status
//! - `llmrelay providers add|remove|list|models`: manage vendors
//! - `llmrelay onboard`: initialize config

mod gateway;
mod helpers;
mod onboard;
mod providers_cmd;
mod status;

use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use llmrelay_core::config::{get_config_path, load_config, Config};
use llmrelay_core::credentials::validate_key_format;
use llmrelay_core::error::RelayError;
use llmrelay_core::types::{GenerationParams, GenerationRequest};
use llmrelay_fallback::{FallbackHandler, FallbackPlan, FallbackSettings};
use llmrelay_providers::ProviderRegistry;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// ⇄ llmrelay: one text-generation endpoint over many LLM vendors
#[derive(Parser)]
#[command(name = "llmrelay", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.llmrelay/config.json)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Listen address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Generate text once, falling back across vendors
    Generate(GenerateArgs),

    /// Show configuration and provider status
    Status {
        /// Validate every configured key against its vendor
        #[arg(long, default_value_t = false)]
        check: bool,
    },

    /// Manage configured vendors
    Providers {
        #[command(subcommand)]
        action: providers_cmd::ProvidersCommands,
    },

    /// Initialize configuration
    Onboard,
}

#[derive(Args)]
struct GenerateArgs {
    /// Prompt text
    #[arg(short, long)]
    prompt: String,

    /// Target model ("default" lets each vendor pick)
    #[arg(short, long, default_value = "default")]
    model: String,

    /// Vendor to try first
    #[arg(long)]
    provider: Option<String>,

    #[arg(long)]
    temperature: Option<f64>,

    #[arg(long)]
    max_tokens: Option<u32>,

    #[arg(long)]
    top_p: Option<f64>,

    #[arg(long)]
    top_k: Option<u32>,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    logs: bool,
}

impl GenerateArgs {
    fn to_request(&self) -> GenerationRequest {
        let defaults = GenerationParams::default();
        let params = GenerationParams {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            top_k: self.top_k.unwrap_or(defaults.top_k),
        };
        let request = GenerationRequest::new(self.prompt.clone())
            .model(self.model.clone())
            .params(params);
        match &self.provider {
            Some(p) => request.provider(p.clone()),
            None => request,
        }
    }
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(helpers::expand_tilde)
        .unwrap_or_else(get_config_path);

    match cli.command {
        Commands::Serve { host, port, logs } => {
            let config = load_config(Some(config_path.as_path()));
            init_logging(logs, &config.server.log_level);
            gateway::run(config, host, port).await
        }
        Commands::Generate(args) => {
            init_logging(args.logs, "warn");
            let config = load_config(Some(config_path.as_path()));
            run_generate(&config, &args).await
        }
        Commands::Status { check } => {
            init_logging(false, "warn");
            let config = load_config(Some(config_path.as_path()));
            status::run(&config, &config_path, check).await
        }
        Commands::Providers { action } => {
            init_logging(false, "warn");
            let config = load_config(Some(config_path.as_path()));
            providers_cmd::dispatch(action, config, &config_path).await
        }
        Commands::Onboard => onboard::run(&config_path),
    }
}

// ─────────────────────────────────────────────
// Shared setup
// ─────────────────────────────────────────────

/// Build the provider registry from config, in configured order.
///
/// Vendors without a key, or whose adapter fails to build, are skipped with
/// a warning rather than aborting startup.
pub async fn build_registry(config: &Config) -> Arc<ProviderRegistry> {
    let registry = Arc::new(ProviderRegistry::new());

    for entry in &config.providers {
        if !entry.is_configured() {
            warn!(provider = %entry.name, "No API key configured, skipping");
            continue;
        }
        if !validate_key_format(entry.name, &entry.api_key) {
            warn!(provider = %entry.name, "API key does not match the vendor's usual format");
        }
        if let Err(e) = registry.create_from_config(entry).await {
            warn!(provider = %entry.name, error = %e, "Failed to initialize provider");
        }
    }

    info!(providers = registry.len(), "provider registry ready");
    registry
}

// ─────────────────────────────────────────────
// Generate command
// ─────────────────────────────────────────────

async fn run_generate(config: &Config, args: &GenerateArgs) -> Result<()> {
    let registry = build_registry(config).await;
    if registry.is_empty() {
        eprintln!("  add one with `llmrelay providers add <name> --key <KEY>`");
        return Err(RelayError::NoProviders.into());
    }

    let request = args.to_request();
    let plan = FallbackPlan::for_request(&request, &registry.names())?;
    let handler = FallbackHandler::new(registry, FallbackSettings::from(&config.fallback));

    // Ctrl+C aborts the in-flight vendor call
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let outcome = handler
        .process_request_cancellable(&request, &plan, &cancel)
        .await;
    watcher.abort();

    match outcome.result {
        Ok(success) => {
            helpers::print_generation(&success, outcome.attempts, outcome.fallback_used);
            Ok(())
        }
        Err(e) => {
            helpers::print_failure(&e, outcome.attempts);
            Err(e.into())
        }
    }
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins when set; otherwise `--logs` enables debug output for the
/// llmrelay crates and `default_level` applies.
fn init_logging(verbose: bool, default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "llmrelay=debug,llmrelay_core=debug,llmrelay_providers=debug,llmrelay_fallback=debug,info",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
