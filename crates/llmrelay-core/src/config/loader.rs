//! Config loader: reads `~/.llmrelay/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.llmrelay/config.json`
//! 3. Environment variables `LLMRELAY_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;
use crate::error::Result;
use crate::types::ProviderName;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    // Parse JSON → Value first for migration
    let mut raw: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    rename_snake_case_keys(&mut raw);

    let config: Config = match serde_json::from_value(raw) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to deserialize config: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
///
/// The file holds credentials, so on Unix it is restricted to the owner.
pub fn save_config(config: &Config, path: Option<&Path>) -> Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;

    std::fs::write(&config_path, json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))?;
    }

    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Accept snake_case `api_key` / `api_base` inside provider entries.
///
/// A camelCase key already present wins.
fn rename_snake_case_keys(raw: &mut serde_json::Value) {
    if let Some(list) = raw.get_mut("providers").and_then(|p| p.as_array_mut()) {
        for entry in list.iter_mut().filter_map(|e| e.as_object_mut()) {
            for (old, new) in [("api_key", "apiKey"), ("api_base", "apiBase")] {
                if let Some(val) = entry.remove(old) {
                    entry.entry(new).or_insert(val);
                }
            }
        }
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `LLMRELAY_<SECTION>__<FIELD>` (double underscore as delimiter).
///
/// Supported overrides:
/// - `LLMRELAY_PROVIDERS__<NAME>__API_KEY` → adds or updates provider `<name>`
/// - `LLMRELAY_PROVIDERS__<NAME>__API_BASE` → `apiBase` of an existing provider
/// - `LLMRELAY_FALLBACK__MAX_RETRIES` → `fallback.max_retries`
/// - `LLMRELAY_FALLBACK__TIMEOUT_SECS` → `fallback.timeout_secs`
/// - `LLMRELAY_SERVER__HOST` → `server.host`
/// - `LLMRELAY_SERVER__PORT` → `server.port`
/// - `LLMRELAY_SERVER__LOG_LEVEL` → `server.log_level`
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides looked up through `env`.
fn apply_overrides(mut config: Config, env: impl Fn(&str) -> Option<String>) -> Config {
    for name in ProviderName::ALL {
        apply_provider_env(&mut config, name, &env);
    }

    // Fallback
    if let Some(val) = env("LLMRELAY_FALLBACK__MAX_RETRIES") {
        if let Ok(n) = val.parse::<u32>() {
            config.fallback.max_retries = n;
        }
    }
    if let Some(val) = env("LLMRELAY_FALLBACK__TIMEOUT_SECS") {
        if let Ok(n) = val.parse::<u64>() {
            config.fallback.timeout_secs = n;
        }
    }

    // Server
    if let Some(val) = env("LLMRELAY_SERVER__HOST") {
        config.server.host = val;
    }
    if let Some(val) = env("LLMRELAY_SERVER__PORT") {
        if let Ok(p) = val.parse::<u16>() {
            config.server.port = p;
        }
    }
    if let Some(val) = env("LLMRELAY_SERVER__LOG_LEVEL") {
        config.server.log_level = val;
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(config: &mut Config, name: ProviderName, env: &impl Fn(&str) -> Option<String>) {
    let tag = name.as_str().to_uppercase();
    if let Some(val) = env(&format!("LLMRELAY_PROVIDERS__{tag}__API_KEY")) {
        config.add_provider(name, &val, None);
    }
    if let Some(val) = env(&format!("LLMRELAY_PROVIDERS__{tag}__API_BASE")) {
        if let Some(entry) = config.providers.iter_mut().find(|p| p.name == name) {
            entry.api_base = Some(val);
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.fallback.max_retries, 2);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "providers": [
                { "name": "gemini", "apiKey": "AIza-1" },
                { "name": "mistral", "apiKey": "ms-2", "models": ["mistral-small-latest"] }
            ],
            "fallback": { "maxRetries": 4 }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(
            config.provider_order(),
            vec![ProviderName::Gemini, ProviderName::Mistral]
        );
        assert_eq!(config.fallback.max_retries, 4);
        // Default preserved
        assert_eq!(config.fallback.timeout_secs, 10);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.fallback.max_retries, 2);
    }

    #[test]
    fn test_load_empty_json() {
        let file = write_temp_json("{}");
        let config = load_config_from_path(file.path());
        assert_eq!(config.server.log_level, "info");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.add_provider(ProviderName::DeepSeek, "ds-secret", Some(vec!["deepseek-chat".into()]));
        config.fallback.max_retries = 3;

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_from_path(&path);
        assert_eq!(reloaded.fallback.max_retries, 3);
        let entry = reloaded.provider(ProviderName::DeepSeek).unwrap();
        assert_eq!(entry.api_key, "ds-secret");
        assert_eq!(entry.models, vec!["deepseek-chat"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config(&Config::default(), Some(&path)).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_providers_map_layout_rejected() {
        let file = write_temp_json(
            r#"{
            "providers": {
                "gemini": { "apiKey": "AIza-1" }
            }
        }"#,
        );

        // Not a list: the whole file falls back to defaults
        let config = load_config_from_path(file.path());
        assert!(config.provider(ProviderName::Gemini).is_none());
        assert_eq!(config.fallback.max_retries, 2);
    }

    #[test]
    fn test_snake_case_keys_accepted() {
        let file = write_temp_json(
            r#"{
            "providers": [
                { "name": "groq", "api_key": "gsk_legacy", "api_base": "http://127.0.0.1:1" }
            ]
        }"#,
        );

        let config = load_config_from_path(file.path());
        let entry = config.provider(ProviderName::Groq).unwrap();
        assert_eq!(entry.api_key, "gsk_legacy");
        assert_eq!(entry.api_base.as_deref(), Some("http://127.0.0.1:1"));
    }

    #[test]
    fn test_camel_case_key_wins() {
        let mut raw = serde_json::json!({
            "providers": [{ "name": "groq", "apiKey": "new", "api_key": "old" }]
        });
        rename_snake_case_keys(&mut raw);
        assert_eq!(raw["providers"][0]["apiKey"], "new");
        assert!(raw["providers"][0].get("api_key").is_none());
    }

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_override_provider_key_adds_entry() {
        let env = env_from(&[
            ("LLMRELAY_PROVIDERS__OPENAI__API_KEY", "sk-env-key"),
            ("LLMRELAY_PROVIDERS__OPENAI__API_BASE", "http://localhost:4000/v1"),
        ]);
        let config = apply_overrides(Config::default(), env);

        let entry = config.provider(ProviderName::OpenAi).unwrap();
        assert_eq!(entry.api_key, "sk-env-key");
        assert_eq!(entry.api_base.as_deref(), Some("http://localhost:4000/v1"));
    }

    #[test]
    fn test_env_override_server() {
        let env = env_from(&[
            ("LLMRELAY_SERVER__PORT", "9999"),
            ("LLMRELAY_SERVER__HOST", "127.0.0.1"),
        ]);
        let config = apply_overrides(Config::default(), env);
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_env_override_max_retries_ignores_garbage() {
        let env = env_from(&[("LLMRELAY_FALLBACK__MAX_RETRIES", "many")]);
        let config = apply_overrides(Config::default(), env);
        assert_eq!(config.fallback.max_retries, 2);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = Config::default();
        config.add_provider(ProviderName::Gemini, "AIza-1", None);
        let config = apply_overrides(config, env_from(&[]));
        assert_eq!(config.provider_order(), vec![ProviderName::Gemini]);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_save_into_file_parent_is_io_error() {
        let file = write_temp_json("{}");
        let path = file.path().join("config.json");
        let err = save_config(&Config::default(), Some(&path)).unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }
}
