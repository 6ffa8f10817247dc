//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProviderEntry` list, `FallbackConfig`, `ServerConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ProviderName;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.llmrelay/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Configured vendors. List order is the default fallback order.
    pub providers: Vec<ProviderEntry>,
    pub fallback: FallbackConfig,
    pub server: ServerConfig,
}

impl Config {
    /// The configured provider order, used as the default fallback plan.
    pub fn provider_order(&self) -> Vec<ProviderName> {
        self.providers.iter().map(|p| p.name).collect()
    }

    /// Get the entry for a provider by name.
    pub fn provider(&self, name: ProviderName) -> Option<&ProviderEntry> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Add a provider, or update the key (and models, if given) of an existing one.
    pub fn add_provider(&mut self, name: ProviderName, api_key: &str, models: Option<Vec<String>>) {
        if let Some(entry) = self.providers.iter_mut().find(|p| p.name == name) {
            entry.api_key = api_key.to_string();
            if let Some(models) = models {
                entry.models = models;
            }
            return;
        }
        self.providers.push(ProviderEntry {
            name,
            api_key: api_key.to_string(),
            api_base: None,
            models: models.unwrap_or_default(),
        });
    }

    /// Remove a provider. Returns whether it was present.
    pub fn remove_provider(&mut self, name: ProviderName) -> bool {
        let before = self.providers.len();
        self.providers.retain(|p| p.name != name);
        self.providers.len() != before
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single vendor connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEntry {
    pub name: ProviderName,
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides the vendor default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Known models. Empty means "discover at startup".
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderEntry {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Pre-known models, or `None` when discovery is needed.
    pub fn known_models(&self) -> Option<Vec<String>> {
        if self.models.is_empty() {
            None
        } else {
            Some(self.models.clone())
        }
    }
}

// ─────────────────────────────────────────────
// Fallback
// ─────────────────────────────────────────────

/// Retry/fallback tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackConfig {
    /// When false, each request only tries its first provider.
    pub enabled: bool,
    /// Attempts per provider before moving on.
    pub max_retries: u32,
    /// Attempt latency (seconds) treated as a timeout.
    pub timeout_secs: u64,
    /// Hard deadline (seconds) for a single vendor call.
    pub attempt_timeout_secs: u64,
    /// Providers reporting fewer remaining calls than this are skipped.
    /// A skipped provider is never attempted again, so its hint never refreshes.
    pub rate_limit_low_water: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            timeout_secs: 10,
            attempt_timeout_secs: 30,
            rate_limit_low_water: 5,
        }
    }
}

impl FallbackConfig {
    pub fn timeout_threshold(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

// ─────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────

/// HTTP server configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Default tracing level when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.providers.is_empty());
        assert!(config.fallback.enabled);
        assert_eq!(config.fallback.max_retries, 2);
        assert_eq!(config.fallback.timeout_threshold(), Duration::from_secs(10));
        assert_eq!(config.fallback.rate_limit_low_water, 5);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_config_from_json_camel_case() {
        let json = serde_json::json!({
            "providers": [
                { "name": "Gemini", "apiKey": "AIza-test", "models": ["gemini-1.5-pro"] },
                { "name": "deepseek", "apiKey": "ds-key", "apiBase": "http://localhost:9000" }
            ],
            "fallback": { "maxRetries": 3, "timeoutSecs": 5 },
            "server": { "port": 9090 }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(
            config.provider_order(),
            vec![ProviderName::Gemini, ProviderName::DeepSeek]
        );
        assert_eq!(config.providers[0].models, vec!["gemini-1.5-pro"]);
        assert_eq!(
            config.providers[1].api_base.as_deref(),
            Some("http://localhost:9000")
        );
        assert_eq!(config.fallback.max_retries, 3);
        assert_eq!(config.fallback.timeout_secs, 5);
        // Defaults preserved for missing fields
        assert_eq!(config.fallback.attempt_timeout_secs, 30);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn test_unknown_provider_name_rejected() {
        let json = serde_json::json!({ "providers": [{ "name": "claude", "apiKey": "x" }] });
        assert!(serde_json::from_value::<Config>(json).is_err());
    }

    #[test]
    fn test_config_json_uses_camel_case() {
        let mut config = Config::default();
        config.add_provider(ProviderName::Mistral, "key", None);
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["fallback"].get("maxRetries").is_some());
        assert!(json["fallback"].get("max_retries").is_none());
        assert_eq!(json["providers"][0]["name"], "mistral");
        assert!(json["providers"][0].get("apiKey").is_some());
        // Absent api base is not serialized
        assert!(json["providers"][0].get("apiBase").is_none());
    }

    #[test]
    fn test_add_provider_upserts() {
        let mut config = Config::default();
        config.add_provider(ProviderName::Gemini, "k1", None);
        config.add_provider(ProviderName::DeepSeek, "k2", Some(vec!["deepseek-chat".into()]));
        config.add_provider(ProviderName::Gemini, "k3", Some(vec!["gemini-1.5-flash".into()]));

        assert_eq!(config.providers.len(), 2);
        let gemini = config.provider(ProviderName::Gemini).unwrap();
        assert_eq!(gemini.api_key, "k3");
        assert_eq!(gemini.models, vec!["gemini-1.5-flash"]);
        // Order is preserved on update
        assert_eq!(config.provider_order()[0], ProviderName::Gemini);
    }

    #[test]
    fn test_add_provider_keeps_models_when_none_given() {
        let mut config = Config::default();
        config.add_provider(ProviderName::Groq, "k1", Some(vec!["llama".into()]));
        config.add_provider(ProviderName::Groq, "k2", None);
        assert_eq!(config.provider(ProviderName::Groq).unwrap().models, vec!["llama"]);
    }

    #[test]
    fn test_remove_provider() {
        let mut config = Config::default();
        config.add_provider(ProviderName::Gemini, "k1", None);
        assert!(config.remove_provider(ProviderName::Gemini));
        assert!(!config.remove_provider(ProviderName::Gemini));
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_known_models() {
        let mut entry = ProviderEntry {
            name: ProviderName::OpenAi,
            api_key: String::new(),
            api_base: None,
            models: Vec::new(),
        };
        assert!(!entry.is_configured());
        assert!(entry.known_models().is_none());
        entry.models.push("gpt-4o".into());
        assert_eq!(entry.known_models(), Some(vec!["gpt-4o".to_string()]));
    }
}
