//! Core types for llmrelay: provider names, generation requests and outcomes.
//!
//! Every vendor adapter speaks a different wire format; these types are the
//! uniform shape the registry and the fallback handler work with.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::utils::truncate_string;

/// Maximum length of a vendor response body kept on a failure.
pub const RESPONSE_SNIPPET_CHARS: usize = 500;

// ─────────────────────────────────────────────
// Provider names
// ─────────────────────────────────────────────

/// Identifier of a supported vendor.
///
/// Parsing is case-insensitive (`"Gemini"`, `"GEMINI"` and `"gemini"` are the
/// same provider); display and serialization always use the lowercase tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderName {
    Gemini,
    DeepSeek,
    Mistral,
    OpenAi,
    Groq,
}

impl ProviderName {
    /// Every known provider, in the order they are listed to users.
    pub const ALL: [ProviderName; 5] = [
        ProviderName::Gemini,
        ProviderName::DeepSeek,
        ProviderName::Mistral,
        ProviderName::OpenAi,
        ProviderName::Groq,
    ];

    /// Lowercase tag used in config files, URLs and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Gemini => "gemini",
            ProviderName::DeepSeek => "deepseek",
            ProviderName::Mistral => "mistral",
            ProviderName::OpenAi => "openai",
            ProviderName::Groq => "groq",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ProviderName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RelayError::UnknownProvider(s.to_string()))
    }
}

impl TryFrom<String> for ProviderName {
    type Error = RelayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProviderName> for String {
    fn from(name: ProviderName) -> Self {
        name.as_str().to_string()
    }
}

// ─────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────

/// Sampling parameters forwarded to the vendor.
///
/// Vendors that have no notion of `top_k` (OpenAI-compatible APIs) ignore it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationParams {
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate.
    #[serde(alias = "max_tokens")]
    pub max_tokens: u32,
    /// Nucleus sampling mass.
    #[serde(alias = "top_p")]
    pub top_p: f64,
    /// Top-k sampling cutoff.
    #[serde(alias = "top_k")]
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

/// A single text-generation request as received from a caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// The prompt to generate from.
    pub prompt: String,
    /// Target model; `"default"` lets each vendor pick its own.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling parameters (flattened into the request body).
    #[serde(flatten)]
    pub params: GenerationParams,
    /// Provider to try first, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

fn default_model() -> String {
    "default".to_string()
}

impl GenerationRequest {
    /// Create a request with default model and sampling parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: default_model(),
            params: GenerationParams::default(),
            provider: None,
        }
    }

    /// Set the target model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the preferred provider.
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Replace the sampling parameters.
    pub fn params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

// ─────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────

/// A successful generation.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSuccess {
    pub text: String,
    /// Model identifier as sent to the vendor (after normalization).
    pub model_used: String,
    pub provider_used: ProviderName,
    pub latency: Duration,
    /// Remaining-calls hint reported by the vendor, if any.
    pub rate_limit_remaining: Option<u64>,
}

/// A failed generation attempt against one vendor.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationFailure {
    /// Human-readable error, e.g. `"API Error: 500"` or `"Exception: ..."`.
    pub error: String,
    /// Truncated vendor response body, when one was received.
    pub response: Option<String>,
    /// HTTP status, when the vendor answered at all.
    pub status: Option<u16>,
    pub latency: Duration,
    pub rate_limit_remaining: Option<u64>,
}

impl GenerationFailure {
    /// Create a failure with just an error message and latency.
    pub fn new(error: impl Into<String>, latency: Duration) -> Self {
        Self {
            error: error.into(),
            response: None,
            status: None,
            latency,
            rate_limit_remaining: None,
        }
    }

    /// Attach the HTTP status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the vendor response body (truncated).
    pub fn with_response(mut self, body: &str) -> Self {
        self.response = Some(truncate_string(body, RESPONSE_SNIPPET_CHARS));
        self
    }

    /// Attach a rate-limit hint.
    pub fn with_rate_limit(mut self, remaining: Option<u64>) -> Self {
        self.rate_limit_remaining = remaining;
        self
    }

    /// Whether this failure carries a rate-limit signature.
    ///
    /// Matches a 429 status, or a case-insensitive `"rate limit"` / `"429"` in
    /// the response snippet or the error text.
    pub fn is_rate_limited(&self) -> bool {
        if self.status == Some(429) {
            return true;
        }
        [self.response.as_deref(), Some(self.error.as_str())]
            .into_iter()
            .flatten()
            .any(has_rate_limit_signature)
    }

    /// Map this failure onto the error taxonomy.
    pub fn classify(&self, provider: ProviderName, timeout_threshold: Duration) -> RelayError {
        if self.is_rate_limited() {
            RelayError::RateLimited(format!("{provider}: {}", self.error))
        } else if self.latency >= timeout_threshold {
            RelayError::Timeout {
                provider,
                elapsed: self.latency,
            }
        } else {
            RelayError::VendorTransient(format!("{provider}: {}", self.error))
        }
    }
}

fn has_rate_limit_signature(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("rate limit") || lower.contains("429")
}

/// Result of one generation call against one vendor.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationOutcome {
    Success(GenerationSuccess),
    Failure(GenerationFailure),
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success(_))
    }

    /// Rate-limit hint reported by the vendor, if the response exposed one.
    pub fn rate_limit_remaining(&self) -> Option<u64> {
        match self {
            GenerationOutcome::Success(s) => s.rate_limit_remaining,
            GenerationOutcome::Failure(f) => f.rate_limit_remaining,
        }
    }
}

// ─────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────

/// Point-in-time view of one provider's counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: ProviderName,
    pub models: Vec<String>,
    pub request_count: u64,
    pub failure_count: u64,
    /// `(requests - failures) / requests`, `0.0` before the first request.
    pub success_rate: f64,
    pub rate_limit_remaining: Option<u64>,
}

/// Success rate as a fraction; `0.0` when nothing has been requested yet.
pub fn success_rate(requests: u64, failures: u64) -> f64 {
    if requests == 0 {
        return 0.0;
    }
    requests.saturating_sub(failures) as f64 / requests as f64
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
