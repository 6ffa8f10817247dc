//! OpenAI-compatible vendor adapter.
//!
//! Talks to any `/chat/completions` + `/models` API with Bearer auth.
//! Covers DeepSeek, Mistral, OpenAI and Groq; the vendor-specific bits
//! (base URL, default models, model filter) come from the [`VendorSpec`].

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use llmrelay_core::error::RelayError;
use llmrelay_core::types::{
    GenerationFailure, GenerationOutcome, GenerationParams, GenerationSuccess, ProviderName,
};

use crate::http_util::{self, PROBE_TIMEOUT};
use crate::traits::{ModelList, Provider};
use crate::vendors::{normalize_model, VendorSpec, WireFormat};

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

// ─────────────────────────────────────────────
// OpenAiCompatProvider
// ─────────────────────────────────────────────

/// Adapter for vendors that speak the OpenAI chat-completions dialect.
pub struct OpenAiCompatProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.deepseek.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    spec: &'static VendorSpec,
    models: ModelList,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("vendor", &self.spec.display_name)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Create an adapter for `spec`, optionally overriding its API base.
    pub fn new(
        spec: &'static VendorSpec,
        api_key: &str,
        api_base: Option<&str>,
    ) -> Result<Self, RelayError> {
        if spec.wire != WireFormat::OpenAiCompatible {
            return Err(RelayError::Config(format!(
                "{} does not speak the OpenAI-compatible dialect",
                spec.display_name
            )));
        }

        Ok(Self {
            client: http_util::build_client()?,
            api_base: api_base.unwrap_or(spec.default_api_base).to_string(),
            api_key: api_key.to_string(),
            spec,
            models: ModelList::default(),
        })
    }

    fn completions_url(&self) -> String {
        http_util::join_url(&self.api_base, "chat/completions")
    }

    fn models_url(&self) -> String {
        http_util::join_url(&self.api_base, "models")
    }

    async fn list_models(&self) -> Result<Vec<String>, String> {
        let response = self
            .client
            .get(self.models_url())
            .bearer_auth(&self.api_key)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;

        if !response.status().is_success() {
            return Err(format!("API Error: {}", response.status().as_u16()));
        }

        let listing: ModelListResponse = response
            .json()
            .await
            .map_err(|e| e.without_url().to_string())?;

        Ok(listing
            .data
            .into_iter()
            .map(|m| m.id)
            .filter(|id| self.spec.keeps_discovered(id))
            .collect())
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> ProviderName {
        self.spec.name
    }

    fn models(&self) -> Vec<String> {
        self.models.get()
    }

    fn set_models(&self, models: Vec<String>) {
        self.models.set(models);
    }

    async fn validate_key(&self) -> bool {
        match self
            .client
            .get(self.models_url())
            .bearer_auth(&self.api_key)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(provider = self.spec.display_name, error = %e.without_url(), "Key validation failed");
                false
            }
        }
    }

    async fn discover_models(&self) -> Vec<String> {
        match self.list_models().await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => {
                debug!(provider = self.spec.display_name, "No matching models listed, using defaults");
                self.spec.default_model_list()
            }
            Err(e) => {
                warn!(provider = self.spec.display_name, error = %e, "Model discovery failed, using defaults");
                self.spec.default_model_list()
            }
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        params: &GenerationParams,
    ) -> GenerationOutcome {
        let resolved_model = normalize_model(self.spec, model, &self.models.get());

        debug!(
            provider = self.spec.display_name,
            model = %resolved_model,
            "Calling vendor"
        );

        let body = ChatCompletionRequest {
            model: &resolved_model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
        };

        let started = Instant::now();
        let result = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await;

        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                let failure = http_util::exception(e, started);
                error!(provider = self.spec.display_name, error = %failure.error, "HTTP request failed");
                return GenerationOutcome::Failure(failure);
            }
        };

        if !response.status().is_success() {
            let failure = http_util::api_error(response, started).await;
            error!(
                provider = self.spec.display_name,
                status = ?failure.status,
                "API error"
            );
            return GenerationOutcome::Failure(failure);
        }

        let remaining = http_util::rate_limit_remaining(response.headers());

        let parsed = match response.json::<ChatCompletionResponse>().await {
            Ok(parsed) => parsed,
            Err(e) => {
                let failure = http_util::exception(e, started).with_rate_limit(remaining);
                error!(provider = self.spec.display_name, error = %failure.error, "Failed to parse response");
                return GenerationOutcome::Failure(failure);
            }
        };

        let Some(text) = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
        else {
            return GenerationOutcome::Failure(
                GenerationFailure::new("Exception: response contained no choices", started.elapsed())
                    .with_rate_limit(remaining),
            );
        };

        GenerationOutcome::Success(GenerationSuccess {
            text,
            model_used: resolved_model,
            provider_used: self.spec.name,
            latency: started.elapsed(),
            rate_limit_remaining: remaining,
        })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
