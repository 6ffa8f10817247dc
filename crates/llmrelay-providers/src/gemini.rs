//! Google Gemini adapter (`generateContent` dialect).
//!
//! The key travels in the `x-goog-api-key` header rather than the `?key=`
//! query parameter so it never shows up in a URL.

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
use crate::vendors::{normalize_model, VendorSpec, GEMINI};

const API_KEY_HEADER: &str = "x-goog-api-key";

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

// ─────────────────────────────────────────────
// GeminiProvider
// ─────────────────────────────────────────────

pub struct GeminiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    models: ModelList,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(api_key: &str, api_base: Option<&str>) -> Result<Self, RelayError> {
        Ok(Self {
            client: http_util::build_client()?,
            api_base: api_base.unwrap_or(GEMINI.default_api_base).to_string(),
            api_key: api_key.to_string(),
            models: ModelList::default(),
        })
    }

    fn spec(&self) -> &'static VendorSpec {
        &GEMINI
    }

    fn generate_url(&self, model: &str) -> String {
        http_util::join_url(&self.api_base, &format!("models/{model}:generateContent"))
    }

    fn models_url(&self) -> String {
        http_util::join_url(&self.api_base, "models")
    }

    async fn list_models(&self) -> Result<Vec<String>, String> {
        let response = self
            .client
            .get(self.models_url())
            .header(API_KEY_HEADER, &self.api_key)
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
            .models
            .into_iter()
            .map(|m| match m.name.strip_prefix("models/") {
                Some(short) => short.to_string(),
                None => m.name,
            })
            .filter(|name| self.spec().keeps_discovered(name))
            .collect())
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> ProviderName {
        ProviderName::Gemini
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
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(provider = "Gemini", error = %e.without_url(), "Key validation failed");
                false
            }
        }
    }

    async fn discover_models(&self) -> Vec<String> {
        match self.list_models().await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => self.spec().default_model_list(),
            Err(e) => {
                warn!(provider = "Gemini", error = %e, "Model discovery failed, using defaults");
                self.spec().default_model_list()
            }
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        params: &GenerationParams,
    ) -> GenerationOutcome {
        let resolved_model = normalize_model(self.spec(), model, &self.models.get());
        debug!(provider = "Gemini", model = %resolved_model, "Calling vendor");

        let body = GenerateContentRequest {
            contents: [Content {
                parts: [TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                top_k: params.top_k,
                max_output_tokens: params.max_tokens,
            },
        };

        let started = Instant::now();
        let response = match self
            .client
            .post(self.generate_url(&resolved_model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let failure = http_util::exception(e, started);
                error!(provider = "Gemini", error = %failure.error, "HTTP request failed");
                return GenerationOutcome::Failure(failure);
            }
        };

        if !response.status().is_success() {
            let failure = http_util::api_error(response, started).await;
            error!(provider = "Gemini", status = ?failure.status, "API error");
            return GenerationOutcome::Failure(failure);
        }

        let remaining = http_util::rate_limit_remaining(response.headers());

        let text = match response.json::<GenerateContentResponse>().await {
            Ok(parsed) => parsed.into_text(),
            Err(e) => {
                let failure = http_util::exception(e, started).with_rate_limit(remaining);
                error!(provider = "Gemini", error = %failure.error, "Failed to parse response");
                return GenerationOutcome::Failure(failure);
            }
        };

        match text {
            Some(text) => GenerationOutcome::Success(GenerationSuccess {
                text,
                model_used: resolved_model,
                provider_used: ProviderName::Gemini,
                latency: started.elapsed(),
                rate_limit_remaining: remaining,
            }),
            None => GenerationOutcome::Failure(
                GenerationFailure::new(
                    "Exception: response contained no candidates",
                    started.elapsed(),
                )
                .with_rate_limit(remaining),
            ),
        }
    }
}
