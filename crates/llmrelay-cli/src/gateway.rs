//! `llmrelay serve`: HTTP gateway in front of the fallback handler.
//!
//! Startup sequence:
//! 1. Build the provider registry from config (discovering models as needed)
//! 2. Wrap it in a `FallbackHandler`
//! 3. Serve `POST /generate` and `GET /status` until Ctrl+C
//!
//! Every response allows any origin, so browser callers can use the gateway
//! directly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use llmrelay_core::config::Config;
use llmrelay_core::types::{GenerationRequest, ProviderName, ProviderStatus};
use llmrelay_fallback::{FallbackHandler, FallbackPlan, FallbackSettings};

use crate::helpers;

// ─────────────────────────────────────────────
// State + wire types
// ─────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    handler: Arc<FallbackHandler>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl AppState {
    pub fn new(handler: Arc<FallbackHandler>) -> Self {
        Self {
            handler,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    text: String,
    model: String,
    provider: ProviderName,
    /// Seconds.
    latency: f64,
    fallback_used: bool,
    attempts: u32,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
}

impl ErrorBody {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Vec::new(),
            attempts: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: &'static str,
    /// Seconds since startup.
    uptime: f64,
    started_at: DateTime<Utc>,
    providers: BTreeMap<ProviderName, ProviderStatus>,
}

// ─────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/status", get(status))
        .layer(middleware::from_fn(allow_any_origin))
        .with_state(state)
}

/// Allow-all CORS. Preflight requests are answered here.
async fn allow_any_origin(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    response
}

async fn generate(State(state): State<AppState>, Json(request): Json<GenerationRequest>) -> Response {
    let registry = state.handler.registry();
    if registry.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody::message("No providers available")),
        )
            .into_response();
    }

    let plan = match FallbackPlan::for_request(&request, &registry.names()) {
        Ok(plan) => plan,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorBody::message(e.to_string()))).into_response();
        }
    };

    let outcome = state.handler.process_request(&request, &plan).await;
    match outcome.result {
        Ok(success) => Json(GenerateResponse {
            text: success.text,
            model: success.model_used,
            provider: success.provider_used,
            latency: success.latency.as_secs_f64(),
            fallback_used: outcome.fallback_used,
            attempts: outcome.attempts,
        })
        .into_response(),
        Err(e) => {
            let body = ErrorBody {
                error: e.to_string(),
                details: e.details().to_vec(),
                attempts: Some(outcome.attempts),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        uptime: state.started.elapsed().as_secs_f64(),
        started_at: state.started_at,
        providers: state.handler.registry().status_of_all(),
    })
}

// ─────────────────────────────────────────────
// Command
// ─────────────────────────────────────────────

/// Run the gateway until Ctrl+C.
pub async fn run(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let registry = crate::build_registry(&config).await;
    let providers = registry.names();
    let handler = Arc::new(FallbackHandler::new(
        registry,
        FallbackSettings::from(&config.fallback),
    ));

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    helpers::print_banner("Gateway");
    println!("  Listening: http://{addr}");
    if providers.is_empty() {
        println!(
            "  {}",
            "⚠  No providers registered. /generate will answer 503.".yellow()
        );
        println!("     Add one with `llmrelay providers add <name> --key <KEY>`");
    } else {
        let order: Vec<&str> = providers.iter().map(|p| p.as_str()).collect();
        println!("  Fallback:  {}", order.join(" → "));
    }
    println!();
    println!("  Ctrl+C to stop");
    println!();

    info!(%addr, providers = providers.len(), "gateway listening");

    axum::serve(listener, build_router(AppState::new(handler)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server error")?;

    println!("  Gateway stopped. Goodbye!");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    println!();
    println!("  Shutting down...");
    info!("received Ctrl+C, shutting down");
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use llmrelay_core::types::{
        GenerationFailure, GenerationOutcome, GenerationParams, GenerationSuccess,
    };
    use llmrelay_providers::{ModelList, Provider, ProviderRegistry};
    use std::time::Duration;

    /// Always succeeds or always fails with a 500.
    struct Fixed {
        name: ProviderName,
        ok: bool,
        models: ModelList,
    }

    #[async_trait]
    impl Provider for Fixed {
        fn name(&self) -> ProviderName {
            self.name
        }
        fn models(&self) -> Vec<String> {
            self.models.get()
        }
        fn set_models(&self, models: Vec<String>) {
            self.models.set(models);
        }
        async fn validate_key(&self) -> bool {
            true
        }
        async fn discover_models(&self) -> Vec<String> {
            Vec::new()
        }
        async fn generate(&self, prompt: &str, _: &str, params: &GenerationParams) -> GenerationOutcome {
            if self.ok {
                GenerationOutcome::Success(GenerationSuccess {
                    text: format!("{prompt} ({} tokens max)", params.max_tokens),
                    model_used: format!("{}-model", self.name),
                    provider_used: self.name,
                    latency: Duration::from_millis(250),
                    rate_limit_remaining: Some(50),
                })
            } else {
                GenerationOutcome::Failure(
                    GenerationFailure::new("API Error: 500", Duration::from_millis(5)).with_status(500),
                )
            }
        }
    }

    async fn spawn_gateway(providers: &[(ProviderName, bool)]) -> String {
        let registry = Arc::new(ProviderRegistry::new());
        for &(name, ok) in providers {
            let provider = Arc::new(Fixed {
                name,
                ok,
                models: ModelList::default(),
            });
            registry.register(provider, "test-key-0000", Some(vec![])).await;
        }
        let handler = Arc::new(FallbackHandler::new(registry, FallbackSettings::default()));
        let app = build_router(AppState::new(handler));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn post_generate(base: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
        let resp = reqwest::Client::new()
            .post(format!("{base}/generate"))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_generate_success() {
        let base = spawn_gateway(&[(ProviderName::Gemini, true)]).await;
        let (status, body) = post_generate(&base, serde_json::json!({ "prompt": "Hi" })).await;

        assert_eq!(status, 200);
        assert_eq!(body["text"], "Hi (1024 tokens max)");
        assert_eq!(body["model"], "gemini-model");
        assert_eq!(body["provider"], "gemini");
        assert_eq!(body["attempts"], 1);
        assert_eq!(body["fallbackUsed"], false);
        assert!((body["latency"].as_f64().unwrap() - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_generate_accepts_snake_case_params() {
        let base = spawn_gateway(&[(ProviderName::Groq, true)]).await;
        let (status, body) =
            post_generate(&base, serde_json::json!({ "prompt": "Hi", "max_tokens": 64 })).await;
        assert_eq!(status, 200);
        assert_eq!(body["text"], "Hi (64 tokens max)");
    }

    #[tokio::test]
    async fn test_generate_falls_back() {
        let base = spawn_gateway(&[(ProviderName::Gemini, false), (ProviderName::DeepSeek, true)]).await;
        let (status, body) = post_generate(&base, serde_json::json!({ "prompt": "Hi" })).await;

        assert_eq!(status, 200);
        assert_eq!(body["provider"], "deepseek");
        assert_eq!(body["attempts"], 3);
        assert_eq!(body["fallbackUsed"], true);
    }

    #[tokio::test]
    async fn test_preferred_provider_goes_first() {
        let base = spawn_gateway(&[(ProviderName::Gemini, true), (ProviderName::DeepSeek, true)]).await;
        let (status, body) =
            post_generate(&base, serde_json::json!({ "prompt": "Hi", "provider": "DeepSeek" })).await;
        assert_eq!(status, 200);
        assert_eq!(body["provider"], "deepseek");
        assert_eq!(body["attempts"], 1);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_bad_request() {
        let base = spawn_gateway(&[(ProviderName::Gemini, true)]).await;
        let (status, body) =
            post_generate(&base, serde_json::json!({ "prompt": "Hi", "provider": "claude" })).await;
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().contains("claude"));
    }

    #[tokio::test]
    async fn test_no_providers_is_unavailable() {
        let base = spawn_gateway(&[]).await;
        let (status, body) = post_generate(&base, serde_json::json!({ "prompt": "Hi" })).await;
        assert_eq!(status, 503);
        assert_eq!(body["error"], "No providers available");
    }

    #[tokio::test]
    async fn test_exhaustion_reports_details() {
        let base = spawn_gateway(&[(ProviderName::Gemini, false), (ProviderName::Mistral, false)]).await;
        let (status, body) = post_generate(&base, serde_json::json!({ "prompt": "Hi" })).await;

        assert_eq!(status, 500);
        assert_eq!(body["error"], "All providers failed");
        assert_eq!(body["attempts"], 4);
        let details = body["details"].as_array().unwrap();
        assert_eq!(details.len(), 4);
        assert_eq!(details[0], "gemini: API Error: 500");
        assert_eq!(details[2], "mistral: API Error: 500");
    }

    #[tokio::test]
    async fn test_preflight_allows_any_origin() {
        let base = spawn_gateway(&[(ProviderName::Gemini, true)]).await;
        let resp = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{base}/generate"))
            .header("Origin", "http://example.test")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status().as_u16(), 204);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert!(resp.headers()["access-control-allow-methods"]
            .to_str()
            .unwrap()
            .contains("POST"));
    }

    #[tokio::test]
    async fn test_responses_carry_cors_header() {
        let base = spawn_gateway(&[]).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/generate"))
            .header("Origin", "http://example.test")
            .json(&serde_json::json!({ "prompt": "Hi" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status().as_u16(), 503);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let base = spawn_gateway(&[(ProviderName::Gemini, true), (ProviderName::Groq, false)]).await;
        post_generate(&base, serde_json::json!({ "prompt": "Hi" })).await;

        let body: serde_json::Value = reqwest::get(format!("{base}/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "ok");
        assert!(body["uptime"].as_f64().unwrap() >= 0.0);
        assert!(body["startedAt"].is_string());
        assert_eq!(body["providers"]["gemini"]["requestCount"], 1);
        assert_eq!(body["providers"]["gemini"]["successRate"], 1.0);
        assert_eq!(body["providers"]["gemini"]["rateLimitRemaining"], 50);
        assert_eq!(body["providers"]["groq"]["requestCount"], 0);
    }
}
