//! Provider handles: a live adapter plus its request counters.
//!
//! Counters live behind a per-handle `Mutex`, so concurrent requests that hit
//! different vendors never contend, and `requests >= failures` holds at every
//! observation.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use llmrelay_core::credentials::mask_api_key;
use llmrelay_core::types::{
    success_rate, GenerationFailure, GenerationOutcome, GenerationRequest, ProviderName,
    ProviderStatus,
};

use crate::traits::Provider;

// ─────────────────────────────────────────────
// ProviderMetrics
// ─────────────────────────────────────────────

/// Point-in-time copy of a handle's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub failures: u64,
    pub rate_limit_remaining: Option<u64>,
}

/// Request counters and the latest rate-limit hint for one provider.
#[derive(Debug, Default)]
pub struct ProviderMetrics {
    inner: Mutex<MetricsSnapshot>,
}

impl ProviderMetrics {
    /// Record one finished attempt.
    ///
    /// The rate-limit hint is only replaced when the outcome carries one.
    pub fn record(&self, outcome: &GenerationOutcome) {
        let mut m = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        m.requests += 1;
        if !outcome.is_success() {
            m.failures += 1;
        }
        if let Some(remaining) = outcome.rate_limit_remaining() {
            m.rate_limit_remaining = Some(remaining);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn rate_limit_remaining(&self) -> Option<u64> {
        self.snapshot().rate_limit_remaining
    }
}

// ─────────────────────────────────────────────
// ProviderHandle
// ─────────────────────────────────────────────

/// One configured vendor, shared by the registry and in-flight requests.
pub struct ProviderHandle {
    provider: Arc<dyn Provider>,
    credential: String,
    metrics: ProviderMetrics,
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("name", &self.name())
            .field("credential", &mask_api_key(&self.credential))
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

impl ProviderHandle {
    pub fn new(provider: Arc<dyn Provider>, credential: &str) -> Self {
        Self {
            provider,
            credential: credential.to_string(),
            metrics: ProviderMetrics::default(),
        }
    }

    pub fn name(&self) -> ProviderName {
        self.provider.name()
    }

    /// Credential in display-safe form.
    pub fn masked_credential(&self) -> String {
        mask_api_key(&self.credential)
    }

    pub fn models(&self) -> Vec<String> {
        self.provider.models()
    }

    pub fn metrics(&self) -> &ProviderMetrics {
        &self.metrics
    }

    /// Latest remaining-calls hint, if any response has carried one.
    pub fn rate_limit_remaining(&self) -> Option<u64> {
        self.metrics.rate_limit_remaining()
    }

    /// Run one attempt under a hard deadline and record it.
    ///
    /// A call that outlives `deadline` is abandoned and reported as a failure
    /// whose latency equals the deadline.
    pub async fn generate(&self, request: &GenerationRequest, deadline: Duration) -> GenerationOutcome {
        let started = Instant::now();
        let call = self
            .provider
            .generate(&request.prompt, &request.model, &request.params);

        let outcome = match tokio::time::timeout(deadline, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(provider = %self.name(), ?deadline, "Vendor call hit the deadline");
                GenerationOutcome::Failure(GenerationFailure::new(
                    format!("Exception: request timed out after {}s", deadline.as_secs_f64()),
                    started.elapsed().max(deadline),
                ))
            }
        };

        self.metrics.record(&outcome);
        outcome
    }

    /// Read-only view of the counters.
    pub fn status(&self) -> ProviderStatus {
        let m = self.metrics.snapshot();
        ProviderStatus {
            name: self.name(),
            models: self.models(),
            request_count: m.requests,
            failure_count: m.failures,
            success_rate: success_rate(m.requests, m.failures),
            rate_limit_remaining: m.rate_limit_remaining,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ModelList;
    use async_trait::async_trait;
    use llmrelay_core::types::{GenerationParams, GenerationSuccess};

    /// Succeeds or fails on alternate calls; optionally sleeps first.
    struct FlipFlop {
        calls: Mutex<u32>,
        delay: Duration,
        models: ModelList,
    }

    impl FlipFlop {
        fn new(delay: Duration) -> Self {
            Self {
                calls: Mutex::new(0),
                delay,
                models: ModelList::new(vec!["deepseek-chat".into()]),
            }
        }
    }

    #[async_trait]
    impl Provider for FlipFlop {
        fn name(&self) -> ProviderName {
            ProviderName::DeepSeek
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
            vec!["deepseek-chat".into(), "deepseek-coder".into()]
        }
        async fn generate(&self, _: &str, model: &str, _: &GenerationParams) -> GenerationOutcome {
            tokio::time::sleep(self.delay).await;
            let n = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if n % 2 == 1 {
                GenerationOutcome::Success(GenerationSuccess {
                    text: "ok".into(),
                    model_used: model.into(),
                    provider_used: ProviderName::DeepSeek,
                    latency: self.delay,
                    rate_limit_remaining: Some(100 - n as u64),
                })
            } else {
                GenerationOutcome::Failure(GenerationFailure::new("API Error: 500", self.delay).with_status(500))
            }
        }
    }

    fn handle(delay: Duration) -> ProviderHandle {
        ProviderHandle::new(Arc::new(FlipFlop::new(delay)), "sk-0123456789abcdef")
    }

    #[tokio::test]
    async fn test_counters_track_outcomes() {
        let h = handle(Duration::ZERO);
        let req = GenerationRequest::new("hi");

        assert!(h.generate(&req, Duration::from_secs(1)).await.is_success());
        assert!(!h.generate(&req, Duration::from_secs(1)).await.is_success());
        assert!(h.generate(&req, Duration::from_secs(1)).await.is_success());

        let status = h.status();
        assert_eq!(status.request_count, 3);
        assert_eq!(status.failure_count, 1);
        assert!((status.success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rate_limit_hint_kept_when_absent() {
        let h = handle(Duration::ZERO);
        let req = GenerationRequest::new("hi");

        h.generate(&req, Duration::from_secs(1)).await; // success, hint 99
        assert_eq!(h.rate_limit_remaining(), Some(99));
        h.generate(&req, Duration::from_secs(1)).await; // failure, no hint
        assert_eq!(h.rate_limit_remaining(), Some(99));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_abandons_call() {
        let h = handle(Duration::from_secs(60));
        let req = GenerationRequest::new("hi");

        let outcome = h.generate(&req, Duration::from_secs(5)).await;
        let GenerationOutcome::Failure(f) = outcome else {
            panic!("expected failure");
        };
        assert!(f.error.contains("timed out"));
        assert!(f.latency >= Duration::from_secs(5));
        assert_eq!(h.status().failure_count, 1);
    }

    #[test]
    fn test_status_before_any_request() {
        let h = handle(Duration::ZERO);
        let status = h.status();
        assert_eq!(status.name, ProviderName::DeepSeek);
        assert_eq!(status.models, vec!["deepseek-chat"]);
        assert_eq!(status.request_count, 0);
        assert_eq!(status.success_rate, 0.0);
        assert_eq!(status.rate_limit_remaining, None);
    }

    #[tokio::test]
    async fn test_status_is_a_pure_read() {
        let h = handle(Duration::ZERO);
        h.generate(&GenerationRequest::new("hi"), Duration::from_secs(1)).await;
        assert_eq!(h.status(), h.status());
        assert_eq!(h.status().request_count, 1);
    }

    #[test]
    fn test_debug_masks_credential() {
        let h = handle(Duration::ZERO);
        let debug = format!("{h:?}");
        assert!(debug.contains("sk-0...cdef"));
        assert!(!debug.contains("sk-0123456789abcdef"));
    }

    #[tokio::test]
    async fn test_concurrent_requests_keep_invariant() {
        let h = Arc::new(handle(Duration::ZERO));
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let h = h.clone();
            tasks.push(tokio::spawn(async move {
                h.generate(&GenerationRequest::new("hi"), Duration::from_secs(1)).await;
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        let m = h.metrics().snapshot();
        assert_eq!(m.requests, 16);
        assert_eq!(m.failures, 8);
    }
}
