//! Fallback handler: walks a plan until one vendor succeeds.
//!
//! For each vendor in plan order the handler makes up to `max_retries`
//! attempts. A rate-limit signature or a slow attempt moves straight on to
//! the next vendor; other failures are retried in place. Every attempt is
//! counted and its error kept, so an exhausted walk reports exactly what
//! happened.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use llmrelay_core::config::FallbackConfig;
use llmrelay_core::error::RelayError;
use llmrelay_core::types::{GenerationFailure, GenerationOutcome, GenerationRequest, GenerationSuccess};
use llmrelay_providers::{ProviderHandle, ProviderRegistry};

use crate::plan::FallbackPlan;

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct FallbackSettings {
    /// When false, only the first attempted vendor is used.
    pub enabled: bool,
    /// Attempts per vendor. Values below 1 are treated as 1.
    pub max_retries: u32,
    /// Attempt latency at or above this moves on to the next vendor.
    pub timeout_threshold: Duration,
    /// Hard deadline for a single vendor call.
    pub attempt_timeout: Duration,
    /// Vendors whose remaining-calls hint is below this are skipped.
    ///
    /// Only an attempt refreshes the hint, so a skipped vendor stays skipped
    /// for the life of the process.
    pub rate_limit_low_water: u64,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self::from(&FallbackConfig::default())
    }
}

impl From<&FallbackConfig> for FallbackSettings {
    fn from(config: &FallbackConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_retries: config.max_retries,
            timeout_threshold: config.timeout_threshold(),
            attempt_timeout: config.attempt_timeout(),
            rate_limit_low_water: config.rate_limit_low_water,
        }
    }
}

// ─────────────────────────────────────────────
// RelayOutcome
// ─────────────────────────────────────────────

/// Result of walking a plan.
#[derive(Debug)]
pub struct RelayOutcome {
    pub result: Result<GenerationSuccess, RelayError>,
    /// Vendor calls made, across all vendors.
    pub attempts: u32,
    /// More than one attempt was needed.
    pub fallback_used: bool,
}

impl RelayOutcome {
    fn new(result: Result<GenerationSuccess, RelayError>, attempts: u32) -> Self {
        Self {
            result,
            attempts,
            fallback_used: attempts > 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Per-attempt errors (`"<vendor>: <error>"`) of an exhausted walk.
    pub fn details(&self) -> &[String] {
        match &self.result {
            Err(e) => e.details(),
            Ok(_) => &[],
        }
    }
}

// ─────────────────────────────────────────────
// FallbackHandler
// ─────────────────────────────────────────────

pub struct FallbackHandler {
    registry: Arc<ProviderRegistry>,
    settings: FallbackSettings,
}

enum Attempt {
    Done(GenerationOutcome),
    Cancelled,
}

impl FallbackHandler {
    pub fn new(registry: Arc<ProviderRegistry>, mut settings: FallbackSettings) -> Self {
        settings.max_retries = settings.max_retries.max(1);
        Self { registry, settings }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &FallbackSettings {
        &self.settings
    }

    /// Walk `plan` until a vendor succeeds or the plan is exhausted.
    pub async fn process_request(&self, request: &GenerationRequest, plan: &FallbackPlan) -> RelayOutcome {
        self.process_request_cancellable(request, plan, &CancellationToken::new())
            .await
    }

    /// Like [`process_request`](Self::process_request), but aborts the
    /// in-flight vendor call as soon as `cancel` fires.
    pub async fn process_request_cancellable(
        &self,
        request: &GenerationRequest,
        plan: &FallbackPlan,
        cancel: &CancellationToken,
    ) -> RelayOutcome {
        let mut attempts: u32 = 0;
        let mut errors: Vec<String> = Vec::new();

        for &name in plan.providers() {
            let Some(handle) = self.registry.get_by_name(name) else {
                warn!(provider = %name, "Provider not registered, skipping");
                continue;
            };

            if let Some(remaining) = handle.rate_limit_remaining() {
                if remaining < self.settings.rate_limit_low_water {
                    warn!(provider = %name, remaining, "Provider near its rate limit, skipping");
                    continue;
                }
            }

            for attempt in 1..=self.settings.max_retries {
                if cancel.is_cancelled() {
                    return RelayOutcome::new(Err(RelayError::Cancelled), attempts);
                }

                attempts += 1;
                info!(provider = %name, attempt, "Trying provider");

                let started = Instant::now();
                let outcome = match self.attempt(&handle, request, cancel, started).await {
                    Attempt::Done(outcome) => outcome,
                    Attempt::Cancelled => {
                        info!(provider = %name, attempts, "Request cancelled");
                        return RelayOutcome::new(Err(RelayError::Cancelled), attempts);
                    }
                };

                let mut failure = match outcome {
                    GenerationOutcome::Success(success) => {
                        info!(
                            provider = %name,
                            model = %success.model_used,
                            attempts,
                            latency_ms = success.latency.as_millis() as u64,
                            "Generation succeeded"
                        );
                        return RelayOutcome::new(Ok(success), attempts);
                    }
                    GenerationOutcome::Failure(failure) => failure,
                };

                failure.latency = failure.latency.max(started.elapsed());
                errors.push(format!("{name}: {}", failure.error));

                let classified = failure.classify(name, self.settings.timeout_threshold);
                warn!(provider = %name, attempt, error = %classified, "Attempt failed");

                if classified.is_fallover_trigger() {
                    debug!(provider = %name, "Moving on to next provider");
                    break;
                }
            }

            if !self.settings.enabled {
                debug!("Fallback disabled, not trying further providers");
                break;
            }
        }

        warn!(attempts, "All providers failed");
        RelayOutcome::new(Err(RelayError::AllProvidersExhausted { details: errors }), attempts)
    }

    /// One vendor call, raced against cancellation.
    ///
    /// An aborted call is still recorded against the handle.
    async fn attempt(
        &self,
        handle: &ProviderHandle,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Attempt {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                handle.metrics().record(&GenerationOutcome::Failure(GenerationFailure::new(
                    "Exception: request cancelled",
                    started.elapsed(),
                )));
                Attempt::Cancelled
            }
            outcome = handle.generate(request, self.settings.attempt_timeout) => Attempt::Done(outcome),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
