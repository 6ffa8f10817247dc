//! Provider trait: the uniform contract every vendor adapter implements.
//!
//! Adapters never return `Err` from a generation call: vendor problems come
//! back as [`GenerationOutcome::Failure`] so the fallback handler can decide
//! whether to retry, move on, or give up.

use std::sync::RwLock;

use async_trait::async_trait;
use llmrelay_core::types::{GenerationOutcome, GenerationParams, ProviderName};

/// Trait that all vendor adapters must implement.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which vendor this adapter talks to.
    fn name(&self) -> ProviderName;

    /// Models this adapter currently knows about (configured or discovered).
    fn models(&self) -> Vec<String>;

    /// Replace the known-model list.
    fn set_models(&self, models: Vec<String>);

    /// Check the credential with a cheap authenticated call.
    ///
    /// Any network error or non-success status counts as invalid.
    async fn validate_key(&self) -> bool;

    /// Fetch the vendor's model catalogue, filtered to the vendor's own family.
    ///
    /// Falls back to the vendor's built-in defaults when the listing fails.
    async fn discover_models(&self) -> Vec<String>;

    /// Send one generation request.
    ///
    /// `model` is normalized against [`Provider::models`] before it is sent;
    /// the outcome reports the identifier actually used.
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        params: &GenerationParams,
    ) -> GenerationOutcome;
}

/// Interior-mutable model list shared by the concrete adapters.
#[derive(Debug, Default)]
pub struct ModelList(RwLock<Vec<String>>);

impl ModelList {
    pub fn new(models: Vec<String>) -> Self {
        Self(RwLock::new(models))
    }

    pub fn get(&self) -> Vec<String> {
        self.0.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, models: Vec<String>) {
        *self.0.write().unwrap_or_else(|e| e.into_inner()) = models;
    }
}
