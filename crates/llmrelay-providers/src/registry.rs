//! Provider registry: name → handle map, built from configuration.
//!
//! The registry is the only place adapters are constructed. Lookups never
//! construct; `create*` and `register` never replace an entry's position, so
//! `all_handles()` keeps insertion order.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use llmrelay_core::config::ProviderEntry;
use llmrelay_core::error::{RelayError, Result};
use llmrelay_core::types::{ProviderName, ProviderStatus};

use crate::gemini::GeminiProvider;
use crate::handle::ProviderHandle;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::Provider;
use crate::vendors::{spec_for, WireFormat};

/// Build the adapter for a vendor without registering it.
pub fn build_provider(
    name: ProviderName,
    credential: &str,
    api_base: Option<&str>,
) -> Result<Arc<dyn Provider>> {
    let spec = spec_for(name);
    let provider: Arc<dyn Provider> = match spec.wire {
        WireFormat::Gemini => Arc::new(GeminiProvider::new(credential, api_base)?),
        WireFormat::OpenAiCompatible => {
            Arc::new(OpenAiCompatProvider::new(spec, credential, api_base)?)
        }
    };
    Ok(provider)
}

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    handles: RwLock<Vec<Arc<ProviderHandle>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a provider by name and register it.
    ///
    /// `name` is matched case-insensitively. When `models` is `None` the
    /// vendor is queried immediately for its model list.
    pub async fn create(
        &self,
        name: &str,
        credential: &str,
        models: Option<Vec<String>>,
    ) -> Result<Arc<ProviderHandle>> {
        let name: ProviderName = name.parse()?;
        let provider = build_provider(name, credential, None)?;
        Ok(self.register(provider, credential, models).await)
    }

    /// Construct and register a provider from its config entry.
    pub async fn create_from_config(&self, entry: &ProviderEntry) -> Result<Arc<ProviderHandle>> {
        if !entry.is_configured() {
            return Err(RelayError::Config(format!("{} has no API key", entry.name)));
        }
        let provider = build_provider(entry.name, &entry.api_key, entry.api_base.as_deref())?;
        Ok(self.register(provider, &entry.api_key, entry.known_models()).await)
    }

    /// Register an already-built provider.
    ///
    /// Re-registering a name replaces the old handle in place (counters reset).
    pub async fn register(
        &self,
        provider: Arc<dyn Provider>,
        credential: &str,
        models: Option<Vec<String>>,
    ) -> Arc<ProviderHandle> {
        let models = match models {
            Some(models) => models,
            None => {
                debug!(provider = %provider.name(), "No models configured, discovering");
                provider.discover_models().await
            }
        };
        provider.set_models(models);

        let handle = Arc::new(ProviderHandle::new(provider, credential));
        let name = handle.name();

        let mut handles = self.handles.write().unwrap_or_else(|e| e.into_inner());
        match handles.iter_mut().find(|h| h.name() == name) {
            Some(slot) => *slot = handle.clone(),
            None => handles.push(handle.clone()),
        }

        info!(
            provider = %name,
            models = handle.models().len(),
            credential = %handle.masked_credential(),
            "Provider registered"
        );
        handle
    }

    /// Case-insensitive lookup. Unknown or unregistered names yield `None`.
    pub fn get(&self, name: &str) -> Option<Arc<ProviderHandle>> {
        let name: ProviderName = name.parse().ok()?;
        self.get_by_name(name)
    }

    pub fn get_by_name(&self, name: ProviderName) -> Option<Arc<ProviderHandle>> {
        self.handles
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|h| h.name() == name)
            .cloned()
    }

    /// Every registered handle, in insertion order.
    pub fn all_handles(&self) -> Vec<Arc<ProviderHandle>> {
        self.handles.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Registered provider names, in insertion order.
    pub fn names(&self) -> Vec<ProviderName> {
        self.all_handles().iter().map(|h| h.name()).collect()
    }

    pub fn status_of_all(&self) -> BTreeMap<ProviderName, ProviderStatus> {
        self.all_handles()
            .iter()
            .map(|h| (h.name(), h.status()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handles.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
