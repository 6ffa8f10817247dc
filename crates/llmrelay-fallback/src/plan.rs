//! Fallback plans: which vendors to try, in which order.

use llmrelay_core::error::Result;
use llmrelay_core::types::{GenerationRequest, ProviderName};

/// Ordered, duplicate-free list of vendors to try for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FallbackPlan {
    order: Vec<ProviderName>,
}

impl FallbackPlan {
    /// Preferred vendor first (if any), then `default_order` minus duplicates.
    ///
    /// A blank preference counts as none; an unrecognised one is an
    /// [`UnknownProvider`](llmrelay_core::RelayError::UnknownProvider) error.
    pub fn new(preferred: Option<&str>, default_order: &[ProviderName]) -> Result<Self> {
        let preferred = match preferred.map(str::trim).filter(|p| !p.is_empty()) {
            Some(name) => Some(name.parse::<ProviderName>()?),
            None => None,
        };
        Ok(Self::from_order(preferred.into_iter().chain(default_order.iter().copied())))
    }

    /// Plan for a request, honouring its `provider` preference.
    pub fn for_request(request: &GenerationRequest, default_order: &[ProviderName]) -> Result<Self> {
        Self::new(request.provider.as_deref(), default_order)
    }

    /// Build a plan from an explicit order, keeping the first occurrence of each name.
    pub fn from_order(names: impl IntoIterator<Item = ProviderName>) -> Self {
        let mut order = Vec::new();
        for name in names {
            if !order.contains(&name) {
                order.push(name);
            }
        }
        Self { order }
    }

    pub fn providers(&self) -> &[ProviderName] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
