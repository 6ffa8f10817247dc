//! Provider layer for llmrelay.
//!
//! # Architecture
//!
//! - [`traits::Provider`]: the four-method contract every vendor implements
//! - [`vendors`]: static specs for all supported vendors + model normalization
//! - [`gemini::GeminiProvider`]: Google Gemini `generateContent` client
//! - [`openai_compat::OpenAiCompatProvider`]: DeepSeek, Mistral, OpenAI, Groq
//! - [`handle::ProviderHandle`]: a live provider plus its request counters
//! - [`registry::ProviderRegistry`]: name → handle map, built from config

pub mod gemini;
pub mod handle;
mod http_util;
pub mod openai_compat;
pub mod registry;
pub mod traits;
pub mod vendors;

// Re-export main types for convenience
pub use gemini::GeminiProvider;
pub use handle::{MetricsSnapshot, ProviderHandle, ProviderMetrics};
pub use openai_compat::OpenAiCompatProvider;
pub use registry::{build_provider, ProviderRegistry};
pub use traits::{ModelList, Provider};
pub use vendors::{spec_for, VendorSpec, VENDORS};
