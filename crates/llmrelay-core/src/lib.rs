//! Core building blocks shared by every llmrelay crate.
//!
//! - [`types`]: provider names, generation requests/outcomes, status snapshots
//! - [`error`]: the [`RelayError`] taxonomy
//! - [`config`]: JSON config schema, loader, env overrides
//! - [`credentials`]: key masking and vendor key-format checks

pub mod config;
pub mod credentials;
pub mod error;
pub mod types;
pub mod utils;

pub use error::{RelayError, Result};
pub use types::{
    GenerationFailure, GenerationOutcome, GenerationParams, GenerationRequest, GenerationSuccess,
    ProviderName, ProviderStatus,
};
