//! Fallback orchestration for llmrelay.
//!
//! - [`plan::FallbackPlan`]: the ordered list of vendors to try for one request
//! - [`handler::FallbackHandler`]: walks a plan with retries and fallover

pub mod handler;
pub mod plan;

pub use handler::{FallbackHandler, FallbackSettings, RelayOutcome};
pub use plan::FallbackPlan;
