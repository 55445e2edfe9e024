//! Model routing for the Prism gateway
//!
//! Resolves each canonical request to a concrete (provider, model) pair.
//! Six sub-routers implement the available strategies; the smart router
//! orchestrates alias resolution, user overrides, direct mapping, and
//! strategy dispatch. The model registry merges the built-in catalogue,
//! dynamically discovered listings, and administrator overrides.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod analysis;
pub mod catalog;
pub mod registry;
pub mod router;
pub mod strategy;

pub use analysis::{RouteQuery, estimated_input_tokens, estimated_output_tokens};
pub use registry::{ModelInfo, ModelRegistry};
pub use router::{RouterContext, SmartRouter};
pub use strategy::{RouteStrategy, RoutingResult};
