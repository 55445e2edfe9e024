//! Runtime monitoring for the Prism gateway
//!
//! Two background concerns: per-model performance counters consumed by
//! the latency router and operators, and periodic provider health probing
//! that feeds availability into routing and fallback decisions.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod health;
pub mod performance;

pub use health::{HealthMonitor, HealthProbe, ProbeOutcome, ProviderHealth};
pub use performance::{ModelPerformance, PerformanceMonitor};
