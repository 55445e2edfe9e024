//! Typed configuration for the Prism gateway
//!
//! Configuration is loaded once from TOML, validated, and handed to the
//! rest of the system as an immutable value. Components hold a reference
//! to the snapshot they were built from; reloads construct a fresh value.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod env;
mod gateway;
mod loader;

pub use gateway::{
    AlertOptions, CapabilityFlags, FallbackOptions, FallbackRule, GatewayConfig, HealthOptions, LogConfig,
    ModelInfoConfig, ModelMapping, PerformanceOptions, ProviderConfig, ProviderType, RegistryOptions, RoutingOptions,
    ServerConfig, StrategyName,
};
