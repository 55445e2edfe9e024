//! Shared primitives for the Prism gateway
//!
//! Request context, the HTTP error contract, and the collaborator
//! interfaces (alerts, persistence, content filtering) consumed by the
//! gateway core and supplied by the transport/persistence layers.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod context;
pub mod error;
pub mod sink;

pub use context::RequestContext;
pub use error::HttpError;
pub use sink::{
    AlertKind, AlertSink, ContentFilter, ContentVerdict, HealthRecord, NullAlertSink, NullPersistenceSink,
    PersistenceSink, TokenUsageRecord, TracingAlertSink,
};
