use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

/// Header carrying the request correlation id
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Runtime context threaded through every gateway operation
///
/// Carries the correlation id for logging, an optional client-supplied
/// API key that overrides the configured provider key, and the
/// cancellation token that terminates in-flight upstream calls.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id read from the request or generated at ingress
    pub correlation_id: String,
    /// Client-forwarded API key, if the provider allows forwarding
    pub api_key: Option<SecretString>,
    /// Cancellation signal; cancelling aborts upstream calls and streams
    pub cancel: CancellationToken,
    /// End-user identifier from the request body, for per-user routing
    pub user: Option<String>,
}

impl RequestContext {
    /// Create a context with a fresh correlation id
    pub fn new() -> Self {
        Self {
            correlation_id: uuid::Uuid::new_v4().to_string(),
            api_key: None,
            cancel: CancellationToken::new(),
            user: None,
        }
    }

    /// Create a context with an explicit correlation id
    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            ..Self::new()
        }
    }

    /// Whether the request has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
