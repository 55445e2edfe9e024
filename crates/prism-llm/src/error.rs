use http::StatusCode;
use prism_core::HttpError;
use thiserror::Error;

/// Errors that can occur while processing a gateway request
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request violates the canonical schema
    #[error("invalid request: {0}")]
    Validation(String),

    /// Requested model is unknown to the registry and every mapping
    #[error("model not found: {model}")]
    ModelNotFound {
        /// The model id that failed to resolve
        model: String,
    },

    /// Named provider does not exist in configuration
    #[error("provider not found: {provider}")]
    ProviderNotFound {
        /// The missing provider name
        provider: String,
    },

    /// Upstream returned 404 for something other than a model
    #[error("not found: {0}")]
    NotFound(String),

    /// Upstream rejected the gateway's credentials
    #[error("provider '{provider}' rejected credentials")]
    ProviderAuthentication {
        /// Provider that rejected the request
        provider: String,
    },

    /// Upstream quota exhausted
    #[error("provider '{provider}' rate limit exceeded")]
    RateLimitExceeded {
        /// Provider that throttled the request
        provider: String,
        /// Seconds until the limit resets, when reported
        retry_after: Option<u64>,
    },

    /// Network failure, timeout, or upstream 5xx
    #[error("provider '{provider}' unavailable: {message}")]
    ProviderUnavailable {
        /// Provider that could not be reached
        provider: String,
        /// Failure description
        message: String,
    },

    /// Upstream 4xx not covered by a more specific kind
    #[error("provider '{provider}' error: {message}")]
    Provider {
        /// Provider that returned the error
        provider: String,
        /// Upstream error code, when the backend supplied one
        code: Option<String>,
        /// Upstream error message
        message: String,
    },

    /// The smart router failed to pick a model
    #[error("routing failed: {0}")]
    Routing(String),

    /// Every substitute in the fallback chain failed
    #[error("fallback chain exhausted after {attempts} attempts: {last}")]
    FallbackExhausted {
        /// Total attempts made, including the primary
        attempts: usize,
        /// The error from the final attempt
        #[source]
        last: Box<GatewayError>,
    },

    /// The selected provider or model cannot perform the operation
    #[error("provider '{provider}' does not support {capability}")]
    CapabilityNotSupported {
        /// Provider that lacks the capability
        provider: String,
        /// Capability name (e.g. "embeddings")
        capability: String,
    },

    /// The content filter collaborator denied the request
    #[error("content filtered: {reason}")]
    ContentFiltered {
        /// Denial reason from the filter
        reason: String,
    },

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    /// Stable snake_case code; also the vocabulary of fallback-rule filters
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ModelNotFound { .. } => "model_not_found",
            Self::ProviderNotFound { .. } => "provider_not_found",
            Self::NotFound(_) => "not_found",
            Self::ProviderAuthentication { .. } => "provider_authentication",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::Provider { .. } => "provider_error",
            Self::Routing(_) => "routing",
            Self::FallbackExhausted { .. } => "fallback_exhausted",
            Self::CapabilityNotSupported { .. } => "capability_not_supported",
            Self::ContentFiltered { .. } => "content_filtered",
            Self::Internal(_) => "internal",
        }
    }

    /// Provider the error originated from, when applicable
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderAuthentication { provider }
            | Self::RateLimitExceeded { provider, .. }
            | Self::ProviderUnavailable { provider, .. }
            | Self::Provider { provider, .. }
            | Self::ProviderNotFound { provider }
            | Self::CapabilityNotSupported { provider, .. } => Some(provider),
            Self::FallbackExhausted { last, .. } => last.provider(),
            _ => None,
        }
    }

    /// Upstream error code, when the backend supplied one
    pub fn provider_error_code(&self) -> Option<&str> {
        match self {
            Self::Provider { code, .. } => code.as_deref(),
            Self::FallbackExhausted { last, .. } => last.provider_error_code(),
            _ => None,
        }
    }
}

impl HttpError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Routing(_) | Self::CapabilityNotSupported { .. } => StatusCode::BAD_REQUEST,
            Self::ModelNotFound { .. } | Self::ProviderNotFound { .. } | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ProviderAuthentication { .. } => StatusCode::UNAUTHORIZED,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ProviderUnavailable { .. } | Self::FallbackExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Provider { .. } => StatusCode::BAD_GATEWAY,
            Self::ContentFiltered { .. } => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &str {
        self.code()
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}

/// Map an upstream HTTP status to a typed error
///
/// `requested_model` scopes a 404 to [`GatewayError::ModelNotFound`];
/// pass `None` for endpoints not addressing a specific model. The body is
/// inspected for the provider's own error code and message.
pub fn map_upstream_status(
    provider: &str,
    status: StatusCode,
    body: &str,
    requested_model: Option<&str>,
) -> GatewayError {
    let (code, message) = extract_provider_error(body);
    let message = message.unwrap_or_else(|| format!("provider returned {status}"));

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        GatewayError::ProviderAuthentication {
            provider: provider.to_owned(),
        }
    } else if status == StatusCode::NOT_FOUND {
        requested_model.map_or_else(
            || GatewayError::NotFound(message.clone()),
            |model| GatewayError::ModelNotFound {
                model: model.to_owned(),
            },
        )
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::RateLimitExceeded {
            provider: provider.to_owned(),
            retry_after: None,
        }
    } else if status.is_server_error() {
        GatewayError::ProviderUnavailable {
            provider: provider.to_owned(),
            message,
        }
    } else {
        GatewayError::Provider {
            provider: provider.to_owned(),
            code,
            message,
        }
    }
}

/// Pull `code` and `message` out of a provider error body, best effort
///
/// Understands the common `{"error": {"message", "code"|"type"}}` shape
/// and a bare `{"message"}` fallback.
fn extract_provider_error(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        let trimmed = body.trim();
        let message = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        return (None, message);
    };

    let error = value.get("error").unwrap_or(&value);
    let code = error
        .get("code")
        .or_else(|| error.get("type"))
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned);
    let message = error.get("message").and_then(|v| v.as_str()).map(ToOwned::to_owned);

    (code, message)
}
