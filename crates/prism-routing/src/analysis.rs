//! Request analysis for routing decisions
//!
//! Routing never sees full canonical requests; the gateway distills each
//! request into a [`RouteQuery`] carrying just the signals the strategies
//! need. Token counts are estimated as `chars / 4` plus a small per-message
//! overhead; callers needing exact accounting post-correct from real usage.

/// Tokens added per message to cover role/framing overhead
const PER_MESSAGE_OVERHEAD: usize = 10;

/// Output tokens assumed when the request does not cap generation
const DEFAULT_OUTPUT_TOKENS: u32 = 1000;

/// Routing-relevant view of a completion request
#[derive(Debug, Clone)]
pub struct RouteQuery {
    /// Requested model id (after alias/user-preference resolution)
    pub model: String,
    /// End-user identifier, when supplied
    pub user: Option<String>,
    /// Number of messages in the conversation
    pub message_count: usize,
    /// Total characters of content across all messages
    pub total_chars: usize,
    /// Concatenated user-message contents, for content classification
    pub user_text: String,
    /// Requested generation cap
    pub max_tokens: Option<u32>,
    /// Requested sampling temperature
    pub temperature: Option<f64>,
}

impl RouteQuery {
    /// Copy of this query targeting a different model id
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }
}

/// Estimate prompt tokens for a query
pub fn estimated_input_tokens(query: &RouteQuery) -> usize {
    query.total_chars / 4 + PER_MESSAGE_OVERHEAD * query.message_count
}

/// Estimate completion tokens for a query
pub fn estimated_output_tokens(query: &RouteQuery) -> u32 {
    query.max_tokens.unwrap_or(DEFAULT_OUTPUT_TOKENS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(chars: usize, messages: usize) -> RouteQuery {
        RouteQuery {
            model: "auto".to_owned(),
            user: None,
            message_count: messages,
            total_chars: chars,
            user_text: String::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    #[test]
    fn input_estimate_is_chars_over_four_plus_overhead() {
        assert_eq!(estimated_input_tokens(&query(400, 1)), 110);
        assert_eq!(estimated_input_tokens(&query(100, 1)), 35);
        assert_eq!(estimated_input_tokens(&query(0, 3)), 30);
    }

    #[test]
    fn output_estimate_defaults_to_one_thousand() {
        let mut q = query(0, 1);
        assert_eq!(estimated_output_tokens(&q), 1000);
        q.max_tokens = Some(200);
        assert_eq!(estimated_output_tokens(&q), 200);
    }
}
