use serde::{Deserialize, Serialize};

/// Embedding input: a single string or an ordered sequence of strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbedInput {
    /// Single text input
    Single(String),
    /// Multiple text inputs
    Multiple(Vec<String>),
}

impl EmbedInput {
    /// Inputs as a positional list of string slices
    pub fn as_vec(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }

    /// Number of input positions
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(v) => v.len(),
        }
    }

    /// Whether there are no inputs
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Multiple(v) if v.is_empty())
    }
}

/// Canonical embedding request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Requested model id
    pub model: String,
    /// Input text(s) to embed
    pub input: EmbedInput,
    /// End-user identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Single embedding entry in the response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    /// Object type (always "embedding")
    pub object: String,
    /// The embedding vector
    pub embedding: Vec<f32>,
    /// Index of this embedding in the request input
    pub index: usize,
}

/// Token usage for an embedding request
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    /// Tokens in the input
    pub prompt_tokens: u32,
    /// Total tokens (same as `prompt_tokens` for embeddings)
    pub total_tokens: u32,
}

/// Canonical embedding response
///
/// Invariant: `data.len()` equals the number of request inputs, with
/// vectors indexed by input position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// Object type (always "list")
    pub object: String,
    /// Embedding vectors, one per input
    pub data: Vec<EmbeddingData>,
    /// Model that generated the embeddings
    pub model: String,
    /// Provider that served the request
    #[serde(default)]
    pub provider: String,
    /// Token usage
    pub usage: EmbeddingUsage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_input_has_one_position() {
        let input = EmbedInput::Single("hello".to_owned());
        assert_eq!(input.len(), 1);
        assert_eq!(input.as_vec(), vec!["hello"]);
        assert!(!input.is_empty());
    }

    #[test]
    fn input_deserializes_from_string_or_array() {
        let single: EmbedInput = serde_json::from_str("\"one\"").unwrap();
        assert_eq!(single.len(), 1);

        let multiple: EmbedInput = serde_json::from_str("[\"one\", \"two\"]").unwrap();
        assert_eq!(multiple.len(), 2);
    }

    #[test]
    fn empty_array_is_empty() {
        let input = EmbedInput::Multiple(vec![]);
        assert!(input.is_empty());
    }
}
