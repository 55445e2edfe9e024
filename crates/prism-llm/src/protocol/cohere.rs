//! Cohere v2 chat API wire format types

use serde::{Deserialize, Serialize};

use crate::types::ToolCall;

// -- Request types --

/// Cohere v2 chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages (system messages stay inline)
    pub messages: Vec<CohereMessage>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold (Cohere calls it `p`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Tool definitions (OpenAI-shaped in v2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,
}

/// Cohere v2 message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereMessage {
    /// Role: "system", "user", "assistant", or "tool"
    pub role: String,
    /// Text content
    pub content: String,
}

// -- Response types --

/// Cohere v2 chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereResponse {
    /// Response identifier
    pub id: String,
    /// Assistant message
    pub message: CohereResponseMessage,
    /// Why generation stopped ("COMPLETE", "MAX_TOKENS", "TOOL_CALL", ...)
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Token usage
    #[serde(default)]
    pub usage: Option<CohereUsage>,
}

/// Assistant message in a Cohere response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereResponseMessage {
    /// Role (always "assistant")
    pub role: String,
    /// Content blocks
    #[serde(default)]
    pub content: Vec<CohereContentBlock>,
    /// Tool calls requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Content block in a Cohere response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CohereContentBlock {
    /// Text content
    Text {
        /// The text string
        text: String,
    },
}

/// Cohere token usage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CohereUsage {
    /// Billed token counts
    #[serde(default)]
    pub billed_units: CohereBilledUnits,
}

/// Billed token counts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CohereBilledUnits {
    /// Input tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Output tokens
    #[serde(default)]
    pub output_tokens: u32,
}

// -- Streaming types --

/// Cohere v2 SSE event
///
/// Unknown event types deserialize to `Other` and are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CohereStreamEvent {
    /// Stream started
    MessageStart {
        /// Response identifier
        #[serde(default)]
        id: Option<String>,
    },
    /// Incremental content
    ContentDelta {
        /// Delta payload
        delta: CohereStreamDelta,
    },
    /// Message finished; carries finish reason and usage
    MessageEnd {
        /// Final delta payload
        #[serde(default)]
        delta: Option<CohereEndDelta>,
    },
    /// Any other event type (content-start, tool-plan-delta, ...)
    #[serde(other)]
    Other,
}

/// Delta payload of a `content-delta` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereStreamDelta {
    /// Partial message
    pub message: CohereStreamMessage,
}

/// Partial message inside a stream delta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereStreamMessage {
    /// Partial content
    pub content: CohereStreamContent,
}

/// Partial content inside a stream delta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereStreamContent {
    /// Text fragment
    #[serde(default)]
    pub text: String,
}

/// Delta payload of a `message-end` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereEndDelta {
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Final usage
    #[serde(default)]
    pub usage: Option<CohereUsage>,
}

// -- Models list --

/// Cohere models list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereModelList {
    /// Available models
    #[serde(default)]
    pub models: Vec<CohereModel>,
}

/// Cohere model entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereModel {
    /// Model name
    pub name: String,
    /// Endpoints the model supports
    #[serde(default)]
    pub endpoints: Vec<String>,
}

// -- Embeddings --

/// Cohere v2 embed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereEmbedRequest {
    /// Model identifier
    pub model: String,
    /// Input texts
    pub texts: Vec<String>,
    /// Input type hint
    pub input_type: String,
    /// Requested vector encodings
    pub embedding_types: Vec<String>,
}

/// Cohere v2 embed response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereEmbedResponse {
    /// Response identifier
    pub id: String,
    /// Vectors keyed by encoding
    pub embeddings: CohereEmbeddings,
    /// Billing metadata
    #[serde(default)]
    pub meta: Option<CohereMeta>,
}

/// Embedding vectors keyed by encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereEmbeddings {
    /// Float-encoded vectors, one per input
    #[serde(default)]
    pub float: Vec<Vec<f32>>,
}

/// Response metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereMeta {
    /// Billed token counts
    #[serde(default)]
    pub billed_units: Option<CohereBilledUnits>,
}
