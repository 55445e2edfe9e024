//! Canonical request and response types
//!
//! The provider-agnostic schema the gateway exposes to clients. Adapters
//! translate these to and from each backend's native wire format.

mod embedding;
mod message;
mod request;
mod response;
mod tool;

pub use embedding::{EmbedInput, EmbeddingData, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage};
pub use message::{FunctionCall, Message, Role, ToolCall};
pub use request::CompletionRequest;
pub use response::{
    Choice, ChoiceDelta, ChoiceMessage, CompletionResponse, FinishReason, FunctionCallDelta, ToolCallDelta, Usage,
};
pub use tool::{FunctionDefinition, ToolChoice, ToolChoiceFunction, ToolChoiceFunctionName, ToolChoiceMode, ToolDefinition};
