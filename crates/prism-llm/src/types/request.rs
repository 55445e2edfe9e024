use serde::{Deserialize, Serialize};

use super::message::{Message, Role};
use super::tool::{ToolChoice, ToolDefinition};
use crate::error::GatewayError;

/// Canonical completion request
///
/// Invariant: at most one `system` message, and it appears first. The
/// gateway validates this at ingress; adapters for providers with a
/// dedicated system slot rely on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Requested model id (canonical, alias, or mapped name)
    pub model: String,
    /// Conversation messages
    pub messages: Vec<Message>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
    /// Tool definitions available to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// How the model should select tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// End-user identifier, for per-user routing and usage records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl CompletionRequest {
    /// Check the schema invariants the rest of the core relies on
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.model.is_empty() {
            return Err(GatewayError::Validation("model must not be empty".to_owned()));
        }
        if self.messages.is_empty() {
            return Err(GatewayError::Validation("messages must not be empty".to_owned()));
        }

        let system_count = self.messages.iter().filter(|m| m.role == Role::System).count();
        if system_count > 1 {
            return Err(GatewayError::Validation(
                "at most one system message is allowed".to_owned(),
            ));
        }
        if system_count == 1 && self.messages[0].role != Role::System {
            return Err(GatewayError::Validation(
                "the system message must appear first".to_owned(),
            ));
        }

        Ok(())
    }

    /// The single system prompt, when present
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(super::message::Message::content_str)
    }

    /// Total characters of content across all messages
    pub fn total_content_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content_str().len()).sum()
    }

    /// Concatenated user-message contents, newline separated
    pub fn user_text(&self) -> String {
        let mut text = String::new();
        for message in self.messages.iter().filter(|m| m.role == Role::User) {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(message.content_str());
        }
        text
    }

    /// Prompt-token estimate used when a backend reports no usage
    pub fn estimated_prompt_tokens(&self) -> u32 {
        u32::try_from(self.total_content_chars() / 4).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4".to_owned(),
            messages,
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop: None,
            stream: false,
            tools: None,
            tool_choice: None,
            user: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        let req = request(vec![
            Message::text(Role::System, "be brief"),
            Message::text(Role::User, "hi"),
        ]);
        assert!(req.validate().is_ok());
        assert_eq!(req.system_prompt(), Some("be brief"));
    }

    #[test]
    fn empty_messages_fail_validation() {
        assert!(request(vec![]).validate().is_err());
    }

    #[test]
    fn two_system_messages_fail_validation() {
        let req = request(vec![
            Message::text(Role::System, "a"),
            Message::text(Role::System, "b"),
        ]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn misplaced_system_message_fails_validation() {
        let req = request(vec![
            Message::text(Role::User, "hi"),
            Message::text(Role::System, "late"),
        ]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn user_text_concatenates_user_messages_only() {
        let req = request(vec![
            Message::text(Role::System, "sys"),
            Message::text(Role::User, "one"),
            Message::text(Role::Assistant, "reply"),
            Message::text(Role::User, "two"),
        ]);
        assert_eq!(req.user_text(), "one\ntwo");
    }

    #[test]
    fn prompt_token_estimate_is_chars_over_four() {
        let req = request(vec![Message::text(Role::User, "x".repeat(400))]);
        assert_eq!(req.estimated_prompt_tokens(), 100);
    }
}
