//! Conversion between canonical types and the Cohere v2 wire format

use super::now_secs;
use crate::protocol::cohere::{
    CohereContentBlock, CohereMessage, CohereRequest, CohereResponse, CohereStreamEvent, CohereUsage,
};
use crate::types::{
    Choice, ChoiceDelta, ChoiceMessage, CompletionRequest, CompletionResponse, FinishReason, Message, Role, Usage,
};

impl From<&CompletionRequest> for CohereRequest {
    fn from(req: &CompletionRequest) -> Self {
        let messages = req.messages.iter().map(message_to_cohere).collect();

        let tools = req.tools.as_ref().map(|tools| {
            // Cohere v2 accepts OpenAI-shaped tool definitions
            tools
                .iter()
                .filter_map(|t| serde_json::to_value(t).ok())
                .collect()
        });

        Self {
            model: req.model.clone(),
            messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            p: req.top_p,
            stop_sequences: req.stop.clone(),
            stream: None,
            tools,
        }
    }
}

fn message_to_cohere(msg: &Message) -> CohereMessage {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    CohereMessage {
        role: role.to_owned(),
        content: msg.content_str().to_owned(),
    }
}

/// Map a Cohere finish reason string
fn parse_cohere_finish(reason: &str) -> Option<FinishReason> {
    match reason {
        "COMPLETE" | "STOP_SEQUENCE" => Some(FinishReason::Stop),
        "MAX_TOKENS" => Some(FinishReason::Length),
        "TOOL_CALL" => Some(FinishReason::ToolCalls),
        _ => None,
    }
}

fn usage_from_cohere(usage: CohereUsage) -> Usage {
    Usage::new(usage.billed_units.input_tokens, usage.billed_units.output_tokens)
}

impl From<CohereResponse> for CompletionResponse {
    fn from(resp: CohereResponse) -> Self {
        let text: String = resp
            .message
            .content
            .iter()
            .map(|CohereContentBlock::Text { text }| text.as_str())
            .collect();

        let message = resp.message.tool_calls.map_or_else(
            || ChoiceMessage::text(text.clone()),
            |calls| ChoiceMessage::with_tool_calls((!text.is_empty()).then(|| text.clone()), calls),
        );

        Self {
            id: resp.id,
            object: "chat.completion".to_owned(),
            created: now_secs(),
            model: String::new(),
            provider: String::new(),
            choices: vec![Choice {
                index: 0,
                message: Some(message),
                delta: None,
                finish_reason: resp.finish_reason.as_deref().and_then(parse_cohere_finish),
            }],
            usage: resp.usage.map(usage_from_cohere),
        }
    }
}

/// State for converting a Cohere SSE stream into canonical chunks
pub struct CohereStreamState {
    response_id: String,
    model: String,
    created: u64,
    /// Prompt-token estimate used when the backend reports no usage
    prompt_estimate: u32,
}

impl CohereStreamState {
    /// Create a stream state with a prompt-token fallback estimate
    pub fn new(model: impl Into<String>, prompt_estimate: u32) -> Self {
        Self {
            response_id: String::new(),
            model: model.into(),
            created: now_secs(),
            prompt_estimate,
        }
    }

    /// Convert one Cohere event into zero or one canonical chunk
    pub fn convert_event(&mut self, event: CohereStreamEvent) -> Option<CompletionResponse> {
        match event {
            CohereStreamEvent::MessageStart { id } => {
                if let Some(id) = id {
                    self.response_id = id;
                }
                None
            }
            CohereStreamEvent::ContentDelta { delta } => Some(CompletionResponse::chunk(
                self.response_id.clone(),
                self.created,
                self.model.clone(),
                ChoiceDelta::text(delta.message.content.text),
                None,
            )),
            CohereStreamEvent::MessageEnd { delta } => {
                let (finish_reason, usage) = delta.map_or((None, None), |d| {
                    (d.finish_reason.as_deref().and_then(parse_cohere_finish), d.usage)
                });

                let mut chunk = CompletionResponse::chunk(
                    self.response_id.clone(),
                    self.created,
                    self.model.clone(),
                    ChoiceDelta::default(),
                    finish_reason.or(Some(FinishReason::Stop)),
                );
                chunk.usage = Some(usage.map_or_else(|| Usage::new(self.prompt_estimate, 0), usage_from_cohere));
                Some(chunk)
            }
            CohereStreamEvent::Other => None,
        }
    }
}
