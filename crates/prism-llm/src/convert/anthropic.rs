//! Conversion between canonical types and the Anthropic wire format
//!
//! Anthropic carries the system prompt in a dedicated slot, requires
//! `max_tokens`, and streams through a content-block event machine; the
//! conversions here fold all of that back into the canonical schema.

use super::{now_secs, parse_finish_reason};
use crate::error::GatewayError;
use crate::protocol::anthropic::{
    AnthropicContent, AnthropicContentBlock, AnthropicMessage, AnthropicMetadata, AnthropicRequest, AnthropicResponse,
    AnthropicResponseBlock, AnthropicStreamContentBlock, AnthropicStreamDelta, AnthropicStreamEvent, AnthropicTool,
    AnthropicToolChoice, AnthropicUsage,
};
use crate::types::{
    Choice, ChoiceDelta, ChoiceMessage, CompletionRequest, CompletionResponse, FinishReason, FunctionCall,
    FunctionCallDelta, Message, Role, ToolCall, ToolCallDelta, ToolChoice, ToolChoiceMode, Usage,
};

/// Default max tokens when not specified (Anthropic requires the field)
const DEFAULT_MAX_TOKENS: u32 = 4096;

// -- Outbound: canonical -> Anthropic wire format --

impl TryFrom<&CompletionRequest> for AnthropicRequest {
    type Error = GatewayError;

    fn try_from(req: &CompletionRequest) -> Result<Self, Self::Error> {
        let mut system = None;
        let mut messages = Vec::new();

        for msg in &req.messages {
            match msg.role {
                Role::System => {
                    if system.is_some() {
                        return Err(GatewayError::Validation(
                            "Anthropic accepts a single system message".to_owned(),
                        ));
                    }
                    system = Some(msg.content_str().to_owned());
                }
                _ => messages.push(message_to_anthropic(msg)),
            }
        }

        let tools = req.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.function.name.clone(),
                    description: t.function.description.clone(),
                    input_schema: t
                        .function
                        .parameters
                        .clone()
                        .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                })
                .collect()
        });

        Ok(Self {
            model: req.model.clone(),
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            temperature: req.temperature,
            top_p: req.top_p,
            stop_sequences: req.stop.clone(),
            stream: req.stream.then_some(true),
            tools,
            tool_choice: req.tool_choice.as_ref().map(tool_choice_to_anthropic),
            metadata: req.user.clone().map(|user_id| AnthropicMetadata {
                user_id: Some(user_id),
            }),
        })
    }
}

/// Convert a canonical message to Anthropic wire format
fn message_to_anthropic(msg: &Message) -> AnthropicMessage {
    // Tool results travel as user-role tool_result blocks
    if msg.role == Role::Tool
        && let Some(tool_call_id) = &msg.tool_call_id
    {
        return AnthropicMessage {
            role: "user".to_owned(),
            content: AnthropicContent::Blocks(vec![AnthropicContentBlock::ToolResult {
                tool_use_id: tool_call_id.clone(),
                content: Some(msg.content_str().to_owned()),
                is_error: None,
            }]),
        };
    }

    let role = if msg.role == Role::Assistant { "assistant" } else { "user" };

    // Assistant tool calls become tool_use blocks
    if let Some(tool_calls) = &msg.tool_calls {
        let mut blocks = Vec::new();

        let text = msg.content_str();
        if !text.is_empty() {
            blocks.push(AnthropicContentBlock::Text { text: text.to_owned() });
        }

        for tc in tool_calls {
            let input = serde_json::from_str(&tc.function.arguments).unwrap_or_else(|_| serde_json::json!({}));
            blocks.push(AnthropicContentBlock::ToolUse {
                id: tc.id.clone(),
                name: tc.function.name.clone(),
                input,
            });
        }

        return AnthropicMessage {
            role: role.to_owned(),
            content: AnthropicContent::Blocks(blocks),
        };
    }

    AnthropicMessage {
        role: role.to_owned(),
        content: AnthropicContent::Text(msg.content_str().to_owned()),
    }
}

/// Convert canonical tool choice to Anthropic wire format
fn tool_choice_to_anthropic(choice: &ToolChoice) -> AnthropicToolChoice {
    match choice {
        ToolChoice::Mode(mode) => match mode {
            // Anthropic has no "none" mode; both None and Auto map to auto
            ToolChoiceMode::None | ToolChoiceMode::Auto => AnthropicToolChoice {
                choice_type: "auto".to_owned(),
                name: None,
            },
            ToolChoiceMode::Required => AnthropicToolChoice {
                choice_type: "any".to_owned(),
                name: None,
            },
        },
        ToolChoice::Function(func) => AnthropicToolChoice {
            choice_type: "tool".to_owned(),
            name: Some(func.function.name.clone()),
        },
    }
}

// -- Inbound: Anthropic wire format -> canonical --

/// Map an Anthropic stop reason string
fn parse_stop_reason(reason: &str) -> Option<FinishReason> {
    match reason {
        "end_turn" | "stop_sequence" => Some(FinishReason::Stop),
        "max_tokens" => Some(FinishReason::Length),
        "tool_use" => Some(FinishReason::ToolCalls),
        other => parse_finish_reason(other),
    }
}

impl From<AnthropicResponse> for CompletionResponse {
    fn from(resp: AnthropicResponse) -> Self {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in resp.content {
            match block {
                AnthropicResponseBlock::Text { text: t } => text.push_str(&t),
                AnthropicResponseBlock::ToolUse { id, name, input } => {
                    let arguments = serde_json::to_string(&input).unwrap_or_else(|_| "{}".to_owned());
                    tool_calls.push(ToolCall {
                        id,
                        call_type: "function".to_owned(),
                        function: FunctionCall { name, arguments },
                    });
                }
            }
        }

        let message = if tool_calls.is_empty() {
            ChoiceMessage::text(text)
        } else {
            ChoiceMessage::with_tool_calls((!text.is_empty()).then_some(text), tool_calls)
        };

        Self {
            id: resp.id,
            object: "chat.completion".to_owned(),
            created: now_secs(),
            model: resp.model,
            provider: String::new(),
            choices: vec![Choice {
                index: 0,
                message: Some(message),
                delta: None,
                finish_reason: resp.stop_reason.as_deref().and_then(parse_stop_reason),
            }],
            usage: Some(Usage::new(resp.usage.input_tokens, resp.usage.output_tokens)),
        }
    }
}

// -- Stream conversion --

/// State machine turning Anthropic SSE events into canonical chunks
///
/// Anthropic's content-block index is shared across block types, so tool
/// calls are renumbered sequentially; consumers index the assembled
/// `tool_calls` array by that value.
pub struct AnthropicStreamState {
    response_id: String,
    model: String,
    created: u64,
    /// Prompt tokens from `message_start`, else the caller's estimate
    prompt_tokens: u32,
    current_tool_index: u32,
    next_tool_index: u32,
}

impl AnthropicStreamState {
    /// Create a stream state with a prompt-token fallback estimate
    ///
    /// Anthropic reports input tokens on `message_start`; when that never
    /// arrives the `chars / 4` estimate from the canonical request fills
    /// the final usage chunk instead.
    pub fn new(model: impl Into<String>, prompt_estimate: u32) -> Self {
        Self {
            response_id: String::new(),
            model: model.into(),
            created: now_secs(),
            prompt_tokens: prompt_estimate,
            current_tool_index: 0,
            next_tool_index: 0,
        }
    }

    fn chunk(&self, delta: ChoiceDelta, finish_reason: Option<FinishReason>) -> CompletionResponse {
        CompletionResponse::chunk(self.response_id.clone(), self.created, self.model.clone(), delta, finish_reason)
    }

    /// Convert one Anthropic event into zero or one canonical chunk
    pub fn convert_event(&mut self, event: AnthropicStreamEvent) -> Option<CompletionResponse> {
        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                self.response_id = message.id;
                if let Some(usage) = message.usage
                    && usage.input_tokens > 0
                {
                    self.prompt_tokens = usage.input_tokens;
                }
                None
            }

            AnthropicStreamEvent::ContentBlockStart { content_block, .. } => match content_block {
                AnthropicStreamContentBlock::Text { .. } => None,
                AnthropicStreamContentBlock::ToolUse { id, name, .. } => {
                    self.current_tool_index = self.next_tool_index;
                    self.next_tool_index += 1;
                    Some(self.chunk(
                        ChoiceDelta {
                            role: None,
                            content: None,
                            tool_calls: Some(vec![ToolCallDelta {
                                index: self.current_tool_index,
                                id: Some(id),
                                function: Some(FunctionCallDelta {
                                    name: Some(name),
                                    arguments: None,
                                }),
                            }]),
                        },
                        None,
                    ))
                }
            },

            AnthropicStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                AnthropicStreamDelta::TextDelta { text } => Some(self.chunk(ChoiceDelta::text(text), None)),
                AnthropicStreamDelta::InputJsonDelta { partial_json } => Some(self.chunk(
                    ChoiceDelta {
                        role: None,
                        content: None,
                        tool_calls: Some(vec![ToolCallDelta {
                            index: self.current_tool_index,
                            id: None,
                            function: Some(FunctionCallDelta {
                                name: None,
                                arguments: Some(partial_json),
                            }),
                        }]),
                    },
                    None,
                )),
            },

            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                let finish_reason = delta.stop_reason.as_deref().and_then(parse_stop_reason);
                let mut chunk = self.chunk(ChoiceDelta::default(), finish_reason);
                chunk.usage = Some(Usage::new(
                    self.prompt_tokens,
                    usage.map_or(0, |u| u.output_tokens),
                ));
                Some(chunk)
            }

            AnthropicStreamEvent::ContentBlockStop { .. }
            | AnthropicStreamEvent::MessageStop
            | AnthropicStreamEvent::Ping => None,
        }
    }
}
