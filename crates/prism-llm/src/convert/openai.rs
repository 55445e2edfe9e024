//! Conversion between canonical types and the `OpenAI` wire format
//!
//! The canonical schema is deliberately close to `OpenAI`'s, so these
//! conversions are mostly structural.

use super::parse_finish_reason;
use crate::protocol::openai::{
    OpenAiChoiceMessage, OpenAiMessage, OpenAiRequest, OpenAiResponse, OpenAiStreamChunk, OpenAiStreamToolCall,
    OpenAiUsage,
};
use crate::types::{
    Choice, ChoiceDelta, ChoiceMessage, CompletionRequest, CompletionResponse, FunctionCallDelta, Message, Role,
    ToolCallDelta, Usage,
};

impl From<&CompletionRequest> for OpenAiRequest {
    fn from(req: &CompletionRequest) -> Self {
        Self {
            model: req.model.clone(),
            messages: req.messages.iter().map(Into::into).collect(),
            temperature: req.temperature,
            top_p: req.top_p,
            max_tokens: req.max_tokens,
            stop: req.stop.clone(),
            stream: None,
            stream_options: None,
            tools: req.tools.clone(),
            tool_choice: req.tool_choice.clone(),
            user: req.user.clone(),
        }
    }
}

impl From<&Message> for OpenAiMessage {
    fn from(msg: &Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        Self {
            role: role.to_owned(),
            content: msg.content.clone(),
            name: msg.name.clone(),
            tool_calls: msg.tool_calls.clone(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

impl From<OpenAiResponse> for CompletionResponse {
    fn from(resp: OpenAiResponse) -> Self {
        let choices = resp
            .choices
            .into_iter()
            .map(|c| Choice {
                index: c.index,
                message: Some(choice_message(c.message)),
                delta: None,
                finish_reason: c.finish_reason.as_deref().and_then(parse_finish_reason),
            })
            .collect();

        Self {
            id: resp.id,
            object: "chat.completion".to_owned(),
            created: resp.created,
            model: resp.model,
            provider: String::new(),
            choices,
            usage: resp.usage.map(Into::into),
        }
    }
}

impl From<OpenAiUsage> for Usage {
    fn from(usage: OpenAiUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

fn choice_message(msg: OpenAiChoiceMessage) -> ChoiceMessage {
    ChoiceMessage {
        role: msg.role,
        content: msg.content,
        tool_calls: msg.tool_calls,
    }
}

/// Convert a streaming chunk into a canonical chunk response
///
/// Preserves chunk order and the upstream id; the trailing usage-only
/// chunk (empty `choices`) becomes a canonical chunk whose single choice
/// carries an empty delta alongside the usage totals.
pub fn chunk_to_response(chunk: OpenAiStreamChunk) -> CompletionResponse {
    let usage = chunk.usage.map(Into::into);

    let (delta, finish_reason) = chunk.choices.into_iter().next().map_or_else(
        || (ChoiceDelta::default(), None),
        |choice| {
            let delta = ChoiceDelta {
                role: choice.delta.role,
                content: choice.delta.content,
                tool_calls: choice
                    .delta
                    .tool_calls
                    .map(|calls| calls.into_iter().map(tool_call_delta).collect()),
            };
            (delta, choice.finish_reason.as_deref().and_then(parse_finish_reason))
        },
    );

    let mut response = CompletionResponse::chunk(chunk.id, chunk.created, chunk.model, delta, finish_reason);
    response.usage = usage;
    response
}

fn tool_call_delta(call: OpenAiStreamToolCall) -> ToolCallDelta {
    ToolCallDelta {
        index: call.index,
        id: call.id,
        function: call.function.map(|f| FunctionCallDelta {
            name: f.name,
            arguments: f.arguments,
        }),
    }
}
