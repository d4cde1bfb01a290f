//! OpenAI chat completions adapter.

use super::{
    CompletionRequest, CompletionResponse, ContentBlock, LlmClient, Message, Role, StopReason,
    ToolChoice,
};
use crate::config::LlmSettings;
use crate::error::{PensumError, Result};
use crate::openai::{create_client_with_timeout, retry_backoff};
use crate::tools::ToolDefinition;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolArgs, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FinishReason, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// [`LlmClient`] backed by the OpenAI chat completions API.
pub struct OpenAIChatClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIChatClient {
    /// Build a client whose per-request deadline is `settings.timeout_seconds`
    /// and which retries rate-limited calls up to `settings.max_retries` times.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let client = create_client_with_timeout(Duration::from_secs(settings.timeout_seconds))?
            .with_backoff(retry_backoff(settings.max_retries));
        Ok(Self::new(client, settings))
    }

    pub fn new(client: Client<OpenAIConfig>, settings: &LlmSettings) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

fn build_err(e: OpenAIError) -> PensumError {
    PensumError::Llm(format!("Failed to build request: {}", e))
}

/// Classify an API failure, keeping transport timeouts distinguishable.
fn map_api_error(e: OpenAIError) -> PensumError {
    match e {
        OpenAIError::Reqwest(ref inner) if inner.is_timeout() => {
            PensumError::LlmTimeout(inner.to_string())
        }
        other => PensumError::OpenAI(other.to_string()),
    }
}

/// Flatten the system prompt and conversation into OpenAI messages.
///
/// Tool results become one `tool` message each, in the order they appear.
fn to_openai_messages(system: &str, messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system.to_string())
            .build()
            .map_err(build_err)?
            .into(),
    ];

    for message in messages {
        let mut text = Vec::new();
        let mut tool_calls = Vec::new();
        let mut tool_results = Vec::new();

        for block in &message.content {
            match block {
                ContentBlock::Text { text: t } => text.push(t.as_str()),
                ContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ChatCompletionMessageToolCall {
                        id: id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: name.clone(),
                            arguments: input.to_string(),
                        },
                    })
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                } => tool_results.push((tool_use_id, content)),
            }
        }

        match message.role {
            Role::Assistant => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if !text.is_empty() {
                    args.content(text.join("\n"));
                }
                if !tool_calls.is_empty() {
                    args.tool_calls(tool_calls);
                }
                out.push(args.build().map_err(build_err)?.into());
            }
            Role::User => {
                for (tool_use_id, content) in tool_results {
                    out.push(
                        ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(tool_use_id.clone())
                            .content(content.clone())
                            .build()
                            .map_err(build_err)?
                            .into(),
                    );
                }
                if !text.is_empty() {
                    out.push(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(text.join("\n"))
                            .build()
                            .map_err(build_err)?
                            .into(),
                    );
                }
            }
        }
    }

    Ok(out)
}

fn to_openai_tools(tools: &[ToolDefinition]) -> Result<Vec<ChatCompletionTool>> {
    tools
        .iter()
        .map(|tool| {
            ChatCompletionToolArgs::default()
                .r#type(ChatCompletionToolType::Function)
                .function(FunctionObject {
                    name: tool.name.clone(),
                    description: Some(tool.description.clone()),
                    parameters: Some(tool.input_schema()),
                    strict: None,
                })
                .build()
                .map_err(build_err)
        })
        .collect()
}

/// Convert the first choice of a completion into content blocks.
fn from_openai_message(
    content: Option<String>,
    tool_calls: Option<Vec<ChatCompletionMessageToolCall>>,
    finish_reason: Option<FinishReason>,
) -> Result<CompletionResponse> {
    let mut blocks = Vec::new();

    if let Some(text) = content.filter(|t| !t.is_empty()) {
        blocks.push(ContentBlock::Text { text });
    }

    for call in tool_calls.unwrap_or_default() {
        let input: Value = if call.function.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                PensumError::Llm(format!(
                    "Malformed arguments for tool '{}': {}",
                    call.function.name, e
                ))
            })?
        };
        blocks.push(ContentBlock::ToolUse {
            id: call.id,
            name: call.function.name,
            input,
        });
    }

    let stop_reason = match finish_reason {
        Some(FinishReason::ToolCalls) | Some(FinishReason::FunctionCall) => StopReason::ToolUse,
        Some(FinishReason::Stop) => StopReason::EndTurn,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        _ => StopReason::Other,
    };

    Ok(CompletionResponse {
        content: blocks,
        stop_reason,
    })
}

#[async_trait]
impl LlmClient for OpenAIChatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(to_openai_messages(&request.system, &request.messages)?)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens);

        if let Some(tools) = request.tools.as_deref().filter(|t| !t.is_empty()) {
            args.tools(to_openai_tools(tools)?);
            if let Some(ToolChoice::Auto) = request.tool_choice {
                args.tool_choice(ChatCompletionToolChoiceOption::Auto);
            }
        }

        let body = args.build().map_err(build_err)?;
        debug!(
            "Requesting completion from {} ({} messages)",
            self.model,
            request.messages.len()
        );

        let response = self
            .client
            .chat()
            .create(body)
            .await
            .map_err(map_api_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PensumError::Llm("No response from model".to_string()))?;

        from_openai_message(
            choice.message.content,
            choice.message.tool_calls,
            choice.finish_reason,
        )
    }
}
