//! Bounded tool-calling loop.

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::{CompletionRequest, CompletionResponse, ContentBlock, LlmClient, Message};
use crate::tools::{ToolDefinition, ToolRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of completed tool rounds before the model is forced to answer.
pub const MAX_TOOL_ROUNDS: usize = 2;

/// Answer returned when a tool fails during a round.
pub const TOOL_FAILURE_FALLBACK: &str = "I hit a retrieval issue while processing that request.";

/// Drives a conversation between the model and the tool registry.
///
/// Each call to [`generate`](Self::generate) runs at most [`MAX_TOOL_ROUNDS`]
/// tool rounds. When the budget is spent, one last model call is made with no
/// tools attached so the model has to produce text.
pub struct ResponseGenerator {
    client: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl ResponseGenerator {
    pub fn new(client: Arc<dyn LlmClient>, prompts: &Prompts) -> Self {
        Self {
            client,
            system_prompt: prompts.render_with_custom(&prompts.agent.system, &HashMap::new()),
        }
    }

    fn system_text(&self, history: Option<&str>) -> String {
        match history {
            Some(h) if !h.is_empty() => {
                format!("{}\n\nPrevious conversation:\n{}", self.system_prompt, h)
            }
            _ => self.system_prompt.clone(),
        }
    }

    /// Answer `query`, letting the model call tools when both `tools` and
    /// `registry` are provided.
    ///
    /// Model failures are returned as `Err`. A failing tool ends the loop
    /// with [`TOOL_FAILURE_FALLBACK`] as the answer.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        registry: Option<&ToolRegistry>,
    ) -> Result<GeneratedResponse> {
        let system = self.system_text(history);
        let mut messages = vec![Message::user_text(query)];
        let mut tool_calls = Vec::new();
        let mut model_calls = 0;

        let (tools, registry) = match (tools.filter(|t| !t.is_empty()), registry) {
            (Some(tools), Some(registry)) => (tools, registry),
            _ => {
                debug!("Tools unavailable, answering directly");
                let response = self
                    .client
                    .complete(CompletionRequest::new(&system, messages))
                    .await?;
                return Ok(GeneratedResponse::finish(&response, tool_calls, 1, 0));
            }
        };

        for round in 0..MAX_TOOL_ROUNDS {
            debug!("Tool round {} of {}", round + 1, MAX_TOOL_ROUNDS);

            let response = self
                .client
                .complete(CompletionRequest::new(&system, messages.clone()).with_tools(tools))
                .await?;
            model_calls += 1;

            let uses = response.tool_uses();
            if uses.is_empty() {
                return Ok(GeneratedResponse::finish(
                    &response,
                    tool_calls,
                    model_calls,
                    round,
                ));
            }

            let mut results = Vec::with_capacity(uses.len());
            for tool_use in &uses {
                info!("Calling tool: {} with args: {}", tool_use.name, tool_use.input);

                let output = match registry.dispatch(tool_use.name, tool_use.input.clone()).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!("Tool '{}' failed: {}", tool_use.name, e);
                        return Ok(GeneratedResponse {
                            text: TOOL_FAILURE_FALLBACK.to_string(),
                            tool_calls,
                            model_calls,
                            rounds: round,
                        });
                    }
                };

                tool_calls.push(ToolCallRecord {
                    name: tool_use.name.to_string(),
                    arguments: tool_use.input.to_string(),
                    result: output.clone(),
                });
                results.push(ContentBlock::ToolResult {
                    tool_use_id: tool_use.id.to_string(),
                    content: output,
                });
            }

            messages.push(Message::assistant(response.content.clone()));
            messages.push(Message::tool_results(results));
        }

        debug!("Tool round budget spent, requesting final answer");
        let response = self
            .client
            .complete(CompletionRequest::new(&system, messages))
            .await?;
        model_calls += 1;

        Ok(GeneratedResponse::finish(
            &response,
            tool_calls,
            model_calls,
            MAX_TOOL_ROUNDS,
        ))
    }
}

/// Outcome of one [`ResponseGenerator::generate`] call.
#[derive(Debug, Clone)]
pub struct GeneratedResponse {
    /// Final answer text. Empty when the model produced no text block.
    pub text: String,
    /// Tool executions that completed, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls issued.
    pub model_calls: usize,
    /// Number of completed tool rounds.
    pub rounds: usize,
}

impl GeneratedResponse {
    fn finish(
        response: &CompletionResponse,
        tool_calls: Vec<ToolCallRecord>,
        model_calls: usize,
        rounds: usize,
    ) -> Self {
        Self {
            text: response.first_text().unwrap_or_default().to_string(),
            tool_calls,
            model_calls,
            rounds,
        }
    }
}

/// Record of a tool call made during generation.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
