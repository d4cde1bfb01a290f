//! LLM capability used by the tool-calling loop.
//!
//! Conversations are modelled as content blocks: a model turn may mix text
//! with tool-use requests, and tool results travel back inside a user turn.
//! [`OpenAIChatClient`] maps this model onto the OpenAI chat completions API.

mod openai;

pub use openai::OpenAIChatClient;

use crate::error::Result;
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One piece of a conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// The model asks for a tool to be run.
    ToolUse { id: String, name: String, input: Value },
    /// Output of a tool run, keyed by the originating request.
    ToolResult { tool_use_id: String, content: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// A conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A user turn holding plain text.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// An assistant turn, replayed verbatim.
    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// A user turn carrying tool results.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: results,
        }
    }
}

/// How the model may pick tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    Auto,
}

/// A single model call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionRequest {
    /// A request without tool permission.
    pub fn new(system: &str, messages: Vec<Message>) -> Self {
        Self {
            system: system.to_string(),
            messages,
            tools: None,
            tool_choice: None,
        }
    }

    /// Allow the model to pick among `tools`.
    pub fn with_tools(mut self, tools: &[ToolDefinition]) -> Self {
        self.tools = Some(tools.to_vec());
        self.tool_choice = Some(ToolChoice::Auto);
        self
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other,
}

/// The model's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

impl CompletionResponse {
    /// Text of the first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// All tool-use blocks, in order.
    pub fn tool_uses(&self) -> Vec<ToolUse<'_>> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolUse { id, name, input }),
                _ => None,
            })
            .collect()
    }
}

/// Borrowed view of a tool-use block.
#[derive(Debug, Clone, Copy)]
pub struct ToolUse<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a Value,
}

/// A chat model that supports tool use.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_text_skips_tool_blocks() {
        let response = CompletionResponse {
            content: vec![
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({"query": "x"}),
                },
                ContentBlock::text("first"),
                ContentBlock::text("second"),
            ],
            stop_reason: StopReason::ToolUse,
        };

        assert_eq!(response.first_text(), Some("first"));
        let uses = response.tool_uses();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].id, "call_1");
        assert_eq!(uses[0].input["query"], "x");
    }

    #[test]
    fn test_response_without_text() {
        let response = CompletionResponse {
            content: Vec::new(),
            stop_reason: StopReason::EndTurn,
        };
        assert_eq!(response.first_text(), None);
        assert!(response.tool_uses().is_empty());
    }

    #[test]
    fn test_content_block_serialization() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "call_9".to_string(),
            content: "done".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"type": "tool_result", "tool_use_id": "call_9", "content": "done"})
        );
    }
}
