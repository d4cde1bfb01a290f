//! Tools the assistant can ask to invoke, and the registry that runs them.
//!
//! Every tool exposes a [`ToolDefinition`] (name, description, parameter
//! schema) and an async [`Tool::execute`]. Content search and outline lookup
//! are two implementations of the same interface, so the registry and the
//! tool-calling loop never need to know which concrete tool they drive.

pub mod links;
mod outline;
mod registry;
mod search;

pub use outline::CourseOutlineTool;
pub use registry::ToolRegistry;
pub use search::CourseSearchTool;

use crate::error::{PensumError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Integer,
    Number,
    Boolean,
}

/// Description of a single named tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub description: String,
    pub required: bool,
}

impl ParameterSpec {
    pub fn required(name: &str, kind: ParameterKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, kind: ParameterKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// What the model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique identifier within a registry.
    pub name: String,
    /// Human-readable purpose.
    pub description: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, parameters: Vec<ParameterSpec>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Render the parameters as a JSON-schema object.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.kind,
                    "description": param.description,
                }),
            );
        }

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Result of a single tool execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolOutput {
    /// Text handed back to the model.
    pub content: String,
    /// Source labels backing this result. `None` leaves whatever the tool
    /// reported earlier untouched.
    pub sources: Option<Vec<String>>,
}

impl ToolOutput {
    /// Plain text result that does not report sources.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: None,
        }
    }

    /// Text result that replaces the tool's sources, possibly with an empty list.
    pub fn with_sources(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            content: content.into(),
            sources: Some(sources),
        }
    }
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The definition advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool. `Err` means the tool itself failed; a legitimate
    /// "nothing found" answer is an `Ok` output.
    async fn execute(&self, args: Value) -> Result<ToolOutput>;
}

/// Deserialize tool arguments into a typed struct.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| PensumError::Tool(format!("Invalid arguments for '{}': {}", tool, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_schema_lists_required_parameters() {
        let definition = ToolDefinition::new(
            "search_course_content",
            "Search course materials",
            vec![
                ParameterSpec::required("query", ParameterKind::String, "What to search for"),
                ParameterSpec::optional("lesson_number", ParameterKind::Integer, "Lesson filter"),
            ],
        );

        let schema = definition.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["lesson_number"]["type"], "integer");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn test_parse_args_reports_tool_name() {
        #[derive(Debug, Deserialize)]
        struct Args {
            #[allow(dead_code)]
            query: String,
        }

        let err = parse_args::<Args>("search_course_content", json!({})).unwrap_err();
        assert!(err.to_string().contains("search_course_content"));
    }
}
