//! Registry of tools exposed to the model.

use super::{Tool, ToolDefinition};
use crate::error::{PensumError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A registered tool with its cached definition.
struct Entry {
    definition: ToolDefinition,
    tool: Arc<dyn Tool>,
}

/// Holds the registered tools, dispatches calls by name and remembers the
/// sources each tool reported on its most recent execution.
///
/// Registering a name that is already taken is rejected; the first
/// registration wins. Source state belongs to one registry value, so
/// concurrent queries should each work on their own [`ToolRegistry::fork`].
pub struct ToolRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    last_sources: Mutex<Vec<Option<Vec<String>>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            last_sources: Mutex::new(Vec::new()),
        }
    }

    /// Register a tool under the name in its definition.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let definition = tool.definition();
        let name = definition.name.clone();

        if name.trim().is_empty() {
            return Err(PensumError::Config(
                "Tool must have a name in its definition".to_string(),
            ));
        }
        if self.index.contains_key(&name) {
            return Err(PensumError::Config(format!(
                "Tool '{}' is already registered",
                name
            )));
        }

        debug!("Registered tool '{}'", name);
        self.index.insert(name, self.entries.len());
        self.entries.push(Entry { definition, tool });
        self.sources_guard().push(None);
        Ok(())
    }

    /// Definitions of all registered tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(|e| e.definition.clone()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Execute the tool called `name`.
    ///
    /// An unknown name yields a not-found message rather than an error. Faults
    /// raised by the tool itself are propagated.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<String> {
        let Some(&slot) = self.index.get(name) else {
            return Ok(format!("Tool '{}' not found", name));
        };

        let output = self.entries[slot].tool.execute(args).await?;

        if let Some(sources) = output.sources {
            self.sources_guard()[slot] = Some(sources);
        }

        Ok(output.content)
    }

    /// The first non-empty source list, by registration order.
    pub fn collected_sources(&self) -> Vec<String> {
        self.sources_guard()
            .iter()
            .flatten()
            .find(|sources| !sources.is_empty())
            .cloned()
            .unwrap_or_default()
    }

    /// Forget the sources recorded by every tool.
    pub fn reset_sources(&self) {
        self.sources_guard().iter_mut().for_each(|slot| *slot = None);
    }

    /// A registry with the same tools and fresh source state.
    pub fn fork(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|e| Entry {
                    definition: e.definition.clone(),
                    tool: Arc::clone(&e.tool),
                })
                .collect(),
            index: self.index.clone(),
            last_sources: Mutex::new(vec![None; self.entries.len()]),
        }
    }

    fn sources_guard(&self) -> std::sync::MutexGuard<'_, Vec<Option<Vec<String>>>> {
        self.last_sources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ParameterKind, ParameterSpec, ToolOutput};
    use async_trait::async_trait;
    use serde_json::json;

    /// Tool that echoes its arguments and reports fixed sources.
    struct EchoTool {
        name: &'static str,
        sources: Option<Vec<String>>,
        fail: bool,
    }

    impl EchoTool {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                sources: None,
                fail: false,
            }
        }

        fn citing(name: &'static str, sources: &[&str]) -> Self {
            Self {
                sources: Some(sources.iter().map(|s| s.to_string()).collect()),
                ..Self::new(name)
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(
                self.name,
                "Echo the arguments",
                vec![ParameterSpec::required("text", ParameterKind::String, "Text to echo")],
            )
        }

        async fn execute(&self, args: Value) -> Result<ToolOutput> {
            if self.fail {
                return Err(PensumError::Tool("echo failed".to_string()));
            }
            let content = format!("{}:{}", self.name, args["text"].as_str().unwrap_or(""));
            Ok(ToolOutput {
                content,
                sources: self.sources.clone(),
            })
        }
    }

    #[test]
    fn test_unknown_tool_returns_not_found_message() {
        let registry = ToolRegistry::new();
        let result = tokio_test::block_on(registry.dispatch("missing_tool", json!({})));
        assert_eq!(result.unwrap(), "Tool 'missing_tool' not found");
    }

    #[test]
    fn test_definitions_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("b_tool"))).unwrap();
        registry.register(Arc::new(EchoTool::new("a_tool"))).unwrap();
        registry.register(Arc::new(EchoTool::new("c_tool"))).unwrap();

        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b_tool", "a_tool", "c_tool"]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::citing("echo", &["first"]))).unwrap();

        let err = registry
            .register(Arc::new(EchoTool::citing("echo", &["second"])))
            .unwrap_err();
        assert!(matches!(err, PensumError::Config(_)));
        assert_eq!(registry.len(), 1);

        tokio_test::block_on(registry.dispatch("echo", json!({"text": "x"}))).unwrap();
        assert_eq!(registry.collected_sources(), vec!["first"]);
    }

    #[test]
    fn test_nameless_tool_is_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(Arc::new(EchoTool::new(""))).unwrap_err();
        assert!(matches!(err, PensumError::Config(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_forwards_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::new("echo"))).unwrap();

        let result = registry.dispatch("echo", json!({"text": "hello"})).await.unwrap();
        assert_eq!(result, "echo:hello");
    }

    #[tokio::test]
    async fn test_dispatch_propagates_tool_faults() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(EchoTool {
                fail: true,
                ..EchoTool::new("broken")
            }))
            .unwrap();

        let err = registry.dispatch("broken", json!({})).await.unwrap_err();
        assert!(matches!(err, PensumError::Tool(_)));
    }

    #[tokio::test]
    async fn test_collected_sources_prefers_first_registered_non_empty() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::citing("empty", &[]))).unwrap();
        registry.register(Arc::new(EchoTool::new("silent"))).unwrap();
        registry.register(Arc::new(EchoTool::citing("first", &["A"]))).unwrap();
        registry.register(Arc::new(EchoTool::citing("second", &["B"]))).unwrap();

        assert!(registry.collected_sources().is_empty());

        for name in ["second", "first", "silent", "empty"] {
            registry.dispatch(name, json!({"text": ""})).await.unwrap();
        }
        assert_eq!(registry.collected_sources(), vec!["A"]);

        registry.reset_sources();
        assert!(registry.collected_sources().is_empty());
    }

    #[tokio::test]
    async fn test_fork_isolates_source_state() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::citing("cite", &["Course A"]))).unwrap();

        let first = registry.fork();
        let second = registry.fork();

        first.dispatch("cite", json!({"text": ""})).await.unwrap();
        second.reset_sources();

        assert_eq!(first.collected_sources(), vec!["Course A"]);
        assert!(second.collected_sources().is_empty());
        assert!(registry.collected_sources().is_empty());
        assert_eq!(first.definitions(), registry.definitions());
    }
}
