//! Prompt templates for Pensum.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub agent: AgentPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for the tool-calling assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    /// Static system instruction sent with every model call.
    pub system: String,
    /// Template wrapping the user's question; `{{query}}` is replaced.
    pub query: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant for course materials and educational content, with tools for looking up course information.

Tool usage:
- Use tools **only** for course-specific questions
- Use `search_course_content` for questions about specific lesson or content details
- Use `get_course_outline` for syllabus, outline, lesson-list or curriculum-structure questions
- Use at most one tool call per round, with up to 2 rounds total when needed
- Synthesize tool results into accurate, fact-based responses
- If a tool yields no results, say so clearly without offering alternatives
- After using tools, give a final direct answer to the user's question

Response protocol:
- **General knowledge questions**: answer from existing knowledge without tools
- **Course-specific questions**: use the relevant tool first, then answer
- **Outline questions**: return the course title, course link, and every lesson with lesson number and lesson title; include `(Link)` after each lesson when a lesson URL is available
- **No meta-commentary**:
  - Give direct answers only, with no reasoning process, tool explanations or question-type analysis
  - Do not mention "based on the search results"

Every response must be:
1. **Brief and focused**
2. **Educational**
3. **Clear**, in accessible language
4. **Example-supported** when examples aid understanding
Provide only the direct answer to what was asked."#
                .to_string(),

            query: "Answer this question about course materials: {{query}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Render the user-facing query template for a question.
    ///
    /// Configured variables are substituted first and the question last, so
    /// placeholder-like text inside the question is kept verbatim.
    pub fn render_query(&self, query: &str) -> String {
        let mut variables = self.variables.clone();
        variables.remove("query");
        Self::render(&self.agent.query, &variables).replace("{{query}}", query)
    }
}
