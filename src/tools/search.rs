//! Content search over course materials.

use super::links::linked_label;
use super::{parse_args, ParameterKind, ParameterSpec, Tool, ToolDefinition, ToolOutput};
use crate::error::Result;
use crate::search::{SearchBackend, SearchResults};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Searches course content, optionally filtered by course and lesson.
///
/// Each execution reports the deduplicated list of cited course/lesson labels,
/// linked to the lesson page when a safe link is known.
pub struct CourseSearchTool {
    backend: Arc<dyn SearchBackend>,
}

impl CourseSearchTool {
    pub const NAME: &'static str = "search_course_content";

    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    async fn format_results(&self, results: &SearchResults) -> Result<ToolOutput> {
        let mut fragments = Vec::with_capacity(results.hits.len());
        let mut sources = Vec::new();
        let mut seen = HashSet::new();

        for hit in &results.hits {
            let label = match hit.metadata.lesson_number {
                Some(n) => format!("{} - Lesson {}", hit.metadata.course_title, n),
                None => hit.metadata.course_title.clone(),
            };

            fragments.push(format!("[{}]\n{}", label, hit.content));

            if !seen.insert(label.clone()) {
                continue;
            }

            let link = match hit.metadata.lesson_number {
                Some(n) => self.backend.lesson_link(&hit.metadata.course_title, n).await?,
                None => None,
            };
            sources.push(linked_label(&label, link.as_deref()));
        }

        Ok(ToolOutput::with_sources(fragments.join("\n\n"), sources))
    }
}

/// Suffix describing the filters applied to an empty search.
fn filter_description(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut description = String::new();
    if let Some(course) = course_name {
        description.push_str(&format!(" in course '{}'", course));
    }
    if let Some(lesson) = lesson_number {
        description.push_str(&format!(" in lesson {}", lesson));
    }
    description
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Search course materials with smart course name matching and lesson filtering",
            vec![
                ParameterSpec::required(
                    "query",
                    ParameterKind::String,
                    "What to search for in the course content",
                ),
                ParameterSpec::optional(
                    "course_name",
                    ParameterKind::String,
                    "Course title (partial matches work, e.g. 'MCP', 'Introduction')",
                ),
                ParameterSpec::optional(
                    "lesson_number",
                    ParameterKind::Integer,
                    "Specific lesson number to search within (e.g. 1, 2, 3)",
                ),
            ],
        )
    }

    #[instrument(skip(self, args))]
    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let args: SearchArgs = parse_args(Self::NAME, args)?;
        let course_name = args.course_name.as_deref();

        let results = self
            .backend
            .search(&args.query, course_name, args.lesson_number)
            .await;

        if let Some(error) = results.error {
            debug!("Search backend reported: {}", error);
            return Ok(ToolOutput::text(error));
        }

        if results.is_empty() {
            return Ok(ToolOutput::text(format!(
                "No relevant content found{}.",
                filter_description(course_name, args.lesson_number)
            )));
        }

        debug!("Formatting {} search hits", results.hits.len());
        self.format_results(&results).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PensumError;
    use crate::search::{ChunkMetadata, CourseOutline, SearchHit};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Backend returning canned results and recording searches.
    #[derive(Default)]
    struct StubBackend {
        results: SearchResults,
        links: HashMap<(String, u32), String>,
        searches: Mutex<Vec<(String, Option<String>, Option<u32>)>>,
    }

    impl StubBackend {
        fn with_hits(hits: &[(&str, &str, Option<u32>)]) -> Self {
            let hits = hits
                .iter()
                .enumerate()
                .map(|(i, (course, content, lesson))| SearchHit {
                    content: content.to_string(),
                    metadata: ChunkMetadata {
                        course_title: course.to_string(),
                        lesson_number: *lesson,
                        chunk_index: i as u32,
                    },
                    score: 0.9,
                })
                .collect();
            Self {
                results: SearchResults::from_hits(hits),
                ..Default::default()
            }
        }

        fn link(mut self, course: &str, lesson: u32, url: &str) -> Self {
            self.links.insert((course.to_string(), lesson), url.to_string());
            self
        }
    }

    #[async_trait]
    impl SearchBackend for StubBackend {
        async fn search(
            &self,
            query: &str,
            course_name: Option<&str>,
            lesson_number: Option<u32>,
        ) -> SearchResults {
            self.searches.lock().unwrap().push((
                query.to_string(),
                course_name.map(str::to_string),
                lesson_number,
            ));
            self.results.clone()
        }

        async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
            Ok(self.links.get(&(course_title.to_string(), lesson_number)).cloned())
        }

        async fn course_outline(&self, _course_name: &str) -> Result<Option<CourseOutline>> {
            Ok(None)
        }

        async fn course_titles(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn search_tool(backend: StubBackend) -> (CourseSearchTool, Arc<StubBackend>) {
        let backend = Arc::new(backend);
        (CourseSearchTool::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_backend_error_is_returned_verbatim() {
        let (tool, backend) = search_tool(StubBackend {
            results: SearchResults::error("Search error: backend unavailable"),
            ..Default::default()
        });

        let output = tool.execute(json!({"query": "What is MCP?"})).await.unwrap();

        assert_eq!(output.content, "Search error: backend unavailable");
        assert_eq!(output.sources, None);
        assert_eq!(
            *backend.searches.lock().unwrap(),
            vec![("What is MCP?".to_string(), None, None)]
        );
    }

    #[tokio::test]
    async fn test_empty_results_describe_both_filters() {
        let (tool, backend) = search_tool(StubBackend::default());

        let output = tool
            .execute(json!({"query": "What is batching?", "course_name": "MCP", "lesson_number": 2}))
            .await
            .unwrap();

        assert_eq!(output.content, "No relevant content found in course 'MCP' in lesson 2.");
        assert_eq!(output.sources, None);
        assert_eq!(
            *backend.searches.lock().unwrap(),
            vec![("What is batching?".to_string(), Some("MCP".to_string()), Some(2))]
        );
    }

    #[tokio::test]
    async fn test_empty_results_without_filters() {
        let (tool, _) = search_tool(StubBackend::default());
        let output = tool.execute(json!({"query": "anything"})).await.unwrap();
        assert_eq!(output.content, "No relevant content found.");
    }

    #[tokio::test]
    async fn test_results_are_formatted_with_linked_sources() {
        let (tool, _) = search_tool(
            StubBackend::with_hits(&[("Mastering MCP", "Batch requests reduce round trips.", Some(2))])
                .link("Mastering MCP", 2, "https://example.com/mastering-mcp/lesson-2"),
        );

        let output = tool.execute(json!({"query": "Explain batching"})).await.unwrap();

        assert_eq!(
            output.content,
            "[Mastering MCP - Lesson 2]\nBatch requests reduce round trips."
        );
        assert_eq!(
            output.sources,
            Some(vec![
                "<a href=\"https://example.com/mastering-mcp/lesson-2\" target=\"_blank\" \
                 rel=\"noopener noreferrer\">Mastering MCP - Lesson 2</a>"
                    .to_string()
            ])
        );
    }

    #[tokio::test]
    async fn test_sources_are_deduplicated_in_first_seen_order() {
        let (tool, _) = search_tool(StubBackend::with_hits(&[
            ("Course B", "one", Some(1)),
            ("Course A", "two", Some(2)),
            ("Course B", "three", Some(1)),
            ("Course A", "four", None),
            ("Course A", "five", Some(2)),
        ]));

        let output = tool.execute(json!({"query": "q"})).await.unwrap();

        assert_eq!(
            output.sources,
            Some(vec![
                "Course B - Lesson 1".to_string(),
                "Course A - Lesson 2".to_string(),
                "Course A".to_string(),
            ])
        );
        assert_eq!(output.content.matches("[Course B - Lesson 1]").count(), 2);
        assert_eq!(
            output.content.split("\n\n").count(),
            5,
            "every fragment is kept even when its source repeats"
        );
    }

    #[tokio::test]
    async fn test_unsafe_lesson_link_renders_plain_escaped_label() {
        let (tool, _) = search_tool(
            StubBackend::with_hits(&[("Q&A <Basics>", "text", Some(1))])
                .link("Q&A <Basics>", 1, "javascript:alert('xss')"),
        );

        let output = tool.execute(json!({"query": "q"})).await.unwrap();

        assert_eq!(
            output.sources,
            Some(vec!["Q&amp;A &lt;Basics&gt; - Lesson 1".to_string()])
        );
    }

    #[tokio::test]
    async fn test_missing_query_is_a_tool_fault() {
        let (tool, _) = search_tool(StubBackend::default());
        let err = tool.execute(json!({"course_name": "MCP"})).await.unwrap_err();
        assert!(matches!(err, PensumError::Tool(_)));
    }
}
