//! Course outline lookup.

use super::links::{anchor, is_safe_http_url};
use super::{parse_args, ParameterKind, ParameterSpec, Tool, ToolDefinition, ToolOutput};
use crate::error::Result;
use crate::search::{CourseOutline, SearchBackend};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Returns the title, link and lesson list of a course.
///
/// Outlines are informational, so this tool never reports sources.
pub struct CourseOutlineTool {
    backend: Arc<dyn SearchBackend>,
}

impl CourseOutlineTool {
    pub const NAME: &'static str = "get_course_outline";

    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }
}

/// Render an outline as plain text with safe anchors for links.
fn render_outline(outline: &CourseOutline) -> String {
    let course_link_line = match outline.course_link.as_deref() {
        Some(link) if is_safe_http_url(link) => format!("Course Link: {}", anchor(link, link)),
        _ => "Course Link: N/A".to_string(),
    };

    let mut lines = vec![
        format!("Course Title: {}", outline.title),
        String::new(),
        course_link_line,
        String::new(),
        "Lessons:".to_string(),
    ];

    if outline.lessons.is_empty() {
        lines.push("No lessons found.".to_string());
    }

    for lesson in &outline.lessons {
        let suffix = match lesson.link.as_deref() {
            Some(link) if is_safe_http_url(link) => format!(" {}", anchor(link, "(Link)")),
            _ => String::new(),
        };
        lines.push(format!("- Lesson {}: {}{}", lesson.number, lesson.title, suffix));
    }

    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "Get complete course outline metadata including course title, course link, and all lessons",
            vec![ParameterSpec::required(
                "course_name",
                ParameterKind::String,
                "Course title (partial matches work)",
            )],
        )
    }

    #[instrument(skip(self, args))]
    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let args: OutlineArgs = parse_args(Self::NAME, args)?;

        let content = match self.backend.course_outline(&args.course_name).await? {
            Some(outline) => render_outline(&outline),
            None => format!("No course outline found matching '{}'.", args.course_name),
        };

        Ok(ToolOutput::text(content))
    }
}
