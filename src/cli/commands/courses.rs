//! Courses command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// List indexed courses with their lesson counts.
pub async fn run_courses(settings: Settings) -> Result<()> {
    preflight::check(Operation::Courses, &settings)?;

    let orchestrator = Orchestrator::new(settings)?;
    let store = orchestrator.vector_store();
    let courses = store.list_courses().await?;

    if courses.is_empty() {
        Output::info("No courses indexed yet. Use 'pensum ingest <folder>' to add content.");
        return Ok(());
    }

    Output::header(&format!("Indexed Courses ({})", courses.len()));
    println!();
    for course in &courses {
        let by = course
            .instructor
            .as_deref()
            .map(|i| format!(" by {}", i))
            .unwrap_or_default();
        Output::list_item(&format!(
            "{}{} ({} lessons)",
            course.title,
            by,
            course.lessons.len()
        ));
    }

    println!();
    Output::kv("Total courses", &courses.len().to_string());
    Output::kv("Total chunks", &store.document_count().await?.to_string());

    Ok(())
}
