//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::{anyhow, Result};

/// Index the course files in `path`, or the configured `rag.docs_dir`.
pub async fn run_ingest(path: Option<&str>, clear: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let folder = match path {
        Some(p) => Settings::expand_path(p),
        None => settings.docs_dir().ok_or_else(|| {
            anyhow!("No folder given and rag.docs_dir is not configured")
        })?,
    };

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner(&format!("Indexing {}...", folder.display()));
    let result = orchestrator.add_course_folder(&folder, clear).await;
    spinner.finish_and_clear();

    let (courses, chunks) = result?;
    if courses == 0 {
        Output::info("No new courses found.");
    } else {
        Output::success(&format!("Added {} courses with {} chunks", courses, chunks));
    }
    Output::kv(
        "Courses indexed",
        &orchestrator.vector_store().course_count().await?.to_string(),
    );

    Ok(())
}
