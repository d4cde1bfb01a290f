//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let system = RagSystem::from_settings(&settings)?;

    let spinner = Output::spinner("Searching course materials...");
    let result = system.query_with_timeout(question, None).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            Output::answer(&response.answer, &response.sources);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            Err(e.into())
        }
    }
}
