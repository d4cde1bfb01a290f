//! Pre-flight checks before operations that call the OpenAI API.
//!
//! Failing early gives a clear message instead of an API error halfway
//! through ingestion or a chat session.

use crate::config::Settings;
use crate::error::{PensumError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs the API key and an index.
    Ask,
    /// Ingestion needs the API key for embeddings.
    Ingest,
    /// Listing courses reads only the local index.
    Courses,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask | Operation::Ingest => {
            check_api_key(std::env::var("OPENAI_API_KEY").ok().as_deref())?;
        }
        Operation::Courses => {}
    }

    if matches!(operation, Operation::Ask) && settings.vector_store.provider == "sqlite" {
        let path = settings.sqlite_path();
        if !path.exists() {
            return Err(PensumError::Config(format!(
                "No index at {}. Run 'pensum ingest <folder>' first.",
                path.display()
            )));
        }
    }

    Ok(())
}

fn check_api_key(key: Option<&str>) -> Result<()> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(PensumError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        None => Err(PensumError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_courses_has_no_requirements() {
        assert!(check(Operation::Courses, &Settings::default()).is_ok());
    }

    #[test]
    fn test_api_key_validation() {
        assert!(check_api_key(Some("sk-test")).is_ok());
        assert!(matches!(check_api_key(Some("  ")), Err(PensumError::Config(_))));
        let err = check_api_key(None).unwrap_err();
        assert!(err.to_string().contains("not set"));
    }
}
