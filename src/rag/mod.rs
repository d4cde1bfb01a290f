//! Query façade: the single entry point for answering course questions.
//!
//! [`RagSystem`] loads a session's history, runs the tool-calling loop with
//! a private copy of the tool registry, collects the sources the tools
//! reported and records the exchange.

mod system;

pub use system::{default_registry, RagSystem, DEGRADED_ANSWER};

use serde::{Deserialize, Serialize};

/// Answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    /// Source labels, possibly rendered as safe anchors.
    pub sources: Vec<String>,
    /// Session the exchange was recorded in.
    pub session_id: String,
}

/// Catalog statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}
