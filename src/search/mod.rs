//! Search backend abstraction.
//!
//! The tools only need three things from the knowledge base: a filtered
//! content search, a lesson-link lookup and a course outline. [`SearchBackend`]
//! captures exactly that; [`VectorSearch`] implements it over an embedder and
//! a vector store.

mod vector;

pub use vector::VectorSearch;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata attached to every indexed fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Title of the course the fragment belongs to.
    pub course_title: String,
    /// Lesson number, when the fragment belongs to a lesson.
    pub lesson_number: Option<u32>,
    /// Position of the fragment within its course.
    pub chunk_index: u32,
}

/// A matching fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Outcome of a content search: ranked hits, or a backend error message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub error: Option<String>,
}

impl SearchResults {
    /// Results carrying the given hits.
    pub fn from_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits, error: None }
    }

    /// Empty results describing a backend failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// One lesson in a course outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonOutline {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// Table of contents for a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub title: String,
    pub course_link: Option<String>,
    pub lessons: Vec<LessonOutline>,
}

/// Capability the retrieval tools search against.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Search course content, optionally narrowed to a course and/or lesson.
    ///
    /// Failures are reported through [`SearchResults::error`] so they can be
    /// shown to the model verbatim.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults;

    /// Link for a lesson of a course, identified by its exact title.
    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>>;

    /// Outline of the course best matching `course_name`.
    async fn course_outline(&self, course_name: &str) -> Result<Option<CourseOutline>>;

    /// Titles of every indexed course.
    async fn course_titles(&self) -> Result<Vec<String>>;
}
