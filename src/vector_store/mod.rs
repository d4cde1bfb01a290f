//! Vector store abstraction for course content.
//!
//! Two collections are kept: course records (one per course, embedded by
//! title so course names can be matched loosely) and content documents (one
//! per chunk of lesson text).

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chunk of lesson text stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// Title of the course this chunk belongs to.
    pub course_title: String,
    /// Lesson the chunk was taken from.
    pub lesson_number: Option<u32>,
    /// Position of the chunk within its course.
    pub chunk_index: u32,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this document was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        course_title: String,
        lesson_number: Option<u32>,
        chunk_index: u32,
        content: String,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_title,
            lesson_number,
            chunk_index,
            content,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A lesson entry in a course record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// Catalog entry for an indexed course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Course title, unique across the catalog.
    pub title: String,
    pub instructor: Option<String>,
    pub course_link: Option<String>,
    /// Lessons in file order.
    pub lessons: Vec<LessonRecord>,
    /// Embedding of the course title.
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

impl CourseRecord {
    /// Look up a lesson by number.
    pub fn lesson(&self, number: u32) -> Option<&LessonRecord> {
        self.lessons.iter().find(|l| l.number == number)
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// A course matched by title similarity.
#[derive(Debug, Clone)]
pub struct CourseMatch {
    pub course: CourseRecord,
    pub score: f32,
}

/// Restricts a content search to a course and/or lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchFilter {
    /// Whether a document passes every set condition.
    pub fn matches(&self, doc: &Document) -> bool {
        let course_ok = self
            .course_title
            .as_deref()
            .map_or(true, |title| doc.course_title == title);
        let lesson_ok = self
            .lesson_number
            .map_or(true, |n| doc.lesson_number == Some(n));
        course_ok && lesson_ok
    }
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a course catalog entry.
    async fn add_course(&self, course: &CourseRecord) -> Result<()>;

    /// Bulk upsert content documents.
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize>;

    /// Content documents most similar to `query_embedding` that pass `filter`.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchResult>>;

    /// Courses whose title embedding is closest to `query_embedding`.
    async fn search_courses(&self, query_embedding: &[f32], limit: usize)
        -> Result<Vec<CourseMatch>>;

    /// Catalog entry for an exact course title.
    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>>;

    /// Every catalog entry, sorted by title.
    async fn list_courses(&self) -> Result<Vec<CourseRecord>>;

    /// Number of catalog entries.
    async fn course_count(&self) -> Result<usize>;

    /// Number of content documents.
    async fn document_count(&self) -> Result<usize>;

    /// Remove all courses and documents.
    async fn clear(&self) -> Result<()>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort by descending score and keep the best `limit`.
pub(crate) fn rank<T>(mut items: Vec<T>, limit: usize, score: impl Fn(&T) -> f32) -> Vec<T> {
    items.sort_by(|a, b| {
        score(b)
            .partial_cmp(&score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_filter() {
        let doc = Document::new("MCP".to_string(), Some(2), 0, "text".to_string(), vec![]);

        assert!(SearchFilter::default().matches(&doc));
        assert!(SearchFilter {
            course_title: Some("MCP".to_string()),
            lesson_number: Some(2),
        }
        .matches(&doc));
        assert!(!SearchFilter {
            course_title: None,
            lesson_number: Some(3),
        }
        .matches(&doc));
        assert!(!SearchFilter {
            course_title: Some("Other".to_string()),
            lesson_number: None,
        }
        .matches(&doc));
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let ranked = rank(vec![0.2_f32, 0.9, 0.5], 2, |s| *s);
        assert_eq!(ranked, vec![0.9, 0.5]);
    }
}
