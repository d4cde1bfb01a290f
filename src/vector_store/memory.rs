//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{
    cosine_similarity, rank, CourseMatch, CourseRecord, Document, SearchFilter, SearchResult,
    VectorStore,
};
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Collections {
    courses: HashMap<String, CourseRecord>,
    documents: HashMap<String, Document>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Collections>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        self.inner
            .read()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        self.inner
            .write()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_course(&self, course: &CourseRecord) -> Result<()> {
        self.write()?
            .courses
            .insert(course.title.clone(), course.clone());
        Ok(())
    }

    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize> {
        let mut store = self.write()?;
        for doc in docs {
            store.documents.insert(doc.id.to_string(), doc.clone());
        }
        Ok(docs.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchResult>> {
        let store = self.read()?;

        let results = store
            .documents
            .values()
            .filter(|doc| filter.matches(doc))
            .map(|doc| SearchResult {
                score: cosine_similarity(query_embedding, &doc.embedding),
                document: doc.clone(),
            })
            .collect();

        Ok(rank(results, limit, |r| r.score))
    }

    async fn search_courses(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CourseMatch>> {
        let store = self.read()?;

        let matches = store
            .courses
            .values()
            .map(|course| CourseMatch {
                score: cosine_similarity(query_embedding, &course.embedding),
                course: course.clone(),
            })
            .collect();

        Ok(rank(matches, limit, |m| m.score))
    }

    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>> {
        Ok(self.read()?.courses.get(title).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<CourseRecord>> {
        let mut courses: Vec<CourseRecord> = self.read()?.courses.values().cloned().collect();
        courses.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(courses)
    }

    async fn course_count(&self) -> Result<usize> {
        Ok(self.read()?.courses.len())
    }

    async fn document_count(&self) -> Result<usize> {
        Ok(self.read()?.documents.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut store = self.write()?;
        store.courses.clear();
        store.documents.clear();
        Ok(())
    }
}
