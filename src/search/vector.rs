//! [`SearchBackend`] over an embedder and a vector store.

use super::{ChunkMetadata, CourseOutline, LessonOutline, SearchBackend, SearchHit, SearchResults};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{CourseRecord, SearchFilter, VectorStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Semantic search over indexed course content.
///
/// Course names given by the model are matched loosely: an exact title wins,
/// otherwise the course whose title embedding is nearest is used.
pub struct VectorSearch {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    max_results: usize,
}

impl VectorSearch {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, max_results: usize) -> Self {
        Self {
            embedder,
            store,
            max_results,
        }
    }

    async fn resolve_course(&self, course_name: &str) -> Result<Option<CourseRecord>> {
        if let Some(course) = self.store.get_course(course_name).await? {
            return Ok(Some(course));
        }

        let embedding = self.embedder.embed(course_name).await?;
        let best = self
            .store
            .search_courses(&embedding, 1)
            .await?
            .into_iter()
            .next();

        if let Some(m) = &best {
            debug!("Resolved '{}' to '{}' ({:.3})", course_name, m.course.title, m.score);
        }
        Ok(best.map(|m| m.course))
    }

    async fn search_inner(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        let course_title = match course_name {
            Some(name) => match self.resolve_course(name).await? {
                Some(course) => Some(course.title),
                None => {
                    return Ok(SearchResults::error(format!(
                        "No course found matching '{}'",
                        name
                    )))
                }
            },
            None => None,
        };

        let filter = SearchFilter {
            course_title,
            lesson_number,
        };
        let embedding = self.embedder.embed(query).await?;
        let results = self
            .store
            .search(&embedding, self.max_results, &filter)
            .await?;

        let hits = results
            .into_iter()
            .map(|r| SearchHit {
                metadata: ChunkMetadata {
                    course_title: r.document.course_title,
                    lesson_number: r.document.lesson_number,
                    chunk_index: r.document.chunk_index,
                },
                content: r.document.content,
                score: r.score,
            })
            .collect();

        Ok(SearchResults::from_hits(hits))
    }
}

#[async_trait]
impl SearchBackend for VectorSearch {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        self.search_inner(query, course_name, lesson_number)
            .await
            .unwrap_or_else(|e| SearchResults::error(format!("Search error: {}", e)))
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        Ok(self
            .store
            .get_course(course_title)
            .await?
            .and_then(|course| course.lesson(lesson_number).and_then(|l| l.link.clone())))
    }

    #[instrument(skip(self))]
    async fn course_outline(&self, course_name: &str) -> Result<Option<CourseOutline>> {
        Ok(self
            .resolve_course(course_name)
            .await?
            .map(|course| CourseOutline {
                title: course.title,
                course_link: course.course_link,
                lessons: course
                    .lessons
                    .into_iter()
                    .map(|l| LessonOutline {
                        number: l.number,
                        title: l.title,
                        link: l.link,
                    })
                    .collect(),
            }))
    }

    async fn course_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_courses()
            .await?
            .into_iter()
            .map(|c| c.title)
            .collect())
    }
}
