//! Ingestion pipeline for Pensum.
//!
//! Coordinates parsing, chunking, embedding and indexing of course files.

use crate::chunking::{ChunkingConfig, CourseDocument, CourseParser, SentenceChunker};
use crate::config::Settings;
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{PensumError, Result};
use crate::vector_store::{
    CourseRecord, Document, LessonRecord, MemoryVectorStore, SqliteVectorStore, VectorStore,
};
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// File extensions treated as course documents.
const COURSE_EXTENSIONS: &[&str] = &["txt", "md"];

/// The ingestion orchestrator.
pub struct Orchestrator {
    settings: Settings,
    parser: CourseParser,
    chunker: SentenceChunker,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the configured embedder and store.
    pub fn new(settings: Settings) -> Result<Self> {
        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);

        let vector_store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "sqlite" => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
            "memory" => Arc::new(MemoryVectorStore::new()),
            other => {
                return Err(PensumError::Config(format!(
                    "Unknown vector store provider: {}",
                    other
                )))
            }
        };

        Ok(Self::with_components(settings, embedder, vector_store))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        let chunker = SentenceChunker::new(ChunkingConfig::from(&settings.chunking));
        Self {
            settings,
            parser: CourseParser::new(),
            chunker,
            embedder,
            vector_store,
        }
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Parse, chunk and index a single course file.
    ///
    /// A course whose title is already indexed is skipped.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn add_course_document(&self, path: &Path) -> Result<ProcessResult> {
        let course = self.parser.parse_file(path)?;

        if self.vector_store.get_course(&course.title).await?.is_some() {
            info!("Course '{}' is already indexed, skipping", course.title);
            return Ok(ProcessResult {
                title: course.title,
                chunks_indexed: 0,
                skipped: true,
            });
        }

        let chunks_indexed = self.index_course(&course).await?;
        Ok(ProcessResult {
            title: course.title,
            chunks_indexed,
            skipped: false,
        })
    }

    /// Index every course file in `folder`, returning `(courses, chunks)` added.
    ///
    /// Files that fail to parse are logged and skipped. With `clear_existing`
    /// the store is emptied first.
    #[instrument(skip(self), fields(folder = %folder.display()))]
    pub async fn add_course_folder(&self, folder: &Path, clear_existing: bool) -> Result<(usize, usize)> {
        if !folder.is_dir() {
            return Err(PensumError::InvalidInput(format!(
                "Folder {} does not exist",
                folder.display()
            )));
        }

        if clear_existing {
            info!("Clearing existing course data");
            self.vector_store.clear().await?;
        }

        let mut known: HashSet<String> = self
            .vector_store
            .list_courses()
            .await?
            .into_iter()
            .map(|c| c.title)
            .collect();

        let mut courses = 0;
        let mut chunks = 0;

        for path in course_files(folder)? {
            let course = match self.parser.parse_file(&path) {
                Ok(course) => course,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            if known.contains(&course.title) {
                debug!("Course '{}' already indexed", course.title);
                continue;
            }

            chunks += self.index_course(&course).await?;
            courses += 1;
            known.insert(course.title);
        }

        info!("Added {} courses with {} chunks", courses, chunks);
        Ok((courses, chunks))
    }

    /// Embed and store a parsed course and its chunks.
    async fn index_course(&self, course: &CourseDocument) -> Result<usize> {
        let record = CourseRecord {
            title: course.title.clone(),
            instructor: course.instructor.clone(),
            course_link: course.course_link.clone(),
            lessons: course
                .lessons
                .iter()
                .map(|l| LessonRecord {
                    number: l.number,
                    title: l.title.clone(),
                    link: l.link.clone(),
                })
                .collect(),
            embedding: self.embedder.embed(&course.title).await?,
            indexed_at: Utc::now(),
        };

        let chunks = self.chunker.chunk_course(course);
        info!("Indexing '{}' ({} chunks)", course.title, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let documents: Vec<Document> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                Document::new(
                    chunk.course_title,
                    chunk.lesson_number,
                    chunk.chunk_index,
                    chunk.content,
                    embedding,
                )
            })
            .collect();

        self.vector_store.add_course(&record).await?;
        if documents.is_empty() {
            return Ok(0);
        }
        self.vector_store.upsert_batch(&documents).await
    }
}

/// Course files directly inside `folder`, sorted by name.
fn course_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        let is_course = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| COURSE_EXTENSIONS.contains(&e.to_lowercase().as_str()));
        if path.is_file() && is_course {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Result of indexing one course file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Course title.
    pub title: String,
    /// Number of chunks indexed.
    pub chunks_indexed: usize,
    /// Whether processing was skipped (already indexed).
    pub skipped: bool,
}
