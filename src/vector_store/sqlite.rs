//! SQLite-based vector store implementation.
//!
//! Embeddings are stored as little-endian `f32` blobs and cosine similarity
//! is computed in Rust. Filters are applied in SQL before scoring.

use super::{
    cosine_similarity, rank, CourseMatch, CourseRecord, Document, LessonRecord, SearchFilter,
    SearchResult, VectorStore,
};
use crate::error::{PensumError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS courses (
        title TEXT PRIMARY KEY,
        instructor TEXT,
        course_link TEXT,
        lessons_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        course_title TEXT NOT NULL,
        lesson_number INTEGER,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_documents_course ON documents(course_title, lesson_number);
"#;

const COURSE_COLUMNS: &str = "title, instructor, course_link, lessons_json, embedding, indexed_at";

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let id_str: String = row.get(0)?;
    let embedding_bytes: Vec<u8> = row.get(5)?;
    let indexed_at: String = row.get(6)?;

    Ok(Document {
        id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
        course_title: row.get(1)?,
        lesson_number: row.get(2)?,
        chunk_index: row.get(3)?,
        content: row.get(4)?,
        embedding: SqliteVectorStore::bytes_to_embedding(&embedding_bytes),
        indexed_at: parse_timestamp(&indexed_at),
    })
}

fn row_to_course(row: &Row<'_>) -> rusqlite::Result<CourseRecord> {
    let lessons_json: String = row.get(3)?;
    let lessons: Vec<LessonRecord> = serde_json::from_str(&lessons_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let embedding_bytes: Vec<u8> = row.get(4)?;
    let indexed_at: String = row.get(5)?;

    Ok(CourseRecord {
        title: row.get(0)?,
        instructor: row.get(1)?,
        course_link: row.get(2)?,
        lessons,
        embedding: SqliteVectorStore::bytes_to_embedding(&embedding_bytes),
        indexed_at: parse_timestamp(&indexed_at),
    })
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, course), fields(title = %course.title))]
    async fn add_course(&self, course: &CourseRecord) -> Result<()> {
        let conn = self.lock()?;
        let lessons_json = serde_json::to_string(&course.lessons)?;

        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO courses ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                COURSE_COLUMNS
            ),
            params![
                course.title,
                course.instructor,
                course.course_link,
                lessons_json,
                Self::embedding_to_bytes(&course.embedding),
                course.indexed_at.to_rfc3339(),
            ],
        )?;

        debug!("Stored course metadata");
        Ok(())
    }

    #[instrument(skip(self, docs))]
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for doc in docs {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO documents
                (id, course_title, lesson_number, chunk_index, content, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    doc.id.to_string(),
                    doc.course_title,
                    doc.lesson_number,
                    doc.chunk_index,
                    doc.content,
                    Self::embedding_to_bytes(&doc.embedding),
                    doc.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch upserted {} documents", docs.len());
        Ok(docs.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, course_title, lesson_number, chunk_index, content, embedding, indexed_at
            FROM documents
            WHERE (?1 IS NULL OR course_title = ?1)
              AND (?2 IS NULL OR lesson_number = ?2)
            "#,
        )?;

        let results = stmt
            .query_map(
                params![filter.course_title, filter.lesson_number],
                row_to_document,
            )?
            .filter_map(|doc| doc.ok())
            .map(|doc| SearchResult {
                score: cosine_similarity(query_embedding, &doc.embedding),
                document: doc,
            })
            .collect();

        let results = rank(results, limit, |r| r.score);
        debug!("Found {} matching documents", results.len());
        Ok(results)
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_courses(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<CourseMatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM courses", COURSE_COLUMNS))?;

        let matches = stmt
            .query_map([], row_to_course)?
            .filter_map(|c| c.ok())
            .map(|course| CourseMatch {
                score: cosine_similarity(query_embedding, &course.embedding),
                course,
            })
            .collect();

        Ok(rank(matches, limit, |m| m.score))
    }

    async fn get_course(&self, title: &str) -> Result<Option<CourseRecord>> {
        let conn = self.lock()?;
        let course = conn
            .query_row(
                &format!("SELECT {} FROM courses WHERE title = ?1", COURSE_COLUMNS),
                params![title],
                row_to_course,
            )
            .optional()?;
        Ok(course)
    }

    async fn list_courses(&self) -> Result<Vec<CourseRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM courses ORDER BY title",
            COURSE_COLUMNS
        ))?;

        let courses = stmt
            .query_map([], row_to_course)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(courses)
    }

    async fn course_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn document_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM documents; DELETE FROM courses;")?;
        info!("Cleared course catalog and content");
        Ok(())
    }
}
