//! Course document parsing and chunking.
//!
//! A course file is parsed into a [`CourseDocument`], whose lesson text is
//! then split into overlapping, sentence-aligned [`CourseChunk`]s ready for
//! embedding.

mod course;
mod sentence;

pub use course::CourseParser;
pub use sentence::SentenceChunker;

use serde::{Deserialize, Serialize};

/// One lesson of a course file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonDocument {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
    /// Lesson body, with line breaks preserved.
    pub content: String,
}

/// A parsed course file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDocument {
    pub title: String,
    pub course_link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<LessonDocument>,
    /// Body text of a file that has no lesson headers.
    pub unstructured: Option<String>,
}

/// A piece of course text ready to be embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    /// Position within the course, counted across lessons.
    pub chunk_index: u32,
    pub content: String,
}

/// Chunk sizes, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

impl From<&crate::config::ChunkingSettings> for ChunkingConfig {
    fn from(settings: &crate::config::ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}
