//! Sentence-window chunking.
//!
//! Text is split into sentences and packed greedily into chunks of at most
//! `chunk_size` characters. Trailing sentences of a chunk that fit within
//! `chunk_overlap` characters are repeated at the start of the next one.

use super::{ChunkingConfig, CourseChunk, CourseDocument};
use regex::Regex;

/// Splits course text into overlapping, sentence-aligned chunks.
pub struct SentenceChunker {
    config: ChunkingConfig,
    whitespace: Regex,
    boundary: Regex,
}

impl SentenceChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            whitespace: Regex::new(r"\s+").expect("Invalid regex"),
            boundary: Regex::new(r"[.!?]\s+").expect("Invalid regex"),
        }
    }

    /// Split text into sentences. A boundary is terminal punctuation followed
    /// by whitespace and an uppercase letter.
    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        let normalized = self.whitespace.replace_all(text.trim(), " ");
        let mut sentences = Vec::new();
        let mut start = 0;

        for m in self.boundary.find_iter(&normalized) {
            let starts_upper = normalized[m.end()..]
                .chars()
                .next()
                .is_some_and(char::is_uppercase);
            if !starts_upper {
                continue;
            }
            // punctuation is a single ASCII byte
            sentences.push(normalized[start..m.start() + 1].trim().to_string());
            start = m.end();
        }
        sentences.push(normalized[start..].trim().to_string());

        sentences.retain(|s| !s.is_empty());
        sentences
    }

    /// Pack the sentences of `text` into chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let sentences = self.split_sentences(text);
        let ChunkingConfig {
            chunk_size,
            chunk_overlap,
        } = self.config;

        let mut chunks = Vec::new();
        let mut i = 0;

        while i < sentences.len() {
            let mut size = 0;
            let mut taken = 0;

            for sentence in &sentences[i..] {
                let len = sentence.chars().count();
                let space = usize::from(taken > 0);
                if taken > 0 && size + len + space > chunk_size {
                    break;
                }
                size += len + space;
                taken += 1;
            }

            chunks.push(sentences[i..i + taken].join(" "));
            if i + taken >= sentences.len() {
                break;
            }

            let mut overlap_size = 0;
            let mut overlap = 0;
            for (k, sentence) in sentences[i..i + taken].iter().enumerate().rev() {
                let len = sentence.chars().count() + usize::from(k + 1 < taken);
                if overlap_size + len > chunk_overlap {
                    break;
                }
                overlap_size += len;
                overlap += 1;
            }

            i = (i + taken - overlap).max(i + 1);
        }

        chunks
    }

    /// Chunk every lesson of a course, numbering chunks across the course.
    pub fn chunk_course(&self, course: &CourseDocument) -> Vec<CourseChunk> {
        let mut out = Vec::new();

        let mut push = |lesson_number: Option<u32>, prefix: String, text: &str| {
            for chunk in self.chunk_text(text) {
                out.push(CourseChunk {
                    course_title: course.title.clone(),
                    lesson_number,
                    chunk_index: out.len() as u32,
                    content: format!("{}{}", prefix, chunk),
                });
            }
        };

        for lesson in &course.lessons {
            push(
                Some(lesson.number),
                format!("Course {} Lesson {} content: ", course.title, lesson.number),
                &lesson.content,
            );
        }

        if let Some(text) = &course.unstructured {
            push(None, format!("Course {} content: ", course.title), text);
        }

        out
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::LessonDocument;

    fn chunker(chunk_size: usize, chunk_overlap: usize) -> SentenceChunker {
        SentenceChunker::new(ChunkingConfig {
            chunk_size,
            chunk_overlap,
        })
    }

    const TEXT: &str = "One two three. Four five six. Seven eight. Nine ten.";

    #[test]
    fn test_sentence_split() {
        let sentences = chunker(800, 100).split_sentences(
            "First   sentence here.\nSecond one! third stays attached? Fourth e.g. here.",
        );
        assert_eq!(
            sentences,
            vec![
                "First sentence here.",
                "Second one! third stays attached?",
                "Fourth e.g. here.",
            ]
        );
    }

    #[test]
    fn test_chunks_without_overlap() {
        let chunks = chunker(30, 12).chunk_text(TEXT);
        assert_eq!(
            chunks,
            vec!["One two three. Four five six.", "Seven eight. Nine ten."]
        );
    }

    #[test]
    fn test_chunks_carry_trailing_sentence() {
        let chunks = chunker(30, 15).chunk_text(TEXT);
        assert_eq!(
            chunks,
            vec![
                "One two three. Four five six.",
                "Four five six. Seven eight.",
                "Seven eight. Nine ten.",
            ]
        );
    }

    #[test]
    fn test_oversized_sentence_is_its_own_chunk() {
        let chunks = chunker(5, 0).chunk_text("A very long sentence. Short.");
        assert_eq!(chunks, vec!["A very long sentence.", "Short."]);
        assert!(chunker(5, 0).chunk_text("   ").is_empty());
    }

    #[test]
    fn test_course_chunks_are_prefixed_and_numbered() {
        let course = CourseDocument {
            title: "MCP".to_string(),
            course_link: None,
            instructor: None,
            lessons: vec![
                LessonDocument {
                    number: 0,
                    title: "Intro".to_string(),
                    link: None,
                    content: "Hello there.".to_string(),
                },
                LessonDocument {
                    number: 1,
                    title: "Tools".to_string(),
                    link: None,
                    content: "Tools are functions. Servers expose them.".to_string(),
                },
            ],
            unstructured: None,
        };

        let chunks = chunker(25, 0).chunk_course(&course);

        let summary: Vec<(Option<u32>, u32, &str)> = chunks
            .iter()
            .map(|c| (c.lesson_number, c.chunk_index, c.content.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some(0), 0, "Course MCP Lesson 0 content: Hello there."),
                (Some(1), 1, "Course MCP Lesson 1 content: Tools are functions."),
                (Some(1), 2, "Course MCP Lesson 1 content: Servers expose them."),
            ]
        );
    }
}
