//! Course file parser.
//!
//! Expected layout:
//!
//! ```text
//! Course Title: Building Toward Computer Use
//! Course Link: https://example.com/course
//! Course Instructor: Colt Steele
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/course/lesson-0
//! Lesson body...
//! ```

use super::{CourseDocument, LessonDocument};
use crate::error::{PensumError, Result};
use regex::Regex;
use std::path::Path;

/// Parses course files into [`CourseDocument`]s.
pub struct CourseParser {
    header_field: Regex,
    lesson_header: Regex,
    lesson_link: Regex,
}

impl CourseParser {
    pub fn new() -> Self {
        Self {
            header_field: Regex::new(r"(?i)^course\s+(title|link|instructor)\s*:\s*(.*)$")
                .expect("Invalid regex"),
            lesson_header: Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.*)$").expect("Invalid regex"),
            lesson_link: Regex::new(r"(?i)^lesson\s+link\s*:\s*(.*)$").expect("Invalid regex"),
        }
    }

    /// Read and parse a course file.
    pub fn parse_file(&self, path: &Path) -> Result<CourseDocument> {
        let text = std::fs::read_to_string(path)?;
        self.parse(&text).map_err(|e| match e {
            PensumError::Document(msg) => {
                PensumError::Document(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parse the text of a course file.
    pub fn parse(&self, text: &str) -> Result<CourseDocument> {
        let mut title = None;
        let mut course_link = None;
        let mut instructor = None;
        let mut lessons: Vec<LessonDocument> = Vec::new();
        let mut preamble = Vec::new();
        let mut body: Vec<&str> = Vec::new();

        let mut lines = text.lines().map(str::trim_end).peekable();

        while let Some(line) = lines.next() {
            let trimmed = line.trim();

            if let Some(caps) = self.lesson_header.captures(trimmed) {
                if let Some(lesson) = lessons.last_mut() {
                    lesson.content = body.join("\n").trim().to_string();
                }
                body.clear();

                let number = caps[1].parse::<u32>().map_err(|e| {
                    PensumError::Document(format!("Invalid lesson number '{}': {}", &caps[1], e))
                })?;

                let link = match lines.peek().map(|l| l.trim()) {
                    Some(next) => self
                        .lesson_link
                        .captures(next)
                        .map(|c| c[1].trim().to_string()),
                    None => None,
                };
                if link.is_some() {
                    lines.next();
                }

                lessons.push(LessonDocument {
                    number,
                    title: caps[2].trim().to_string(),
                    link: link.filter(|l| !l.is_empty()),
                    content: String::new(),
                });
                continue;
            }

            if !lessons.is_empty() {
                body.push(line);
                continue;
            }

            match self.header_field.captures(trimmed) {
                Some(caps) => {
                    let value = caps[2].trim().to_string();
                    let slot = match caps[1].to_lowercase().as_str() {
                        "title" => &mut title,
                        "link" => &mut course_link,
                        _ => &mut instructor,
                    };
                    if slot.is_none() && !value.is_empty() {
                        *slot = Some(value);
                    }
                }
                None => preamble.push(line),
            }
        }

        if let Some(lesson) = lessons.last_mut() {
            lesson.content = body.join("\n").trim().to_string();
        }

        let title = title.ok_or_else(|| {
            PensumError::Document("Missing 'Course Title:' header".to_string())
        })?;

        let unstructured = if lessons.is_empty() {
            Some(preamble.join("\n").trim().to_string()).filter(|t| !t.is_empty())
        } else {
            None
        };

        Ok(CourseDocument {
            title,
            course_link,
            instructor,
            lessons,
            unstructured,
        })
    }
}

impl Default for CourseParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COURSE: &str = "Course Title: Building Toward Computer Use
Course Link: https://example.com/computer-use
Course Instructor: Colt Steele

Lesson 0: Introduction
Lesson Link: https://example.com/computer-use/intro
Welcome to the course. We will build agents.

Lesson 1: Working With The API
This lesson has no link.
It spans two lines.
";

    #[test]
    fn test_parse_full_course() {
        let doc = CourseParser::new().parse(COURSE).unwrap();

        assert_eq!(doc.title, "Building Toward Computer Use");
        assert_eq!(doc.course_link.as_deref(), Some("https://example.com/computer-use"));
        assert_eq!(doc.instructor.as_deref(), Some("Colt Steele"));
        assert_eq!(doc.unstructured, None);
        assert_eq!(doc.lessons.len(), 2);

        assert_eq!(doc.lessons[0].number, 0);
        assert_eq!(doc.lessons[0].title, "Introduction");
        assert_eq!(
            doc.lessons[0].link.as_deref(),
            Some("https://example.com/computer-use/intro")
        );
        assert_eq!(
            doc.lessons[0].content,
            "Welcome to the course. We will build agents."
        );

        assert_eq!(doc.lessons[1].link, None);
        assert_eq!(
            doc.lessons[1].content,
            "This lesson has no link.\nIt spans two lines."
        );
    }

    #[test]
    fn test_missing_title_is_rejected() {
        let err = CourseParser::new()
            .parse("Lesson 1: Orphan\ntext")
            .unwrap_err();
        assert!(matches!(err, PensumError::Document(_)));
    }

    #[test]
    fn test_course_without_lessons_keeps_body() {
        let doc = CourseParser::new()
            .parse("Course Title: Notes\n\nJust some free text.\nMore text.")
            .unwrap();

        assert!(doc.lessons.is_empty());
        assert_eq!(
            doc.unstructured.as_deref(),
            Some("Just some free text.\nMore text.")
        );
    }

    #[test]
    fn test_parse_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        std::fs::write(&path, "no header here").unwrap();

        let err = CourseParser::new().parse_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.txt"));
    }
}
