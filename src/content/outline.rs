//! Lesson outline parsing and lesson-unit naming.

use std::path::{Path, PathBuf};

/// Outline used when synthesis output carries no recognizable outline section.
pub const DEFAULT_OUTLINE: [&str; 4] = [
    "Introduction and Fundamentals",
    "Core Concepts",
    "Practical Applications",
    "Advanced Topics",
];

/// Prefix shared by every lesson key and artifact file.
pub const LESSON_PREFIX: &str = "lesson_";

/// Extension of lesson artifact files.
pub const LESSON_EXTENSION: &str = "md";

const MAX_TITLE_CHARS: usize = 50;

/// Extract lesson titles from the `## LESSON OUTLINE` section of synthesis output.
///
/// Never returns an empty outline: falls back to [`DEFAULT_OUTLINE`].
pub fn extract_lesson_outline(synthesis_output: &str) -> Vec<String> {
    let mut lessons = Vec::new();
    let mut in_outline = false;

    for line in synthesis_output.lines() {
        let trimmed = line.trim();

        if !in_outline {
            if trimmed.starts_with('#') && trimmed.to_lowercase().contains("lesson outline") {
                in_outline = true;
            }
            continue;
        }

        if trimmed.starts_with("##") && !trimmed.to_lowercase().contains("lesson") {
            break;
        }

        let is_entry = trimmed
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '*');
        if !is_entry {
            continue;
        }

        let title = trimmed
            .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | '*' | ')' | ' '))
            .trim();
        if !title.is_empty() {
            lessons.push(title.to_string());
        }
    }

    if lessons.is_empty() {
        return DEFAULT_OUTLINE.iter().map(|t| t.to_string()).collect();
    }
    lessons
}

/// Filesystem-safe form of a lesson title (lower-case, `_` for spaces, max 50 chars).
pub fn sanitize_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .take(MAX_TITLE_CHARS)
        .collect()
}

/// Stable key for the outline entry at 1-based `position`.
///
/// A pure function of (position, title): an unchanged outline always maps to
/// the same keys, which is what lets reruns find existing lesson files.
pub fn lesson_key(position: usize, title: &str) -> String {
    format!("{LESSON_PREFIX}{position:02}_{}", sanitize_title(title))
}

/// Artifact path of a lesson key inside `lessons_dir`.
pub fn lesson_path(lessons_dir: &Path, key: &str) -> PathBuf {
    lessons_dir.join(format!("{key}.{LESSON_EXTENSION}"))
}
