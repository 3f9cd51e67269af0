//! Course index written at publish time.

use crate::content::{LESSON_EXTENSION, lesson_key};
use crate::models::PipelineState;
use std::fmt::Write;

/// Index file name inside a namespace.
pub const README_FILE: &str = "README.md";

/// Render the course README: title, audience, lesson links and sources.
pub fn render_readme(state: &PipelineState) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# {}\n", state.topic);
    let _ = writeln!(out, "Target audience: {}\n", state.target_audience);

    out.push_str("## Lessons\n\n");
    for (i, title) in state.lesson_outline.iter().enumerate() {
        let key = lesson_key(i + 1, title);
        let _ = writeln!(out, "{}. [{title}](lessons/{key}.{LESSON_EXTENSION})", i + 1);
    }

    if !state.research_sources.is_empty() {
        out.push_str("\n## Sources\n\n");
        for source in &state.research_sources {
            let _ = writeln!(out, "- [{}]({})", source.title, source.url);
        }
    }

    out
}
