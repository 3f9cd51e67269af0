//! Pipeline state types.
//!
//! `PipelineState` is owned by the orchestrator for the duration of a run and
//! is its return value. Stages never mutate it directly; each hands back a
//! `StageOutput` which is merged with `PipelineState::apply`.

use crate::content::lesson_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A research source kept for attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: f64,
}

/// Partial update produced by one stage (or one lesson unit).
#[derive(Debug, Clone)]
pub enum StageOutput {
    Research {
        sources: Vec<Source>,
        raw_notes: String,
    },
    Synthesis {
        knowledge_base: String,
        lesson_outline: Vec<String>,
    },
    Lesson {
        key: String,
        content: String,
    },
    Published {
        url: String,
    },
}

/// What a run actually did versus what it reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub research_skipped: bool,
    pub synthesis_skipped: bool,
    pub lessons_written: usize,
    pub lessons_reused: usize,
}

/// Full working state of one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub topic: String,
    pub target_audience: String,
    /// Namespace directory; empty until setup completes
    pub namespace: PathBuf,
    pub research_sources: Vec<Source>,
    pub raw_notes: String,
    pub knowledge_base: String,
    pub lesson_outline: Vec<String>,
    /// Lesson key → body. Use `lesson_bodies` for outline order: key order
    /// diverges from it past 99 lessons (`lesson_100_` sorts before `lesson_10_`).
    pub lessons: BTreeMap<String, String>,
    pub publish_url: String,
    pub report: RunReport,
}

impl PipelineState {
    /// Create the initial state for a run.
    pub fn new(topic: impl Into<String>, target_audience: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            target_audience: target_audience.into(),
            ..Default::default()
        }
    }

    /// Merge a stage's output into the state.
    pub fn apply(&mut self, output: StageOutput) {
        match output {
            StageOutput::Research { sources, raw_notes } => {
                self.research_sources = sources;
                self.raw_notes = raw_notes;
            }
            StageOutput::Synthesis {
                knowledge_base,
                lesson_outline,
            } => {
                self.knowledge_base = knowledge_base;
                self.lesson_outline = lesson_outline;
            }
            StageOutput::Lesson { key, content } => {
                self.lessons.insert(key, content);
            }
            StageOutput::Published { url } => {
                self.publish_url = url;
            }
        }
    }

    /// Number of lesson bodies held.
    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }

    /// Lesson bodies in outline order, skipping entries not written yet.
    pub fn lesson_bodies(&self) -> impl Iterator<Item = &str> {
        self.lesson_outline
            .iter()
            .enumerate()
            .filter_map(|(i, title)| self.lessons.get(&lesson_key(i + 1, title)))
            .map(String::as_str)
    }

    /// Lessons directory inside the namespace.
    pub fn lessons_dir(&self) -> PathBuf {
        self.namespace.join("lessons")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_merges_each_stage() {
        let mut state = PipelineState::new("Intro to Caching", "backend developers");

        state.apply(StageOutput::Research {
            sources: vec![Source {
                title: "Caching 101".to_string(),
                url: "https://example.com".to_string(),
                score: 0.9,
            }],
            raw_notes: "notes".to_string(),
        });
        state.apply(StageOutput::Synthesis {
            knowledge_base: "kb".to_string(),
            lesson_outline: vec!["Basics".to_string(), "Eviction".to_string()],
        });
        state.apply(StageOutput::Lesson {
            key: "lesson_02_eviction".to_string(),
            content: "second".to_string(),
        });
        state.apply(StageOutput::Lesson {
            key: "lesson_01_basics".to_string(),
            content: "first".to_string(),
        });

        assert_eq!(state.research_sources.len(), 1);
        assert_eq!(state.raw_notes, "notes");
        assert_eq!(state.knowledge_base, "kb");
        assert_eq!(state.lesson_count(), 2);
        assert_eq!(
            state.lesson_bodies().collect::<Vec<_>>(),
            vec!["first", "second"]
        );
    }

    #[test]
    fn test_lesson_bodies_follow_outline_past_99_lessons() {
        let mut state = PipelineState::new("Everything", "everyone");
        let outline: Vec<String> = (1..=101).map(|i| format!("Part {i}")).collect();
        state.apply(StageOutput::Synthesis {
            knowledge_base: "kb".to_string(),
            lesson_outline: outline.clone(),
        });
        for (i, title) in outline.iter().enumerate() {
            state.apply(StageOutput::Lesson {
                key: lesson_key(i + 1, title),
                content: title.clone(),
            });
        }

        let bodies: Vec<&str> = state.lesson_bodies().collect();
        assert_eq!(bodies.len(), 101);
        assert_eq!(bodies[9], "Part 10");
        assert_eq!(bodies[99], "Part 100");
        assert_eq!(bodies[100], "Part 101");
    }

    #[test]
    fn test_source_defaults_missing_fields() {
        let source: Source = serde_json::from_str(r#"{"url": "https://x.dev"}"#).unwrap();
        assert_eq!(source.title, "");
        assert_eq!(source.score, 0.0);
    }
}
