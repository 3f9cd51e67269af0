//! Durable snapshot of pipeline progress.

use crate::content::lesson_key;
use crate::models::{PipelineState, Source};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Checkpoint record persisted once per namespace.
///
/// Monotonic within a run: `absorb` only ever fills fields, it never clears
/// one that is already populated. Every field defaults, so files written by
/// older versions (or with `null` values) still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(deserialize_with = "null_as_default")]
    pub target_audience: String,
    #[serde(deserialize_with = "null_as_default")]
    pub research_sources: Vec<Source>,
    #[serde(deserialize_with = "null_as_default")]
    pub raw_notes: String,
    #[serde(deserialize_with = "null_as_default")]
    pub knowledge_base: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lesson_outline: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub completed_lessons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl CheckpointRecord {
    /// True when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.raw_notes.is_empty()
            && self.knowledge_base.is_empty()
            && self.lesson_outline.is_empty()
            && self.completed_lessons.is_empty()
    }

    /// Fold the durable parts of `state` into the record.
    ///
    /// Empty state fields leave the recorded value untouched. Completed
    /// lessons follow outline order and only include lessons held in `state`.
    pub fn absorb(&mut self, state: &PipelineState) {
        fill(&mut self.topic, &state.topic);
        fill(&mut self.target_audience, &state.target_audience);
        fill(&mut self.raw_notes, &state.raw_notes);
        fill(&mut self.knowledge_base, &state.knowledge_base);

        if !state.research_sources.is_empty() {
            self.research_sources = state.research_sources.clone();
        }
        if !state.lesson_outline.is_empty() {
            self.lesson_outline = state.lesson_outline.clone();
        }
        if !state.lessons.is_empty() {
            self.completed_lessons = state
                .lesson_outline
                .iter()
                .enumerate()
                .map(|(i, title)| lesson_key(i + 1, title))
                .filter(|key| state.lessons.contains_key(key))
                .collect();
        }

        self.updated_at = Some(Utc::now());
    }
}

fn fill(field: &mut String, value: &str) {
    if !value.is_empty() {
        *field = value.to_string();
    }
}
