//! Resume analysis: what a run can skip.
//!
//! Two sources of truth:
//! - research and synthesis completion come from the checkpoint record
//! - lesson completion comes from the lesson files on disk, whatever the record says

use super::{CheckpointRecord, CheckpointStore};
use crate::content::{LESSON_EXTENSION, LESSON_PREFIX};
use crate::models::{Result, ScriptoriumError};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Derived, never persisted: recomputed at the start of every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeInfo {
    /// A checkpoint file was present
    pub has_checkpoint: bool,
    /// Checkpoint holds research notes
    pub can_skip_research: bool,
    /// Checkpoint holds a knowledge base (independent of research)
    pub can_skip_synthesis: bool,
    /// Keys of lesson files found on disk
    pub completed_lessons: BTreeSet<String>,
}

impl ResumeInfo {
    /// Whether anything at all can be reused.
    pub fn is_resuming(&self) -> bool {
        self.can_skip_research || self.can_skip_synthesis || !self.completed_lessons.is_empty()
    }
}

/// Inspects a namespace's checkpoint and lesson directory.
pub struct ResumeAnalyzer;

impl ResumeAnalyzer {
    /// Load the checkpoint of `namespace` and analyze it together with its lesson files.
    pub fn analyze(namespace: &Path) -> Result<ResumeInfo> {
        let store = CheckpointStore::new(namespace);
        let record = store.load();
        Self::inspect(&record, store.exists(), &namespace.join("lessons"))
    }

    /// Analyze an already loaded record against `lessons_dir`.
    pub fn inspect(
        record: &CheckpointRecord,
        has_checkpoint: bool,
        lessons_dir: &Path,
    ) -> Result<ResumeInfo> {
        let info = ResumeInfo {
            has_checkpoint,
            can_skip_research: !record.raw_notes.is_empty(),
            can_skip_synthesis: !record.knowledge_base.is_empty(),
            completed_lessons: Self::scan_lessons(lessons_dir)?,
        };

        debug!(
            has_checkpoint = info.has_checkpoint,
            skip_research = info.can_skip_research,
            skip_synthesis = info.can_skip_synthesis,
            lessons_on_disk = info.completed_lessons.len(),
            recorded_lessons = record.completed_lessons.len(),
            "Resume analysis"
        );
        Ok(info)
    }

    /// Keys of `lesson_*.md` files in `lessons_dir`; empty when the directory is missing.
    pub fn scan_lessons(lessons_dir: &Path) -> Result<BTreeSet<String>> {
        if !lessons_dir.is_dir() {
            return Ok(BTreeSet::new());
        }

        let escaped = glob::Pattern::escape(&lessons_dir.to_string_lossy());
        let pattern = format!("{escaped}/{LESSON_PREFIX}*.{LESSON_EXTENSION}");

        let keys = glob::glob(&pattern)
            .map_err(|e| ScriptoriumError::Internal(format!("Invalid glob pattern: {e}")))?
            .filter_map(|r| r.ok())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .collect();

        Ok(keys)
    }
}
