//! Checkpoint persistence.
//!
//! - One JSON file per namespace, fully rewritten on every save
//! - Writes go to a temp file and are renamed into place
//! - A missing file loads as an empty record; so does a corrupt one, with a warning

use super::CheckpointRecord;
use crate::models::{Result, ScriptoriumError};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Checkpoint file name inside a namespace.
pub const CHECKPOINT_FILE: &str = ".checkpoint.json";

const CHECKPOINT_TEMP_FILE: &str = ".checkpoint.tmp.json";

/// Reads and writes the checkpoint record of one namespace.
///
/// Single writer: concurrent runs against the same namespace are not supported.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    /// Namespace directory
    dir: PathBuf,
    /// Path to the checkpoint file
    checkpoint_path: PathBuf,
}

impl CheckpointStore {
    /// Create a store for `namespace`. Does not touch the filesystem.
    pub fn new(namespace: &Path) -> Self {
        Self {
            dir: namespace.to_path_buf(),
            checkpoint_path: namespace.join(CHECKPOINT_FILE),
        }
    }

    /// Path of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Check if a checkpoint exists.
    pub fn exists(&self) -> bool {
        self.checkpoint_path.exists()
    }

    /// Load the checkpoint record.
    ///
    /// Never fails: an unreadable record costs a stage rerun, not the run.
    pub fn load(&self) -> CheckpointRecord {
        let content = match fs::read_to_string(&self.checkpoint_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return CheckpointRecord::default(),
            Err(e) => {
                warn!(
                    path = %self.checkpoint_path.display(),
                    error = %e,
                    "Could not read checkpoint, starting fresh"
                );
                return CheckpointRecord::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    path = %self.checkpoint_path.display(),
                    error = %e,
                    "Checkpoint is corrupt, starting fresh"
                );
                CheckpointRecord::default()
            }
        }
    }

    /// Save the checkpoint record, replacing any previous content.
    pub fn save(&self, record: &CheckpointRecord) -> Result<()> {
        let temp_path = self.dir.join(CHECKPOINT_TEMP_FILE);

        {
            let file = File::create(&temp_path)
                .map_err(|e| ScriptoriumError::io("creating temp checkpoint", e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, record)
                .map_err(|e| ScriptoriumError::Internal(format!("Serializing checkpoint: {e}")))?;
            writer
                .flush()
                .map_err(|e| ScriptoriumError::io("flushing checkpoint", e))?;
        }

        fs::rename(&temp_path, &self.checkpoint_path)
            .map_err(|e| ScriptoriumError::io("renaming checkpoint", e))?;

        debug!(
            path = %self.checkpoint_path.display(),
            completed_lessons = record.completed_lessons.len(),
            "Checkpoint saved"
        );
        Ok(())
    }
}
