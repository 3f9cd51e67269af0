//! Checkpoint module for resumable pipeline execution.
//!
//! Provides:
//! - `CheckpointRecord`: Durable snapshot of stage progress
//! - `CheckpointStore`: Atomic persistence of the record in a namespace
//! - `ResumeAnalyzer`: Decides which stages and lessons a run can skip

mod record;
mod resume;
mod store;

pub use record::*;
pub use resume::*;
pub use store::*;
