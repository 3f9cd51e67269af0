//! Collaborator seams consumed by the pipeline.
//!
//! The orchestrator only sees these traits; concrete HTTP and git
//! implementations are constructed by the caller and injected.

use super::SearchResponse;
use crate::models::Result;
use async_trait::async_trait;
use std::path::Path;

/// Web search.
#[async_trait]
pub trait Researcher: Send + Sync {
    async fn search(&self, topic: &str) -> Result<SearchResponse>;
}

/// Text generation. One contract for notes, knowledge synthesis and lessons.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
        max_output_tokens: Option<u32>,
    ) -> Result<String>;
}

/// Version control for the namespace directory.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Initialize a repository at `path` unless one exists.
    async fn ensure_repo(&self, path: &Path) -> Result<()>;

    /// Stage everything and commit. Returns false when there was nothing to commit.
    async fn commit(&self, path: &Path, message: &str) -> Result<bool>;

    /// Push the current branch to `remote_url`.
    async fn push(&self, path: &Path, remote_url: &str) -> Result<()>;
}
