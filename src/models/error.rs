//! Error types for scriptorium.
//!
//! Taxonomy:
//! - Configuration: missing credentials or unreadable config, fatal before any stage
//! - Collaborator failures: search, generation or git calls that failed, abort the run
//! - Internal: invariant violations (bugs)
//!
//! Checkpoint corruption has no variant: the store recovers it in place.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for scriptorium.
#[derive(Debug, Error)]
pub enum ScriptoriumError {
    // ═══════════════════════════════════════════════════════════════════
    // CONFIGURATION — operator must fix before rerunning
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Repository directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    // ═══════════════════════════════════════════════════════════════════
    // COLLABORATOR FAILURES — propagated, next run resumes at the same unit
    // ═══════════════════════════════════════════════════════════════════

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: f64 },

    #[error("git {command} failed: {stderr}")]
    VersionControl { command: String, stderr: String },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // INTERNAL — invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors reported by an HTTP collaborator (chat completions or search).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl ScriptoriumError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the error must be fixed by the operator rather than by rerunning.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::MissingDirectory(_))
    }
}

/// Result type alias for scriptorium.
pub type Result<T> = std::result::Result<T, ScriptoriumError>;
