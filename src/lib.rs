//! scriptorium - Resumable research-to-course generation.
//!
//! ## Architecture
//!
//! A run turns one topic into a course through a fixed, linear pipeline:
//! - **Research**: web search, condensed into research notes
//! - **Synthesis**: notes become a knowledge base ending in a lesson outline
//! - **Writing**: one lesson file per outline entry
//! - **Publish**: README, commit, optional push
//!
//! ## Resumption
//!
//! Each topic owns a namespace directory (`<base>/<slug>`) holding a
//! `.checkpoint.json` record and a `lessons/` directory. The record is saved
//! after every completed unit of work, so rerunning a topic picks up exactly
//! where the previous run stopped and never regenerates finished work.
//!
//! External services (search, text generation, git) sit behind the traits in
//! [`client`] and are injected into the [`Orchestrator`].

pub mod checkpoint;
pub mod client;
pub mod content;
pub mod models;
pub mod pipeline;

// Re-exports for convenience
pub use checkpoint::{CheckpointRecord, CheckpointStore, ResumeAnalyzer, ResumeInfo};
pub use client::{ChatGenerator, GitCli, LLMClient, TavilySearch};
pub use content::{ContentBudgeter, TiktokenCounter};
pub use models::{Config, PipelineState, Result, RunReport, ScriptoriumError};
pub use pipeline::{Collaborators, Orchestrator, PipelineSettings, RunRequest, Stage};
