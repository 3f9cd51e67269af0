//! Core data models for scriptorium.
//!
//! - `Config`: operator-tunable settings loaded from TOML
//! - `PipelineState`: the typed working state threaded through the stages
//! - `ScriptoriumError`: the error taxonomy shared by every module

mod config;
mod error;
mod state;

pub use config::*;
pub use error::*;
pub use state::*;
