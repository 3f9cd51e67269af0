//! Collaborator clients: chat completions, web search and git.

mod collaborator;
mod git;
mod llm_client;
mod search;

pub use collaborator::*;
pub use git::*;
pub use llm_client::*;
pub use search::*;
