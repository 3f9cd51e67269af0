//! Course pipeline: prompts, stage orchestration and publishing.

mod orchestrator;
pub mod prompts;
mod publish;
#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::*;
pub use publish::*;
