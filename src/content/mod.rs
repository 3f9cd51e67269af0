//! Deterministic text helpers: namespace slugs, token budgeting and
//! lesson outline handling.

mod budget;
mod outline;
pub mod slug;

pub use budget::*;
pub use outline::*;
