//! Token budgeting for oversized prompt inputs.
//!
//! Long inputs are cut from the middle: the head usually carries setup and
//! context, the tail carries conclusions. If the line-level cut is still over
//! budget, a proportional character cut finishes the job.

use crate::models::{Result, ScriptoriumError};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

/// Fraction of the budget targeted by the line-level cut.
const KEEP_RATIO: f64 = 0.8;

/// Fraction of the budget targeted by the character-level fallback.
const HARD_CUT_RATIO: f64 = 0.7;

/// Spliced between the kept head and tail lines.
pub const LINE_TRUNCATION_MARKER: &str = "\n\n[... CONTENT TRUNCATED TO FIT TOKEN LIMIT ...]\n\n";

/// Appended after a character-level cut.
pub const HARD_TRUNCATION_MARKER: &str = "\n\n[... TRUNCATED ...]";

/// Counts model-specific units (tokens) in a string.
///
/// Implementations must return 0 for the empty string.
pub trait UnitCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// `cl100k_base` BPE counter, close enough for the chat models in use.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ScriptoriumError::Internal(format!("Loading cl100k_base: {e}")))?;
        Ok(Self { bpe })
    }
}

impl UnitCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Keeps text within a unit budget.
#[derive(Clone)]
pub struct ContentBudgeter {
    counter: Arc<dyn UnitCounter>,
}

impl ContentBudgeter {
    pub fn new(counter: Arc<dyn UnitCounter>) -> Self {
        Self { counter }
    }

    /// Count units with the configured counter.
    pub fn count(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Fit `text` into `max_units`.
    ///
    /// Returns the (possibly shortened) text and whether anything was cut.
    /// Deterministic for identical input and budget; the result never
    /// measures more than `max_units`.
    pub fn fit(&self, text: &str, max_units: usize) -> (String, bool) {
        let total = self.counter.count(text);
        if total <= max_units {
            return (text.to_string(), false);
        }

        let candidate = keep_head_and_tail(text, KEEP_RATIO * max_units as f64 / total as f64);
        let measured = self.counter.count(&candidate);
        if measured <= max_units {
            return (candidate, true);
        }

        debug!(measured, max_units, "Line cut insufficient, cutting characters");
        (self.hard_cut(&candidate, measured, max_units), true)
    }

    /// `fit` with a warning naming the content when it had to be cut.
    pub fn fit_for_prompt(&self, text: &str, max_units: usize, content_name: &str) -> String {
        let (fitted, truncated) = self.fit(text, max_units);
        if truncated {
            warn!(
                content = content_name,
                original_tokens = self.counter.count(text),
                final_tokens = self.counter.count(&fitted),
                limit = max_units,
                "Truncated to fit token limit"
            );
        }
        fitted
    }

    fn hard_cut(&self, text: &str, mut measured: usize, max_units: usize) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut limit = chars.len();

        loop {
            let ratio = (max_units as f64 * HARD_CUT_RATIO) / measured.max(1) as f64;
            let next = (limit as f64 * ratio) as usize;
            // Strictly shrink so the loop terminates even when the ratio rounds up.
            limit = next.min(limit.saturating_sub(1));

            let mut candidate: String = chars[..limit].iter().collect();
            candidate.push_str(HARD_TRUNCATION_MARKER);
            measured = self.counter.count(&candidate);

            if measured <= max_units {
                return candidate;
            }
            if limit == 0 {
                // Not even the marker fits.
                return String::new();
            }
        }
    }
}

/// Keep the first and last `keep_ratio / 2` of the lines around a marker.
fn keep_head_and_tail(text: &str, keep_ratio: f64) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let total = lines.len();
    let keep = ((total as f64 * keep_ratio * 0.5) as usize).min(total / 2);

    let mut kept = Vec::with_capacity(keep * 2 + 1);
    kept.extend_from_slice(&lines[..keep]);
    kept.push(LINE_TRUNCATION_MARKER);
    if keep > 0 {
        kept.extend_from_slice(&lines[total - keep..]);
    }
    kept.join("\n")
}
