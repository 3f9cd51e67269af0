//! Topic → namespace identifier.

use regex::Regex;
use std::sync::OnceLock;

/// Identifier used when a topic contains nothing but separators or dots.
pub const UNTITLED_SLUG: &str = "untitled";

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s/\\_-]+").expect("static pattern"))
}

/// Map a free-text topic to a stable, filesystem-safe directory name.
///
/// Lower-cases, turns runs of whitespace, path separators, underscores and
/// hyphens into a single hyphen, and trims hyphens from both ends. A result
/// made only of dots (`.`, `..`) would name the current or parent directory
/// and becomes [`UNTITLED_SLUG`]. Pure, total and idempotent. Distinct topics
/// may collide; that is accepted.
pub fn resolve(topic: &str) -> String {
    let lowered = topic.to_lowercase();
    let slug = separators().replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');

    if slug.chars().all(|c| c == '.') {
        UNTITLED_SLUG.to_string()
    } else {
        slug.to_string()
    }
}
