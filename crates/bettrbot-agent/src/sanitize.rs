//! Plain-text cleanup for model output.
//!
//! The coach is instructed to answer in plain bullet points, but models still
//! emit markdown emphasis, headings and code fences. Everything here is total:
//! any input, including the empty string, produces a value.

/// Markdown punctuation removed wherever it appears.
pub const MARKDOWN_CHARS: [char; 5] = ['*', '_', '#', '`', '~'];

/// Strip markdown punctuation, collapse every whitespace run (newlines
/// included) to a single space and trim both ends.
///
/// Bullet dashes survive; only `*`, `_`, `#`, backtick and `~` are removed. The function is
/// idempotent.
pub fn clean_text(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !MARKDOWN_CHARS.contains(c)).collect();
    let stripped = stripped.replace("**", "").replace("```", "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
