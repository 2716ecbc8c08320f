//! Text helpers shared by the search and completion stages.

use lazy_static::lazy_static;
use regex::Regex;

/// Appended to any text cut by [`truncate_text`].
pub const ELLIPSIS: &str = "...";

lazy_static! {
    /// Scheme and optional `www.` prefix of a URL.
    static ref URL_PREFIX: Regex = Regex::new(r"^https?://(www\.)?").unwrap();

    /// A Markdown code fence wrapping the whole payload, with optional language tag.
    static ref CODE_FENCE: Regex =
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_+-]*[ \t]*\n?(.*?)\n?\s*```\s*$").unwrap();
}

/// Cut `text` to at most `max_chars` characters, appending [`ELLIPSIS`]
/// when anything was removed.
///
/// Lengths count Unicode scalar values, so multi-byte text never splits
/// inside a character.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut cut = String::with_capacity(byte_idx + ELLIPSIS.len());
            cut.push_str(&text[..byte_idx]);
            cut.push_str(ELLIPSIS);
            cut
        }
        None => text.to_string(),
    }
}

/// [`truncate_text`] lifted over an optional field.
pub fn truncate_opt(text: Option<String>, max_chars: usize) -> Option<String> {
    text.map(|t| truncate_text(&t, max_chars))
}

/// Derive a readable title from the last path segment of a URL.
///
/// `https://www.example.com/blog/how-to_cook` becomes `How To Cook`.
pub fn title_from_url(url: &str) -> String {
    let sanitized = URL_PREFIX.replace(url, "");
    let path = sanitized.split(['?', '#']).next().unwrap_or_default();
    let last = path.split('/').filter(|part| !part.is_empty()).last();

    let Some(segment) = last else {
        return sanitized.to_string();
    };

    segment
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// Remove a Markdown code fence wrapping the entire payload.
///
/// Models often answer ```` ```json [...] ``` ```` even when told to return
/// bare JSON. Text without a surrounding fence is returned trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}
