//! Text helpers shared by the crawler and the clients.
//!
//! Slugs are the dedup key for concepts, so `slugify` must stay stable
//! across releases: changing it invalidates every persisted dedup store.

use std::sync::LazyLock;

use regex::Regex;

static RE_NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid slug regex"));

/// Normalize a topic name into a lowercase, hyphen-separated slug.
///
/// Apostrophes and quotes are dropped rather than split on, so
/// `"Newton's laws"` becomes `newtons-laws`.
pub fn slugify(name: &str) -> String {
    let lowered: String = name
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '\u{2019}'))
        .flat_map(char::to_lowercase)
        .collect();
    RE_NON_WORD
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Replace every line-break variant (`\r\n`, `\n\r`, `\n`, `\r`) with a
/// single space.
pub fn collapse_line_breaks(text: &str) -> String {
    normalize(text, None)
}

/// Collapse line breaks and replace every occurrence of `delimiter` with a
/// space, so the value can never split a tabular row.
pub fn normalize_field(text: &str, delimiter: char) -> String {
    normalize(text, Some(delimiter))
}

fn normalize(text: &str, delimiter: Option<char>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            '\n' => {
                if chars.peek() == Some(&'\r') {
                    chars.next();
                }
                out.push(' ');
            }
            c if Some(c) == delimiter => out.push(' '),
            c => out.push(c),
        }
    }
    out
}
