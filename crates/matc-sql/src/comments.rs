//! SQL comment stripping

use regex::Regex;
use std::sync::OnceLock;

static COMMENT_RE: OnceLock<Regex> = OnceLock::new();

fn comment_re() -> &'static Regex {
    COMMENT_RE.get_or_init(|| Regex::new(r"(?ms)/\*.*?\*/|(^|\s)--.*?\n").expect("valid regex"))
}

/// Replace every block comment and newline-terminated line comment with a
/// single newline.
///
/// A `--` with no newline after it (e.g. at end of input) is left alone, as is
/// a `--` glued to a preceding non-space character.
pub fn strip_comments(sql: &str) -> String {
    comment_re().replace_all(sql, "\n").into_owned()
}

#[cfg(test)]
#[path = "comments_test.rs"]
mod tests;
