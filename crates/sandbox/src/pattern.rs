// SPDX-License-Identifier: MIT

//! C2 Pattern Matcher (§4.2).
//!
//! Glob-style patterns for environment-key and import-specifier matching.
//! `*` is the sole metacharacter, meaning "any sequence" (including empty);
//! matching is fully anchored and case-sensitive.

/// True if `pattern` matches `text` in full (anchored, case-sensitive, `*`
/// as the only metacharacter).
pub fn matches_pattern(pattern: &str, text: &str) -> bool {
    match_from(pattern.as_bytes(), text.as_bytes())
}

fn match_from(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => {
            // Try consuming zero or more characters of `text` for this `*`.
            if match_from(rest, text) {
                return true;
            }
            !text.is_empty() && match_from(pattern, &text[1..])
        }
        Some((p, rest)) => match text.split_first() {
            Some((t, text_rest)) if t == p => match_from(rest, text_rest),
            _ => false,
        },
    }
}

/// True if `text` matches any pattern in `patterns`.
pub fn matches_any<'a>(patterns: impl IntoIterator<Item = &'a str>, text: &str) -> bool {
    patterns.into_iter().any(|p| matches_pattern(p, text))
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
