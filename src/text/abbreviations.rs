//! Abbreviation scanning and first-use expansion

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

static ALL_CAPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2,}\b").unwrap());

/// `Long Form (` immediately before the abbreviation
static LONG_FORM_BEFORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z\s'-]{3,}\s*\(\s*$").unwrap());

/// `(Long form)` immediately after the abbreviation
static LONG_FORM_AFTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\(\s*[A-Za-z][A-Za-z\s'-]{3,}\)").unwrap());

/// First occurrence of an all-caps token in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviation<'a> {
    pub token: &'a str,
    /// Byte offset of the first occurrence
    pub offset: usize,
    /// Whether the first occurrence is paired with its expansion
    pub defined: bool,
}

/// Scan `text` for all-caps tokens outside `whitelist`, reporting each once
pub fn first_uses<'a>(text: &'a str, whitelist: &BTreeSet<String>) -> Vec<Abbreviation<'a>> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for m in ALL_CAPS.find_iter(text) {
        let token = m.as_str();
        if whitelist.contains(token) || !seen.insert(token) {
            continue;
        }
        found.push(Abbreviation {
            token,
            offset: m.start(),
            defined: is_defined_at(text, m.start(), m.end()),
        });
    }

    found
}

fn is_defined_at(text: &str, start: usize, end: usize) -> bool {
    let before = &text[..start];
    let after = &text[end..];

    let wrapped = LONG_FORM_BEFORE.is_match(before) && after.trim_start().starts_with(')');
    wrapped || LONG_FORM_AFTER.is_match(after)
}

/// Insert ` (expansion)` right after the first occurrence of `token`
///
/// Returns `None` when the token does not occur as a whole word.
pub fn expand_first_use(text: &str, token: &str, expansion: &str) -> Option<String> {
    let m = ALL_CAPS.find_iter(text).find(|m| m.as_str() == token)?;
    let mut expanded = String::with_capacity(text.len() + expansion.len() + 3);
    expanded.push_str(&text[..m.end()]);
    expanded.push_str(" (");
    expanded.push_str(expansion);
    expanded.push(')');
    expanded.push_str(&text[m.end()..]);
    Some(expanded)
}
