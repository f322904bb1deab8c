//! Citation extraction and pattern-table matching
//!
//! Citation classes are data: each class is a list of named requirements, each
//! requirement satisfied by any one of its patterns. The policy owns the table;
//! this module only evaluates it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// `Party v Party ...` up to the next clause break
static CASE_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[A-Z][\w'&-]*\s+)*?[A-Z][\w'&-]*\s+v\s+[A-Z][A-Za-z][^;.,\n]*").unwrap()
});

/// `Name Act ...` up to the next clause break
static STATUTE_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[A-Z][A-Za-z]+\s+)+(?:and\s+(?:[A-Z][A-Za-z]+\s+)+)?Act\b[^;.,\n]*").unwrap()
});

static NUANCE_NOTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:nuance|approved|persuasive|caution|note)").unwrap());

static TREATMENT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[(overruled|distinguished)\]").unwrap());

/// What a mention in prose refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    Case,
    Statute,
    /// The explicit "no verified authority" token
    Placeholder,
}

/// An authority named inside a block of prose
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub kind: MentionKind,
    pub text: String,
    /// Byte range inside the scanned text
    pub range: Range<usize>,
}

/// Find case, statute and placeholder mentions in order of appearance
///
/// Overlapping matches keep the one that starts first.
pub fn extract_mentions(text: &str, placeholder: Option<&str>) -> Vec<Mention> {
    let mut mentions: Vec<Mention> = Vec::new();

    let cases = CASE_MENTION.find_iter(text).map(|m| (MentionKind::Case, m.range()));
    let statutes = STATUTE_MENTION
        .find_iter(text)
        .map(|m| (MentionKind::Statute, m.range()));
    let placeholders = placeholder
        .filter(|token| !token.is_empty())
        .map(|token| {
            text.match_indices(token)
                .map(|(start, found)| (MentionKind::Placeholder, start..start + found.len()))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let mut candidates: Vec<(MentionKind, Range<usize>)> =
        cases.chain(statutes).chain(placeholders).collect();
    candidates.sort_by_key(|(_, range)| (range.start, std::cmp::Reverse(range.end)));

    for (kind, range) in candidates {
        if mentions.last().map_or(false, |last| range.start < last.range.end) {
            continue;
        }
        let trimmed = text[range.clone()].trim_end();
        let range = range.start..range.start + trimmed.len();
        mentions.push(Mention {
            kind,
            text: trimmed.to_string(),
            range,
        });
    }

    mentions
}

/// Whether an authority string carries a nuance or caution note
pub fn has_nuance_note(text: &str) -> bool {
    NUANCE_NOTE.is_match(text)
}

/// `overruled` / `distinguished` when the authority is flagged as such
pub fn treatment_marker(text: &str) -> Option<String> {
    TREATMENT_MARKER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// One named requirement of a citation class
#[derive(Debug, Clone)]
pub struct Requirement {
    pub label: String,
    patterns: Vec<Regex>,
}

impl Requirement {
    pub fn new(label: &str, patterns: Vec<Regex>) -> Self {
        Self {
            label: label.to_string(),
            patterns,
        }
    }

    fn is_satisfied(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}

/// Outcome of testing one string against a citation class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationCheck {
    pub passed: bool,
    /// Labels of the requirements the string failed
    pub missing: Vec<String>,
}

/// A citation class: named requirements plus a failure template
///
/// The template may use `{text}` (the tested string) and `{missing}` (the
/// comma-separated failed requirement labels).
#[derive(Debug, Clone)]
pub struct CitationClass {
    pub name: String,
    requirements: Vec<Requirement>,
    template: String,
}

impl CitationClass {
    pub fn new(name: &str, requirements: Vec<Requirement>, template: &str) -> Self {
        Self {
            name: name.to_string(),
            requirements,
            template: template.to_string(),
        }
    }

    /// Test a string against every requirement
    pub fn check(&self, text: &str) -> CitationCheck {
        let missing: Vec<String> = self
            .requirements
            .iter()
            .filter(|r| !r.is_satisfied(text))
            .map(|r| r.label.clone())
            .collect();
        CitationCheck {
            passed: missing.is_empty(),
            missing,
        }
    }

    /// Whether the string satisfies the named requirement
    ///
    /// Unknown labels count as satisfied.
    pub fn satisfies(&self, label: &str, text: &str) -> bool {
        self.requirements
            .iter()
            .filter(|r| r.label == label)
            .all(|r| r.is_satisfied(text))
    }

    /// Render the failure template for a string
    pub fn failure_message(&self, text: &str, check: &CitationCheck) -> String {
        self.template
            .replace("{missing}", &check.missing.join(", "))
            .replace("{text}", text)
    }
}

/// Ordered table of authority tiers, first match wins
#[derive(Debug, Clone)]
pub struct TierTable {
    tiers: Vec<(String, Vec<Regex>)>,
    fallback: String,
}

impl TierTable {
    pub fn new(tiers: Vec<(String, Vec<Regex>)>, fallback: &str) -> Self {
        Self {
            tiers,
            fallback: fallback.to_string(),
        }
    }

    /// Priority tag for an authority string
    pub fn classify(&self, text: &str) -> &str {
        self.tiers
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(text)))
            .map(|(tag, _)| tag.as_str())
            .unwrap_or(&self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap()
    }

    fn case_class() -> CitationClass {
        CitationClass::new(
            "case",
            vec![
                Requirement::new("year", vec![re(r"\b(?:1[5-9]|20)\d{2}\b")]),
                Requirement::new(
                    "neutral or report citation",
                    vec![
                        re(r"\[(?:1[5-9]|20)\d{2}\]\s*[A-Z][A-Za-z]*\s*\d+"),
                        re(r"\b\d+\s*[A-Z]{2,}[A-Za-z]*\s*\d+\b"),
                    ],
                ),
            ],
            "Authority missing year and neutral/report citation: {text}",
        )
    }

    #[test]
    fn test_extract_cases_and_statutes() {
        let text = "Step 1 — Sullivan v Moody (HCA 2001) [2001] HCA 59; 207 CLR 562 applies. \
                    Wrongs Act 1958 (Vic) s 48 frames breach.";
        let mentions = extract_mentions(text, None);
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].kind, MentionKind::Case);
        assert_eq!(mentions[0].text, "Sullivan v Moody (HCA 2001) [2001] HCA 59");
        assert_eq!(mentions[1].kind, MentionKind::Statute);
        assert_eq!(mentions[1].text, "Wrongs Act 1958 (Vic) s 48 frames breach");
        assert_eq!(&text[mentions[0].range.clone()], mentions[0].text);
    }

    #[test]
    fn test_multi_word_party_names() {
        let mentions = extract_mentions("Caparo Industries v Dickman [1990] UKHL 2 nuance", None);
        assert_eq!(mentions[0].text, "Caparo Industries v Dickman [1990] UKHL 2 nuance");
    }

    #[test]
    fn test_placeholder_mention() {
        let text = "Step 2 — [NO VERIFIED AUTHORITY FOUND] for this limb.";
        let mentions = extract_mentions(text, Some("[NO VERIFIED AUTHORITY FOUND]"));
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].kind, MentionKind::Placeholder);
    }

    #[test]
    fn test_case_class_check() {
        let class = case_class();
        assert!(class.check("Sullivan v Moody (2001) 207 CLR 562").passed);
        assert!(class.check("Sullivan v Moody [2001] HCA 59").passed);

        let text = "Entick v Carrington — possession-centred trespass liability";
        let check = class.check(text);
        assert!(!check.passed);
        assert_eq!(check.missing.len(), 2);
        assert_eq!(
            class.failure_message(text, &check),
            "Authority missing year and neutral/report citation: Entick v Carrington — possession-centred trespass liability"
        );
    }

    #[test]
    fn test_nuance_and_treatment() {
        assert!(has_nuance_note("Donoghue v Stevenson — persuasive only"));
        assert!(!has_nuance_note("Caparo Industries v Dickman [1990] UKHL 2 confirms proximity"));
        assert_eq!(
            treatment_marker("Jaensch v Coffey [Distinguished]"),
            Some("distinguished".to_string())
        );
        assert_eq!(treatment_marker("Jaensch v Coffey"), None);
    }

    #[test]
    fn test_tier_table() {
        let table = TierTable::new(
            vec![
                ("HCA".to_string(), vec![re(r"\bHCA\b"), re(r"\bCLR\b")]),
                ("UK/PC".to_string(), vec![re(r"\b(?:UKHL|AC)\b")]),
            ],
            "Other Aus",
        );
        assert_eq!(table.classify("Perre v Apand (1999) 198 CLR 180"), "HCA");
        assert_eq!(table.classify("Donoghue v Stevenson [1932] AC 562"), "UK/PC");
        assert_eq!(table.classify("Some v Trial [2010] VSC 1"), "Other Aus");
    }
}
