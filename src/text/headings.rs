//! Heading extraction for the back of a card
//!
//! A heading is a line reading exactly `<Label>.` for one of the known labels,
//! or starting with `<Label>. ` followed by text (an inline heading). Lines
//! that look like a decorated variant of a known label (`## Rule`, `**Rule**`,
//! `Authorities:`, `rule.`) are reported too, marked as not exact, so callers
//! can tell a misnamed heading from a missing one.

use std::ops::Range;

/// One heading found in a block of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Index of the known label this heading stands for
    pub index: usize,
    /// The heading text as written, without decoration
    pub written: String,
    /// `<Label>.` spelled exactly
    pub exact: bool,
    /// Heading and body share a line
    pub inline: bool,
    /// 0-based line number
    pub line: usize,
    /// Byte offset where the heading's line starts
    pub line_start: usize,
    /// Bytes of the heading marker itself
    pub marker: Range<usize>,
    /// Bytes owned by this heading, up to the next heading
    pub body: Range<usize>,
}

/// The headings of a text and the spans they own
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub headings: Vec<Heading>,
    /// Text before the first heading
    pub preamble: Range<usize>,
}

impl Outline {
    /// Scan `text` for the `known` heading labels
    pub fn parse<S: AsRef<str>>(text: &str, known: &[S]) -> Self {
        let mut headings: Vec<Heading> = Vec::new();
        let mut offset = 0;

        for (line_no, raw_line) in text.split_inclusive('\n').enumerate() {
            let line_start = offset;
            offset += raw_line.len();

            let content = raw_line.trim_end_matches(&['\n', '\r'][..]);
            let trimmed = content.trim_start();
            let indent = content.len() - trimmed.len();
            let trimmed = trimmed.trim_end();
            let start = line_start + indent;

            if let Some(heading) = exact_heading(trimmed, known, start, line_no, line_start) {
                headings.push(heading);
                continue;
            }
            if let Some((index, written)) = heading_candidate(trimmed, known) {
                headings.push(Heading {
                    index,
                    written,
                    exact: false,
                    inline: false,
                    line: line_no,
                    line_start,
                    marker: start..start + trimmed.len(),
                    body: line_start + raw_line.len()..0,
                });
            }
        }

        for i in 0..headings.len() {
            let end = headings
                .get(i + 1)
                .map_or(text.len(), |next| next.line_start);
            let heading = &mut headings[i];
            if !heading.inline {
                heading.body.start = heading.body.start.min(end);
            }
            heading.body.end = end;
        }

        let preamble = 0..headings.first().map_or(text.len(), |h| h.line_start);
        Self { headings, preamble }
    }

    /// First exactly-spelled heading for a label
    pub fn find(&self, index: usize) -> Option<&Heading> {
        self.headings.iter().find(|h| h.exact && h.index == index)
    }

    /// Body text of the first exact heading for a label, trimmed
    pub fn section<'t>(&self, text: &'t str, index: usize) -> Option<&'t str> {
        self.find(index).map(|h| text[h.body.clone()].trim())
    }

    /// Number of exact headings for a label
    pub fn count(&self, index: usize) -> usize {
        self.headings
            .iter()
            .filter(|h| h.exact && h.index == index)
            .count()
    }

    /// Exact headings in order of appearance
    pub fn exact(&self) -> impl Iterator<Item = &Heading> {
        self.headings.iter().filter(|h| h.exact)
    }
}

fn exact_heading<S: AsRef<str>>(
    trimmed: &str,
    known: &[S],
    start: usize,
    line: usize,
    line_start: usize,
) -> Option<Heading> {
    for (index, label) in known.iter().enumerate() {
        let label = label.as_ref();
        let Some(rest) = trimmed
            .strip_prefix(label)
            .and_then(|rest| rest.strip_prefix('.'))
        else {
            continue;
        };

        let marker = start..start + label.len() + 1;
        if rest.is_empty() {
            return Some(Heading {
                index,
                written: label.to_string(),
                exact: true,
                inline: false,
                line,
                line_start,
                marker,
                body: start + trimmed.len()..0,
            });
        }
        if rest.starts_with(char::is_whitespace) {
            return Some(Heading {
                index,
                written: label.to_string(),
                exact: true,
                inline: true,
                line,
                line_start,
                body: marker.end..0,
                marker,
            });
        }
    }
    None
}

/// A decorated line that names a known label in some other spelling
fn heading_candidate<S: AsRef<str>>(trimmed: &str, known: &[S]) -> Option<(usize, String)> {
    let mut core = trimmed;
    let mut decorated = false;

    if core.starts_with('#') {
        core = core.trim_start_matches('#').trim_start();
        decorated = true;
    }
    for wrapper in ["**", "__"] {
        if let Some(inner) = core
            .strip_prefix(wrapper)
            .and_then(|c| c.strip_suffix(wrapper))
        {
            core = inner.trim();
            decorated = true;
        }
    }
    if let Some(stripped) = core.strip_suffix(':').or_else(|| core.strip_suffix('.')) {
        core = stripped.trim_end();
        decorated = true;
    }

    if core.is_empty() || core.split_whitespace().count() > 4 {
        return None;
    }

    let (index, same_words) = match_label(core, known)?;
    if decorated || same_words {
        Some((index, core.to_string()))
    } else {
        None
    }
}

fn normalized_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            if w.len() > 3 {
                w.strip_suffix('s').unwrap_or(w).to_string()
            } else {
                w.to_string()
            }
        })
        .collect()
}

/// Unique known label that `core` spells loosely, and whether the words agree
pub fn match_label<S: AsRef<str>>(core: &str, known: &[S]) -> Option<(usize, bool)> {
    let words = normalized_words(core);
    if words.is_empty() {
        return None;
    }

    let mut matched = known.iter().enumerate().filter_map(|(index, label)| {
        let label_words = normalized_words(label.as_ref());
        if label_words == words {
            Some((index, true))
        } else if label_words.starts_with(&words) || words.starts_with(&label_words) {
            Some((index, false))
        } else {
            None
        }
    });

    let first = matched.next()?;
    if matched.next().is_some() {
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: [&str; 7] = [
        "Issue",
        "Rule",
        "Application scaffold",
        "Authorities map",
        "Statutory hook",
        "Tripwires",
        "Conclusion",
    ];

    #[test]
    fn test_exact_headings_and_bodies() {
        let text = "Issue.\nIs a duty owed?\n\nRule.\nSalient features govern.\n";
        let outline = Outline::parse(text, &LABELS);
        assert_eq!(outline.headings.len(), 2);
        assert!(outline.headings.iter().all(|h| h.exact));
        assert_eq!(outline.section(text, 0), Some("Is a duty owed?"));
        assert_eq!(outline.section(text, 1), Some("Salient features govern."));
        assert_eq!(outline.section(text, 2), None);
    }

    #[test]
    fn test_inline_heading() {
        let text = "Rule. The test is coherence.\nConclusion. Duty is owed.";
        let outline = Outline::parse(text, &LABELS);
        assert_eq!(outline.headings.len(), 2);
        assert!(outline.headings[0].inline);
        assert_eq!(outline.section(text, 1), Some("The test is coherence."));
        assert_eq!(outline.section(text, 6), Some("Duty is owed."));
    }

    #[test]
    fn test_mid_sentence_label_is_not_a_heading() {
        let text = "Statutory hook.\nWrongs Act s 52 aligns with the Application scaffold.";
        let outline = Outline::parse(text, &LABELS);
        assert_eq!(outline.headings.len(), 1);
    }

    #[test]
    fn test_misnamed_headings() {
        let text = "## Rule\nText.\n**Authorities**\nMore.\nconclusion.\nEnd.";
        let outline = Outline::parse(text, &LABELS);
        let found: Vec<(usize, bool)> = outline.headings.iter().map(|h| (h.index, h.exact)).collect();
        assert_eq!(found, vec![(1, false), (3, false), (6, false)]);
        assert_eq!(outline.find(1), None);
        assert_eq!(outline.headings[1].written, "Authorities");
    }

    #[test]
    fn test_plain_sentences_are_not_candidates() {
        let text = "Finish.\nYes.\nRule\n";
        let outline = Outline::parse(text, &LABELS);
        assert_eq!(outline.headings.len(), 1);
        assert_eq!(outline.headings[0].index, 1);
        assert!(!outline.headings[0].exact);
    }

    #[test]
    fn test_duplicate_count_and_preamble() {
        let text = "Intro line.\nRule.\nA.\nRule.\nB.";
        let outline = Outline::parse(text, &LABELS);
        assert_eq!(outline.count(1), 2);
        assert_eq!(&text[outline.preamble.clone()], "Intro line.\n");
    }

    #[test]
    fn test_match_label() {
        assert_eq!(match_label("Application", &LABELS), Some((2, false)));
        assert_eq!(match_label("statutory hooks", &LABELS), Some((4, true)));
        assert_eq!(match_label("Tripwire", &LABELS), Some((5, true)));
        assert_eq!(match_label("Remedies", &LABELS), None);
    }
}
