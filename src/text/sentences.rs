//! Citation-aware sentence segmentation
//!
//! A sentence ends at a run of `.`, `?` or `!` (plus any closing quotes or
//! brackets) that is followed by whitespace or the end of the text. A lone
//! period directly after a citation abbreviation such as `s.`, `v.` or `cf.`
//! does not end the sentence, and periods inside tokens (`48.1`, `e.g.,`)
//! never do.

/// Abbreviations whose trailing period is part of the citation
const CITATION_ABBREVIATIONS: &[&str] = &[
    "s", "ss", "v", "vs", "cf", "para", "paras", "pt", "pts", "no", "nos", "pp", "p", "ch",
    "cl", "reg", "regs", "sch", "div", "art", "sec", "e.g", "i.e", "viz", "mr", "mrs", "ms",
    "dr", "j", "jj", "cj", "lj",
];

/// Lazy, restartable iterator over the sentences of a block of prose
#[derive(Debug, Clone)]
pub struct Sentences<'a> {
    text: &'a str,
    pos: usize,
}

/// Split `text` into trimmed, non-empty sentences
pub fn sentences(text: &str) -> Sentences<'_> {
    Sentences { text, pos: 0 }
}

impl<'a> Sentences<'a> {
    /// Rewind to the start of the text
    pub fn restart(&mut self) {
        self.pos = 0;
    }
}

impl<'a> Iterator for Sentences<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.pos < self.text.len() {
            let start = self.pos;
            let end = next_boundary(self.text, start);
            self.pos = end;
            let sentence = self.text[start..end].trim();
            if !sentence.is_empty() {
                return Some(sentence);
            }
        }
        None
    }
}

fn is_terminal(byte: u8) -> bool {
    matches!(byte, b'.' | b'?' | b'!')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

/// Byte offset just past the sentence that starts at `from`
fn next_boundary(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = from;

    while i < bytes.len() {
        if !is_terminal(bytes[i]) {
            i += 1;
            continue;
        }

        let mut run_end = i;
        while run_end < bytes.len() && is_terminal(bytes[run_end]) {
            run_end += 1;
        }

        let mut end = run_end;
        for c in text[run_end..].chars() {
            if !is_closer(c) {
                break;
            }
            end += c.len_utf8();
        }

        let at_break = text[end..].chars().next().map_or(true, char::is_whitespace);
        let lone_period = run_end - i == 1 && bytes[i] == b'.';
        if at_break && !(lone_period && ends_with_citation_abbreviation(&text[from..i])) {
            return end;
        }
        i = end;
    }

    bytes.len()
}

fn ends_with_citation_abbreviation(prefix: &str) -> bool {
    let word = prefix
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(&['(', '['][..]);
    if word.is_empty() {
        return false;
    }
    let word = word.to_lowercase();
    CITATION_ABBREVIATIONS.contains(&word.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<&str> {
        sentences(text).collect()
    }

    #[test]
    fn test_basic_split() {
        assert_eq!(
            split("Duty is owed. Was it breached? Yes!"),
            vec!["Duty is owed.", "Was it breached?", "Yes!"]
        );
    }

    #[test]
    fn test_trailing_text_without_terminal() {
        assert_eq!(split("One. Two"), vec!["One.", "Two"]);
        assert!(split("   ").is_empty());
    }

    #[test]
    fn test_citation_abbreviations_do_not_end_sentences() {
        let text = "Apply s. 48 of the Wrongs Act. Compare Smith v. Jones on remoteness.";
        assert_eq!(
            split(text),
            vec![
                "Apply s. 48 of the Wrongs Act.",
                "Compare Smith v. Jones on remoteness."
            ]
        );
    }

    #[test]
    fn test_embedded_periods() {
        let text = "See para 48.1 and e.g., the CLR report. Then conclude.";
        assert_eq!(split(text).len(), 2);
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        assert_eq!(
            split("He said \"stop.\" Then left."),
            vec!["He said \"stop.\"", "Then left."]
        );
    }

    #[test]
    fn test_heading_lines_are_sentences() {
        let text = "Issue.\nThe duty question.\n\nRule.\nThe test is coherence.";
        assert_eq!(
            split(text),
            vec!["Issue.", "The duty question.", "Rule.", "The test is coherence."]
        );
    }

    #[test]
    fn test_terminal_count_property() {
        let cases = [
            ("A. B. C.", 3),
            ("A? B! C", 3),
            ("Under s 48(1)(a). The court held otherwise. Finally", 3),
            ("Wait... what?! Really.", 3),
        ];
        for (text, expected) in cases {
            assert_eq!(split(text).len(), expected, "{text}");
        }
    }

    #[test]
    fn test_restartable() {
        let mut iter = sentences("One. Two. Three.");
        assert_eq!(iter.next(), Some("One."));
        assert_eq!(iter.next(), Some("Two."));
        iter.restart();
        assert_eq!(iter.count(), 3);
    }
}
