//! Word and sentence limits on the back

use super::prose_sentences;
use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};
use crate::text::word_count;

pub struct BackLength;

impl Rule for BackLength {
    fn id(&self) -> &'static str {
        "back-length"
    }

    fn description(&self) -> &'static str {
        "The back stays within its word bounds"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Length
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["back.min_words", "back.max_words"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let words = word_count(&card.back);
        let min = policy.spec().back.min_words;
        let max = policy.max_back_words();

        let mut findings = Vec::new();
        if words < min {
            findings.push(Finding::error(
                self.id(),
                format!("Back must contain at least {} words (found {})", min, words),
            ));
        }
        if words > max {
            findings.push(Finding::error(
                self.id(),
                format!("Back must contain no more than {} words (found {})", max, words),
            ));
        }
        findings
    }
}

pub struct SentenceLength;

impl Rule for SentenceLength {
    fn id(&self) -> &'static str {
        "sentence-length"
    }

    fn description(&self) -> &'static str {
        "No sentence of the back runs past the sentence word limit"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Length
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["back.max_sentence_words"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let max = policy.max_sentence_words();
        prose_sentences(&card.back, policy)
            .into_iter()
            .enumerate()
            .filter_map(|(i, sentence)| {
                let words = word_count(sentence);
                (words > max).then(|| {
                    Finding::error(
                        self.id(),
                        format!("Sentence {} exceeds {} words ({} words)", i + 1, max, words),
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{base_card, build_back, section_text};

    #[test]
    fn test_base_back_is_within_bounds() {
        let policy = Policy::default();
        assert_eq!(word_count(&base_card().back), 278);
        assert!(BackLength.check(&base_card(), &policy).is_empty());
    }

    #[test]
    fn test_exactly_one_word_over() {
        let policy = Policy::default();
        let conclusion = format!("{} Done three.", section_text("Conclusion."));
        let card = Card {
            back: build_back(&[("Conclusion.", conclusion.as_str())], &[]),
            ..base_card()
        };
        assert_eq!(word_count(&card.back), 280);

        let card = Card {
            back: format!("{} extra", card.back),
            ..card
        };
        let findings = BackLength.check(&card, &policy);
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message,
            "Back must contain no more than 280 words (found 281)"
        );
    }

    #[test]
    fn test_too_short() {
        let policy = Policy::default();
        let card = Card {
            back: "Issue.\nToo short.".into(),
            ..base_card()
        };
        assert_eq!(
            BackLength.check(&card, &policy)[0].message,
            "Back must contain at least 160 words (found 3)"
        );
    }

    #[test]
    fn test_long_sentence_names_index() {
        let policy = Policy::default();
        let long = vec!["word"; 30].join(" ") + ".";
        let card = Card {
            back: format!("Issue.\nShort opener here. {}\nRule.\nFine.", long),
            ..base_card()
        };
        let findings = SentenceLength.check(&card, &policy);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Sentence 2 exceeds 28 words (30 words)");
    }

    #[test]
    fn test_citation_periods_do_not_split() {
        let policy = Policy::default();
        let words = vec!["word"; 26].join(" ");
        let card = Card {
            back: format!("Rule.\nUnder s. 48 {}.", words),
            ..base_card()
        };
        let findings = SentenceLength.check(&card, &policy);
        assert_eq!(findings[0].message, "Sentence 1 exceeds 28 words (29 words)");
    }
}
