//! Anchor list checks

use super::non_blank;
use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};
use crate::text::citations::has_nuance_note;
use crate::text::word_count;

pub struct AnchorList;

impl Rule for AnchorList {
    fn id(&self) -> &'static str {
        "anchors"
    }

    fn description(&self) -> &'static str {
        "Anchors are bounded in number and length and each cites a case or statute"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Citation
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &[
            "anchors.min_items",
            "anchors.max_items",
            "anchors.each_item_max_words",
            "anchors.require_case_or_statute_ref",
            "anchors.uk_or_persuasive_requires_note",
            "citations.reference",
        ]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let rules = &policy.spec().anchors;
        let items = non_blank(card.anchors.items());
        let mut findings = Vec::new();

        if items.len() < rules.min_items {
            findings.push(Finding::error(
                self.id(),
                format!(
                    "Anchors must include at least {} items (found {})",
                    rules.min_items,
                    items.len()
                ),
            ));
        }
        if items.len() > policy.max_anchors() {
            findings.push(Finding::error(
                self.id(),
                format!(
                    "Anchors must include no more than {} items (found {})",
                    policy.max_anchors(),
                    items.len()
                ),
            ));
        }

        for (i, item) in card.anchors.items().into_iter().enumerate() {
            if item.trim().is_empty() {
                continue;
            }
            let words = word_count(item);
            if let Some(max) = rules.each_item_max_words.filter(|max| words > *max) {
                findings.push(Finding::error(
                    self.id(),
                    format!("Anchor {} exceeds {} words ({} words)", i + 1, max, words),
                ));
            }
        }

        let reference = policy.citation_class("reference");
        let nuance_tiers = &policy.spec().authorities.nuance_required_tiers;
        let has_notes = !non_blank(card.anchors.notes().iter().map(String::as_str)).is_empty();
        let mut needs_note = false;

        for (i, anchor) in card.anchors.citations().into_iter().enumerate() {
            if anchor.trim().is_empty() {
                continue;
            }
            if rules.require_case_or_statute_ref {
                if let Some(class) = reference {
                    let check = class.check(anchor);
                    if !check.passed {
                        let message = class
                            .failure_message(anchor, &check)
                            .replace("{index}", &(i + 1).to_string());
                        findings.push(Finding::error(self.id(), message));
                    }
                }
            }

            let tier = policy.classify_authority(anchor);
            if nuance_tiers.iter().any(|t| t == tier) && !has_nuance_note(anchor) && !has_notes {
                needs_note = true;
            }
        }

        if rules.uk_or_persuasive_requires_note && needs_note {
            findings.push(Finding::error(
                self.id(),
                "UK/PC anchors must include nuance or note",
            ));
        }

        findings
    }
}

pub struct AnchorPinpoint;

impl Rule for AnchorPinpoint {
    fn id(&self) -> &'static str {
        "anchor-pinpoint"
    }

    fn description(&self) -> &'static str {
        "Case and statute anchors carry a pinpoint"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Citation
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["anchors.require_pinpoint", "citations.pinpoint"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        if !policy.spec().anchors.require_pinpoint {
            return Vec::new();
        }
        let Some(class) = policy.citation_class("pinpoint") else {
            return Vec::new();
        };

        non_blank(card.anchors.citations())
            .into_iter()
            .filter_map(|anchor| {
                let check = class.check(anchor);
                (!check.passed)
                    .then(|| Finding::warning(self.id(), class.failure_message(anchor, &check)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Anchors, GroupedAnchors};
    use crate::test_support::base_card;

    fn check(anchors: Anchors) -> Vec<String> {
        let card = Card {
            anchors,
            ..base_card()
        };
        AnchorList
            .check(&card, &Policy::default())
            .into_iter()
            .map(|f| f.message)
            .collect()
    }

    fn list(items: &[&str]) -> Anchors {
        Anchors::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_anchor_must_reference_case_or_statute() {
        let found = check(list(&[
            "Sullivan v Moody (2001) 207 CLR 562",
            "Coherence matters more than anything",
        ]));
        assert_eq!(found, vec!["Anchor 2 must reference a case or statute"]);
    }

    #[test]
    fn test_anchor_numbers_follow_record_position() {
        let found = check(list(&[
            "",
            "Sullivan v Moody (2001) 207 CLR 562",
            "Coherence matters more than anything",
        ]));
        assert_eq!(found, vec!["Anchor 3 must reference a case or statute"]);
    }

    #[test]
    fn test_anchor_without_pinpoint_warns() {
        let card = Card {
            anchors: list(&[
                "Sullivan v Moody (2001) 207 CLR 562",
                "Perre v Apand — vulnerability",
                "Wrongs Act 1958 (Vic) s 48",
            ]),
            ..base_card()
        };
        let findings = AnchorPinpoint.check(&card, &Policy::default());
        assert_eq!(findings.len(), 1);
        assert!(!findings[0].is_error());
        assert_eq!(
            findings[0].message,
            "Anchor missing pinpoint: Perre v Apand — vulnerability"
        );

        let mut spec = crate::policy::PolicySpec::default();
        spec.anchors.require_pinpoint = false;
        let policy = Policy::from_spec(spec).unwrap();
        assert!(AnchorPinpoint.check(&card, &policy).is_empty());
    }

    #[test]
    fn test_count_bounds() {
        assert_eq!(
            check(list(&[])),
            vec!["Anchors must include at least 1 items (found 0)"]
        );
        let many = vec!["Wrongs Act 1958 (Vic) s 48"; 9];
        assert_eq!(
            check(list(&many)),
            vec!["Anchors must include no more than 8 items (found 9)"]
        );
    }

    #[test]
    fn test_word_limit() {
        let long = format!("Sullivan v Moody {}", vec!["word"; 120].join(" "));
        assert_eq!(
            check(list(&[long.as_str()])),
            vec!["Anchor 1 exceeds 120 words (123 words)"]
        );
    }

    #[test]
    fn test_uk_anchor_needs_note() {
        let found = check(list(&["Donoghue v Stevenson [1932] AC 562 — neighbour principle"]));
        assert_eq!(found, vec!["UK/PC anchors must include nuance or note"]);

        assert!(check(list(&["Donoghue v Stevenson [1932] AC 562 — persuasive only"])).is_empty());

        let grouped = Anchors::Grouped(GroupedAnchors {
            cases: vec!["Donoghue v Stevenson [1932] AC 562".into()],
            statutes: vec![],
            notes: vec!["English authority, read alongside Sullivan".into()],
        });
        assert!(check(grouped).is_empty());
    }
}
