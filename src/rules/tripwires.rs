//! Tripwire list checks

use super::non_blank;
use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};
use crate::text::{near_duplicates, DuplicateScope};

pub struct Tripwires;

impl Rule for Tripwires {
    fn id(&self) -> &'static str {
        "tripwires"
    }

    fn description(&self) -> &'static str {
        "Tripwires are bounded in number and do not repeat each other"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structure
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &[
            "tripwires.min",
            "tripwires.max",
            "tripwires.duplicate_similarity_threshold",
            "tripwires.max_chars",
        ]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let rules = &policy.spec().tripwires;
        let items = non_blank(card.tripwires.iter().map(String::as_str));
        let mut findings = Vec::new();

        if items.len() < rules.min {
            findings.push(Finding::error(
                self.id(),
                format!("At least {} tripwires required (found {})", rules.min, items.len()),
            ));
        }
        if items.len() > rules.max {
            findings.push(Finding::error(
                self.id(),
                format!("No more than {} tripwires allowed (found {})", rules.max, items.len()),
            ));
        }

        if let Some(max) = rules.max_chars {
            for (i, item) in card.tripwires.iter().enumerate() {
                let chars = item.trim().chars().count();
                if chars > max {
                    findings.push(Finding::error(
                        self.id(),
                        format!("Tripwire {} exceeds {} characters (found {})", i + 1, max, chars),
                    ));
                }
            }
        }

        let threshold = rules.duplicate_similarity_threshold;
        for pair in near_duplicates(&[items], threshold, DuplicateScope::Within) {
            findings.push(Finding::error(
                self.id(),
                format!(
                    "Tripwires {} and {} are near-duplicates (similarity >= {})",
                    pair.first.1 + 1,
                    pair.second.1 + 1,
                    threshold
                ),
            ));
        }

        findings
    }
}
