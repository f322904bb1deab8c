//! Prose checks: abbreviations, repeated sentences, unverified authority

use super::field_sentences;
use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};
use crate::text::{first_uses, near_duplicates};
use std::borrow::Cow;

/// The back with the uncertainty token blanked out, so its capitals are not scanned
pub(crate) fn abbreviation_scope<'a>(card: &'a Card, policy: &Policy) -> Cow<'a, str> {
    match policy.uncertainty_token() {
        Some(token) if !token.is_empty() && card.back.contains(token) => {
            Cow::Owned(card.back.replace(token, ""))
        }
        _ => Cow::Borrowed(&card.back),
    }
}

pub struct Abbreviations;

impl Rule for Abbreviations {
    fn id(&self) -> &'static str {
        "abbreviations"
    }

    fn description(&self) -> &'static str {
        "Abbreviations outside the whitelist are expanded on first use"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Language
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["abbreviations.expand_on_first_use", "abbreviations.whitelist"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        if !policy.spec().abbreviations.expand_on_first_use {
            return Vec::new();
        }
        let text = abbreviation_scope(card, policy);
        first_uses(&text, policy.abbreviation_whitelist())
            .into_iter()
            .filter(|abbr| !abbr.defined)
            .map(|abbr| {
                Finding::error(
                    self.id(),
                    format!("Abbreviation '{}' must be expanded on first use", abbr.token),
                )
            })
            .collect()
    }
}

pub struct NearDuplicates;

impl Rule for NearDuplicates {
    fn id(&self) -> &'static str {
        "near-duplicates"
    }

    fn description(&self) -> &'static str {
        "No two sentences of the compared fields say nearly the same thing"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Language
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &[
            "lint.near_duplicate_threshold",
            "lint.near_duplicate_scope",
            "lint.near_duplicate_fields",
        ]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let lint = &policy.spec().lint;
        let names = &lint.near_duplicate_fields;
        let fields: Vec<Vec<&str>> = names
            .iter()
            .map(|name| field_sentences(card, policy, name))
            .collect();
        let threshold = policy.near_duplicate_threshold();

        near_duplicates(&fields, threshold, lint.near_duplicate_scope)
            .into_iter()
            .map(|pair| {
                Finding::error(
                    self.id(),
                    format!(
                        "Sentences from {} ({}) and {} ({}) are near-duplicates (similarity {:.2} >= {:.2})",
                        names[pair.first.0],
                        pair.first.1 + 1,
                        names[pair.second.0],
                        pair.second.1 + 1,
                        pair.score,
                        threshold
                    ),
                )
            })
            .collect()
    }
}

pub struct UncertaintyToken;

impl Rule for UncertaintyToken {
    fn id(&self) -> &'static str {
        "uncertainty-token"
    }

    fn description(&self) -> &'static str {
        "Flags backs that still carry the no-verified-authority token"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Recommendation
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["lint.uncertainty_token"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        match policy.uncertainty_token() {
            Some(token) if !token.is_empty() && card.back.contains(token) => {
                vec![Finding::warning(
                    self.id(),
                    format!("Back contains '{}'; verify the authority before study use", token),
                )]
            }
            _ => Vec::new(),
        }
    }
}
