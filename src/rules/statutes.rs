//! Statute citations and the statutory hook

use super::non_blank;
use crate::card::{Card, STATUTORY_HEADING};
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};
use crate::text::{extract_mentions, MentionKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Commonwealth engagement; the report series is captured so it can be skipped
static COMMONWEALTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:cth|federal|commonwealth(\s+law\s+reports)?)\b").unwrap()
});

static ACT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bAct\b").unwrap());

/// Whether the text engages Commonwealth law, ignoring the law report series
fn engages_commonwealth(text: &str) -> bool {
    COMMONWEALTH
        .captures_iter(text)
        .any(|caps| caps.get(1).is_none())
}

/// Whether a statute mention is Commonwealth legislation
fn is_commonwealth_statute(text: &str) -> bool {
    text.contains("(Cth")
        || COMMONWEALTH.captures_iter(text).any(|caps| {
            caps.get(1).is_none() && caps[0].eq_ignore_ascii_case("commonwealth")
        })
}

/// Statute mentions of the statutory hook, in order
fn hook_statutes(card: &Card, policy: &Policy) -> Vec<String> {
    card.section_text(policy, STATUTORY_HEADING)
        .map(|hook| {
            extract_mentions(hook, None)
                .into_iter()
                .filter(|m| m.kind == MentionKind::Statute)
                .map(|m| m.text)
                .collect()
        })
        .unwrap_or_default()
}

/// Statutes cited anywhere the card is expected to cite them, each once
fn statute_citations(card: &Card, policy: &Policy) -> Vec<String> {
    let mut texts = hook_statutes(card, policy);
    for step in card.authority_steps(policy) {
        for mention in step.authorities().filter(|m| m.kind == MentionKind::Statute) {
            if !texts.contains(&mention.text) {
                texts.push(mention.text.clone());
            }
        }
    }
    for anchor in non_blank(card.anchors.citations()) {
        if ACT_WORD.is_match(anchor) && !anchor.contains(" v ") && !texts.iter().any(|t| t == anchor) {
            texts.push(anchor.to_string());
        }
    }
    texts
}

pub struct StatuteCitation;

impl Rule for StatuteCitation {
    fn id(&self) -> &'static str {
        "statute-citation"
    }

    fn description(&self) -> &'static str {
        "Statute references name an operative section, a year and a jurisdiction"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Citation
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &[
            "statutes.require_operative_section",
            "citations.statute",
            "citations.statute-form",
        ]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let operative = policy
            .citation_class("statute")
            .filter(|_| policy.spec().statutes.require_operative_section);
        let form = policy.citation_class("statute-form");
        let mut findings = Vec::new();

        for text in statute_citations(card, policy) {
            if let Some(class) = operative {
                let check = class.check(&text);
                if !check.passed {
                    findings.push(Finding::error(self.id(), class.failure_message(&text, &check)));
                }
            }
            if let Some(class) = form {
                let check = class.check(&text);
                if !check.passed {
                    findings.push(Finding::warning(
                        self.id(),
                        class.failure_message(&text, &check),
                    ));
                }
            }
        }
        findings
    }
}

pub struct StatutoryHook;

impl Rule for StatutoryHook {
    fn id(&self) -> &'static str {
        "statutory-hook"
    }

    fn description(&self) -> &'static str {
        "The statutory hook leads with Victorian law and cites Commonwealth law when engaged"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Citation
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &[
            "statutes.prefer_victoria_first",
            "statutes.require_commonwealth_if_engaged",
        ]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let Some(hook) = card.section_text(policy, STATUTORY_HEADING) else {
            return Vec::new();
        };
        if hook.is_empty() {
            return vec![Finding::warning(self.id(), "Statutory hook section is empty")];
        }

        let rules = &policy.spec().statutes;
        let statutes = hook_statutes(card, policy);
        let mut findings = Vec::new();

        if rules.prefer_victoria_first {
            if let Some(first) = statutes.first().filter(|s| !s.contains("(Vic")) {
                log::debug!("{}: hook leads with {}", card.id, first);
                findings.push(Finding::warning(
                    self.id(),
                    "Victorian legislation should be prioritised before other jurisdictions",
                ));
            }
        }

        if rules.require_commonwealth_if_engaged && engages_commonwealth(&card.back) {
            let cited = statute_citations(card, policy)
                .iter()
                .any(|s| is_commonwealth_statute(s));
            if !cited {
                findings.push(Finding::error(
                    self.id(),
                    "Commonwealth engagement flagged but no Commonwealth statute cited",
                ));
            }
        }

        findings
    }
}
