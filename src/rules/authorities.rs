//! Authorities map discipline and authority citation form

use super::non_blank;
use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};
use crate::text::citations::{has_nuance_note, treatment_marker};
use crate::text::MentionKind;

/// Whether the known tiers appear strongest first; unranked tiers are skipped
pub fn priority_respected(tiers: &[&str], policy: &Policy) -> bool {
    let ranks: Vec<usize> = tiers
        .iter()
        .filter_map(|tier| policy.priority_rank(tier))
        .collect();
    ranks.windows(2).all(|pair| pair[0] <= pair[1])
}

pub struct AuthoritiesMap;

impl Rule for AuthoritiesMap {
    fn id(&self) -> &'static str {
        "authorities-map"
    }

    fn description(&self) -> &'static str {
        "Each authorities map step cites authority, within limits, in priority order"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Citation
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &[
            "authorities.priority_order",
            "authorities.lead_required",
            "authorities.require_citation_per_step",
            "authorities.max_per_step",
            "authorities.fallback_allowed",
            "authorities.flag_overruled_or_distinguished",
            "authorities.nuance_required_tiers",
            "authorities.tiers",
        ]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let rules = &policy.spec().authorities;
        let mut findings = Vec::new();
        let mut any_cited = false;

        for step in card.authority_steps(policy) {
            let n = step.number;
            let authorities: Vec<_> = step.authorities().collect();

            if authorities.is_empty() && !step.has_placeholder() {
                if rules.require_citation_per_step {
                    findings.push(Finding::error(
                        self.id(),
                        format!("Step {} in authorities map lacks cited authority", n),
                    ));
                }
                continue;
            }
            any_cited = true;

            if step.has_placeholder() {
                findings.push(Finding::warning(
                    self.id(),
                    "Authority placeholder used; follow up to locate verified authority",
                ));
            }
            if authorities.len() > rules.max_per_step {
                findings.push(Finding::error(
                    self.id(),
                    format!(
                        "Step {} lists {} authorities; maximum is {}",
                        n,
                        authorities.len(),
                        rules.max_per_step
                    ),
                ));
            }
            if authorities.len() > 1 && !rules.fallback_allowed {
                findings.push(Finding::error(
                    self.id(),
                    format!("Step {} cannot include fallback authorities", n),
                ));
            }

            let tiers = step.tiers(policy);
            if !priority_respected(&tiers, policy) {
                findings.push(Finding::error(
                    self.id(),
                    format!(
                        "Step {} authorities are out of priority order (expected [{}])",
                        n,
                        policy.authority_priority().join(", ")
                    ),
                ));
            }

            for (mention, tier) in authorities.iter().zip(&tiers) {
                if rules.flag_overruled_or_distinguished {
                    if let Some(marker) = treatment_marker(&mention.text) {
                        findings.push(Finding::warning(
                            self.id(),
                            format!("Authority marked as {}: {}", marker, mention.text),
                        ));
                    }
                }
                if rules.nuance_required_tiers.iter().any(|t| t == tier)
                    && !has_nuance_note(&mention.text)
                {
                    findings.push(Finding::error(
                        self.id(),
                        format!("{} authority requires a nuance note: {}", tier, mention.text),
                    ));
                }
            }
        }

        if rules.lead_required && !any_cited {
            findings.push(Finding::error(
                self.id(),
                "Authorities map requires at least one lead authority",
            ));
        }

        findings
    }
}

pub struct AuthorityCitation;

impl AuthorityCitation {
    /// Case authorities from the map, then case anchors, each once
    fn case_citations(card: &Card, policy: &Policy) -> Vec<String> {
        let mut texts: Vec<String> = Vec::new();
        for step in card.authority_steps(policy) {
            for mention in step.authorities().filter(|m| m.kind == MentionKind::Case) {
                if !texts.contains(&mention.text) {
                    texts.push(mention.text.clone());
                }
            }
        }
        for anchor in non_blank(card.anchors.citations()) {
            if anchor.contains(" v ") && !texts.iter().any(|t| t == anchor) {
                texts.push(anchor.to_string());
            }
        }
        texts
    }
}

impl Rule for AuthorityCitation {
    fn id(&self) -> &'static str {
        "authority-citation"
    }

    fn description(&self) -> &'static str {
        "Case authorities carry a year and a neutral or law-report citation"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Citation
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["authorities.require_year_and_citation", "citations.case"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        if !policy.spec().authorities.require_year_and_citation {
            return Vec::new();
        }
        let Some(class) = policy.citation_class("case") else {
            return Vec::new();
        };

        Self::case_citations(card, policy)
            .into_iter()
            .filter_map(|text| {
                let check = class.check(&text);
                (!check.passed)
                    .then(|| Finding::error(self.id(), class.failure_message(&text, &check)))
            })
            .collect()
    }
}

pub struct TopicAuthorities;

impl Rule for TopicAuthorities {
    fn id(&self) -> &'static str {
        "topic-authorities"
    }

    fn description(&self) -> &'static str {
        "Cards tagged with a topic mention that topic's reference authorities"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Recommendation
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["authorities.references"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let text = card.full_text();
        let mut findings = Vec::new();
        for tag in &card.tags {
            for (source, pattern) in policy.authority_reference_requirements(tag.trim()) {
                if !pattern.is_match(&text) {
                    findings.push(Finding::warning(
                        self.id(),
                        format!("Topic '{}' is missing reference authority: {}", tag, source),
                    ));
                }
            }
        }
        findings
    }
}
