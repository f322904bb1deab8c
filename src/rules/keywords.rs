//! Keyword bounds and recommendations

use super::non_blank;
use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};

pub struct KeywordCount;

impl Rule for KeywordCount {
    fn id(&self) -> &'static str {
        "keyword-count"
    }

    fn description(&self) -> &'static str {
        "The keyword list stays within its bounds"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schema
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["keywords.min", "keywords.max"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let found = non_blank(card.keywords.iter().map(String::as_str)).len();
        let (min, max) = (policy.min_keywords(), policy.max_keywords());

        let mut findings = Vec::new();
        if found < min {
            findings.push(Finding::error(
                self.id(),
                format!("At least {} keywords required (found {})", min, found),
            ));
        }
        if found > max {
            findings.push(Finding::error(
                self.id(),
                format!("No more than {} keywords allowed (found {})", max, found),
            ));
        }
        findings
    }
}

/// Lowercased keyword with hyphens read as spaces
fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase().replace('-', " ")
}

pub struct RequiredKeywords;

impl Rule for RequiredKeywords {
    fn id(&self) -> &'static str {
        "required-keywords"
    }

    fn description(&self) -> &'static str {
        "Every policy-required keyword is listed"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schema
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["keywords.required"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let listed: Vec<String> = card.keywords.iter().map(|k| normalize_keyword(k)).collect();
        policy
            .spec()
            .keywords
            .required
            .iter()
            .filter(|phrase| {
                let wanted = normalize_keyword(phrase);
                !listed.iter().any(|k| k.contains(&wanted))
            })
            .map(|phrase| Finding::error(self.id(), format!("Missing required keyword: {}", phrase)))
            .collect()
    }
}

pub struct KeywordRecommendations;

impl KeywordRecommendations {
    fn has_keyword(card: &Card, phrase: &str) -> bool {
        card.keywords
            .iter()
            .any(|k| k.trim().eq_ignore_ascii_case(phrase.trim()))
    }
}

impl Rule for KeywordRecommendations {
    fn id(&self) -> &'static str {
        "keyword-recommendations"
    }

    fn description(&self) -> &'static str {
        "Suggests recommended keywords for the card's topics"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Recommendation
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["keywords.recommended", "keywords.recommended_if_relevant"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let back = card.back.to_lowercase();
        let mut suggested: Vec<&str> = Vec::new();

        for tag in &card.tags {
            if let Some(phrases) = policy.keyword_recommendations().get(tag.trim()) {
                suggested.extend(phrases.iter().map(String::as_str));
            }
        }
        suggested.extend(
            policy
                .spec()
                .keywords
                .recommended_if_relevant
                .iter()
                .map(String::as_str)
                .filter(|phrase| back.contains(&phrase.to_lowercase())),
        );

        let mut findings = Vec::new();
        let mut reported: Vec<String> = Vec::new();
        for phrase in suggested {
            let key = phrase.trim().to_lowercase();
            if key.is_empty() || reported.contains(&key) || Self::has_keyword(card, phrase) {
                continue;
            }
            reported.push(key);
            findings.push(Finding::warning(
                self.id(),
                format!("Consider adding recommended keyword: {}", phrase.trim()),
            ));
        }
        findings
    }
}
