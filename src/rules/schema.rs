//! Record-level checks: required fields, front format, placeholders, tags

use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};
use crate::text::word_count;

/// Fields whose prose is scanned for placeholder text
const PLACEHOLDER_FIELDS: [&str; 4] = ["front", "back", "why_it_matters", "mnemonic"];

pub struct RequiredFields;

impl Rule for RequiredFields {
    fn id(&self) -> &'static str {
        "required-fields"
    }

    fn description(&self) -> &'static str {
        "Every policy-required field is present and non-empty"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schema
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["schema.required_fields"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let mut findings = Vec::new();
        for field in &policy.spec().schema.required_fields {
            if !card.has_field(field) {
                findings.push(Finding::error(
                    self.id(),
                    format!("Missing required field: {}", field),
                ));
            } else if card.is_field_empty(field) {
                findings.push(Finding::error(
                    self.id(),
                    format!("Field '{}' must not be empty", field),
                ));
            }
        }
        findings
    }
}

pub struct FrontFormat;

impl Rule for FrontFormat {
    fn id(&self) -> &'static str {
        "front-format"
    }

    fn description(&self) -> &'static str {
        "The prompt is a question within the word limit"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schema
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["front.max_words", "front.must_end_with_question_mark"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let front = card.front.trim();
        if front.is_empty() {
            return Vec::new();
        }

        let rules = &policy.spec().front;
        let mut findings = Vec::new();
        if let Some(max) = rules.max_words {
            let words = word_count(front);
            if words > max {
                findings.push(Finding::error(
                    self.id(),
                    format!("Front exceeds {} words (found {})", max, words),
                ));
            }
        }
        if rules.must_end_with_question_mark && !front.ends_with('?') {
            findings.push(Finding::error(
                self.id(),
                "Front must end with a question mark",
            ));
        }
        findings
    }
}

pub struct FieldValues;

impl Rule for FieldValues {
    fn id(&self) -> &'static str {
        "field-values"
    }

    fn description(&self) -> &'static str {
        "Reading level and stakes text meet the policy"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schema
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["schema.reading_level", "schema.why_it_matters_min_chars"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let rules = &policy.spec().schema;
        let mut findings = Vec::new();

        // Absent fields are reported by required-fields
        if let Some(expected) = &rules.reading_level {
            let found = card.reading_level.trim();
            if card.has_field("reading_level") && found != expected.trim() {
                findings.push(Finding::error(
                    self.id(),
                    format!("reading_level must be '{}' (found '{}')", expected, found),
                ));
            }
        }
        if let Some(min) = rules.why_it_matters_min_chars {
            let chars = card.why_it_matters.trim().chars().count();
            if card.has_field("why_it_matters") && chars < min {
                findings.push(Finding::error(
                    self.id(),
                    format!(
                        "why_it_matters must be at least {} characters (found {})",
                        min, chars
                    ),
                ));
            }
        }
        findings
    }
}

pub struct PlaceholderText;

impl Rule for PlaceholderText {
    fn id(&self) -> &'static str {
        "placeholder-text"
    }

    fn description(&self) -> &'static str {
        "No unfinished placeholder text in the prose fields"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schema
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["lint.placeholder_patterns"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let mut findings = Vec::new();
        for field in PLACEHOLDER_FIELDS {
            let Some(text) = card.text_field(field) else {
                continue;
            };
            for (source, pattern) in policy.placeholder_patterns() {
                if pattern.is_match(text) {
                    findings.push(Finding::error(
                        self.id(),
                        format!(
                            "Field '{}' contains placeholder text matching '{}'",
                            field, source
                        ),
                    ));
                }
            }
        }
        findings
    }
}

pub struct RequiredTags;

impl Rule for RequiredTags {
    fn id(&self) -> &'static str {
        "tags"
    }

    fn description(&self) -> &'static str {
        "Every policy-mandated tag is applied"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Schema
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["tags.required"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        policy
            .spec()
            .tags
            .required
            .iter()
            .filter(|tag| !card.tags.iter().any(|t| t.trim() == tag.as_str()))
            .map(|tag| Finding::error(self.id(), format!("Missing required tag: {}", tag)))
            .collect()
    }
}
