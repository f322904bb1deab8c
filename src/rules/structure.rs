//! Required headings of the back

use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};
use crate::text::Outline;
use once_cell::sync::Lazy;
use regex::Regex;

/// `(No ... applicable)` closing the back
static RATIONALE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(No [^\n)]*applicable\)\s*$").unwrap());

/// Whether the back closes with a not-applicable rationale
pub fn has_rationale_marker(back: &str) -> bool {
    RATIONALE_MARKER.is_match(back.trim())
}

pub struct BackHeadings;

impl Rule for BackHeadings {
    fn id(&self) -> &'static str {
        "back-headings"
    }

    fn description(&self) -> &'static str {
        "Required headings appear once each, exactly spelled, in policy order"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structure
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &[
            "back.required_headings",
            "back.forbid_duplicate_headings",
            "back.allow_missing_blocks_if_not_applicable",
        ]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let labels = policy.required_headings();
        let rules = &policy.spec().back;
        let outline = Outline::parse(&card.back, labels);
        let mut findings = Vec::new();
        let mut missing = Vec::new();

        for (index, label) in labels.iter().enumerate() {
            match outline.count(index) {
                0 => missing.push(label.as_str()),
                1 => {}
                _ if rules.forbid_duplicate_headings => findings.push(Finding::error(
                    self.id(),
                    format!("Duplicate heading detected: {}.", label),
                )),
                _ => {}
            }
        }

        let mut seen: Vec<usize> = Vec::new();
        for heading in outline.exact() {
            if !seen.contains(&heading.index) {
                seen.push(heading.index);
            }
        }
        if seen.windows(2).any(|pair| pair[0] > pair[1]) {
            findings.push(Finding::error(self.id(), "Back headings are out of order"));
        }

        for heading in &outline.headings {
            let label = &labels[heading.index];
            if !heading.exact {
                findings.push(Finding::warning(
                    self.id(),
                    format!(
                        "Heading '{}' should be written as '{}.'",
                        heading.written, label
                    ),
                ));
            } else if heading.inline {
                findings.push(Finding::warning(
                    self.id(),
                    format!("Heading '{}.' should stand on its own line", label),
                ));
            }
        }

        for (index, label) in labels.iter().enumerate() {
            if outline.section(&card.back, index) == Some("") {
                findings.push(Finding::warning(
                    self.id(),
                    format!("Section '{}' is empty", label),
                ));
            }
        }

        if !missing.is_empty() {
            if rules.allow_missing_blocks_if_not_applicable && has_rationale_marker(&card.back) {
                findings.push(Finding::warning(
                    self.id(),
                    format!(
                        "Missing sections replaced with rationale marker: {}",
                        missing.join(", ")
                    ),
                ));
            } else {
                findings.extend(missing.iter().map(|label| {
                    Finding::error(self.id(), format!("Missing required heading: {}.", label))
                }));
            }
        }

        findings
    }
}

pub struct RequiredConcepts;

impl Rule for RequiredConcepts {
    fn id(&self) -> &'static str {
        "required-concepts"
    }

    fn description(&self) -> &'static str {
        "The back mentions every concept the policy insists on"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structure
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &["back.must_include_terms"]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        policy
            .required_terms()
            .iter()
            .filter(|(_, pattern)| !pattern.is_match(&card.back))
            .map(|(source, _)| {
                Finding::error(
                    self.id(),
                    format!("Back missing required concept: {}", source),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicySpec;
    use crate::test_support::{base_card, build_back};

    fn check(back: String) -> Vec<Finding> {
        let card = Card {
            back,
            ..base_card()
        };
        BackHeadings.check(&card, &Policy::default())
    }

    #[test]
    fn test_missing_heading_names_it() {
        let findings = check(build_back(&[], &["Rule."]));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_error());
        assert_eq!(findings[0].message, "Missing required heading: Rule.");
    }

    #[test]
    fn test_rationale_marker_downgrades_missing() {
        let back = build_back(&[], &["Statutory hook."]) + "\n(No statutory hook applicable)";
        let findings = check(back);
        assert_eq!(findings.len(), 1);
        assert!(!findings[0].is_error());
        assert!(findings[0].message.contains("Statutory hook"));

        let spec = PolicySpec::preset("strict").unwrap();
        let policy = Policy::from_spec(spec).unwrap();
        let card = Card {
            back: build_back(&[], &["Statutory hook."]) + "\n(No statutory hook applicable)",
            ..base_card()
        };
        assert!(BackHeadings.check(&card, &policy)[0].is_error());
    }

    #[test]
    fn test_duplicate_and_order() {
        let back = build_back(&[], &[]) + "\n\nRule.\nAgain.";
        let findings = check(back);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Duplicate heading detected: Rule.");

        let back = build_back(&[], &[]).replacen("Issue.", "Issue placeholder.", 1) + "\n\nIssue.\nLate issue.";
        let findings = check(back);
        assert!(findings.iter().any(|f| f.message == "Back headings are out of order"));
    }

    #[test]
    fn test_malformed_and_inline_headings_warn() {
        let back = build_back(&[], &[])
            .replacen("Rule.\n", "## Rule\n", 1)
            .replacen("Conclusion.\n", "Conclusion. ", 1);
        let findings = check(back);
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert!(messages.contains(&"Heading 'Rule' should be written as 'Rule.'"));
        assert!(messages.contains(&"Heading 'Conclusion.' should stand on its own line"));
        assert!(messages.contains(&"Missing required heading: Rule."));
    }

    #[test]
    fn test_required_concepts() {
        assert!(RequiredConcepts.check(&base_card(), &Policy::default()).is_empty());

        let mut spec = PolicySpec::default();
        spec.back.must_include_terms = vec!["duty".into(), "damages".into(), "wrongs act".into()];
        let policy = Policy::from_spec(spec).unwrap();

        let findings = RequiredConcepts.check(&base_card(), &policy);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_error());
        assert_eq!(findings[0].message, "Back missing required concept: damages");
    }

    #[test]
    fn test_empty_section_warns() {
        let findings = check(build_back(&[("Tripwires.", "")], &[]));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Section 'Tripwires' is empty");
        assert!(!findings[0].is_error());
    }
}
