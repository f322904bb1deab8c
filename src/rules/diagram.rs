//! Mindmap diagram shape

use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use crate::rule::{Rule, RuleCategory};
use crate::text::mindmap::normalize_label;
use crate::text::{extract_fence, Mindmap};
use std::collections::BTreeSet;

pub struct MindmapShape;

impl MindmapShape {
    /// Required headings whose labels a top-level branch repeats
    fn mirrored_headings(&self, map: &Mindmap, policy: &Policy) -> BTreeSet<String> {
        let branches: BTreeSet<String> = map.branch_labels().map(normalize_label).collect();
        policy
            .required_headings()
            .iter()
            .filter(|label| branches.contains(&normalize_label(label)))
            .cloned()
            .collect()
    }
}

impl Rule for MindmapShape {
    fn id(&self) -> &'static str {
        "mindmap"
    }

    fn description(&self) -> &'static str {
        "The diagram is a fenced mermaid mindmap of bounded shape"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Diagram
    }

    fn policy_keys(&self) -> &'static [&'static str] {
        &[
            "diagram.require_mermaid_fence",
            "diagram.require_mindmap",
            "diagram.min_branches",
            "diagram.max_branches",
            "diagram.max_total_nodes",
            "diagram.discourage_heading_mirroring",
            "diagram.required_branch_pattern",
        ]
    }

    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding> {
        let rules = &policy.spec().diagram;
        if card.diagram.trim().is_empty() {
            return vec![Finding::error(self.id(), "Diagram content is missing")];
        }

        let mut findings = Vec::new();
        let body = match extract_fence(&card.diagram) {
            Some(fence) => {
                if rules.require_mermaid_fence && !fence.language.eq_ignore_ascii_case("mermaid") {
                    findings.push(Finding::error(
                        self.id(),
                        "Diagram fence must declare mermaid language",
                    ));
                }
                fence.body
            }
            None if rules.require_mermaid_fence => {
                return vec![Finding::error(
                    self.id(),
                    "Diagram must be a fenced mermaid block",
                )];
            }
            None => card.diagram.as_str(),
        };

        let map = Mindmap::parse(body);
        if rules.require_mindmap && !map.declared {
            findings.push(Finding::error(self.id(), "Diagram must declare a mindmap"));
        }

        let branches = map.branch_count();
        let (min, max) = (policy.min_mindmap_branches(), policy.max_mindmap_branches());
        if branches < min {
            findings.push(Finding::error(
                self.id(),
                format!(
                    "Mindmap must have at least {} top-level branches (found {})",
                    min, branches
                ),
            ));
        }
        if branches > max {
            findings.push(Finding::error(
                self.id(),
                format!(
                    "Mindmap must have no more than {} top-level branches (found {})",
                    max, branches
                ),
            ));
        }

        if let Some(limit) = rules.max_total_nodes {
            let nodes = map.total_nodes();
            if nodes > limit {
                findings.push(Finding::error(
                    self.id(),
                    format!("Mindmap contains {} nodes but maximum is {}", nodes, limit),
                ));
            }
        }

        if let Some((source, pattern)) = policy.required_branch() {
            if !map.branch_labels().any(|label| pattern.is_match(label)) {
                findings.push(Finding::error(
                    self.id(),
                    format!("Mindmap needs a top-level branch matching '{}'", source),
                ));
            }
        }

        if rules.discourage_heading_mirroring {
            let mirrored = self.mirrored_headings(&map, policy);
            if !mirrored.is_empty() {
                let labels: Vec<&str> = mirrored.iter().map(String::as_str).collect();
                findings.push(Finding::warning(
                    self.id(),
                    format!(
                        "Mindmap branches mirror back section headings: {}",
                        labels.join(", ")
                    ),
                ));
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::base_card;

    fn check(diagram: &str) -> Vec<Finding> {
        let card = Card {
            diagram: diagram.into(),
            ..base_card()
        };
        MindmapShape.check(&card, &Policy::default())
    }

    fn mindmap(branches: &[&str]) -> String {
        let lines: Vec<String> = branches.iter().map(|b| format!("  {}", b)).collect();
        format!("```mermaid\nmindmap\n{}\n```\n", lines.join("\n"))
    }

    #[test]
    fn test_too_many_branches() {
        let findings = check(&mindmap(&["A", "B", "C", "D", "E", "F", "G", "H", "I"]));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].is_error());
        assert_eq!(
            findings[0].message,
            "Mindmap must have no more than 5 top-level branches (found 9)"
        );
    }

    #[test]
    fn test_too_few_branches_and_nodes() {
        let findings = check(&mindmap(&["Duty", "Breach"]));
        assert_eq!(
            findings[0].message,
            "Mindmap must have at least 4 top-level branches (found 2)"
        );

        let crowded = "```mermaid\nmindmap\n  Root\n    A\n      a1\n      a2\n      a3\n      a4\n    B\n      b1\n      b2\n    C\n      c1\n    D\n      d1\n```";
        let findings = check(crowded);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Mindmap contains 13 nodes but maximum is 12");
    }

    #[test]
    fn test_fence_and_declaration() {
        assert_eq!(check("  ")[0].message, "Diagram content is missing");
        assert_eq!(
            check("mindmap\n  A\n  B\n  C\n  D")[0].message,
            "Diagram must be a fenced mermaid block"
        );

        let findings = check("```\nmindmap\n  A\n  B\n  C\n  D\n```");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Diagram fence must declare mermaid language");

        let findings = check("```mermaid\n  A\n  B\n  C\n  D\n```");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Diagram must declare a mindmap");
    }

    #[test]
    fn test_required_branch() {
        let mut spec = crate::policy::PolicySpec::default();
        spec.diagram.required_branch_pattern = Some("overlaps|borderlines".into());
        let policy = Policy::from_spec(spec).unwrap();

        let card = base_card();
        let findings = MindmapShape.check(&card, &policy);
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message,
            "Mindmap needs a top-level branch matching 'overlaps|borderlines'"
        );

        let card = Card {
            diagram: mindmap(&["Duty focus", "Statutes", "Authorities", "Overlaps with breach"]),
            ..base_card()
        };
        assert!(MindmapShape.check(&card, &policy).is_empty());
    }

    #[test]
    fn test_heading_mirroring_is_a_warning() {
        let findings = check(&mindmap(&["Issue", "Rule", "Exam tips", "Tripwires"]));
        assert_eq!(findings.len(), 1);
        assert!(!findings[0].is_error());
        assert_eq!(
            findings[0].message,
            "Mindmap branches mirror back section headings: Issue, Rule, Tripwires"
        );
    }
}
