//! Rule definition and metadata

use crate::card::Card;
use crate::diagnostic::Finding;
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule category for grouping related checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Record fields, tags and placeholders
    #[default]
    Schema,
    /// Word and sentence limits
    Length,
    /// Back headings and section order
    Structure,
    /// Anchors, authorities and statute references
    Citation,
    /// Abbreviations, duplicated prose, uncertainty markers
    Language,
    /// The mermaid mindmap
    Diagram,
    /// Advisory suggestions that never block a card
    Recommendation,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCategory::Schema => write!(f, "schema"),
            RuleCategory::Length => write!(f, "length"),
            RuleCategory::Structure => write!(f, "structure"),
            RuleCategory::Citation => write!(f, "citation"),
            RuleCategory::Language => write!(f, "language"),
            RuleCategory::Diagram => write!(f, "diagram"),
            RuleCategory::Recommendation => write!(f, "recommendation"),
        }
    }
}

impl std::str::FromStr for RuleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "schema" => Ok(RuleCategory::Schema),
            "length" => Ok(RuleCategory::Length),
            "structure" => Ok(RuleCategory::Structure),
            "citation" | "citations" => Ok(RuleCategory::Citation),
            "language" => Ok(RuleCategory::Language),
            "diagram" | "mindmap" => Ok(RuleCategory::Diagram),
            "recommendation" | "recommendations" => Ok(RuleCategory::Recommendation),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// One independent check over a card
///
/// Checks never see each other's output, so every check runs on every card
/// and a single pass reports every defect.
pub trait Rule: Send + Sync {
    /// Stable identifier used in findings and configuration
    fn id(&self) -> &'static str;

    /// One-line summary
    fn description(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    /// Policy keys that drive this check, for `explain`
    fn policy_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Run the check
    fn check(&self, card: &Card, policy: &Policy) -> Vec<Finding>;
}

/// Serializable description of a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleInfo {
    pub id: &'static str,
    pub description: &'static str,
    pub category: RuleCategory,
    pub policy_keys: &'static [&'static str],
}

impl RuleInfo {
    pub fn of(rule: &dyn Rule) -> Self {
        Self {
            id: rule.id(),
            description: rule.description(),
            category: rule.category(),
            policy_keys: rule.policy_keys(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display_from_str() {
        for category in [
            RuleCategory::Schema,
            RuleCategory::Length,
            RuleCategory::Structure,
            RuleCategory::Citation,
            RuleCategory::Language,
            RuleCategory::Diagram,
            RuleCategory::Recommendation,
        ] {
            assert_eq!(category.to_string().parse::<RuleCategory>(), Ok(category));
        }
        assert_eq!("Mindmap".parse::<RuleCategory>(), Ok(RuleCategory::Diagram));
        assert!("perf".parse::<RuleCategory>().is_err());
    }
}
