//! Finding types produced by card checks

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for findings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory - the card passes but could be improved
    #[default]
    Warning,
    /// Blocking - the card is non-compliant
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// Position inside a raw record (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// One validation result attached to a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable identifier of the check that produced this finding
    pub rule_id: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message, including the offending value
    pub message: String,
    /// Source location, only known for parse failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Finding {
    /// Create a new finding
    pub fn new(rule_id: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            message: message.into(),
            location: None,
        }
    }

    /// Create a blocking finding
    pub fn error(rule_id: &str, message: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::Error, message)
    }

    /// Create an advisory finding
    pub fn warning(rule_id: &str, message: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::Warning, message)
    }

    /// Attach a source location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Check if this finding blocks validity
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.rule_id, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("error".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("WARN".parse::<Severity>(), Ok(Severity::Warning));
        assert!("info".parse::<Severity>().is_err());
    }

    #[test]
    fn test_finding_builders() {
        let finding = Finding::error("parse-error", "bad indent").with_location(Location::new(3, 7));
        assert!(finding.is_error());
        assert_eq!(finding.location, Some(Location::new(3, 7)));
        assert_eq!(finding.to_string(), "error [parse-error] bad indent");

        let warning = Finding::warning("mindmap", "mirrors headings");
        assert!(!warning.is_error());
        assert!(warning.location.is_none());
    }

    #[test]
    fn test_finding_serializes_without_empty_location() {
        let json = serde_json::to_string(&Finding::warning("tags", "x")).unwrap();
        assert!(!json.contains("location"));
        assert!(json.contains("\"severity\":\"warning\""));
    }
}
