//! JSON output formatter

use super::ReportFormatter;
use crate::engine::{BatchReport, CardReport, ValidationResult};
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    cards: Vec<JsonCard<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonCard<'a> {
    id: &'a str,
    #[serde(flatten)]
    result: &'a ValidationResult,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    actions: &'a [String],
}

impl<'a> From<&'a CardReport> for JsonCard<'a> {
    fn from(card: &'a CardReport) -> Self {
        Self {
            id: &card.id,
            result: &card.result,
            actions: &card.actions,
        }
    }
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    passed: usize,
    failed: usize,
    errored: usize,
    error_count: usize,
    warning_count: usize,
    repaired_count: usize,
    duration_ms: u128,
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &BatchReport) -> String {
        let output = JsonOutput {
            cards: report.cards.iter().map(JsonCard::from).collect(),
            summary: JsonSummary {
                total: report.total,
                passed: report.passed,
                failed: report.failed,
                errored: report.errored,
                error_count: report.error_count(),
                warning_count: report.warning_count(),
                repaired_count: report.repaired_count(),
                duration_ms: report.duration.as_millis(),
            },
        };
        self.render(&output)
    }

    fn format_card(&self, card: &CardReport) -> String {
        self.render(&JsonCard::from(card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;
    use serde_json::Value;

    #[test]
    fn test_json_format_card() {
        let formatter = JsonFormatter::new();
        let batch = fixtures::batch();

        let output = formatter.format_card(&batch.cards[2]);
        assert!(output.contains("\"id\":\"cards/c-invalid.yml\""));
        assert!(output.contains("\"status\":\"invalid\""));
        assert!(output.contains("\"rule_id\":\"tags\""));
        assert!(!output.contains("\"actions\""));

        let output = formatter.format_card(&batch.cards[1]);
        assert!(output.contains("\"actions\":[\"Renamed heading 'Rule' to 'Rule.'\"]"));
        assert!(output.contains("\"edited\":true"));
    }

    #[test]
    fn test_json_format_batch() {
        let output = JsonFormatter::new().pretty().format(&fixtures::batch());
        assert!(output.contains('\n'));

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["total"], 4);
        assert_eq!(value["summary"]["errored"], 1);
        assert_eq!(value["summary"]["error_count"], 2);
        assert_eq!(value["summary"]["repaired_count"], 1);
        assert_eq!(value["cards"][3]["status"], "error");
        assert_eq!(value["cards"][3]["errors"][0]["rule_id"], "file-read-error");
    }
}
