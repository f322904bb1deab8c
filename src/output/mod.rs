//! Output formatters for batch reports

mod json;
mod markdown;
mod text;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;
pub use text::TextFormatter;

use crate::config::{OutputConfig, OutputFormat};
use crate::engine::{BatchReport, CardReport};

/// Renders a batch report
pub trait ReportFormatter: Send + Sync {
    /// Format the entire batch
    fn format(&self, report: &BatchReport) -> String;

    /// Format a single card's entry
    fn format_card(&self, card: &CardReport) -> String;
}

/// Build the formatter selected by the output settings
pub fn formatter_for(output: &OutputConfig, colored: bool) -> Box<dyn ReportFormatter> {
    match output.format {
        OutputFormat::Text => Box::new(TextFormatter {
            colored,
            verbose: output.verbose,
            ..TextFormatter::default()
        }),
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
        OutputFormat::Markdown => Box::new(MarkdownFormatter {
            verbose: output.verbose,
        }),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::diagnostic::Finding;
    use crate::engine::{BatchReport, CardReport, ValidationResult};
    use std::time::Duration;

    fn report(id: &str, findings: Vec<Finding>) -> CardReport {
        CardReport {
            id: id.to_string(),
            result: ValidationResult::from_findings(findings),
            actions: Vec::new(),
            original_source: None,
            repaired_source: None,
        }
    }

    /// One valid, one invalid with a warning, one repaired, one unreadable
    pub fn batch() -> BatchReport {
        let mut repaired = report("cards/b-rule.yml", vec![]);
        repaired.result.repaired = true;
        repaired.result.edited = true;
        repaired.actions = vec!["Renamed heading 'Rule' to 'Rule.'".into()];

        let mut errored = report("cards/d-missing.yml", vec![]);
        errored.result = ValidationResult::failure(Finding::error(
            "file-read-error",
            "Failed to read file: not found",
        ));

        let mut batch = BatchReport::from_cards(vec![
            report("cards/a-valid.yml", vec![]),
            repaired,
            report(
                "cards/c-invalid.yml",
                vec![
                    Finding::error("tags", "Missing required tag: MLS_H1"),
                    Finding::warning("keyword-recommendations", "Consider adding recommended keyword: duty"),
                ],
            ),
            errored,
        ]);
        batch.duration = Duration::from_millis(12);
        batch
    }
}
