//! Markdown report formatter
//!
//! Renders a summary table followed by a section per card that has something
//! to say, suitable for pasting into a review thread.

use super::ReportFormatter;
use crate::engine::{BatchReport, CardReport};

#[derive(Default)]
pub struct MarkdownFormatter {
    /// Include passing cards in the detail sections
    pub verbose: bool,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Escape characters that would break a table cell
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &BatchReport) -> String {
        let mut md = String::from("# Card validation report\n\n");

        md.push_str("| Total | Valid | Invalid | Errored | Errors | Warnings | Repaired |\n");
        md.push_str("|---|---|---|---|---|---|---|\n");
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n\n",
            report.total,
            report.passed,
            report.failed,
            report.errored,
            report.error_count(),
            report.warning_count(),
            report.repaired_count()
        ));

        if !report.cards.is_empty() {
            md.push_str("| Card | Status | Errors | Warnings |\n");
            md.push_str("|---|---|---|---|\n");
            for card in &report.cards {
                md.push_str(&format!(
                    "| `{}` | {} | {} | {} |\n",
                    escape_cell(&card.id),
                    card.result.status,
                    card.result.errors.len(),
                    card.result.warnings.len()
                ));
            }
            md.push('\n');
        }

        for card in &report.cards {
            let quiet = card.result.errors.is_empty()
                && card.result.warnings.is_empty()
                && card.actions.is_empty();
            if quiet && !self.verbose {
                continue;
            }
            md.push_str(&self.format_card(card));
            md.push('\n');
        }

        md
    }

    fn format_card(&self, card: &CardReport) -> String {
        let mut md = format!("## `{}` ({})\n\n", card.id, card.result.status);

        for finding in &card.result.errors {
            md.push_str(&format!("- **error** `{}`: {}\n", finding.rule_id, finding.message));
        }
        for finding in &card.result.warnings {
            md.push_str(&format!("- warning `{}`: {}\n", finding.rule_id, finding.message));
        }
        if !card.actions.is_empty() {
            if !card.result.errors.is_empty() || !card.result.warnings.is_empty() {
                md.push('\n');
            }
            md.push_str("Repairs:\n\n");
            for action in &card.actions {
                md.push_str(&format!("- {}\n", action));
            }
        }

        md
    }
}
