//! Human-readable text output formatter

use super::ReportFormatter;
use crate::diagnostic::{Finding, Severity};
use crate::engine::{BatchReport, CardReport, Status};
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// List passing cards too
    pub verbose: bool,

    /// Show repair actions
    pub show_actions: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            verbose: false,
            show_actions: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn paint(&self, text: String, style: fn(ColoredString) -> ColoredString) -> String {
        if self.colored {
            style(text.normal()).to_string()
        } else {
            text
        }
    }

    fn severity_str(&self, severity: Severity) -> ColoredString {
        let s = format!("{}", severity);
        if !self.colored {
            return s.normal();
        }
        match severity {
            Severity::Error => s.red().bold(),
            Severity::Warning => s.yellow().bold(),
        }
    }

    fn status_str(&self, status: Status) -> ColoredString {
        let s = format!("{}", status);
        if !self.colored {
            return s.normal();
        }
        match status {
            Status::Valid => s.green(),
            Status::Invalid => s.red(),
            Status::Error => s.red().bold(),
        }
    }

    fn format_finding(&self, finding: &Finding) -> String {
        format!(
            "  {}[{}]: {}\n",
            self.severity_str(finding.severity),
            self.paint(finding.rule_id.clone(), |s| s.cyan()),
            finding.message
        )
    }

    fn plural(count: usize, word: &str) -> String {
        format!("{} {}{}", count, word, if count == 1 { "" } else { "s" })
    }
}

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &BatchReport) -> String {
        let mut output = String::new();

        for card in &report.cards {
            let quiet = card.result.errors.is_empty()
                && card.result.warnings.is_empty()
                && card.actions.is_empty();
            if quiet && !self.verbose {
                continue;
            }
            output.push_str(&self.format_card(card));
            output.push('\n');
        }

        if self.show_stats {
            output.push_str(&format!(
                "{} processed: {} valid, {} invalid, {} errored",
                Self::plural(report.total, "card"),
                report.passed,
                report.failed,
                report.errored
            ));

            let mut counts = Vec::new();
            let errors = report.error_count();
            if errors > 0 {
                counts.push(self.paint(Self::plural(errors, "error"), |s| s.red()));
            }
            let warnings = report.warning_count();
            if warnings > 0 {
                counts.push(self.paint(Self::plural(warnings, "warning"), |s| s.yellow()));
            }
            let repaired = report.repaired_count();
            if repaired > 0 {
                counts.push(self.paint(format!("{} repaired", repaired), |s| s.green()));
            }
            if !counts.is_empty() {
                output.push_str(&format!(" ({})", counts.join(", ")));
            }
            output.push('\n');

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                report.duration.as_secs_f64()
            ));
        }

        output
    }

    fn format_card(&self, card: &CardReport) -> String {
        let mut output = String::new();

        let header = if self.colored {
            card.id.underline().to_string()
        } else {
            card.id.clone()
        };
        output.push_str(&format!("{} {}\n", header, self.status_str(card.result.status)));

        for finding in card.result.errors.iter().chain(&card.result.warnings) {
            output.push_str(&self.format_finding(finding));
        }

        if self.show_actions {
            for action in &card.actions {
                output.push_str(&format!(
                    "  {} {}\n",
                    self.paint("repaired:".to_string(), |s| s.green()),
                    action
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_card() {
        let formatter = TextFormatter::new().without_color();
        let batch = fixtures::batch();

        assert_eq!(
            formatter.format_card(&batch.cards[2]),
            "cards/c-invalid.yml invalid\n  error[tags]: Missing required tag: MLS_H1\n  warning[keyword-recommendations]: Consider adding recommended keyword: duty\n"
        );
        assert_eq!(
            formatter.format_card(&batch.cards[1]),
            "cards/b-rule.yml valid\n  repaired: Renamed heading 'Rule' to 'Rule.'\n"
        );
    }

    #[test]
    fn test_format_batch_skips_quiet_cards() {
        let formatter = TextFormatter::new().without_color();
        let output = formatter.format(&fixtures::batch());

        assert!(!output.contains("a-valid"));
        assert!(output.contains("cards/d-missing.yml error\n  error[file-read-error]"));
        assert!(output.contains(
            "4 cards processed: 2 valid, 1 invalid, 1 errored (2 errors, 1 warning, 1 repaired)"
        ));
        assert!(output.contains("Finished in 0.01s"));
    }

    #[test]
    fn test_verbose_lists_every_card() {
        let formatter = TextFormatter {
            verbose: true,
            ..TextFormatter::new().without_color()
        };
        let output = formatter.format(&fixtures::batch());
        assert!(output.starts_with("cards/a-valid.yml valid\n"));
    }
}
