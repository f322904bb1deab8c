//! Core validation engine
//!
//! [`validate`] is the per-card contract: every rule runs, findings are split
//! by severity, and the card is valid exactly when no errors remain. The
//! [`Engine`] wraps that contract for batches of files and never lets one
//! card's failure stop the others.

use crate::card::{Card, CardParseError};
use crate::config::Config;
use crate::diagnostic::{Finding, Severity};
use crate::fixer::Fixer;
use crate::policy::Policy;
use crate::rule::Rule;
use crate::rules::builtin_rules;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outcome class of one card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Valid,
    Invalid,
    /// The record could not be read or parsed
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Valid => write!(f, "valid"),
            Status::Invalid => write!(f, "invalid"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// Result of validating one card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: Status,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    /// A repair transformation was applied
    pub repaired: bool,
    /// Repaired content differs from the original beyond whitespace
    pub edited: bool,
}

impl ValidationResult {
    /// Split findings by severity, keeping their order
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let (errors, warnings): (Vec<Finding>, Vec<Finding>) =
            findings.into_iter().partition(Finding::is_error);
        let status = if errors.is_empty() {
            Status::Valid
        } else {
            Status::Invalid
        };
        Self {
            status,
            errors,
            warnings,
            repaired: false,
            edited: false,
        }
    }

    /// A card that never made it to the rules
    pub fn failure(finding: Finding) -> Self {
        Self {
            status: Status::Error,
            errors: vec![finding],
            warnings: Vec::new(),
            repaired: false,
            edited: false,
        }
    }

    /// The single finding reported for an unparseable record
    pub fn parse_failure(err: &CardParseError) -> Self {
        let message = match err.location() {
            Some(location) => format!("Parse error at {}: {}", location, err),
            None => format!("Parse error: {}", err),
        };
        let mut finding = Finding::new("parse-error", Severity::Error, message);
        if let Some(location) = err.location() {
            finding = finding.with_location(location);
        }
        Self::failure(finding)
    }

    pub fn is_valid(&self) -> bool {
        self.status == Status::Valid
    }

    /// Rule ids of the errors, deduplicated
    pub fn error_ids(&self) -> BTreeSet<&str> {
        self.errors.iter().map(|f| f.rule_id.as_str()).collect()
    }
}

/// Validate a card against every built-in rule
pub fn validate(card: &Card, policy: &Policy) -> ValidationResult {
    validate_with(card, policy, &builtin_rules())
}

/// Validate a card against a chosen set of rules, in order
pub fn validate_with(card: &Card, policy: &Policy, rules: &[Box<dyn Rule>]) -> ValidationResult {
    let findings: Vec<Finding> = rules
        .iter()
        .flat_map(|rule| rule.check(card, policy))
        .collect();
    let result = ValidationResult::from_findings(findings);
    log::debug!(
        "{}: {} ({} errors, {} warnings)",
        card.id,
        result.status,
        result.errors.len(),
        result.warnings.len()
    );
    result
}

/// One card's entry in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct CardReport {
    /// Card identifier, the record's path
    pub id: String,
    pub result: ValidationResult,
    /// Repair actions that were kept
    pub actions: Vec<String>,
    /// Original record text, kept when a repair edited the card
    pub original_source: Option<String>,
    /// Repaired record, ready to be written back
    pub repaired_source: Option<String>,
}

impl CardReport {
    fn new(id: &str, result: ValidationResult) -> Self {
        Self {
            id: id.to_string(),
            result,
            actions: Vec::new(),
            original_source: None,
            repaired_source: None,
        }
    }
}

/// Aggregate over a batch of cards
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    /// Per-card reports sorted by identifier
    pub cards: Vec<CardReport>,
    /// Processing duration
    pub duration: Duration,
}

impl BatchReport {
    /// Count and sort a set of card reports
    pub fn from_cards(mut cards: Vec<CardReport>) -> Self {
        cards.sort_by(|a, b| a.id.cmp(&b.id));
        let count = |status: Status| cards.iter().filter(|c| c.result.status == status).count();
        Self {
            total: cards.len(),
            passed: count(Status::Valid),
            failed: count(Status::Invalid),
            errored: count(Status::Error),
            duration: Duration::ZERO,
            cards,
        }
    }

    pub fn error_count(&self) -> usize {
        self.cards.iter().map(|c| c.result.errors.len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.cards.iter().map(|c| c.result.warnings.len()).sum()
    }

    pub fn repaired_count(&self) -> usize {
        self.cards.iter().filter(|c| c.result.repaired).count()
    }

    /// Get exit code (0 = success, 1 = invalid cards under strict, 2 = unreadable cards)
    pub fn exit_code(&self, strict: bool) -> i32 {
        if self.errored > 0 {
            2
        } else if strict && self.failed > 0 {
            1
        } else {
            0
        }
    }
}

/// The batch runner
pub struct Engine {
    config: Config,
    policy: Policy,
    rules: Vec<Box<dyn Rule>>,
}

impl Engine {
    /// Create an engine running every rule the configuration enables
    pub fn new(config: Config, policy: Policy) -> Self {
        let rules: Vec<Box<dyn Rule>> = builtin_rules()
            .into_iter()
            .filter(|rule| config.is_rule_enabled(rule.id()))
            .collect();
        log::debug!("Engine running {} rules", rules.len());
        Self {
            config,
            policy,
            rules,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    /// Validate one parsed card
    pub fn validate(&self, card: &Card) -> ValidationResult {
        validate_with(card, &self.policy, &self.rules)
    }

    /// Parse, validate and optionally repair one record held in memory
    pub fn check_source(&self, id: &str, source: &str, repair: bool) -> CardReport {
        let card = match Card::from_yaml(id, source) {
            Ok(card) => card,
            Err(e) => {
                log::debug!("{}: {}", id, e);
                return CardReport::new(id, ValidationResult::parse_failure(&e));
            }
        };

        if !repair {
            return CardReport::new(id, self.validate(&card));
        }

        let outcome = Fixer::new(&self.policy, &self.rules).repair(&card);
        let mut result = self.validate(&outcome.card);
        result.repaired = outcome.changed;
        result.edited = outcome.edited;

        let mut report = CardReport::new(id, result);
        if outcome.changed {
            match outcome.card.to_yaml() {
                Ok(yaml) => {
                    report.original_source = Some(source.to_string());
                    report.repaired_source = Some(yaml);
                }
                Err(e) => log::warn!("{}: could not serialise repaired card: {}", id, e),
            }
        }
        report.actions = outcome.actions;
        report
    }

    /// Read and check one file
    pub fn lint_file(&self, path: &Path, repair: bool) -> CardReport {
        let id = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(source) => self.check_source(&id, &source, repair),
            Err(e) => CardReport::new(
                &id,
                ValidationResult::failure(Finding::error(
                    "file-read-error",
                    format!("Failed to read file: {}", e),
                )),
            ),
        }
    }

    /// Check a batch of files, in parallel when configured
    pub fn lint_paths(&self, files: &[PathBuf], repair: bool) -> BatchReport {
        let start = Instant::now();

        let reports: Vec<CardReport> = if self.config.engine.parallel && files.len() > 1 {
            let jobs = if self.config.engine.jobs > 0 {
                self.config.engine.jobs
            } else {
                num_cpus::get()
            };
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| {
                    files
                        .par_iter()
                        .map(|f| self.lint_file(f, repair))
                        .collect()
                }),
                Err(e) => {
                    log::warn!("Thread pool unavailable, checking sequentially: {}", e);
                    files.iter().map(|f| self.lint_file(f, repair)).collect()
                }
            }
        } else {
            files.iter().map(|f| self.lint_file(f, repair)).collect()
        };

        let mut batch = BatchReport::from_cards(reports);
        batch.duration = start.elapsed();
        log::info!(
            "Checked {} cards: {} valid, {} invalid, {} errored",
            batch.total,
            batch.passed,
            batch.failed,
            batch.errored
        );
        batch
    }
}
