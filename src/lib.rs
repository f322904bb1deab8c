//! Cardlint - Policy-driven flashcard linter
//!
//! Validates legal-study flashcards stored as YAML records against a
//! declarative policy, and optionally repairs the defects that can be fixed by
//! restructuring text already on the card.
//!
//! # Architecture
//!
//! ```text
//! CLI -> Engine -> Rules -> Card
//!               -> Fixer -> Rules
//! ```
//!
//! The engine reads records, hands each parsed [`Card`] to every enabled rule,
//! and collects the findings into a [`ValidationResult`]. Rules are independent
//! and never see each other's output. The fixer applies one transformation at
//! a time and keeps it only when re-validation shows no new kind of error.
//!
//! # Policy documents
//!
//! ```yaml
//! extends: [default]
//! back:
//!   max_words: 300
//! tags:
//!   required: [MLS_H1]
//! ```

pub mod card;
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod fixer;
pub mod output;
pub mod policy;
pub mod rule;
pub mod rules;
pub mod text;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use card::{Card, CardParseError};
pub use config::Config;
pub use diagnostic::{Finding, Location, Severity};
pub use engine::{validate, BatchReport, CardReport, Engine, Status, ValidationResult};
pub use fixer::{generate_unified_diff, repair, Fixer, RepairOutcome};
pub use policy::{Policy, PolicyError, PolicySpec};
pub use rule::{Rule, RuleCategory};
