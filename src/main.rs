//! Cardlint CLI - flashcard policy linter
//!
//! Validates (and optionally repairs) flashcard YAML records against a policy.

use anyhow::{Context, Result};
use cardlint::config::{ColorMode, Config, FileFilter, OutputFormat};
use cardlint::engine::{BatchReport, Engine};
use cardlint::fixer::generate_unified_diff;
use cardlint::output::formatter_for;
use cardlint::policy::PolicySpec;
use cardlint::rule::Rule;
use cardlint::rules::{builtin_rules, find_rule};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use glob::glob;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "cardlint",
    version,
    about = "Flashcard policy linter",
    long_about = "Validates legal-study flashcard YAML records against a declarative policy and repairs what can be fixed by restructuring existing text."
)]
struct Cli {
    /// Files, directories or glob patterns to check
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Policy document (YAML or JSON)
    #[arg(short, long, conflicts_with = "preset")]
    policy: Option<PathBuf>,

    /// Built-in policy preset (default, strict)
    #[arg(long)]
    preset: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// List passing cards too
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Repair cards where possible (dry-run by default, use with --write to apply)
    #[arg(long)]
    repair: bool,

    /// Write repaired cards back to their files (requires --repair)
    #[arg(long, requires = "repair")]
    write: bool,

    /// Exit with 1 when any card is invalid
    #[arg(long)]
    strict: bool,

    /// Exit with 0 even if cards fail
    #[arg(long)]
    exit_zero: bool,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show detailed information about a rule
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },
    /// Write a policy document from a preset
    Init {
        /// Preset to start from (default, strict)
        #[arg(long, default_value = "default")]
        preset: String,

        /// Output format (yaml, json)
        #[arg(long, default_value = "yaml")]
        output_format: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Markdown,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Markdown => OutputFormat::Markdown,
        }
    }
}

fn print_rule(rule: &dyn Rule, enabled: bool) {
    let marker = if enabled {
        "".normal()
    } else {
        " [disabled]".yellow()
    };
    println!("    {} ({}){}", rule.id().cyan(), rule.category(), marker);
    println!("      {}", rule.description());
}

/// Print detailed rule explanation
fn handle_explain(rule_id: &str) {
    let Some(rule) = find_rule(rule_id) else {
        eprintln!("{}: Rule '{}' not found", "error".red().bold(), rule_id);
        eprintln!();
        eprintln!("Use {} to see all available rules", "--list-rules".cyan());
        std::process::exit(1);
    };

    println!("{}", "Rule Details".bold());
    println!();
    println!("  {}: {}", "ID".bold(), rule.id().cyan());
    println!("  {}: {}", "Category".bold(), rule.category());
    println!();
    println!("  {}", "Description".bold());
    println!("  {}", rule.description());

    if !rule.policy_keys().is_empty() {
        println!();
        println!("  {}", "Policy keys".bold());
        for key in rule.policy_keys() {
            println!("    {}", key);
        }
    }
}

fn handle_init(preset: &str, output_format: &str) {
    let Some(spec) = PolicySpec::preset(preset) else {
        eprintln!(
            "{}: Unknown preset '{}'. Available: {}",
            "error".red().bold(),
            preset,
            PolicySpec::PRESETS.join(", ")
        );
        std::process::exit(1);
    };

    let filename = if output_format == "json" {
        "cardlint-policy.json"
    } else {
        "cardlint-policy.yaml"
    };

    if Path::new(filename).exists() {
        eprintln!(
            "{}: {} already exists. Remove it first to reinitialize.",
            "error".red().bold(),
            filename
        );
        std::process::exit(1);
    }

    let content = if output_format == "json" {
        serde_json::to_string_pretty(&spec).unwrap_or_default()
    } else {
        let yaml = serde_yaml::to_string(&spec).unwrap_or_default();
        format!(
            "# Card policy\n# Generated with: cardlint init --preset {}\n\n{}",
            preset, yaml
        )
    };

    if let Err(e) = std::fs::write(filename, content) {
        eprintln!(
            "{}: Failed to write {}: {}",
            "error".red().bold(),
            filename,
            e
        );
        std::process::exit(1);
    }

    println!("{} Created {}", "success".green().bold(), filename);
    println!();
    println!("Next steps:");
    println!("  1. Review and customize the policy");
    println!(
        "  2. Run {} to check your cards",
        format!("cardlint --policy {} cards/", filename).cyan()
    );
}

/// Expand files, directories and glob patterns into a sorted, deduplicated list
///
/// Files named explicitly are always checked; directory and pattern matches go
/// through the include/exclude filter.
fn collect_files(patterns: &[String], filter: &FileFilter) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.insert(path.to_path_buf());
            continue;
        }

        let expanded = if path.is_dir() {
            format!("{}/**/*", pattern.trim_end_matches('/'))
        } else {
            pattern.clone()
        };
        let paths = glob(&expanded).with_context(|| format!("Invalid pattern '{}'", pattern))?;
        for entry in paths.flatten() {
            if entry.is_file() && filter.matches(&entry) {
                files.insert(entry);
            }
        }
    }

    Ok(files.into_iter().collect())
}

fn apply_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => {
            colored::control::set_override(true);
            true
        }
        ColorMode::Never => {
            colored::control::set_override(false);
            false
        }
        ColorMode::Auto => colored::control::SHOULD_COLORIZE.should_colorize(),
    }
}

/// Print diffs, or write repaired records back when asked to
fn handle_repairs(report: &BatchReport, write: bool, show_diff: bool) -> Result<()> {
    for card in &report.cards {
        let (Some(original), Some(repaired)) = (&card.original_source, &card.repaired_source)
        else {
            continue;
        };

        if write {
            std::fs::write(&card.id, repaired)
                .with_context(|| format!("Failed to write {}", card.id))?;
            log::info!("Wrote repaired card {}", card.id);
        } else if show_diff {
            print!("{}", generate_unified_diff(&card.id, original, repaired));
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().context("Failed to load config")?,
    };

    config.merge_cli(
        cli.format.map(OutputFormat::from),
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable,
        cli.policy,
        cli.preset,
        Some(cli.strict),
    );
    if cli.no_color {
        config.output.color = ColorMode::Never;
    }
    let colored = apply_color(config.output.color);

    for id in &config.rules.disabled {
        if find_rule(id).is_none() {
            eprintln!("{}: Unknown rule '{}' in disabled list", "warning".yellow(), id);
        }
    }

    if cli.list_rules {
        println!("{}", "Available rules:".bold());
        println!();
        for rule in builtin_rules() {
            print_rule(rule.as_ref(), config.is_rule_enabled(rule.id()));
        }
        return Ok(0);
    }

    if cli.files.is_empty() {
        eprintln!("{}: No files specified", "error".red().bold());
        eprintln!();
        eprintln!("Usage: cardlint [OPTIONS] <FILES>...");
        eprintln!();
        eprintln!("For more information, try '--help'");
        return Ok(2);
    }

    let filter = config.file_filter()?;
    let files = collect_files(&cli.files, &filter)?;
    if files.is_empty() {
        eprintln!("{}: No cards found to check", "error".red().bold());
        return Ok(2);
    }

    let policy = config.load_policy().context("Failed to load policy")?;
    let strict = config.strict;
    let output = config.output.clone();
    let engine = Engine::new(config, policy);

    let report = engine.lint_paths(&files, cli.repair);

    if cli.repair {
        handle_repairs(&report, cli.write, output.format == OutputFormat::Text)?;
    }

    let formatter = formatter_for(&output, colored);
    print!("{}", formatter.format(&report));

    if cli.exit_zero {
        Ok(0)
    } else {
        Ok(report.exit_code(strict))
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Explain { rule_id }) => {
            handle_explain(rule_id);
            return;
        }
        Some(Commands::Init {
            preset,
            output_format,
        }) => {
            handle_init(preset, output_format);
            return;
        }
        None => {}
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            2
        }
    };
    std::process::exit(code);
}
