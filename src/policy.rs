//! Policy model
//!
//! A policy is written as a YAML or JSON document (`PolicySpec`), merged over
//! any presets or files it `extends`, then compiled into an immutable
//! [`Policy`] with its patterns built and its invariants checked. Validation
//! only ever sees the compiled form.

use crate::text::citations::{CitationClass, Requirement, TierTable};
use crate::text::DuplicateScope;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fields a policy may list as required
pub const CARD_FIELDS: [&str; 10] = [
    "front",
    "back",
    "why_it_matters",
    "mnemonic",
    "diagram",
    "tripwires",
    "anchors",
    "keywords",
    "reading_level",
    "tags",
];

/// Citation classes the checks rely on
const REQUIRED_CITATION_CLASSES: [&str; 3] = ["case", "statute", "reference"];

static EXPANSION_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z\s'-]{3,}$").unwrap());

/// Policy loading or compilation error
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern '{pattern}' in {context}: {source}")]
    Pattern {
        context: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid policy: {0}")]
    Invalid(String),
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Required record fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaPolicy {
    pub required_fields: Vec<String>,
    /// Exact value `reading_level` must hold
    pub reading_level: Option<String>,
    pub why_it_matters_min_chars: Option<usize>,
}

impl Default for SchemaPolicy {
    fn default() -> Self {
        Self {
            required_fields: strings(&CARD_FIELDS),
            reading_level: None,
            why_it_matters_min_chars: None,
        }
    }
}

/// Prompt side of the card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontPolicy {
    pub max_words: Option<usize>,
    pub must_end_with_question_mark: bool,
}

/// Answer side of the card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackPolicy {
    pub min_words: usize,
    pub max_words: usize,
    pub max_sentence_words: usize,
    /// Heading labels, without the trailing period, in required order
    pub required_headings: Vec<String>,
    /// Accept missing headings (as a warning) when the back ends with a
    /// `(No ... applicable)` marker
    pub allow_missing_blocks_if_not_applicable: bool,
    pub forbid_duplicate_headings: bool,
    /// Opening phrases that mark a paragraph as belonging to a heading
    pub section_openers: BTreeMap<String, Vec<String>>,
    /// Case-insensitive patterns for concepts the back must mention
    pub must_include_terms: Vec<String>,
}

impl Default for BackPolicy {
    fn default() -> Self {
        let openers: [(&str, &[&str]); 7] = [
            ("Issue", &["The issue", "Issue:", "Whether", "The question"]),
            (
                "Rule",
                &["The rule", "The test", "The law", "The principle", "The governing"],
            ),
            (
                "Application scaffold",
                &["First,", "Apply", "Applying", "To apply", "In application"],
            ),
            ("Authorities map", &["Step 1", "Lead authority", "Authorities:"]),
            (
                "Statutory hook",
                &["Under the", "Under s", "The statute", "Legislation", "Wrongs Act", "Civil Liability Act"],
            ),
            (
                "Tripwires",
                &["Never", "Watch", "Avoid", "Beware", "Common error", "Do not", "Don't"],
            ),
            (
                "Conclusion",
                &["In conclusion", "Conclude", "Therefore", "Thus", "Finally", "Return to", "Overall"],
            ),
        ];

        Self {
            min_words: 160,
            max_words: 280,
            max_sentence_words: 28,
            required_headings: strings(&[
                "Issue",
                "Rule",
                "Application scaffold",
                "Authorities map",
                "Statutory hook",
                "Tripwires",
                "Conclusion",
            ]),
            allow_missing_blocks_if_not_applicable: true,
            forbid_duplicate_headings: true,
            section_openers: openers
                .iter()
                .map(|(heading, phrases)| (heading.to_string(), strings(phrases)))
                .collect(),
            must_include_terms: Vec::new(),
        }
    }
}

/// Anchor list bounds and content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorPolicy {
    pub min_items: usize,
    pub max_items: usize,
    pub each_item_max_words: Option<usize>,
    pub require_case_or_statute_ref: bool,
    pub uk_or_persuasive_requires_note: bool,
    /// Warn on anchors that match no `pinpoint` citation requirement
    pub require_pinpoint: bool,
}

impl Default for AnchorPolicy {
    fn default() -> Self {
        Self {
            min_items: 1,
            max_items: 8,
            each_item_max_words: Some(120),
            require_case_or_statute_ref: true,
            uk_or_persuasive_requires_note: true,
            require_pinpoint: true,
        }
    }
}

/// A court tier and the patterns that identify it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub tag: String,
    pub patterns: Vec<String>,
}

/// Authorities map and authority ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityPolicy {
    /// Tier tags from most to least authoritative
    pub priority_order: Vec<String>,
    pub lead_required: bool,
    pub require_citation_per_step: bool,
    pub max_per_step: usize,
    pub fallback_allowed: bool,
    pub require_year_and_citation: bool,
    pub flag_overruled_or_distinguished: bool,
    /// Tiers whose authorities must carry a nuance note
    pub nuance_required_tiers: Vec<String>,
    pub tiers: Vec<TierSpec>,
    pub fallback_tier: String,
    /// Topic tag -> patterns expected somewhere in the card
    pub references: BTreeMap<String, Vec<String>>,
}

impl Default for AuthorityPolicy {
    fn default() -> Self {
        let tier = |tag: &str, patterns: &[&str]| TierSpec {
            tag: tag.to_string(),
            patterns: strings(patterns),
        };
        let references: [(&str, &[&str]); 6] = [
            ("Duty", &["Sullivan v Moody", "Perre v Apand", "Woolcock Street"]),
            ("Breach", &[r"Wyong.*Shirt", "Rogers v Whitaker", r"\bs\s*59\b"]),
            (
                "Causation",
                &[r"\bs\s*51\(1\)\(a\)", "March v Stramare", "Strong v Woolworths", "Wallace v Kam"],
            ),
            ("Property", &[r"Plenty v Dillon|Halliday v Nevill|Kuru v (?:State of )?NSW"]),
            ("Defamation", &[r"Defamation Act 2005 \(Vic\)"]),
            ("Apportionment", &[r"Pt\s*IVAA"]),
        ];

        Self {
            priority_order: strings(&["HCA", "State CA", "Other Aus", "UK/PC"]),
            lead_required: true,
            require_citation_per_step: true,
            max_per_step: 2,
            fallback_allowed: true,
            require_year_and_citation: true,
            flag_overruled_or_distinguished: true,
            nuance_required_tiers: strings(&["UK/PC"]),
            tiers: vec![
                tier("HCA", &[r"\bHCA\b", r"\bCLR\b", r"High Court"]),
                tier(
                    "State CA",
                    &[r"\b(?:VSCA|NSWCA|QCA|SASCFC|WASCA|TASCCA|ACTCA|NTCA)\b", r"Court of Appeal"],
                ),
                tier(
                    "UK/PC",
                    &[r"\b(?:UKHL|UKSC|UKPC|AC|QB|KB|WLR|UK|PC)\b", r"All ER", r"Privy Council", r"House of Lords"],
                ),
                tier("Statute", &[r"\bAct\b", r"\bRegulations?\b"]),
            ],
            fallback_tier: "Other Aus".to_string(),
            references: references
                .iter()
                .map(|(topic, patterns)| (topic.to_string(), strings(patterns)))
                .collect(),
        }
    }
}

/// Statute citation expectations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatutePolicy {
    pub require_operative_section: bool,
    pub prefer_victoria_first: bool,
    pub require_commonwealth_if_engaged: bool,
}

impl Default for StatutePolicy {
    fn default() -> Self {
        Self {
            require_operative_section: true,
            prefer_victoria_first: true,
            require_commonwealth_if_engaged: true,
        }
    }
}

/// One requirement of a citation class, met by any of its patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementSpec {
    pub label: String,
    pub any_of: Vec<String>,
}

/// Named citation class with its failure template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationClassSpec {
    pub requirements: Vec<RequirementSpec>,
    pub message: String,
}

fn default_citations() -> BTreeMap<String, CitationClassSpec> {
    let class = |requirements: &[(&str, &[&str])], message: &str| CitationClassSpec {
        requirements: requirements
            .iter()
            .map(|(label, any_of)| RequirementSpec {
                label: label.to_string(),
                any_of: strings(any_of),
            })
            .collect(),
        message: message.to_string(),
    };

    let mut citations = BTreeMap::new();
    citations.insert(
        "case".to_string(),
        class(
            &[
                ("year", &[r"\b(?:1[5-9]|20)\d{2}\b"]),
                (
                    "neutral or report citation",
                    &[
                        r"\[(?:1[5-9]|20)\d{2}\]\s*[A-Z][A-Za-z]*\s*\d+",
                        r"\b\d+\s*[A-Z]{2,}[A-Za-z]*\s*\d+\b",
                    ],
                ),
            ],
            "Authority missing year and neutral/report citation: {text}",
        ),
    );
    citations.insert(
        "statute".to_string(),
        class(
            &[(
                "operative section",
                &[r"\bss?\s*\d+", r"\bsections?\s+\d+", r"\bs\.\s*\d+"],
            )],
            "Statute reference must include operational section: {text}",
        ),
    );
    citations.insert(
        "statute-form".to_string(),
        class(
            &[
                ("year", &[r"\b(?:1[6-9]|20)\d{2}\b"]),
                (
                    "jurisdiction",
                    &[r"\((?:Vic|NSW|Cth|Qld|SA|WA|Tas|NT|ACT|UK|Imp)\)"],
                ),
            ],
            "Statute reference should include {missing}: {text}",
        ),
    );
    citations.insert(
        "reference".to_string(),
        class(
            &[("case or statute", &[r"\bv\b", r"\bAct\b", r"\bss?\s*\d"])],
            "Anchor {index} must reference a case or statute",
        ),
    );
    citations.insert(
        "pinpoint".to_string(),
        class(
            &[(
                "pinpoint",
                &[
                    r"(?i)\[para[^\]]+\]",
                    r"(?i)\bpara(?:graph)?\s+\d+",
                    r",\s*\d{1,4}(?:[–-]\d{1,4})?",
                    r"(?i)\b(?:CLR|ALR|AC|NSWLR|VR|FCR|SASR|WLR|QB|Ch|All\s+ER|SCR|FCAFC|FCA|HCA|VSCA|VSC|Aust\s+Torts\s+Reports)\s*\d{1,4}",
                    r"(?i)\bss?\s*\d+[A-Za-z]*",
                ],
            )],
            "Anchor missing pinpoint: {text}",
        ),
    );
    citations
}

/// Abbreviation handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbbreviationPolicy {
    pub expand_on_first_use: bool,
    pub whitelist: BTreeSet<String>,
    /// Known expansions, used by repair
    pub expansions: BTreeMap<String, String>,
}

impl Default for AbbreviationPolicy {
    fn default() -> Self {
        let expansions = [
            ("ACL", "Australian Consumer Law"),
            ("CCA", "Competition and Consumer Act"),
            ("CLR", "Commonwealth Law Reports"),
            ("EPA", "Environment Protection Authority"),
            ("ER", "English Reports"),
            ("FCR", "Federal Court Reports"),
            ("UKHL", "United Kingdom House of Lords"),
            ("VBA", "Victorian Bar Association"),
            ("VLR", "Victorian Law Reports"),
            ("VR", "Victorian Reports"),
            ("WLR", "Weekly Law Reports"),
        ];
        Self {
            expand_on_first_use: true,
            whitelist: ["HCA", "AGLC", "JD", "LLB", "NSW", "VIC", "SA", "WA", "QLD", "ACT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            expansions: expansions
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Keyword bounds and recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordPolicy {
    pub min: usize,
    pub max: usize,
    /// Topic tag -> recommended keyword phrases
    pub recommended: BTreeMap<String, Vec<String>>,
    /// Phrases recommended whenever they already occur in the back
    pub recommended_if_relevant: Vec<String>,
    /// Phrases every card must list, hyphens and spaces interchangeable
    pub required: Vec<String>,
}

impl Default for KeywordPolicy {
    fn default() -> Self {
        Self {
            min: 6,
            max: 10,
            recommended: BTreeMap::new(),
            recommended_if_relevant: strings(&[
                "salient features",
                "exclusive possession",
                "relational loss",
                "proportionate liability",
                "obvious risk",
                "scope of liability",
                "voluntary assumption of risk",
                "vicarious liability",
            ]),
            required: Vec::new(),
        }
    }
}

/// Mindmap shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramPolicy {
    pub require_mermaid_fence: bool,
    pub require_mindmap: bool,
    pub min_branches: usize,
    pub max_branches: usize,
    pub max_total_nodes: Option<usize>,
    pub discourage_heading_mirroring: bool,
    /// Case-insensitive pattern at least one top-level branch must match
    pub required_branch_pattern: Option<String>,
}

impl Default for DiagramPolicy {
    fn default() -> Self {
        Self {
            require_mermaid_fence: true,
            require_mindmap: true,
            min_branches: 4,
            max_branches: 5,
            max_total_nodes: Some(12),
            discourage_heading_mirroring: true,
            required_branch_pattern: None,
        }
    }
}

/// Tripwire list bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripwirePolicy {
    pub min: usize,
    pub max: usize,
    pub duplicate_similarity_threshold: f64,
    pub max_chars: Option<usize>,
}

impl Default for TripwirePolicy {
    fn default() -> Self {
        Self {
            min: 3,
            max: 6,
            duplicate_similarity_threshold: 0.8,
            max_chars: None,
        }
    }
}

/// Mandatory tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagPolicy {
    pub required: Vec<String>,
}

impl Default for TagPolicy {
    fn default() -> Self {
        Self {
            required: strings(&["MLS_H1"]),
        }
    }
}

/// Cross-field prose checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintPolicy {
    pub near_duplicate_threshold: f64,
    pub near_duplicate_scope: DuplicateScope,
    pub near_duplicate_fields: Vec<String>,
    /// Case-insensitive patterns that mark unfinished text
    pub placeholder_patterns: Vec<String>,
    /// Token an author may use in place of an authority they could not verify
    pub uncertainty_token: Option<String>,
}

impl Default for LintPolicy {
    fn default() -> Self {
        Self {
            near_duplicate_threshold: 0.8,
            near_duplicate_scope: DuplicateScope::Both,
            near_duplicate_fields: strings(&["front", "back", "why_it_matters"]),
            placeholder_patterns: strings(&["TBD", "lorem ipsum"]),
            uncertainty_token: Some("[NO VERIFIED AUTHORITY FOUND]".to_string()),
        }
    }
}

/// Declarative policy document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySpec {
    pub schema: SchemaPolicy,
    pub front: FrontPolicy,
    pub back: BackPolicy,
    pub anchors: AnchorPolicy,
    pub authorities: AuthorityPolicy,
    pub statutes: StatutePolicy,
    pub citations: BTreeMap<String, CitationClassSpec>,
    pub abbreviations: AbbreviationPolicy,
    pub keywords: KeywordPolicy,
    pub diagram: DiagramPolicy,
    pub tripwires: TripwirePolicy,
    pub tags: TagPolicy,
    pub lint: LintPolicy,
}

impl Default for PolicySpec {
    fn default() -> Self {
        Self {
            schema: SchemaPolicy::default(),
            front: FrontPolicy::default(),
            back: BackPolicy::default(),
            anchors: AnchorPolicy::default(),
            authorities: AuthorityPolicy::default(),
            statutes: StatutePolicy::default(),
            citations: default_citations(),
            abbreviations: AbbreviationPolicy::default(),
            keywords: KeywordPolicy::default(),
            diagram: DiagramPolicy::default(),
            tripwires: TripwirePolicy::default(),
            tags: TagPolicy::default(),
            lint: LintPolicy::default(),
        }
    }
}

impl PolicySpec {
    /// Names accepted by [`PolicySpec::preset`]
    pub const PRESETS: [&'static str; 2] = ["default", "strict"];

    /// Get a preset policy by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "strict" => Some(Self::preset_strict()),
            _ => None,
        }
    }

    /// Strict preset - exactly four tripwires, question-form fronts
    fn preset_strict() -> Self {
        let mut spec = Self::default();
        spec.tripwires.min = 4;
        spec.tripwires.max = 4;
        spec.front.must_end_with_question_mark = true;
        spec.front.max_words = Some(40);
        spec.back.allow_missing_blocks_if_not_applicable = false;
        spec
    }

    /// Load a policy document, resolving `extends`
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let value = load_value(path, 0)?;
        Ok(serde_yaml::from_value(value)?)
    }

    /// Parse a policy document held in memory
    ///
    /// `extends` may only name presets here, since there is no base directory.
    pub fn from_yaml_str(content: &str) -> Result<Self, PolicyError> {
        let value: Value = serde_yaml::from_str(content)?;
        let value = resolve_extends(value, None, 0)?;
        Ok(serde_yaml::from_value(value)?)
    }
}

/// Load with recursion depth limit (to prevent inheritance loops)
fn load_value(path: &Path, depth: usize) -> Result<Value, PolicyError> {
    let content = std::fs::read_to_string(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let value: Value = match ext {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "json" => serde_json::from_str(&content)?,
        _ => {
            return Err(PolicyError::Invalid(format!(
                "Unknown policy file format: {}",
                ext
            )))
        }
    };

    log::debug!("Loaded policy document {}", path.display());
    resolve_extends(value, path.parent(), depth)
}

fn resolve_extends(
    mut value: Value,
    base_dir: Option<&Path>,
    depth: usize,
) -> Result<Value, PolicyError> {
    const MAX_DEPTH: usize = 10;
    if depth >= MAX_DEPTH {
        return Err(PolicyError::Invalid(
            "Maximum policy inheritance depth exceeded".to_string(),
        ));
    }

    let is_null = value.is_null();
    let extends = match value.as_mapping_mut() {
        Some(map) => map.remove("extends"),
        None if is_null => None,
        None => {
            return Err(PolicyError::Invalid(
                "Policy document must be a mapping".to_string(),
            ))
        }
    };

    let names: Vec<String> = match extends {
        None | Some(Value::Null) => return Ok(value),
        Some(Value::String(name)) => vec![name],
        Some(Value::Sequence(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                _ => Err(PolicyError::Invalid(
                    "extends entries must be strings".to_string(),
                )),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(PolicyError::Invalid(
                "extends must be a string or a list".to_string(),
            ))
        }
    };

    let mut base = Value::Mapping(Mapping::new());
    for name in names {
        let extended = if let Some(preset) = PolicySpec::preset(&name) {
            serde_yaml::to_value(preset)?
        } else {
            let dir = base_dir.ok_or_else(|| {
                PolicyError::Invalid(format!("Unknown policy preset: {}", name))
            })?;
            let path = if Path::new(&name).is_absolute() {
                PathBuf::from(&name)
            } else {
                dir.join(&name)
            };
            load_value(&path, depth + 1)?
        };
        merge_values(&mut base, extended);
    }

    merge_values(&mut base, value);
    Ok(base)
}

/// Deep-merge `overlay` into `base`; mappings merge, everything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

/// Compiled, immutable policy
#[derive(Debug, Clone)]
pub struct Policy {
    spec: PolicySpec,
    citations: BTreeMap<String, CitationClass>,
    tiers: TierTable,
    placeholders: Vec<(String, Regex)>,
    required_terms: Vec<(String, Regex)>,
    required_branch: Option<(String, Regex)>,
    references: BTreeMap<String, Vec<(String, Regex)>>,
    openers: Vec<Vec<String>>,
}

fn compile(pattern: &str, context: &str) -> Result<Regex, PolicyError> {
    Regex::new(pattern).map_err(|source| PolicyError::Pattern {
        context: context.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_ignore_case(pattern: &str, context: &str) -> Result<Regex, PolicyError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| PolicyError::Pattern {
            context: context.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

fn check_bounds(name: &str, min: usize, max: usize) -> Result<(), PolicyError> {
    if min > max {
        return Err(PolicyError::Invalid(format!(
            "{}: minimum {} exceeds maximum {}",
            name, min, max
        )));
    }
    Ok(())
}

fn check_ratio(name: &str, value: f64) -> Result<(), PolicyError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(PolicyError::Invalid(format!(
            "{} must be between 0 and 1 (found {})",
            name, value
        )));
    }
    Ok(())
}

fn check_unique(name: &str, items: &[String]) -> Result<(), PolicyError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.as_str()) {
            return Err(PolicyError::Invalid(format!(
                "{} contains duplicate entry '{}'",
                name, item
            )));
        }
    }
    Ok(())
}

impl Policy {
    /// Check invariants and compile every pattern
    pub fn from_spec(spec: PolicySpec) -> Result<Self, PolicyError> {
        check_bounds("back words", spec.back.min_words, spec.back.max_words)?;
        check_bounds("anchors", spec.anchors.min_items, spec.anchors.max_items)?;
        check_bounds("keywords", spec.keywords.min, spec.keywords.max)?;
        check_bounds(
            "mindmap branches",
            spec.diagram.min_branches,
            spec.diagram.max_branches,
        )?;
        check_bounds("tripwires", spec.tripwires.min, spec.tripwires.max)?;
        check_ratio("near_duplicate_threshold", spec.lint.near_duplicate_threshold)?;
        check_ratio(
            "duplicate_similarity_threshold",
            spec.tripwires.duplicate_similarity_threshold,
        )?;
        check_unique("priority_order", &spec.authorities.priority_order)?;
        check_unique("required_headings", &spec.back.required_headings)?;
        if spec.authorities.max_per_step == 0 {
            return Err(PolicyError::Invalid(
                "max_per_step must be at least 1".to_string(),
            ));
        }
        if spec.back.required_headings.iter().any(|h| h.trim().is_empty()) {
            return Err(PolicyError::Invalid(
                "required_headings contains an empty label".to_string(),
            ));
        }
        for field in spec
            .schema
            .required_fields
            .iter()
            .chain(&spec.lint.near_duplicate_fields)
        {
            if !CARD_FIELDS.contains(&field.as_str()) {
                return Err(PolicyError::Invalid(format!("Unknown card field: {}", field)));
            }
        }
        for name in REQUIRED_CITATION_CLASSES {
            if !spec.citations.contains_key(name) {
                return Err(PolicyError::Invalid(format!(
                    "Missing citation class: {}",
                    name
                )));
            }
        }
        for (abbreviation, expansion) in &spec.abbreviations.expansions {
            if !EXPANSION_SHAPE.is_match(expansion) {
                return Err(PolicyError::Invalid(format!(
                    "Expansion for {} must be plain words: {}",
                    abbreviation, expansion
                )));
            }
        }

        let mut citations = BTreeMap::new();
        for (name, class) in &spec.citations {
            let mut requirements = Vec::new();
            for requirement in &class.requirements {
                let context = format!("citation class '{}'", name);
                let patterns = requirement
                    .any_of
                    .iter()
                    .map(|p| compile(p, &context))
                    .collect::<Result<Vec<_>, _>>()?;
                requirements.push(Requirement::new(&requirement.label, patterns));
            }
            citations.insert(
                name.clone(),
                CitationClass::new(name, requirements, &class.message),
            );
        }

        let mut tiers = Vec::new();
        for tier in &spec.authorities.tiers {
            let context = format!("tier '{}'", tier.tag);
            let patterns = tier
                .patterns
                .iter()
                .map(|p| compile(p, &context))
                .collect::<Result<Vec<_>, _>>()?;
            tiers.push((tier.tag.clone(), patterns));
        }

        let placeholders = spec
            .lint
            .placeholder_patterns
            .iter()
            .map(|p| compile_ignore_case(p, "placeholder_patterns").map(|r| (p.clone(), r)))
            .collect::<Result<Vec<_>, _>>()?;

        let required_terms = spec
            .back
            .must_include_terms
            .iter()
            .map(|p| compile_ignore_case(p, "must_include_terms").map(|r| (p.clone(), r)))
            .collect::<Result<Vec<_>, _>>()?;

        let required_branch = spec
            .diagram
            .required_branch_pattern
            .as_ref()
            .map(|p| compile_ignore_case(p, "required_branch_pattern").map(|r| (p.clone(), r)))
            .transpose()?;

        let mut references = BTreeMap::new();
        for (topic, patterns) in &spec.authorities.references {
            let context = format!("references for '{}'", topic);
            let compiled = patterns
                .iter()
                .map(|p| compile(p, &context).map(|r| (p.clone(), r)))
                .collect::<Result<Vec<_>, _>>()?;
            references.insert(topic.clone(), compiled);
        }

        let openers = spec
            .back
            .required_headings
            .iter()
            .map(|heading| {
                spec.back
                    .section_openers
                    .get(heading)
                    .map(|phrases| phrases.iter().map(|p| p.to_lowercase()).collect())
                    .unwrap_or_default()
            })
            .collect();

        let tiers = TierTable::new(tiers, &spec.authorities.fallback_tier);

        Ok(Self {
            spec,
            citations,
            tiers,
            placeholders,
            required_terms,
            required_branch,
            references,
            openers,
        })
    }

    /// Load and compile a policy file
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let policy = Self::from_spec(PolicySpec::load(path)?)?;
        log::info!("Using policy {}", path.display());
        Ok(policy)
    }

    /// Compile a named preset
    pub fn preset(name: &str) -> Result<Self, PolicyError> {
        let spec = PolicySpec::preset(name)
            .ok_or_else(|| PolicyError::Invalid(format!("Unknown policy preset: {}", name)))?;
        Self::from_spec(spec)
    }

    /// The policy document this was compiled from
    pub fn spec(&self) -> &PolicySpec {
        &self.spec
    }

    pub fn max_back_words(&self) -> usize {
        self.spec.back.max_words
    }

    pub fn max_sentence_words(&self) -> usize {
        self.spec.back.max_sentence_words
    }

    pub fn required_headings(&self) -> &[String] {
        &self.spec.back.required_headings
    }

    pub fn max_anchors(&self) -> usize {
        self.spec.anchors.max_items
    }

    pub fn min_mindmap_branches(&self) -> usize {
        self.spec.diagram.min_branches
    }

    pub fn max_mindmap_branches(&self) -> usize {
        self.spec.diagram.max_branches
    }

    pub fn authority_priority(&self) -> &[String] {
        &self.spec.authorities.priority_order
    }

    pub fn abbreviation_whitelist(&self) -> &BTreeSet<String> {
        &self.spec.abbreviations.whitelist
    }

    pub fn keyword_recommendations(&self) -> &BTreeMap<String, Vec<String>> {
        &self.spec.keywords.recommended
    }

    pub fn near_duplicate_threshold(&self) -> f64 {
        self.spec.lint.near_duplicate_threshold
    }

    pub fn min_keywords(&self) -> usize {
        self.spec.keywords.min
    }

    pub fn max_keywords(&self) -> usize {
        self.spec.keywords.max
    }

    /// Compiled patterns a topic tag requires, with their source text
    pub fn authority_reference_requirements(&self, topic: &str) -> &[(String, Regex)] {
        self.references.get(topic).map_or(&[], Vec::as_slice)
    }

    pub fn citation_class(&self, name: &str) -> Option<&CitationClass> {
        self.citations.get(name)
    }

    /// Priority tag for an authority string
    pub fn classify_authority<'a>(&'a self, text: &str) -> &'a str {
        self.tiers.classify(text)
    }

    /// Rank of a tier in the priority order, lower is stronger
    pub fn priority_rank(&self, tag: &str) -> Option<usize> {
        self.authority_priority().iter().position(|t| t == tag)
    }

    pub fn placeholder_patterns(&self) -> &[(String, Regex)] {
        &self.placeholders
    }

    /// Compiled concepts the back must mention, with their source text
    pub fn required_terms(&self) -> &[(String, Regex)] {
        &self.required_terms
    }

    pub fn required_branch(&self) -> Option<&(String, Regex)> {
        self.required_branch.as_ref()
    }

    /// Lowercased opening phrases for the heading at `index`
    pub fn section_openers(&self, index: usize) -> &[String] {
        self.openers.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn uncertainty_token(&self) -> Option<&str> {
        self.spec
            .lint
            .uncertainty_token
            .as_deref()
            .filter(|t| !t.is_empty())
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_spec(PolicySpec::default()).expect("built-in policy compiles")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_policy_compiles() {
        let policy = Policy::default();
        assert_eq!(policy.max_back_words(), 280);
        assert_eq!(policy.max_sentence_words(), 28);
        assert_eq!(policy.required_headings().len(), 7);
        assert_eq!(policy.max_anchors(), 8);
        assert_eq!(policy.min_mindmap_branches(), 4);
        assert_eq!(policy.max_mindmap_branches(), 5);
        assert_eq!(policy.min_keywords(), 6);
        assert_eq!(policy.max_keywords(), 10);
        assert!(policy.abbreviation_whitelist().contains("HCA"));
        assert!(policy.citation_class("case").is_some());
        assert!(Policy::preset("strict").is_ok());
    }

    #[test]
    fn test_classify_and_rank() {
        let policy = Policy::default();
        assert_eq!(
            policy.classify_authority("Sullivan v Moody [2001] HCA 59"),
            "HCA"
        );
        assert_eq!(
            policy.classify_authority("Donoghue v Stevenson [1932] AC 562"),
            "UK/PC"
        );
        assert_eq!(
            policy.classify_authority("Smith v Jones [2015] VSC 12"),
            "Other Aus"
        );
        assert_eq!(policy.priority_rank("HCA"), Some(0));
        assert_eq!(policy.priority_rank("UK/PC"), Some(3));
        assert_eq!(policy.priority_rank("Statute"), None);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut spec = PolicySpec::default();
        spec.keywords.min = 12;
        let err = Policy::from_spec(spec).unwrap_err();
        assert!(err.to_string().contains("keywords"));
    }

    #[test]
    fn test_rejects_duplicate_priority() {
        let mut spec = PolicySpec::default();
        spec.authorities.priority_order = vec!["HCA".into(), "HCA".into()];
        assert!(matches!(
            Policy::from_spec(spec),
            Err(PolicyError::Invalid(msg)) if msg.contains("duplicate")
        ));
    }

    #[test]
    fn test_rejects_bad_pattern_and_unknown_field() {
        let mut spec = PolicySpec::default();
        spec.lint.placeholder_patterns = vec!["(unclosed".into()];
        assert!(matches!(
            Policy::from_spec(spec),
            Err(PolicyError::Pattern { .. })
        ));

        let mut spec = PolicySpec::default();
        spec.schema.required_fields.push("summary".into());
        assert!(Policy::from_spec(spec).is_err());
    }

    #[test]
    fn test_negative_bound_is_a_parse_error() {
        let result = PolicySpec::from_yaml_str("back:\n  max_words: -5\n");
        assert!(matches!(result, Err(PolicyError::Yaml(_))));
    }

    #[test]
    fn test_yaml_overrides_keep_other_defaults() {
        let spec = PolicySpec::from_yaml_str(
            "back:\n  max_words: 300\nkeywords:\n  recommended:\n    LAWS50025_Torts: [duty of care]\n",
        )
        .unwrap();
        assert_eq!(spec.back.max_words, 300);
        assert_eq!(spec.back.max_sentence_words, 28);
        assert_eq!(spec.keywords.min, 6);
        assert_eq!(
            spec.keywords.recommended.get("LAWS50025_Torts"),
            Some(&vec!["duty of care".to_string()])
        );
    }

    #[test]
    fn test_extends_preset() {
        let spec = PolicySpec::from_yaml_str("extends: strict\nkeywords:\n  max: 12\n").unwrap();
        assert_eq!(spec.tripwires.min, 4);
        assert_eq!(spec.tripwires.max, 4);
        assert_eq!(spec.keywords.max, 12);
        assert!(PolicySpec::from_yaml_str("extends: nope\n").is_err());
    }

    #[test]
    fn test_document_must_be_a_mapping() {
        let err = PolicySpec::from_yaml_str("- default\n- strict\n").unwrap_err();
        assert!(err.to_string().contains("must be a mapping"));
    }

    #[test]
    fn test_extends_file_and_citation_override() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yml");
        let mut file = std::fs::File::create(&base).unwrap();
        writeln!(file, "extends: [strict]\ntags:\n  required: [MLS_H1, LAWS50025_Torts]").unwrap();

        let child = dir.path().join("child.yaml");
        std::fs::write(
            &child,
            "extends: base.yml\ncitations:\n  statute:\n    requirements:\n      - label: pinpoint\n        any_of: ['\\bs\\s*\\d+']\n    message: 'Pinpoint needed: {text}'\n",
        )
        .unwrap();

        let policy = Policy::load(&child).unwrap();
        assert_eq!(policy.spec().tripwires.max, 4);
        assert_eq!(policy.spec().tags.required.len(), 2);
        let statute = policy.citation_class("statute").unwrap();
        assert!(!statute.check("Wrongs Act 1958 (Vic)").passed);
        assert!(policy.citation_class("case").is_some());
    }

    #[test]
    fn test_extends_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.yml");
        std::fs::write(&path, "extends: loop.yml\n").unwrap();
        let err = PolicySpec::load(&path).unwrap_err();
        assert!(err.to_string().contains("depth"));
    }

    #[test]
    fn test_json_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.json");
        std::fs::write(&path, r#"{"diagram": {"max_branches": 9}}"#).unwrap();
        let policy = Policy::load(&path).unwrap();
        assert_eq!(policy.max_mindmap_branches(), 9);
    }
}
