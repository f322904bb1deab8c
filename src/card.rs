//! Card model
//!
//! A [`Card`] is built once from a raw YAML record and is read-only during
//! validation. Fields absent from the record are remembered so the
//! required-field check can tell "missing" from "empty", and unknown fields are
//! carried through untouched so a repaired card can be written back whole.

use crate::diagnostic::Location;
use crate::policy::{Policy, CARD_FIELDS};
use crate::text::{extract_mentions, Mention, MentionKind, Outline};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use thiserror::Error;

/// Heading whose section holds the derived authorities map
pub const AUTHORITIES_HEADING: &str = "Authorities map";

/// Heading whose section holds the statutory hook
pub const STATUTORY_HEADING: &str = "Statutory hook";

static STEP_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bStep\s+\d+\b").unwrap());

const BULLETS: [&str; 3] = ["- ", "* ", "• "];

/// Raw record could not be turned into a card
#[derive(Debug, Error)]
pub enum CardParseError {
    #[error("{message}")]
    Yaml {
        message: String,
        location: Option<Location>,
    },

    #[error("Card record must be a mapping of fields")]
    NotAMapping,
}

impl CardParseError {
    pub fn location(&self) -> Option<Location> {
        match self {
            CardParseError::Yaml { location, .. } => *location,
            CardParseError::NotAMapping => None,
        }
    }
}

impl From<serde_yaml::Error> for CardParseError {
    fn from(err: serde_yaml::Error) -> Self {
        CardParseError::Yaml {
            location: err.location().map(|l| Location::new(l.line(), l.column())),
            message: err.to_string(),
        }
    }
}

/// Anchors grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupedAnchors {
    pub cases: Vec<String>,
    pub statutes: Vec<String>,
    pub notes: Vec<String>,
}

/// Supporting citations, either a flat list or grouped by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Anchors {
    List(Vec<String>),
    Grouped(GroupedAnchors),
}

impl Default for Anchors {
    fn default() -> Self {
        Anchors::List(Vec::new())
    }
}

impl Anchors {
    /// Every anchor string in record order
    pub fn items(&self) -> Vec<&str> {
        match self {
            Anchors::List(items) => items.iter().map(String::as_str).collect(),
            Anchors::Grouped(group) => group
                .cases
                .iter()
                .chain(&group.statutes)
                .chain(&group.notes)
                .map(String::as_str)
                .collect(),
        }
    }

    /// Anchors that are expected to cite something (notes are not)
    pub fn citations(&self) -> Vec<&str> {
        match self {
            Anchors::List(items) => items.iter().map(String::as_str).collect(),
            Anchors::Grouped(group) => group
                .cases
                .iter()
                .chain(&group.statutes)
                .map(String::as_str)
                .collect(),
        }
    }

    pub fn notes(&self) -> &[String] {
        match self {
            Anchors::List(_) => &[],
            Anchors::Grouped(group) => &group.notes,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One explicit authorities map entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorityEntry {
    Text(String),
    Detailed {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tier: Option<String>,
    },
}

impl AuthorityEntry {
    pub fn text(&self) -> &str {
        match self {
            AuthorityEntry::Text(text) | AuthorityEntry::Detailed { text, .. } => text,
        }
    }

    pub fn tier(&self) -> Option<&str> {
        match self {
            AuthorityEntry::Text(_) => None,
            AuthorityEntry::Detailed { tier, .. } => tier.as_deref(),
        }
    }

    pub fn set_text(&mut self, new_text: String) {
        match self {
            AuthorityEntry::Text(text) | AuthorityEntry::Detailed { text, .. } => *text = new_text,
        }
    }
}

/// Where a step's text lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSource {
    /// Index into the explicit `authorities_map` list
    Explicit(usize),
    /// Byte range in the back
    Back(Range<usize>),
}

/// One reasoning step of the authorities map
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorityStep {
    /// 1-based position
    pub number: usize,
    pub text: String,
    /// Tier declared for the step's lead authority
    pub tier: Option<String>,
    /// Mentions with ranges relative to `text`
    pub mentions: Vec<Mention>,
    pub source: StepSource,
}

impl AuthorityStep {
    /// Cited cases and statutes, placeholders excluded
    pub fn authorities(&self) -> impl Iterator<Item = &Mention> {
        self.mentions
            .iter()
            .filter(|m| m.kind != MentionKind::Placeholder)
    }

    pub fn has_placeholder(&self) -> bool {
        self.mentions
            .iter()
            .any(|m| m.kind == MentionKind::Placeholder)
    }

    /// Tier of each authority, in order
    pub fn tiers<'p>(&'p self, policy: &'p Policy) -> Vec<&'p str> {
        self.authorities()
            .enumerate()
            .map(|(i, mention)| match (&self.tier, i) {
                (Some(tier), 0) => tier.as_str(),
                _ => policy.classify_authority(&mention.text),
            })
            .collect()
    }
}

/// Take one field out of the record, locating the error at its key
fn take_field<T: DeserializeOwned>(
    mapping: &mut Mapping,
    source: &str,
    name: &str,
) -> Result<Option<T>, CardParseError> {
    let Some(value) = mapping.remove(name) else {
        return Ok(None);
    };
    serde_yaml::from_value::<Option<T>>(value).map_err(|err| CardParseError::Yaml {
        location: Some(
            err.location()
                .map(|l| Location::new(l.line(), l.column()))
                .or_else(|| key_location(source, name))
                .unwrap_or(Location::new(1, 1)),
        ),
        message: format!("{}: {}", name, err),
    })
}

/// Line of a top-level key in the record source
fn key_location(source: &str, key: &str) -> Option<Location> {
    source.lines().enumerate().find_map(|(i, line)| {
        let rest = line.strip_prefix(key)?;
        rest.trim_start()
            .starts_with(':')
            .then(|| Location::new(i + 1, 1))
    })
}

/// One flashcard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Card {
    /// Stable identifier, usually the record's path
    pub id: String,
    pub front: String,
    pub back: String,
    pub why_it_matters: String,
    pub mnemonic: String,
    pub diagram: String,
    pub tripwires: Vec<String>,
    pub anchors: Anchors,
    pub keywords: Vec<String>,
    pub reading_level: String,
    pub tags: Vec<String>,
    /// Explicit authorities map; derived from the back when absent
    pub authorities_map: Option<Vec<AuthorityEntry>>,
    /// Fields this crate does not interpret
    pub extra: BTreeMap<String, Value>,
    pub(crate) missing: BTreeSet<String>,
    pub(crate) key_order: Vec<String>,
}

impl Card {
    /// Parse a YAML record
    pub fn from_yaml(id: impl Into<String>, source: &str) -> Result<Self, CardParseError> {
        let value: Value = serde_yaml::from_str(source)?;
        let Value::Mapping(mut mapping) = value else {
            return Err(CardParseError::NotAMapping);
        };

        let key_order: Vec<String> = mapping
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect();
        let missing = CARD_FIELDS
            .iter()
            .filter(|field| !key_order.iter().any(|k| k == *field))
            .map(|field| field.to_string())
            .collect();

        let m = &mut mapping;
        let front: Option<String> = take_field(m, source, "front")?;
        let back: Option<String> = take_field(m, source, "back")?;
        let why_it_matters: Option<String> = take_field(m, source, "why_it_matters")?;
        let mnemonic: Option<String> = take_field(m, source, "mnemonic")?;
        let diagram: Option<String> = take_field(m, source, "diagram")?;
        let tripwires: Option<Vec<String>> = take_field(m, source, "tripwires")?;
        let anchors: Option<Anchors> = take_field(m, source, "anchors")?;
        let keywords: Option<Vec<String>> = take_field(m, source, "keywords")?;
        let reading_level: Option<String> = take_field(m, source, "reading_level")?;
        let tags: Option<Vec<String>> = take_field(m, source, "tags")?;
        let authorities_map: Option<Vec<AuthorityEntry>> = take_field(m, source, "authorities_map")?;

        let extra = mapping
            .into_iter()
            .filter_map(|(key, value)| match key {
                Value::String(key) => Some((key, value)),
                _ => None,
            })
            .collect();

        Ok(Self {
            id: id.into(),
            front: front.unwrap_or_default(),
            back: back.unwrap_or_default(),
            why_it_matters: why_it_matters.unwrap_or_default(),
            mnemonic: mnemonic.unwrap_or_default(),
            diagram: diagram.unwrap_or_default(),
            tripwires: tripwires.unwrap_or_default(),
            anchors: anchors.unwrap_or_default(),
            keywords: keywords.unwrap_or_default(),
            reading_level: reading_level.unwrap_or_default(),
            tags: tags.unwrap_or_default(),
            authorities_map,
            extra,
            missing,
            key_order,
        })
    }

    /// Serialise back to YAML, keeping the record's key order
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut keys = self.key_order.clone();
        for field in CARD_FIELDS.iter().copied().chain(["authorities_map"]) {
            if self.has_field(field) && !keys.iter().any(|k| k == field) {
                keys.push(field.to_string());
            }
        }
        for key in self.extra.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }

        let mut map = Mapping::new();
        for key in keys {
            if let Some(value) = self.field_value(&key)? {
                map.insert(Value::String(key), value);
            }
        }
        serde_yaml::to_string(&map)
    }

    fn field_value(&self, key: &str) -> Result<Option<Value>, serde_yaml::Error> {
        if CARD_FIELDS.contains(&key) && !self.has_field(key) {
            return Ok(None);
        }
        let value = match key {
            "tripwires" => serde_yaml::to_value(&self.tripwires)?,
            "anchors" => serde_yaml::to_value(&self.anchors)?,
            "keywords" => serde_yaml::to_value(&self.keywords)?,
            "tags" => serde_yaml::to_value(&self.tags)?,
            "authorities_map" => match &self.authorities_map {
                Some(entries) => serde_yaml::to_value(entries)?,
                None => return Ok(None),
            },
            other => match self.text_field(other) {
                Some(text) => Value::String(text.to_string()),
                None => return Ok(self.extra.get(other).cloned()),
            },
        };
        Ok(Some(value))
    }

    /// Whether the record carried this field
    pub fn has_field(&self, name: &str) -> bool {
        match name {
            "authorities_map" => self.authorities_map.is_some(),
            _ if CARD_FIELDS.contains(&name) => !self.missing.contains(name),
            _ => self.extra.contains_key(name),
        }
    }

    /// Whether a known field holds nothing but whitespace or no items
    pub fn is_field_empty(&self, name: &str) -> bool {
        match name {
            "tripwires" => self.tripwires.iter().all(|t| t.trim().is_empty()),
            "anchors" => self.anchors.items().iter().all(|a| a.trim().is_empty()),
            "keywords" => self.keywords.iter().all(|k| k.trim().is_empty()),
            "tags" => self.tags.iter().all(|t| t.trim().is_empty()),
            _ => self.text_field(name).map_or(true, |t| t.trim().is_empty()),
        }
    }

    /// Single-string fields by name
    pub fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "front" => Some(&self.front),
            "back" => Some(&self.back),
            "why_it_matters" => Some(&self.why_it_matters),
            "mnemonic" => Some(&self.mnemonic),
            "diagram" => Some(&self.diagram),
            "reading_level" => Some(&self.reading_level),
            _ => None,
        }
    }

    /// Trimmed byte range of a back section, found by its exact heading
    pub fn back_section(&self, policy: &Policy, label: &str) -> Option<Range<usize>> {
        let mut known: Vec<&str> = policy
            .required_headings()
            .iter()
            .map(String::as_str)
            .collect();
        if !known.contains(&label) {
            known.push(label);
        }
        let index = known.iter().position(|k| *k == label)?;
        let outline = Outline::parse(&self.back, &known);
        let heading = outline.find(index)?;
        Some(trim_range(&self.back, heading.body.clone()))
    }

    pub fn section_text(&self, policy: &Policy, label: &str) -> Option<&str> {
        self.back_section(policy, label).map(|range| &self.back[range])
    }

    /// The authorities map, explicit or derived from the back
    pub fn authority_steps(&self, policy: &Policy) -> Vec<AuthorityStep> {
        let placeholder = policy.uncertainty_token();

        if let Some(entries) = &self.authorities_map {
            return entries
                .iter()
                .enumerate()
                .map(|(i, entry)| AuthorityStep {
                    number: i + 1,
                    text: entry.text().to_string(),
                    tier: entry.tier().map(str::to_string),
                    mentions: extract_mentions(entry.text(), placeholder),
                    source: StepSource::Explicit(i),
                })
                .collect();
        }

        let Some(body) = self.back_section(policy, AUTHORITIES_HEADING) else {
            return Vec::new();
        };
        split_steps(&self.back, body)
            .into_iter()
            .enumerate()
            .map(|(i, range)| {
                let text = &self.back[range.clone()];
                AuthorityStep {
                    number: i + 1,
                    text: text.to_string(),
                    tier: None,
                    mentions: extract_mentions(text, placeholder),
                    source: StepSource::Back(range),
                }
            })
            .collect()
    }

    /// Tags and every searchable field joined, for topic reference checks
    pub fn full_text(&self) -> String {
        let mut parts: Vec<&str> = vec![
            &self.front,
            &self.back,
            &self.why_it_matters,
            &self.mnemonic,
            &self.diagram,
        ];
        parts.extend(self.tripwires.iter().map(String::as_str));
        parts.extend(self.anchors.items());
        parts.extend(self.keywords.iter().map(String::as_str));
        if let Some(entries) = &self.authorities_map {
            parts.extend(entries.iter().map(AuthorityEntry::text));
        }
        parts.join("\n")
    }
}

fn trim_range(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let start = range.start + (slice.len() - slice.trim_start().len());
    let end = range.end - (slice.len() - slice.trim_end().len());
    start..end.max(start)
}

/// Step ranges inside a section: at `Step N` markers, else one per line
fn split_steps(back: &str, body: Range<usize>) -> Vec<Range<usize>> {
    let text = &back[body.clone()];
    let markers: Vec<usize> = STEP_MARKER.find_iter(text).map(|m| m.start()).collect();
    let mut ranges = Vec::new();

    if markers.is_empty() {
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            let mut range = trim_range(text, offset..offset + line.len());
            offset += line.len();
            if range.is_empty() {
                continue;
            }
            if let Some(bullet) = BULLETS.iter().find(|b| text[range.clone()].starts_with(*b)) {
                range = trim_range(text, range.start + bullet.len()..range.end);
            }
            ranges.push(range);
        }
    } else {
        for (i, &start) in markers.iter().enumerate() {
            let end = markers.get(i + 1).copied().unwrap_or(text.len());
            ranges.push(trim_range(text, start..end));
        }
    }

    ranges
        .into_iter()
        .map(|r| body.start + r.start..body.start + r.end)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::base_card_yaml;

    #[test]
    fn test_parse_base_card() {
        let card = Card::from_yaml("cards/duty.yml", &base_card_yaml()).unwrap();
        assert_eq!(card.id, "cards/duty.yml");
        assert_eq!(card.tripwires.len(), 3);
        assert_eq!(card.anchors.len(), 3);
        assert_eq!(card.keywords.len(), 6);
        assert_eq!(card.tags, vec!["MLS_H1", "LAWS50025_Torts"]);
        assert!(CARD_FIELDS.iter().all(|f| card.has_field(f)));
        assert!(card.authorities_map.is_none());
    }

    #[test]
    fn test_missing_and_empty_fields() {
        let card = Card::from_yaml("x", "front: ''\nback: text\nmnemonic:\n").unwrap();
        assert!(!card.has_field("diagram"));
        assert!(card.has_field("mnemonic"));
        assert!(card.is_field_empty("mnemonic"));
        assert!(card.is_field_empty("front"));
        assert!(!card.is_field_empty("back"));
    }

    #[test]
    fn test_parse_error_location() {
        let err = Card::from_yaml("x", "front: ok\nback: [unclosed\n").unwrap_err();
        assert!(err.location().is_some());

        assert!(matches!(
            Card::from_yaml("x", "- just\n- a list\n"),
            Err(CardParseError::NotAMapping)
        ));
        assert!(Card::from_yaml("x", "tripwires: 12\n").is_err());
    }

    #[test]
    fn test_wrong_field_type_is_located() {
        let err = Card::from_yaml("x", "front: ok\nback: text\nkeywords: duty\n").unwrap_err();
        assert_eq!(err.location(), Some(Location::new(3, 1)));
        assert!(err.to_string().starts_with("keywords: invalid type"));
    }

    #[test]
    fn test_grouped_anchors() {
        let yaml = "anchors:\n  cases: [Sullivan v Moody (2001) 207 CLR 562]\n  statutes: [Wrongs Act 1958 (Vic) s 48]\n  notes: [UK cases are persuasive only]\n";
        let card = Card::from_yaml("x", yaml).unwrap();
        assert_eq!(card.anchors.len(), 3);
        assert_eq!(card.anchors.citations().len(), 2);
        assert_eq!(card.anchors.notes().len(), 1);
    }

    #[test]
    fn test_round_trip_keeps_unknown_fields_and_order() {
        let yaml = "id_hint: abc\nfront: Q?\ntags: [MLS_H1]\nsource:\n  deck: torts\n";
        let card = Card::from_yaml("x", yaml).unwrap();
        let out = card.to_yaml().unwrap();
        let again = Card::from_yaml("x", &out).unwrap();
        assert_eq!(again, card);
        assert!(out.find("id_hint").unwrap() < out.find("front").unwrap());
        assert!(!out.contains("back"));
    }

    #[test]
    fn test_derived_steps_at_markers() {
        let policy = Policy::default();
        let card = Card::from_yaml("x", &base_card_yaml()).unwrap();
        let steps = card.authority_steps(&policy);
        assert_eq!(steps.len(), 2);
        assert!(steps[0].text.starts_with("Step 1"));
        assert_eq!(
            steps[0].authorities().next().map(|m| m.text.as_str()),
            Some("Sullivan v Moody (HCA 2001) [2001] HCA 59")
        );
        assert_eq!(steps[1].tiers(&policy), vec!["HCA"]);
        match &steps[1].source {
            StepSource::Back(range) => assert_eq!(card.back[range.clone()], steps[1].text),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_derived_steps_per_line() {
        let policy = Policy::default();
        let card = Card {
            back: "Authorities map.\n- Sullivan v Moody [2001] HCA 59\n\n- Wrongs Act 1958 (Vic) s 48\nConclusion.\nDone.".into(),
            ..Card::default()
        };
        let steps = card.authority_steps(&policy);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].text, "Sullivan v Moody [2001] HCA 59");
        assert_eq!(steps[1].authorities().next().unwrap().kind, MentionKind::Statute);
    }

    #[test]
    fn test_explicit_steps() {
        let yaml = "authorities_map:\n  - Sullivan v Moody [2001] HCA 59\n  - text: Caparo Industries v Dickman [1990] UKHL 2 nuance\n    tier: Other Aus\n  - '[NO VERIFIED AUTHORITY FOUND]'\n";
        let policy = Policy::default();
        let card = Card::from_yaml("x", yaml).unwrap();
        let steps = card.authority_steps(&policy);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].tiers(&policy), vec!["Other Aus"]);
        assert!(steps[2].has_placeholder());
        assert_eq!(steps[2].authorities().count(), 0);
    }

    #[test]
    fn test_section_text() {
        let policy = Policy::default();
        let card = Card::from_yaml("x", &base_card_yaml()).unwrap();
        let hook = card.section_text(&policy, STATUTORY_HEADING).unwrap();
        assert!(hook.starts_with("Wrongs Act 1958 (Vic) s 48"));
        assert!(hook.ends_with("Application scaffold."));
    }
}
