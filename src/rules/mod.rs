//! Built-in card checks
//!
//! Each check is a unit struct implementing [`Rule`]. `builtin_rules` fixes the
//! order they run in, which is also the order their findings are reported.

mod anchors;
mod authorities;
mod diagram;
mod keywords;
mod language;
mod length;
mod schema;
mod statutes;
mod structure;
mod tripwires;

pub use anchors::{AnchorList, AnchorPinpoint};
pub use authorities::{AuthoritiesMap, AuthorityCitation, TopicAuthorities};
pub use diagram::MindmapShape;
pub use keywords::{KeywordCount, KeywordRecommendations, RequiredKeywords};
pub use language::{Abbreviations, NearDuplicates, UncertaintyToken};
pub use length::{BackLength, SentenceLength};
pub use schema::{FieldValues, FrontFormat, PlaceholderText, RequiredFields, RequiredTags};
pub use statutes::{StatuteCitation, StatutoryHook};
pub use structure::{BackHeadings, RequiredConcepts};
pub use tripwires::Tripwires;

pub(crate) use authorities::priority_respected;
pub(crate) use language::abbreviation_scope;

use crate::card::Card;
use crate::policy::Policy;
use crate::rule::Rule;
use crate::text::{sentences, Outline};

/// Get all built-in rules in evaluation order
pub fn builtin_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(RequiredFields),
        Box::new(FrontFormat),
        Box::new(FieldValues),
        Box::new(BackLength),
        Box::new(SentenceLength),
        Box::new(BackHeadings),
        Box::new(RequiredConcepts),
        Box::new(AnchorList),
        Box::new(AnchorPinpoint),
        Box::new(AuthoritiesMap),
        Box::new(AuthorityCitation),
        Box::new(StatuteCitation),
        Box::new(StatutoryHook),
        Box::new(Abbreviations),
        Box::new(KeywordCount),
        Box::new(RequiredKeywords),
        Box::new(KeywordRecommendations),
        Box::new(MindmapShape),
        Box::new(NearDuplicates),
        Box::new(Tripwires),
        Box::new(TopicAuthorities),
        Box::new(PlaceholderText),
        Box::new(UncertaintyToken),
        Box::new(RequiredTags),
    ]
}

/// Look up a built-in rule by id
pub fn find_rule(id: &str) -> Option<Box<dyn Rule>> {
    builtin_rules().into_iter().find(|rule| rule.id() == id)
}

/// Sentences of the back with heading markers left out
pub(crate) fn prose_sentences<'a>(back: &'a str, policy: &Policy) -> Vec<&'a str> {
    let outline = Outline::parse(back, policy.required_headings());
    std::iter::once(outline.preamble.clone())
        .chain(outline.headings.iter().map(|h| h.body.clone()))
        .flat_map(|range| sentences(&back[range]))
        .collect()
}

/// Sentences of a named field, as compared by the duplicate checks
pub(crate) fn field_sentences<'a>(card: &'a Card, policy: &Policy, field: &str) -> Vec<&'a str> {
    match field {
        "back" => prose_sentences(&card.back, policy),
        "tripwires" => card.tripwires.iter().flat_map(|t| sentences(t)).collect(),
        "keywords" => card.keywords.iter().map(String::as_str).collect(),
        "tags" => card.tags.iter().map(String::as_str).collect(),
        "anchors" => card.anchors.items().into_iter().flat_map(sentences).collect(),
        other => card.text_field(other).map_or_else(Vec::new, |t| sentences(t).collect()),
    }
}

/// Items of a list field with blanks dropped
pub(crate) fn non_blank<'a, I>(items: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    items
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
