//! Stateless text analyzers
//!
//! Every function here is pure: it borrows a string, returns owned or borrowed
//! results, and never consults a policy beyond the arguments it is given.

pub mod abbreviations;
pub mod citations;
pub mod headings;
pub mod mindmap;
pub mod sentences;
pub mod similarity;

pub use abbreviations::{expand_first_use, first_uses, Abbreviation};
pub use citations::{extract_mentions, CitationCheck, CitationClass, Mention, MentionKind};
pub use headings::{Heading, Outline};
pub use mindmap::{extract_fence, Fence, Mindmap, MindmapNode};
pub use sentences::{sentences, Sentences};
pub use similarity::{near_duplicates, similarity, DuplicateScope, NearDuplicate};

/// Count whitespace-delimited tokens
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Collapse every whitespace run to a single space
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
