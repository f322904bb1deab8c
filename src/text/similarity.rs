//! Near-duplicate sentence detection
//!
//! Similarity is the cosine of lowercase alphanumeric token-count vectors. The
//! dot product and norms are computed over integer counts, so the score for
//! `(a, b)` is bit-for-bit the score for `(b, a)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which sentence pairs are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateScope {
    /// Pairs inside the same field only
    Within,
    /// Pairs drawn from two different fields only
    Across,
    /// Every pair
    #[default]
    Both,
}

fn token_counts(text: &str) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *counts.entry(token.to_string()).or_insert(0) += 1;
    }
    counts
}

fn cosine(a: &BTreeMap<String, u64>, b: &BTreeMap<String, u64>) -> f64 {
    let dot: u64 = a
        .iter()
        .filter_map(|(token, count)| b.get(token).map(|other| count * other))
        .sum();
    if dot == 0 {
        return 0.0;
    }
    let norm_a: u64 = a.values().map(|c| c * c).sum();
    let norm_b: u64 = b.values().map(|c| c * c).sum();
    dot as f64 / ((norm_a * norm_b) as f64).sqrt()
}

/// Similarity ratio in `0.0..=1.0`
pub fn similarity(a: &str, b: &str) -> f64 {
    cosine(&token_counts(a), &token_counts(b))
}

/// A flagged sentence pair
///
/// Positions are `(field index, sentence index)`, both 0-based, and `first`
/// always precedes `second` in field-then-sentence order.
#[derive(Debug, Clone, PartialEq)]
pub struct NearDuplicate {
    pub first: (usize, usize),
    pub second: (usize, usize),
    pub score: f64,
}

/// Compare every unordered sentence pair allowed by `scope`
pub fn near_duplicates<S: AsRef<str>>(
    fields: &[Vec<S>],
    threshold: f64,
    scope: DuplicateScope,
) -> Vec<NearDuplicate> {
    let flat: Vec<((usize, usize), BTreeMap<String, u64>)> = fields
        .iter()
        .enumerate()
        .flat_map(|(f, sentences)| {
            sentences
                .iter()
                .enumerate()
                .map(move |(s, text)| ((f, s), token_counts(text.as_ref())))
        })
        .collect();

    let mut flagged = Vec::new();
    for (i, (pos_a, counts_a)) in flat.iter().enumerate() {
        for (pos_b, counts_b) in &flat[i + 1..] {
            let same_field = pos_a.0 == pos_b.0;
            let compared = match scope {
                DuplicateScope::Within => same_field,
                DuplicateScope::Across => !same_field,
                DuplicateScope::Both => true,
            };
            if !compared {
                continue;
            }
            let score = cosine(counts_a, counts_b);
            if score >= threshold {
                flagged.push(NearDuplicate {
                    first: *pos_a,
                    second: *pos_b,
                    score,
                });
            }
        }
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_disjoint() {
        assert!((similarity("Duty is owed.", "duty IS owed") - 1.0).abs() < 1e-12);
        assert_eq!(similarity("Duty is owed.", "Breach follows"), 0.0);
        assert_eq!(similarity("", "anything"), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            ("This negligence duty question maps the plaintiff relationship.", "This negligence duty question demands mapping the plaintiff relationship and risk."),
            ("a a b c", "a b b d d d"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b).to_bits(), similarity(b, a).to_bits());
        }
    }

    #[test]
    fn test_scope_filtering() {
        let fields = vec![
            vec!["Duty arises from salient features.", "Unrelated words entirely here."],
            vec!["Duty arises from salient features."],
        ];
        let both = near_duplicates(&fields, 0.8, DuplicateScope::Both);
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].first, (0, 0));
        assert_eq!(both[0].second, (1, 0));

        assert!(near_duplicates(&fields, 0.8, DuplicateScope::Within).is_empty());
        assert_eq!(near_duplicates(&fields, 0.8, DuplicateScope::Across).len(), 1);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let fields = vec![vec!["alpha beta", "alpha beta"]];
        assert_eq!(near_duplicates(&fields, 1.0, DuplicateScope::Both).len(), 1);
    }
}
