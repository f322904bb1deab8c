//! Repair engine
//!
//! Repairs only restructure text that is already there:
//! - misnamed headings are renamed, inline headings moved onto their own line
//! - missing headings are inserted before paragraphs that open like their section
//! - duplicate keywords are dropped and the list truncated to the policy maximum
//! - authorities within a step are reordered by priority
//! - abbreviations with a known expansion are expanded on first use
//!
//! Each transformation is validated on its own. It is kept only when every
//! remaining error comes from a rule that already failed on the original card
//! and the error count has not grown; otherwise it is rolled back.

use crate::card::{AuthorityStep, Card, StepSource};
use crate::engine::validate_with;
use crate::policy::Policy;
use crate::rule::Rule;
use crate::rules::{abbreviation_scope, builtin_rules, priority_respected};
use crate::text::{expand_first_use, first_uses, squash_whitespace, Outline};
use std::collections::{BTreeSet, HashSet};

/// What a repair pass produced
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    /// The repaired card; the input is never modified
    pub card: Card,
    /// Human-readable description of each kept transformation
    pub actions: Vec<String>,
    /// At least one transformation was kept
    pub changed: bool,
    /// Content differs from the original beyond whitespace
    pub edited: bool,
}

/// A candidate transformation
struct Edit {
    card: Card,
    actions: Vec<String>,
}

type Transform<'a> = fn(&Fixer<'a>, &Card) -> Option<Edit>;

/// Repair a card against every built-in rule
pub fn repair(card: &Card, policy: &Policy) -> (Card, bool) {
    let rules = builtin_rules();
    let outcome = Fixer::new(policy, &rules).repair(card);
    (outcome.card, outcome.changed)
}

/// Applies guarded transformations to cards
pub struct Fixer<'a> {
    policy: &'a Policy,
    /// Rules used to judge each transformation
    rules: &'a [Box<dyn Rule>],
}

impl<'a> Fixer<'a> {
    /// Create a fixer judging repairs with `rules`
    pub fn new(policy: &'a Policy, rules: &'a [Box<dyn Rule>]) -> Self {
        Self { policy, rules }
    }

    /// Run every transformation in turn, keeping the ones that do no harm
    pub fn repair(&self, card: &Card) -> RepairOutcome {
        let original = validate_with(card, self.policy, self.rules);
        let allowed = original.error_ids();
        let mut error_count = original.errors.len();
        let mut current = card.clone();
        let mut actions = Vec::new();

        let transforms: [(&str, Transform<'a>); 7] = [
            ("rename-headings", Self::rename_headings),
            ("split-inline-headings", Self::split_inline_headings),
            ("insert-headings", Self::insert_missing_headings),
            ("dedupe-keywords", Self::dedupe_keywords),
            ("truncate-keywords", Self::truncate_keywords),
            ("reorder-authorities", Self::reorder_authorities),
            ("expand-abbreviations", Self::expand_abbreviations),
        ];

        for (name, transform) in transforms {
            let Some(edit) = transform(self, &current) else {
                continue;
            };
            if edit.card == current {
                continue;
            }

            let result = validate_with(&edit.card, self.policy, self.rules);
            let new_category = result
                .errors
                .iter()
                .find(|f| !allowed.contains(f.rule_id.as_str()));
            if let Some(finding) = new_category {
                log::debug!("{}: rolled back {} ({})", card.id, name, finding);
                continue;
            }
            if result.errors.len() > error_count {
                log::debug!(
                    "{}: rolled back {} ({} errors, was {})",
                    card.id,
                    name,
                    result.errors.len(),
                    error_count
                );
                continue;
            }

            for action in &edit.actions {
                log::info!("{}: {}", card.id, action);
            }
            error_count = result.errors.len();
            current = edit.card;
            actions.extend(edit.actions);
        }

        let changed = !actions.is_empty();
        let edited = changed && content_signature(card) != content_signature(&current);
        RepairOutcome {
            card: current,
            actions,
            changed,
            edited,
        }
    }

    fn with_back(card: &Card, back: String, actions: Vec<String>) -> Option<Edit> {
        if actions.is_empty() {
            return None;
        }
        let mut card = card.clone();
        card.back = back;
        Some(Edit { card, actions })
    }

    /// `## Rule`, `**Authorities**`, `conclusion.` -> the exact label
    fn rename_headings(&self, card: &Card) -> Option<Edit> {
        let labels = self.policy.required_headings();
        let outline = Outline::parse(&card.back, labels);

        let mut claimed = BTreeSet::new();
        let fixable: Vec<_> = outline
            .headings
            .iter()
            .filter(|h| !h.exact && outline.count(h.index) == 0)
            .filter(|h| claimed.insert(h.index))
            .collect();

        let mut back = card.back.clone();
        for heading in fixable.iter().rev() {
            back.replace_range(heading.marker.clone(), &format!("{}.", labels[heading.index]));
        }
        let actions = fixable
            .iter()
            .map(|h| format!("Renamed heading '{}' to '{}.'", h.written, labels[h.index]))
            .collect();
        Self::with_back(card, back, actions)
    }

    /// `Rule. The test...` -> `Rule.` on a line of its own
    fn split_inline_headings(&self, card: &Card) -> Option<Edit> {
        let labels = self.policy.required_headings();
        let outline = Outline::parse(&card.back, labels);
        let inline: Vec<_> = outline.headings.iter().filter(|h| h.exact && h.inline).collect();

        let mut back = card.back.clone();
        for heading in inline.iter().rev() {
            let rest = &back[heading.marker.end..];
            let gap = rest.len() - rest.trim_start_matches([' ', '\t']).len();
            back.replace_range(heading.marker.end..heading.marker.end + gap, "\n");
        }
        let actions = inline
            .iter()
            .map(|h| format!("Moved heading '{}.' onto its own line", labels[h.index]))
            .collect();
        Self::with_back(card, back, actions)
    }

    /// Insert a missing heading before the first paragraph that opens like its section
    fn insert_missing_headings(&self, card: &Card) -> Option<Edit> {
        let labels = self.policy.required_headings();
        let outline = Outline::parse(&card.back, labels);

        let mut lines: Vec<(usize, &str)> = Vec::new();
        let mut offset = 0;
        for line in card.back.split_inclusive('\n') {
            lines.push((offset, line.trim_end_matches(['\n', '\r'])));
            offset += line.len();
        }
        let heading_lines: HashSet<usize> = outline.headings.iter().map(|h| h.line).collect();

        // (label index, byte offset) of every heading in place or planned
        let mut placed: Vec<(usize, usize)> = (0..labels.len())
            .filter_map(|index| outline.find(index).map(|h| (index, h.line_start)))
            .collect();
        let mut inserted: Vec<(usize, usize)> = Vec::new();

        for index in 0..labels.len() {
            if outline.headings.iter().any(|h| h.index == index) {
                continue;
            }
            let openers = self.policy.section_openers(index);
            if openers.is_empty() {
                continue;
            }

            for (line_no, &(start, line)) in lines.iter().enumerate() {
                if heading_lines.contains(&line_no) || line.trim().is_empty() {
                    continue;
                }
                let previous = lines[..line_no].iter().rposition(|(_, l)| !l.trim().is_empty());
                let opens_paragraph = match previous {
                    None => true,
                    Some(p) => p + 1 < line_no && !heading_lines.contains(&p),
                };
                if !opens_paragraph {
                    continue;
                }

                let lowered = line.trim_start().to_lowercase();
                if !openers.iter().any(|o| lowered.starts_with(o.as_str())) {
                    continue;
                }
                let in_order = placed
                    .iter()
                    .all(|&(other, at)| at != start && (other < index) == (at < start));
                if in_order {
                    placed.push((index, start));
                    inserted.push((index, start));
                    break;
                }
            }
        }

        let mut back = card.back.clone();
        let mut by_offset = inserted.clone();
        by_offset.sort_by_key(|&(_, start)| std::cmp::Reverse(start));
        for (index, start) in by_offset {
            back.insert_str(start, &format!("{}.\n", labels[index]));
        }
        let actions = inserted
            .iter()
            .map(|&(index, _)| format!("Inserted missing heading '{}.'", labels[index]))
            .collect();
        Self::with_back(card, back, actions)
    }

    fn dedupe_keywords(&self, card: &Card) -> Option<Edit> {
        let mut seen = HashSet::new();
        let kept: Vec<String> = card
            .keywords
            .iter()
            .filter(|k| seen.insert(k.trim().to_lowercase()))
            .cloned()
            .collect();
        let removed = card.keywords.len() - kept.len();
        if removed == 0 {
            return None;
        }

        let mut repaired = card.clone();
        repaired.keywords = kept;
        Some(Edit {
            card: repaired,
            actions: vec![format!(
                "Removed {} duplicate keyword{}",
                removed,
                if removed == 1 { "" } else { "s" }
            )],
        })
    }

    /// Keep the first `max` keywords; never invents any
    fn truncate_keywords(&self, card: &Card) -> Option<Edit> {
        let max = self.policy.max_keywords();
        let items: Vec<String> = card
            .keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .cloned()
            .collect();
        if items.len() <= max {
            return None;
        }

        let mut repaired = card.clone();
        repaired.keywords = items.into_iter().take(max).collect();
        Some(Edit {
            card: repaired,
            actions: vec![format!("Truncated keywords to the first {}", max)],
        })
    }

    fn reorder_authorities(&self, card: &Card) -> Option<Edit> {
        let mut back = card.back.clone();
        let mut entries = card.authorities_map.clone();
        let mut actions = Vec::new();

        // Back ranges are rewritten last-first so earlier ranges stay valid
        for step in card.authority_steps(self.policy).iter().rev() {
            // Declared tiers belong to the lead as written
            if step.tier.is_some() {
                continue;
            }
            let Some(text) = self.reordered_step(step) else {
                continue;
            };
            match &step.source {
                StepSource::Back(range) => back.replace_range(range.clone(), &text),
                StepSource::Explicit(i) => {
                    if let Some(entry) = entries.as_mut().and_then(|e| e.get_mut(*i)) {
                        entry.set_text(text);
                    }
                }
            }
            actions.push(format!(
                "Reordered authorities in step {} by priority",
                step.number
            ));
        }
        if actions.is_empty() {
            return None;
        }

        actions.reverse();
        let mut repaired = card.clone();
        repaired.back = back;
        repaired.authorities_map = entries;
        Some(Edit {
            card: repaired,
            actions,
        })
    }

    /// Step text with its ranked authorities stably sorted; unranked ones stay put
    fn reordered_step(&self, step: &AuthorityStep) -> Option<String> {
        let tiers = step.tiers(self.policy);
        if priority_respected(&tiers, self.policy) {
            return None;
        }
        let authorities: Vec<_> = step.authorities().collect();

        let ranked: Vec<(usize, usize)> = tiers
            .iter()
            .enumerate()
            .filter_map(|(i, tier)| self.policy.priority_rank(tier).map(|rank| (i, rank)))
            .collect();
        let mut sorted = ranked.clone();
        sorted.sort_by_key(|&(_, rank)| rank);

        let mut source: Vec<usize> = (0..authorities.len()).collect();
        for (&(slot, _), &(from, _)) in ranked.iter().zip(&sorted) {
            source[slot] = from;
        }

        let mut text = String::with_capacity(step.text.len());
        let mut cursor = 0;
        for (slot, mention) in authorities.iter().enumerate() {
            text.push_str(&step.text[cursor..mention.range.start]);
            text.push_str(&authorities[source[slot]].text);
            cursor = mention.range.end;
        }
        text.push_str(&step.text[cursor..]);
        Some(text)
    }

    /// `CLR` -> `CLR (Commonwealth Law Reports)` when the expansion is known
    fn expand_abbreviations(&self, card: &Card) -> Option<Edit> {
        let expansions = &self.policy.spec().abbreviations.expansions;
        let scope = abbreviation_scope(card, self.policy);
        let undefined: Vec<String> = first_uses(&scope, self.policy.abbreviation_whitelist())
            .into_iter()
            .filter(|abbr| !abbr.defined)
            .map(|abbr| abbr.token.to_string())
            .collect();

        let mut back = card.back.clone();
        let mut actions = Vec::new();
        for token in undefined {
            let Some(expansion) = expansions.get(&token) else {
                log::debug!("{}: no known expansion for {}", card.id, token);
                continue;
            };
            if let Some(expanded) = expand_first_use(&back, &token, expansion) {
                back = expanded;
                actions.push(format!(
                    "Expanded '{}' as '{}' on first use",
                    token, expansion
                ));
            }
        }
        Self::with_back(card, back, actions)
    }
}

/// Every field with whitespace runs collapsed
fn content_signature(card: &Card) -> Vec<String> {
    let mut parts: Vec<String> = [
        &card.front,
        &card.back,
        &card.why_it_matters,
        &card.mnemonic,
        &card.diagram,
        &card.reading_level,
    ]
    .iter()
    .map(|text| squash_whitespace(text))
    .collect();

    let lists: [Vec<&str>; 4] = [
        card.tripwires.iter().map(String::as_str).collect(),
        card.anchors.items(),
        card.keywords.iter().map(String::as_str).collect(),
        card.tags.iter().map(String::as_str).collect(),
    ];
    for list in lists {
        parts.push(list.len().to_string());
        parts.extend(list.into_iter().map(squash_whitespace));
    }
    if let Some(entries) = &card.authorities_map {
        parts.push(entries.len().to_string());
        parts.extend(entries.iter().map(|e| squash_whitespace(e.text())));
    }
    parts
}

/// Generate a unified diff between two versions of a record
pub fn generate_unified_diff(label: &str, original: &str, modified: &str) -> String {
    let mut diff = String::new();

    let original_lines: Vec<&str> = original.lines().collect();
    let modified_lines: Vec<&str> = modified.lines().collect();

    diff.push_str(&format!("--- a/{}\n", label));
    diff.push_str(&format!("+++ b/{}\n", label));

    // Common prefix and suffix bound a single hunk
    let prefix = original_lines
        .iter()
        .zip(&modified_lines)
        .take_while(|(o, m)| o == m)
        .count();
    let suffix = original_lines[prefix..]
        .iter()
        .rev()
        .zip(modified_lines[prefix..].iter().rev())
        .take_while(|(o, m)| o == m)
        .count();

    let removed = &original_lines[prefix..original_lines.len() - suffix];
    let added = &modified_lines[prefix..modified_lines.len() - suffix];
    if removed.is_empty() && added.is_empty() {
        return diff;
    }

    let context_start = prefix.saturating_sub(1);
    let context_end = (original_lines.len() - suffix + 1).min(original_lines.len());
    let trailing = context_end - (original_lines.len() - suffix);
    let leading = prefix - context_start;

    diff.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        context_start + 1,
        leading + removed.len() + trailing,
        context_start + 1,
        leading + added.len() + trailing
    ));
    for line in &original_lines[context_start..prefix] {
        diff.push_str(&format!(" {}\n", line));
    }
    for line in removed {
        diff.push_str(&format!("-{}\n", line));
    }
    for line in added {
        diff.push_str(&format!("+{}\n", line));
    }
    for line in &original_lines[original_lines.len() - suffix..context_end] {
        diff.push_str(&format!(" {}\n", line));
    }

    diff
}
