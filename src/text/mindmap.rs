//! Fenced mermaid mindmap parsing

use once_cell::sync::Lazy;
use regex::Regex;

/// `id((text))`, `id[text]`, `(text)` and the other mermaid node shapes
static NODE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]*[\(\[\{\)]+(.+?)[\)\]\}\(]+$").unwrap());

/// A fenced code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence<'a> {
    /// Info string after the opening backticks, possibly empty
    pub language: &'a str,
    pub body: &'a str,
}

/// Find the first complete ``` fenced block in `text`
pub fn extract_fence(text: &str) -> Option<Fence<'_>> {
    let mut offset = 0;
    let mut opening: Option<(&str, usize)> = None;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        let line_start = offset;
        offset += line.len();

        if let Some(info) = trimmed.strip_prefix("```") {
            match opening {
                None => {
                    let language = info.split_whitespace().next().unwrap_or("");
                    opening = Some((language, offset));
                }
                Some((language, body_start)) => {
                    return Some(Fence {
                        language,
                        body: &text[body_start..line_start],
                    });
                }
            }
        }
    }
    None
}

/// One node of the outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MindmapNode {
    pub label: String,
    pub children: Vec<MindmapNode>,
}

impl MindmapNode {
    /// Number of nodes below this one
    pub fn descendants(&self) -> usize {
        self.children.iter().map(|c| 1 + c.descendants()).sum()
    }
}

/// Parsed mindmap outline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mindmap {
    /// The body opened with a `mindmap` declaration
    pub declared: bool,
    /// Single root node, when the outline has one
    pub root: Option<String>,
    pub branches: Vec<MindmapNode>,
}

struct FlatNode {
    label: String,
    parent: Option<usize>,
}

impl Mindmap {
    /// Parse an outline body into a tree by indentation
    ///
    /// A lone top-level node is the root and its children are the branches;
    /// several top-level nodes are branches of an implicit root.
    pub fn parse(body: &str) -> Self {
        let mut declared = false;
        let mut seen_content = false;
        let mut nodes: Vec<FlatNode> = Vec::new();
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for line in body.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("%%") || trimmed.starts_with("::") {
                continue;
            }
            if !seen_content {
                seen_content = true;
                if trimmed.eq_ignore_ascii_case("mindmap") {
                    declared = true;
                    continue;
                }
            }

            let indent = indentation(line);
            while stack.last().map_or(false, |&(depth, _)| depth >= indent) {
                stack.pop();
            }
            let parent = stack.last().map(|&(_, idx)| idx);
            nodes.push(FlatNode {
                label: clean_label(trimmed),
                parent,
            });
            stack.push((indent, nodes.len() - 1));
        }

        let mut top: Vec<MindmapNode> = (0..nodes.len())
            .filter(|&i| nodes[i].parent.is_none())
            .map(|i| build(&nodes, i))
            .collect();

        if top.len() == 1 {
            let root = top.remove(0);
            Self {
                declared,
                root: Some(root.label),
                branches: root.children,
            }
        } else {
            Self {
                declared,
                root: None,
                branches: top,
            }
        }
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Every node, the root included
    pub fn total_nodes(&self) -> usize {
        let root = usize::from(self.root.is_some());
        root + self
            .branches
            .iter()
            .map(|b| 1 + b.descendants())
            .sum::<usize>()
    }

    /// Descendant count under each top-level branch
    pub fn child_counts(&self) -> Vec<usize> {
        self.branches.iter().map(MindmapNode::descendants).collect()
    }

    pub fn branch_labels(&self) -> impl Iterator<Item = &str> {
        self.branches.iter().map(|b| b.label.as_str())
    }
}

fn build(nodes: &[FlatNode], idx: usize) -> MindmapNode {
    MindmapNode {
        label: nodes[idx].label.clone(),
        children: (0..nodes.len())
            .filter(|&i| nodes[i].parent == Some(idx))
            .map(|i| build(nodes, i))
            .collect(),
    }
}

fn indentation(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn clean_label(trimmed: &str) -> String {
    let label = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("+ "))
        .unwrap_or(trimmed)
        .trim();
    NODE_SHAPE
        .captures(label)
        .and_then(|c| c.get(1))
        .map_or(label, |m| m.as_str().trim())
        .to_string()
}

/// Lowercase alphanumerics only, with any `A.` / `1.` enumerator dropped
pub fn normalize_label(label: &str) -> String {
    let label = label.trim();
    let label = match label.split_once(". ") {
        Some((prefix, rest))
            if prefix.len() <= 2 && prefix.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            rest
        }
        _ => label,
    };
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAGRAM: &str = "```mermaid\nmindmap\n  Duty focus\n    Thresholds\n    Salient features\n  Statutes\n    Wrongs Act s 48\n  Authorities\n    Sullivan v Moody\n    Perre v Apand\n  Exam tips\n    Time management\n```\n";

    #[test]
    fn test_extract_fence() {
        let fence = extract_fence(DIAGRAM).unwrap();
        assert_eq!(fence.language, "mermaid");
        assert!(fence.body.starts_with("mindmap\n"));
        assert!(fence.body.ends_with("Time management\n"));
        assert!(extract_fence("mindmap\n  A").is_none());
        assert!(extract_fence("```mermaid\nmindmap\n").is_none());
    }

    #[test]
    fn test_implicit_root() {
        let map = Mindmap::parse(extract_fence(DIAGRAM).unwrap().body);
        assert!(map.declared);
        assert_eq!(map.root, None);
        assert_eq!(map.branch_count(), 4);
        assert_eq!(map.total_nodes(), 10);
        assert_eq!(map.child_counts(), vec![2, 1, 2, 1]);
        assert_eq!(
            map.branch_labels().collect::<Vec<_>>(),
            vec!["Duty focus", "Statutes", "Authorities", "Exam tips"]
        );
    }

    #[test]
    fn test_explicit_root() {
        let body = "mindmap\n  root((Negligence duty))\n    Duty\n      Salience\n    Breach\n    Causation\n    Defences\n";
        let map = Mindmap::parse(body);
        assert_eq!(map.root.as_deref(), Some("Negligence duty"));
        assert_eq!(map.branch_count(), 4);
        assert_eq!(map.total_nodes(), 6);
    }

    #[test]
    fn test_bullets_and_shapes() {
        let body = "mindmap\n  root[Torts]\n    - A. Issue\n    - Rule(Coherence)\n    * Tripwires";
        let map = Mindmap::parse(body);
        assert_eq!(
            map.branch_labels().collect::<Vec<_>>(),
            vec!["A. Issue", "Coherence", "Tripwires"]
        );
    }

    #[test]
    fn test_missing_declaration() {
        let map = Mindmap::parse("graph TD\n  A --> B\n");
        assert!(!map.declared);
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("A. Issue"), "issue");
        assert_eq!(normalize_label("Authorities map"), "authoritiesmap");
        assert_eq!(normalize_label("1. Statutory hook"), "statutoryhook");
        assert_eq!(normalize_label("Wrongs Act s 48"), "wrongsacts48");
    }
}
