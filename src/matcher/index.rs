//! Anchor index over the target node list
//!
//! Built fresh for every matcher run and never mutated afterwards. Each
//! label and each name maps to exactly one target position; a repeated key
//! keeps its first occurrence and is reported, so the later node is only
//! reachable through the content-similarity fallback.

use crate::error::Diagnostic;
use crate::node::StructuralNode;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::warn;

#[derive(Debug, Default)]
pub struct TargetIndex {
    by_label: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl TargetIndex {
    /// Index `targets` by label and name
    ///
    /// Returns the index together with one warning per duplicate anchor.
    pub fn build(targets: &[StructuralNode]) -> (Self, Vec<Diagnostic>) {
        let mut index = TargetIndex::default();
        let mut diagnostics = Vec::new();

        for (position, node) in targets.iter().enumerate() {
            if let Some(label) = node.label_key() {
                insert_unique(&mut index.by_label, "label", label, position, targets, &mut diagnostics);
            }
            if let Some(name) = node.name_key() {
                insert_unique(&mut index.by_name, "name", name, position, targets, &mut diagnostics);
            }
        }

        (index, diagnostics)
    }

    pub fn by_label(&self, label: &str) -> Option<usize> {
        self.by_label.get(label).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_label.len() + self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty() && self.by_name.is_empty()
    }
}

fn insert_unique(
    map: &mut HashMap<String, usize>,
    marker: &str,
    key: &str,
    position: usize,
    targets: &[StructuralNode],
    diagnostics: &mut Vec<Diagnostic>,
) {
    match map.entry(key.to_string()) {
        Entry::Vacant(slot) => {
            slot.insert(position);
        }
        Entry::Occupied(existing) => {
            let first = &targets[*existing.get()];
            let duplicate = &targets[position];
            warn!(
                marker,
                key,
                first = %first.id,
                duplicate = %duplicate.id,
                "duplicate anchor in target tree"
            );
            diagnostics.push(Diagnostic::warning(
                format!(
                    "duplicate {} '{}' in target tree: {} shadowed by {} ({}:{})",
                    marker,
                    key,
                    duplicate.id,
                    first.id,
                    duplicate.file_key(),
                    duplicate.line_number
                ),
                Some(&duplicate.id),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn target(id: &str, label: Option<&str>, name: Option<&str>) -> StructuralNode {
        let mut node = StructuralNode::new(NodeKind::Section, id, "docs/ja/index.md", 1).with_id(id);
        node.label = label.map(str::to_string);
        node.name = name.map(str::to_string);
        node
    }

    #[test]
    fn test_lookup_by_label_and_name() {
        let targets = vec![
            target("t0", Some("intro"), None),
            target("t1", None, Some("example")),
        ];
        let (index, diagnostics) = TargetIndex::build(&targets);
        assert!(diagnostics.is_empty());
        assert_eq!(index.by_label("intro"), Some(0));
        assert_eq!(index.by_name("example"), Some(1));
        assert_eq!(index.by_label("example"), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_duplicate_label_keeps_first_and_warns() {
        let targets = vec![
            target("t0", Some("intro"), None),
            target("t1", Some("intro"), None),
        ];
        let (index, diagnostics) = TargetIndex::build(&targets);
        assert_eq!(index.by_label("intro"), Some(0));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].node_id.as_deref(), Some("t1"));
        assert!(diagnostics[0].message.contains("duplicate label 'intro'"));
    }

    #[test]
    fn test_empty_markers_not_indexed() {
        let targets = vec![target("t0", Some(""), Some(""))];
        let (index, diagnostics) = TargetIndex::build(&targets);
        assert!(index.is_empty());
        assert!(diagnostics.is_empty());
    }
}
