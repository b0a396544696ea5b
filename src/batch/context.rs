//! Context windows over the nodes that go into batches
//!
//! Unlike the per-node context the hierarchy builder attaches, these
//! windows only look at neighbours that are themselves being translated,
//! so the preceding and following text is what the translator will see
//! alongside the node.

use crate::hierarchy::context::{following_text, preceding_text};
use crate::hierarchy::{DocumentTree, TranslationTreeNode};
use crate::node::{NodeKind, truncate_chars};
use serde::Serialize;
use std::collections::BTreeMap;

const TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preceding_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    /// Other eligible nodes under the same parent
    pub sibling_count: usize,
}

/// Windows for `eligible` nodes of `tree`, keyed by node id
pub fn build_windows(
    tree: &DocumentTree,
    eligible: &[&TranslationTreeNode],
    window: usize,
) -> BTreeMap<String, ContextWindow> {
    let entries: Vec<(NodeKind, &str)> = eligible.iter().map(|n| (n.kind, n.source.as_str())).collect();

    let mut per_parent: BTreeMap<&str, usize> = BTreeMap::new();
    for node in eligible {
        if let Some(parent) = node.parent_id.as_deref() {
            *per_parent.entry(parent).or_default() += 1;
        }
    }

    eligible
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let section_title = tree
                .parent(node)
                .filter(|p| p.is_section())
                .map(|p| truncate_chars(&p.source, TITLE_CHARS).to_string());
            let sibling_count = node
                .parent_id
                .as_deref()
                .and_then(|p| per_parent.get(p))
                .map_or(0, |count| count - 1);

            (
                node.id.clone(),
                ContextWindow {
                    preceding_text: preceding_text(&entries, i, window),
                    following_text: following_text(&entries, i, window),
                    section_title,
                    sibling_count,
                },
            )
        })
        .collect()
}
