//! Bounded neighbour context
//!
//! Neighbours are collected from a flat, document-ordered sequence of
//! `(kind, text)` entries. Sections and code blocks are skipped; each kept
//! neighbour is cut to [`CONTEXT_CHARS`] characters. Neighbours that were
//! adjacent in the sequence are joined with a space, and a [`GAP_MARKER`]
//! marks every place where skipped entries lie between two of them.

use crate::node::{NodeKind, truncate_chars};

pub const CONTEXT_CHARS: usize = 200;
pub const GAP_MARKER: &str = " [...] ";

fn provides_context(kind: NodeKind) -> bool {
    !matches!(kind, NodeKind::Section | NodeKind::CodeBlock)
}

fn join(parts: &[(usize, &str)]) -> Option<String> {
    let (first, rest) = parts.split_first()?;
    let mut text = truncate_chars(first.1, CONTEXT_CHARS).to_string();
    let mut previous = first.0;
    for &(position, part) in rest {
        text.push_str(if position == previous + 1 { " " } else { GAP_MARKER });
        text.push_str(truncate_chars(part, CONTEXT_CHARS));
        previous = position;
    }
    Some(text)
}

/// Up to `window` context-bearing entries before `index`, in document order
pub fn preceding_text(entries: &[(NodeKind, &str)], index: usize, window: usize) -> Option<String> {
    let mut parts: Vec<(usize, &str)> = entries[..index.min(entries.len())]
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, (kind, _))| provides_context(*kind))
        .take(window)
        .map(|(position, (_, text))| (position, *text))
        .collect();
    parts.reverse();
    join(&parts)
}

/// Up to `window` context-bearing entries after `index`
pub fn following_text(entries: &[(NodeKind, &str)], index: usize, window: usize) -> Option<String> {
    let parts: Vec<(usize, &str)> = entries
        .iter()
        .enumerate()
        .skip(index + 1)
        .filter(|(_, (kind, _))| provides_context(*kind))
        .take(window)
        .map(|(position, (_, text))| (position, *text))
        .collect();
    join(&parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<(NodeKind, &'static str)> {
        vec![
            (NodeKind::Paragraph, "p0"),
            (NodeKind::Paragraph, "p1"),
            (NodeKind::CodeBlock, "code"),
            (NodeKind::Paragraph, "p3"),
            (NodeKind::Section, "# S"),
            (NodeKind::Paragraph, "p5"),
            (NodeKind::Paragraph, "p6"),
        ]
    }

    #[test]
    fn test_preceding_skips_code_and_marks_gap() {
        let e = entries();
        assert_eq!(preceding_text(&e, 3, 3).as_deref(), Some("p0 p1"));
        assert_eq!(preceding_text(&e, 5, 3).as_deref(), Some("p0 p1 [...] p3"));
        assert_eq!(preceding_text(&e, 5, 1).as_deref(), Some("p3"));
    }

    #[test]
    fn test_following_window() {
        let e = entries();
        assert_eq!(following_text(&e, 1, 2).as_deref(), Some("p3 [...] p5"));
        assert_eq!(following_text(&e, 5, 3).as_deref(), Some("p6"));
        assert_eq!(following_text(&e, 6, 3), None);
    }

    #[test]
    fn test_no_neighbours() {
        let e = entries();
        assert_eq!(preceding_text(&e, 0, 3), None);
        assert_eq!(preceding_text(&e, 3, 0), None);
    }

    #[test]
    fn test_neighbour_truncated() {
        let long = "x".repeat(500);
        let e = vec![(NodeKind::Paragraph, long.as_str()), (NodeKind::Paragraph, "me")];
        let text = preceding_text(&e, 1, 3).unwrap();
        assert_eq!(text.chars().count(), CONTEXT_CHARS);
    }
}
