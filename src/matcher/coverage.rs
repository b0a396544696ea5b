//! Comparison summaries over a matcher run

use super::{Correspondence, MatchStatus, MatchingStrategy};
use crate::error::Diagnostic;
use crate::language::normalize_language;
use crate::node::{NodeKind, StructuralNode, truncate_chars};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

const PREVIEW_CHARS: usize = 100;

/// Translation coverage counts and ratios
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageStats {
    pub total: usize,
    pub translated: usize,
    pub exact: usize,
    pub fuzzy: usize,
    pub missing: usize,
    /// `translated / total`, 0.0 for an empty tree
    pub overall: f64,
    pub exact_ratio: f64,
    pub fuzzy_ratio: f64,
    pub missing_ratio: f64,
}

impl CoverageStats {
    pub fn from_correspondences(correspondences: &[Correspondence]) -> Self {
        let mut stats = CoverageStats {
            total: correspondences.len(),
            ..Self::default()
        };

        for c in correspondences {
            if c.is_translated() {
                stats.translated += 1;
            }
            match c.status {
                MatchStatus::Exact => stats.exact += 1,
                MatchStatus::Fuzzy => stats.fuzzy += 1,
                MatchStatus::Missing => stats.missing += 1,
            }
        }

        if stats.total > 0 {
            let total = stats.total as f64;
            stats.overall = stats.translated as f64 / total;
            stats.exact_ratio = stats.exact as f64 / total;
            stats.fuzzy_ratio = stats.fuzzy as f64 / total;
            stats.missing_ratio = stats.missing as f64 / total;
        }

        stats
    }
}

/// Node counts of one kind in both trees
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KindCoverage {
    pub source: usize,
    pub target: usize,
    /// `target - source`
    pub difference: i64,
    /// `target / source * 100`, 0.0 when the source has none
    pub coverage_percent: f64,
}

/// Per-kind structural comparison, ordered by kind
pub type StructureDiff = BTreeMap<NodeKind, KindCoverage>;

fn structure_diff(source: &[StructuralNode], target: &[StructuralNode]) -> StructureDiff {
    let mut counts: BTreeMap<NodeKind, (usize, usize)> = BTreeMap::new();
    for node in source {
        counts.entry(node.kind).or_default().0 += 1;
    }
    for node in target {
        counts.entry(node.kind).or_default().1 += 1;
    }

    counts
        .into_iter()
        .map(|(kind, (s, t))| {
            let coverage_percent = if s > 0 {
                t as f64 / s as f64 * 100.0
            } else {
                0.0
            };
            (
                kind,
                KindCoverage {
                    source: s,
                    target: t,
                    difference: t as i64 - s as i64,
                    coverage_percent,
                },
            )
        })
        .collect()
}

/// How far a matched target drifted from its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeClass {
    Minor,
    Moderate,
    Major,
    Rewrite,
}

impl ChangeClass {
    pub fn from_similarity(similarity: f64) -> Self {
        if similarity >= 0.95 {
            ChangeClass::Minor
        } else if similarity >= 0.8 {
            ChangeClass::Moderate
        } else if similarity >= 0.5 {
            ChangeClass::Major
        } else {
            ChangeClass::Rewrite
        }
    }
}

/// A matched pair whose contents differ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentChange {
    pub source_id: String,
    pub target_id: String,
    pub file: String,
    pub line: usize,
    pub kind: NodeKind,
    pub similarity: f64,
    pub change: ChangeClass,
    pub source_preview: String,
    pub target_preview: String,
}

fn content_changes(correspondences: &[Correspondence]) -> Vec<ContentChange> {
    correspondences
        .iter()
        .filter_map(|c| {
            let target = c.target.as_ref()?;
            if c.similarity <= 0.0 || c.similarity >= 1.0 {
                return None;
            }
            Some(ContentChange {
                source_id: c.source.id.clone(),
                target_id: target.id.clone(),
                file: c.source.file_key(),
                line: c.source.line_number,
                kind: c.source.kind,
                similarity: c.similarity,
                change: ChangeClass::from_similarity(c.similarity),
                source_preview: truncate_chars(&c.source.content, PREVIEW_CHARS).to_string(),
                target_preview: truncate_chars(&target.content, PREVIEW_CHARS).to_string(),
            })
        })
        .collect()
}

/// Everything a comparison of two language trees produces
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub source_language: String,
    pub target_language: String,
    pub correspondences: Vec<Correspondence>,
    pub diagnostics: Vec<Diagnostic>,
    pub coverage: CoverageStats,
    pub structure: StructureDiff,
    pub changes: Vec<ContentChange>,
}

impl ComparisonResult {
    /// Source nodes still waiting for a (re)translation
    pub fn needs_translation_count(&self) -> usize {
        self.correspondences
            .iter()
            .filter(|c| c.needs_translation())
            .count()
    }
}

/// Match `source` against `target` and summarize the result
pub fn compare(
    source: &[StructuralNode],
    target: &[StructuralNode],
    strategy: &dyn MatchingStrategy,
    source_language: &str,
    target_language: &str,
) -> ComparisonResult {
    let outcome = strategy.match_nodes(source, target);
    let coverage = CoverageStats::from_correspondences(&outcome.correspondences);

    info!(
        strategy = strategy.strategy_name(),
        total = coverage.total,
        translated = coverage.translated,
        missing = coverage.missing,
        diagnostics = outcome.diagnostics.len(),
        "compared {} -> {}",
        source_language,
        target_language
    );

    ComparisonResult {
        source_language: normalize_language(source_language),
        target_language: normalize_language(target_language),
        structure: structure_diff(source, target),
        changes: content_changes(&outcome.correspondences),
        correspondences: outcome.correspondences,
        diagnostics: outcome.diagnostics,
        coverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatcherConfig;
    use crate::matcher::GreedyMatcher;

    fn matcher() -> GreedyMatcher {
        GreedyMatcher::new(MatcherConfig::default(), "en", "ja")
    }

    #[test]
    fn test_empty_coverage_is_zero() {
        let stats = CoverageStats::from_correspondences(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.overall, 0.0);
    }

    #[test]
    fn test_change_classes() {
        assert_eq!(ChangeClass::from_similarity(0.97), ChangeClass::Minor);
        assert_eq!(ChangeClass::from_similarity(0.8), ChangeClass::Moderate);
        assert_eq!(ChangeClass::from_similarity(0.5), ChangeClass::Major);
        assert_eq!(ChangeClass::from_similarity(0.1), ChangeClass::Rewrite);
    }

    #[test]
    fn test_compare_summaries() {
        let source = vec![
            StructuralNode::new(NodeKind::Section, "## Overview", "docs/en/index.md", 1)
                .with_label("overview"),
            StructuralNode::new(NodeKind::Paragraph, "Only in English.", "docs/en/index.md", 2),
            StructuralNode::new(NodeKind::Paragraph, "Also only English.", "docs/en/index.md", 3),
        ];
        let target = vec![
            StructuralNode::new(NodeKind::Section, "## 概要", "docs/ja/index.md", 1)
                .with_label("overview"),
        ];

        let result = compare(&source, &target, &matcher(), "en-US", "ja");
        assert_eq!(result.source_language, "en");
        assert_eq!(result.correspondences.len(), 3);

        assert_eq!(result.coverage.total, 3);
        assert_eq!(result.coverage.translated, 1);
        assert_eq!(result.coverage.missing, 2);
        assert!((result.coverage.overall - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.needs_translation_count(), 3);

        let paragraphs = &result.structure[&NodeKind::Paragraph];
        assert_eq!(paragraphs.source, 2);
        assert_eq!(paragraphs.target, 0);
        assert_eq!(paragraphs.difference, -2);
        assert_eq!(paragraphs.coverage_percent, 0.0);
        assert_eq!(result.structure[&NodeKind::Section].coverage_percent, 100.0);

        // "## Overview" vs "## 概要" scores 0.375
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].change, ChangeClass::Rewrite);
        assert_eq!(result.changes[0].target_preview, "## 概要");
    }

    #[test]
    fn test_preview_truncated() {
        let long = "a".repeat(150);
        let mut translated = "b".repeat(60);
        translated.push_str(&"a".repeat(90));
        let source = vec![
            StructuralNode::new(NodeKind::Paragraph, long, "docs/en/x.md", 1).with_label("p"),
        ];
        let target = vec![
            StructuralNode::new(NodeKind::Paragraph, translated, "docs/ja/x.md", 1)
                .with_label("p"),
        ];

        let result = compare(&source, &target, &matcher(), "en", "ja");
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.changes[0].source_preview.chars().count(), 100);
        assert_eq!(result.changes[0].target_preview.chars().count(), 100);
    }
}
