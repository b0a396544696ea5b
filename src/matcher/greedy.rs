//! Greedy first-match-wins matching
//!
//! Source nodes are matched in document order and each target node can be
//! consumed once. This is not a globally optimal assignment: an earlier
//! source node may take a target a later node would have matched better.
//! An optimal assignment can be provided as another [`MatchingStrategy`].

use super::index::TargetIndex;
use super::similarity::similarity;
use super::{Correspondence, MatchOutcome, MatchStatus, MatchingStrategy};
use crate::config::MatcherConfig;
use crate::language::are_corresponding_files;
use crate::node::StructuralNode;
use std::collections::HashSet;
use tracing::debug;

/// Target positions already paired with a source node during one run
#[derive(Debug, Default)]
pub struct ConsumedTargets(HashSet<usize>);

impl ConsumedTargets {
    pub fn contains(&self, position: usize) -> bool {
        self.0.contains(&position)
    }

    pub fn consume(&mut self, position: usize) {
        self.0.insert(position);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GreedyMatcher {
    config: MatcherConfig,
    /// `exact_threshold` resolved for this run's language pair
    exact_threshold: f64,
}

impl GreedyMatcher {
    pub fn new(config: MatcherConfig, source_language: &str, target_language: &str) -> Self {
        let exact_threshold = config.exact_threshold_for(source_language, target_language);
        Self {
            config,
            exact_threshold,
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    fn score(&self, source: &StructuralNode, target: &StructuralNode) -> f64 {
        similarity(&source.content, &target.content, self.config.length_ratio_cutoff)
    }

    /// The target sharing the source's label, else the one sharing its name
    fn structural_candidate(
        &self,
        source: &StructuralNode,
        index: &TargetIndex,
        consumed: &ConsumedTargets,
    ) -> Option<usize> {
        let by_label = source
            .label_key()
            .and_then(|label| index.by_label(label))
            .filter(|&position| !consumed.contains(position));
        by_label.or_else(|| {
            source
                .name_key()
                .and_then(|name| index.by_name(name))
                .filter(|&position| !consumed.contains(position))
        })
    }

    /// Most similar unused target of the same kind, with the same-file bonus
    fn best_content_match(
        &self,
        source: &StructuralNode,
        targets: &[StructuralNode],
        consumed: &ConsumedTargets,
    ) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;

        for (position, target) in targets.iter().enumerate() {
            if consumed.contains(position) || target.kind != source.kind {
                continue;
            }

            let mut score = self.score(source, target);
            if are_corresponding_files(&source.source_file, &target.source_file) {
                score = (score * self.config.same_file_bonus).min(1.0);
            }

            // strictly greater keeps the earliest target on ties
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((position, score));
            }
        }

        best
    }

    fn match_one(
        &self,
        source: &StructuralNode,
        targets: &[StructuralNode],
        index: &TargetIndex,
        consumed: &mut ConsumedTargets,
    ) -> Correspondence {
        if let Some(position) = self.structural_candidate(source, index, consumed) {
            let target = &targets[position];
            let score = self.score(source, target);

            if score > self.config.identical_threshold {
                return Correspondence::missing(source.clone());
            }

            consumed.consume(position);
            let status = if score < self.exact_threshold {
                MatchStatus::Exact
            } else {
                MatchStatus::Fuzzy
            };
            return Correspondence {
                source: source.clone(),
                target: Some(target.clone()),
                similarity: score,
                status,
            };
        }

        match self.best_content_match(source, targets, consumed) {
            Some((position, score)) if score >= self.config.similarity_threshold => {
                if score > self.config.identical_threshold {
                    return Correspondence::missing(source.clone());
                }
                consumed.consume(position);
                Correspondence {
                    source: source.clone(),
                    target: Some(targets[position].clone()),
                    similarity: score,
                    status: MatchStatus::Fuzzy,
                }
            }
            _ => Correspondence::missing(source.clone()),
        }
    }
}

impl MatchingStrategy for GreedyMatcher {
    fn match_nodes(&self, source: &[StructuralNode], target: &[StructuralNode]) -> MatchOutcome {
        let (index, diagnostics) = TargetIndex::build(target);
        let mut consumed = ConsumedTargets::default();

        let correspondences: Vec<Correspondence> = source
            .iter()
            .map(|node| self.match_one(node, target, &index, &mut consumed))
            .collect();

        debug!(
            strategy = self.strategy_name(),
            sources = source.len(),
            targets = target.len(),
            consumed = consumed.len(),
            "matching finished"
        );

        MatchOutcome {
            correspondences,
            diagnostics,
        }
    }

    fn strategy_name(&self) -> &str {
        "greedy"
    }
}
