//! Batch optimizer
//!
//! A run is a pure function of the hierarchy, the configuration and the
//! optional glossary. All state (the pending merge buffer, the batch
//! counter) is local to one call of [`BatchOptimizer::optimize_with_glossary`].

use super::context::build_windows;
use super::estimator::CostModel;
use super::metrics::OptimizationMetrics;
use super::theme::Theme;
use super::{Batch, OptimizationOutcome};
use crate::config::OptimizerConfig;
use crate::error::DocDiffResult;
use crate::glossary::Glossary;
use crate::hierarchy::{DocumentHierarchy, DocumentTree, TranslationTreeNode};
use crate::node::{ContentClass, truncate_chars};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

const SECTION_PRIORITY: u32 = 10;
const EARLY_LINE_PRIORITY: u32 = 5;
const EARLY_LINE_LIMIT: usize = 100;
const PARENT_PRIORITY: u32 = 3;
const PARENT_MIN_CHILDREN: usize = 3;
const RANGE_TITLE_CHARS: usize = 50;
const SECTION_TITLE_CHARS: usize = 100;
const MAX_GLOSSARY_TERMS: usize = 10;

/// Phases of one optimizer run, in the only order they may occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptimizerPhase {
    Idle,
    Grouping,
    Merging,
    Splitting,
    Finalizing,
    Ordered,
}

#[derive(Debug)]
struct PhaseTracker(OptimizerPhase);

impl PhaseTracker {
    fn advance(&mut self, next: OptimizerPhase) {
        debug_assert!(next > self.0, "optimizer phase {:?} after {:?}", next, self.0);
        debug!(from = ?self.0, to = ?next, "optimizer phase");
        self.0 = next;
    }
}

type Group<'a> = Vec<&'a TranslationTreeNode>;

/// Nodes of one file on their way through the stages
struct FileWork<'a> {
    tree: &'a DocumentTree,
    groups: Vec<Group<'a>>,
}

#[derive(Debug, Clone)]
pub struct BatchOptimizer {
    config: OptimizerConfig,
    cost: CostModel,
}

impl BatchOptimizer {
    /// Create an optimizer
    ///
    /// # Errors
    /// `InvalidConfig` when the size band is inconsistent (`min_size >
    /// max_size`, `target_size` outside `[min_size, max_size]`) or the cost
    /// tables contain invalid factors.
    pub fn new(config: OptimizerConfig, cost: CostModel) -> DocDiffResult<Self> {
        config.validate()?;
        cost.validate()?;
        Ok(Self { config, cost })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Ordered batches for every node still needing translation
    pub fn optimize(&self, hierarchy: &DocumentHierarchy) -> Vec<Batch> {
        self.optimize_with_glossary(hierarchy, None).batches
    }

    pub fn optimize_with_glossary(
        &self,
        hierarchy: &DocumentHierarchy,
        glossary: Option<&Glossary>,
    ) -> OptimizationOutcome {
        let mut phase = PhaseTracker(OptimizerPhase::Idle);
        let mut context_windows = BTreeMap::new();

        phase.advance(OptimizerPhase::Grouping);
        let mut work: Vec<FileWork> = Vec::new();
        for tree in hierarchy.trees() {
            let eligible: Vec<&TranslationTreeNode> =
                tree.nodes.iter().filter(|n| n.needs_translation()).collect();
            if eligible.is_empty() {
                continue;
            }
            if self.config.enable_context {
                context_windows.insert(
                    tree.file_path.clone(),
                    build_windows(tree, &eligible, self.config.context_window),
                );
            }
            work.push(FileWork {
                tree,
                groups: self.group(tree, eligible),
            });
        }

        phase.advance(OptimizerPhase::Merging);
        for file in &mut work {
            let groups = std::mem::take(&mut file.groups);
            file.groups = self.merge(groups);
        }

        phase.advance(OptimizerPhase::Splitting);
        for file in &mut work {
            let groups = std::mem::take(&mut file.groups);
            file.groups = groups.into_iter().flat_map(|g| self.split(g)).collect();
        }

        phase.advance(OptimizerPhase::Finalizing);
        let mut batches = Vec::new();
        for file in &work {
            for nodes in &file.groups {
                let batch = self.finalize(batches.len() + 1, file.tree, nodes, glossary);
                batches.push(batch);
            }
        }

        phase.advance(OptimizerPhase::Ordered);
        order(&mut batches);

        let metrics = OptimizationMetrics::from_batches(&batches, self.config.target_size);
        info!(
            files = work.len(),
            nodes = metrics.total_nodes,
            batches = metrics.total_batches,
            utilization = metrics.average_utilization,
            "batch optimization finished"
        );

        OptimizationOutcome {
            batches,
            metrics,
            context_windows,
        }
    }

    fn group_cost(&self, group: &[&TranslationTreeNode]) -> usize {
        self.cost
            .estimate_batch(&texts(group), &self.config.source_language)
    }

    fn fits(&self, group: &[&TranslationTreeNode]) -> bool {
        self.cost.fits_in_limit(
            &texts(group),
            self.config.max_size,
            &self.config.source_language,
        )
    }

    /// Stage B: runs of eligible nodes sharing one enclosing section
    fn group<'a>(&self, tree: &'a DocumentTree, eligible: Vec<&'a TranslationTreeNode>) -> Vec<Group<'a>> {
        if !self.config.preserve_hierarchy {
            return eligible.into_iter().map(|n| vec![n]).collect();
        }

        let mut groups = Vec::new();
        let mut current: Group = Vec::new();
        let mut current_section: Option<&str> = None;

        for node in eligible {
            let section = if node.is_section() {
                None
            } else {
                tree.enclosing_section(node).map(|s| s.id.as_str())
            };

            if node.is_section() || section != current_section {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                current_section = if node.is_section() {
                    Some(node.id.as_str())
                } else {
                    section
                };
            }
            current.push(node);
        }
        if !current.is_empty() {
            groups.push(current);
        }

        groups
    }

    /// Stage C: pack small groups until they reach `target_size`
    fn merge<'a>(&self, groups: Vec<Group<'a>>) -> Vec<Group<'a>> {
        let mut merged = Vec::new();
        let mut pending: Group = Vec::new();
        let mut pending_cost = 0;

        for group in groups {
            let cost = self.group_cost(&group);

            if cost >= self.config.min_size {
                if !pending.is_empty() {
                    merged.push(std::mem::take(&mut pending));
                    pending_cost = 0;
                }
                merged.push(group);
            } else if pending_cost + cost <= self.config.max_size {
                pending.extend(group);
                pending_cost += cost;
                if pending_cost >= self.config.target_size {
                    merged.push(std::mem::take(&mut pending));
                    pending_cost = 0;
                }
            } else {
                if !pending.is_empty() {
                    merged.push(std::mem::take(&mut pending));
                }
                pending = group;
                pending_cost = cost;
            }
        }
        if !pending.is_empty() {
            merged.push(pending);
        }

        merged
    }

    /// Stage D: cut a group above `max_size` between nodes
    fn split<'a>(&self, group: Group<'a>) -> Vec<Group<'a>> {
        if self.fits(&group) {
            return vec![group];
        }

        let mut parts = Vec::new();
        let mut rest: &[&'a TranslationTreeNode] = &group;
        while !rest.is_empty() {
            let len = self.cost.optimal_batch_len(
                &texts(rest),
                self.config.max_size,
                &self.config.source_language,
            );
            parts.push(rest[..len].to_vec());
            rest = &rest[len..];
        }

        parts
    }

    /// Stage E: turn a node list into a batch
    fn finalize(
        &self,
        id: usize,
        tree: &DocumentTree,
        nodes: &[&TranslationTreeNode],
        glossary: Option<&Glossary>,
    ) -> Batch {
        let estimated_size = self.group_cost(nodes);
        let oversized = nodes.len() == 1 && !self.fits(nodes);
        if oversized {
            let node = nodes[0];
            let chunks = self.cost.chunks_needed(
                &node.source,
                self.config.max_size.saturating_sub(self.cost.per_node_overhead),
                node.kind.content_class(),
                &self.config.source_language,
            );
            warn!(
                batch = id,
                node = %node.id,
                size = estimated_size,
                max_size = self.config.max_size,
                chunks,
                "node exceeds max batch size, emitted as its own batch"
            );
        }

        let glossary_terms = glossary
            .map(|g| {
                let text = nodes.iter().map(|n| n.source.as_str()).collect::<Vec<_>>().join(" ");
                g.find_terms_in_text(&text)
                    .into_iter()
                    .take(MAX_GLOSSARY_TERMS)
                    .map(|t| t.term.clone())
                    .collect()
            })
            .unwrap_or_default();

        Batch {
            id,
            node_ids: nodes.iter().map(|n| n.id.clone()).collect(),
            estimated_size,
            file_group: tree.file_path.clone(),
            section_range: section_range(tree, nodes),
            priority: priority(nodes),
            dependencies: Vec::new(),
            section_title: nodes
                .iter()
                .find_map(|n| tree.enclosing_section(n))
                .map(|s| truncate_chars(&s.source, SECTION_TITLE_CHARS).to_string()),
            theme: Theme::detect(nodes.iter().map(|n| n.source.as_str())),
            glossary_terms,
            oversized,
        }
    }
}

fn texts<'n>(nodes: &[&'n TranslationTreeNode]) -> Vec<(&'n str, ContentClass)> {
    nodes
        .iter()
        .map(|n| (n.source.as_str(), n.kind.content_class()))
        .collect()
}

/// `"<first section> to <last section>"`, one title, or a line range
fn section_range(tree: &DocumentTree, nodes: &[&TranslationTreeNode]) -> String {
    let sections: Vec<&str> = nodes
        .iter()
        .filter_map(|n| tree.enclosing_section(n))
        .map(|s| truncate_chars(&s.source, RANGE_TITLE_CHARS))
        .collect();

    match (sections.first(), sections.last()) {
        (Some(first), Some(last)) if first != last => format!("{} to {}", first, last),
        (Some(first), _) => first.to_string(),
        _ => {
            let first = nodes.first().map_or(0, |n| n.line_number());
            let last = nodes.last().map_or(0, |n| n.line_number());
            format!("Lines {}-{}", first, last)
        }
    }
}

fn priority(nodes: &[&TranslationTreeNode]) -> u32 {
    nodes
        .iter()
        .map(|n| {
            let mut score = 0;
            if n.is_section() {
                score += SECTION_PRIORITY;
            }
            if n.line_number() < EARLY_LINE_LIMIT {
                score += EARLY_LINE_PRIORITY;
            }
            if n.children_ids.len() > PARENT_MIN_CHILDREN {
                score += PARENT_PRIORITY;
            }
            score
        })
        .sum()
}

/// Stage F: chain each file's batches in document order, then sort
fn order(batches: &mut [Batch]) {
    let mut previous: HashMap<String, usize> = HashMap::new();
    for batch in batches.iter_mut() {
        if let Some(prev) = previous.insert(batch.file_group.clone(), batch.id) {
            batch.dependencies.push(prev);
        }
    }

    batches.sort_by_key(|b| (Reverse(b.priority), b.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::HierarchyBuilder;
    use crate::matcher::{Correspondence, MatchStatus};
    use crate::node::{NodeKind, StructuralNode};
    use std::collections::HashSet;

    const FILE: &str = "docs/en/guide.md";

    fn optimizer(target: usize, min: usize, max: usize) -> BatchOptimizer {
        BatchOptimizer::new(OptimizerConfig::with_sizes(target, min, max), CostModel::default())
            .unwrap()
    }

    fn missing(node: StructuralNode) -> Correspondence {
        Correspondence::missing(node)
    }

    fn exact(node: StructuralNode) -> Correspondence {
        let mut c = Correspondence::missing(node);
        c.status = MatchStatus::Exact;
        c
    }

    fn para(text: &str, line: usize) -> StructuralNode {
        StructuralNode::new(NodeKind::Paragraph, text, FILE, line)
    }

    /// English text costing `units`, a multiple of 11
    fn text_of_cost(units: usize) -> String {
        // 40 chars cost 11 units
        "a".repeat(units / 11 * 40)
    }

    fn hierarchy(input: &[Correspondence]) -> DocumentHierarchy {
        HierarchyBuilder::default().build(input)
    }

    #[test]
    fn test_invalid_band_is_fatal() {
        assert!(
            BatchOptimizer::new(OptimizerConfig::with_sizes(600, 800, 700), CostModel::default())
                .is_err()
        );
    }

    #[test]
    fn test_empty_input_gives_no_batches() {
        let outcome = optimizer(1500, 500, 2000).optimize_with_glossary(&DocumentHierarchy::default(), None);
        assert!(outcome.batches.is_empty());
        assert_eq!(outcome.metrics.total_batches, 0);

        let all_exact = hierarchy(&[exact(para("Done.", 1))]);
        assert!(optimizer(1500, 500, 2000).optimize(&all_exact).is_empty());
    }

    #[test]
    fn test_exact_nodes_not_batched() {
        let h = hierarchy(&[
            missing(StructuralNode::section("# Intro", 1, FILE, 1)),
            exact(para("Translated already.", 2)),
            missing(para("Needs work.", 3)),
        ]);
        let tree = h.file(FILE).unwrap();
        let batches = optimizer(500, 1, 1000).optimize(&h);
        let sources: Vec<_> = batches
            .iter()
            .flat_map(|b| &b.node_ids)
            .map(|id| tree.get(id).unwrap().source.as_str())
            .collect();
        assert_eq!(sources, vec!["# Intro", "Needs work."]);
    }

    #[test]
    fn test_small_groups_merge_until_target() {
        // ten sections with one small paragraph each
        let mut input = Vec::new();
        for i in 0..10 {
            input.push(missing(StructuralNode::section(format!("## Part {}", i), 2, FILE, i * 10 + 1)));
            input.push(missing(para("Short text.", i * 10 + 2)));
        }
        let h = hierarchy(&input);
        let batches = optimizer(300, 250, 400).optimize(&h);

        // each section group costs 52 + 53 = 105, below min_size
        for batch in &batches {
            assert!(batch.estimated_size <= 400);
        }
        assert!(batches.len() < 10);
        assert_eq!(batches.iter().map(|b| b.node_ids.len()).sum::<usize>(), 20);
    }

    #[test]
    fn test_large_group_split_between_nodes() {
        let body = text_of_cost(330); // 330 + 50 = 380 per node
        let input: Vec<_> = (0..5)
            .map(|i| missing(para(&format!("{}{}", body, i), i + 1)))
            .collect();
        let h = hierarchy(&input);
        let batches = optimizer(800, 100, 800).optimize(&h);

        for batch in &batches {
            assert!(batch.estimated_size <= 800);
            assert!(!batch.oversized);
        }
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(|b| b.node_ids.len()).sum::<usize>(), 5);
    }

    #[test]
    fn test_oversized_node_own_batch() {
        let huge = "x".repeat(10_000);
        let h = hierarchy(&[missing(para("Small.", 1)), missing(para(&huge, 2))]);
        let batches = optimizer(500, 100, 1000).optimize(&h);

        let oversized: Vec<_> = batches.iter().filter(|b| b.oversized).collect();
        assert_eq!(oversized.len(), 1);
        assert_eq!(oversized[0].node_ids.len(), 1);
        assert!(oversized[0].estimated_size > 1000);
        assert_eq!(batches.iter().map(|b| b.node_ids.len()).sum::<usize>(), 2);
    }

    #[test]
    fn test_no_node_loss_and_no_duplicates() {
        let mut input = Vec::new();
        for i in 0..30 {
            if i % 7 == 0 {
                input.push(missing(StructuralNode::section(format!("# S{}", i), 1 + (i % 3) as u32, FILE, i + 1)));
            } else if i % 5 == 0 {
                input.push(exact(para(&format!("Done {}", i), i + 1)));
            } else {
                input.push(missing(para(&"word ".repeat(i * 20), i + 1)));
            }
        }
        let h = hierarchy(&input);
        let tree = h.file(FILE).unwrap();
        let eligible: HashSet<_> = tree
            .nodes
            .iter()
            .filter(|n| n.needs_translation())
            .map(|n| n.id.clone())
            .collect();

        for preserve in [true, false] {
            let mut config = OptimizerConfig::with_sizes(600, 200, 900);
            config.preserve_hierarchy = preserve;
            let batches = BatchOptimizer::new(config, CostModel::default())
                .unwrap()
                .optimize(&h);

            let mut seen = HashSet::new();
            for batch in &batches {
                for id in &batch.node_ids {
                    assert!(seen.insert(id.clone()), "duplicate node {}", id);
                }
            }
            assert_eq!(seen, eligible);
        }
    }

    #[test]
    fn test_dependencies_follow_document_order() {
        let body = text_of_cost(330);
        let mut input = vec![missing(para(&format!("{}a", body), 500))];
        input.push(missing(StructuralNode::section("# Late section", 1, FILE, 600)));
        input.push(missing(para(&format!("{}b", body), 601)));
        input.push(missing(para(&format!("{}c", body), 602)));
        let h = hierarchy(&input);

        let batches = optimizer(400, 300, 450).optimize(&h);
        assert!(batches.len() >= 3);

        let mut by_id: Vec<&Batch> = batches.iter().collect();
        by_id.sort_by_key(|b| b.id);
        assert!(by_id[0].dependencies.is_empty());
        for pair in by_id.windows(2) {
            assert_eq!(pair[1].dependencies, vec![pair[0].id]);
        }

        // priority order: section batch first
        assert!(batches[0].priority >= batches[batches.len() - 1].priority);
        for pair in batches.windows(2) {
            assert!(
                pair[0].priority > pair[1].priority
                    || (pair[0].priority == pair[1].priority && pair[0].id < pair[1].id)
            );
        }
    }

    #[test]
    fn test_dependencies_per_file() {
        let other = "docs/en/other.md";
        let h = hierarchy(&[
            missing(para("First file.", 1)),
            missing(StructuralNode::new(NodeKind::Paragraph, "Second file.", other, 1)),
        ]);
        let batches = optimizer(500, 1, 1000).optimize(&h);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.dependencies.is_empty()));
    }

    #[test]
    fn test_section_range_and_title() {
        let h = hierarchy(&[
            missing(StructuralNode::section("# Alpha", 1, FILE, 1)),
            missing(para("One.", 2)),
            missing(StructuralNode::section("# Beta", 1, FILE, 3)),
            missing(para("Two.", 4)),
        ]);
        let batches = optimizer(1500, 500, 2000).optimize(&h);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].section_range, "# Alpha to # Beta");
        assert_eq!(batches[0].section_title.as_deref(), Some("# Alpha"));
    }

    #[test]
    fn test_line_range_without_sections() {
        let h = hierarchy(&[missing(para("One.", 7)), missing(para("Two.", 9))]);
        let batches = optimizer(500, 1, 1000).optimize(&h);
        assert_eq!(batches[0].section_range, "Lines 7-9");
        assert_eq!(batches[0].section_title, None);
    }

    #[test]
    fn test_priority_scoring() {
        let mut input = vec![missing(StructuralNode::section("# Top", 1, FILE, 1))];
        for i in 0..4 {
            input.push(exact(para("Child.", i + 2)));
        }
        input.push(missing(para("Far down.", 150)));
        let h = hierarchy(&input);
        let tree = h.file(FILE).unwrap();

        let top: Vec<&TranslationTreeNode> = vec![&tree.nodes[0]];
        // section + early line + more than three children
        assert_eq!(priority(&top), 18);
        let far: Vec<&TranslationTreeNode> = vec![&tree.nodes[5]];
        assert_eq!(priority(&far), 0);
    }

    #[test]
    fn test_theme_and_glossary_annotations() {
        let mut glossary = Glossary::new();
        glossary.add_term(crate::glossary::GlossaryTerm::new("pip", "Package installer"));
        let h = hierarchy(&[missing(para("Install the package with pip.", 1))]);

        let outcome = optimizer(500, 1, 1000).optimize_with_glossary(&h, Some(&glossary));
        let batch = &outcome.batches[0];
        assert_eq!(batch.theme, Some(Theme::Installation));
        assert_eq!(batch.glossary_terms, vec!["pip".to_string()]);
    }

    #[test]
    fn test_context_windows_toggle() {
        let h = hierarchy(&[missing(para("One.", 1)), missing(para("Two.", 2))]);
        let outcome = optimizer(500, 1, 1000).optimize_with_glossary(&h, None);
        let tree = h.file(FILE).unwrap();
        assert_eq!(
            outcome
                .context_window(FILE, &tree.nodes[0].id)
                .and_then(|w| w.following_text.as_deref()),
            Some("Two.")
        );
        assert!(outcome.context_window(FILE, &tree.nodes[1].id).is_some());

        let mut config = OptimizerConfig::with_sizes(500, 1, 1000);
        config.enable_context = false;
        let outcome = BatchOptimizer::new(config, CostModel::default())
            .unwrap()
            .optimize_with_glossary(&h, None);
        assert!(outcome.context_windows.is_empty());
    }

    #[test]
    fn test_context_windows_kept_per_file() {
        let other = "docs/en/other.md";
        let h = hierarchy(&[
            missing(para("Alpha one.", 1).with_id("p1")),
            missing(para("Alpha two.", 2).with_id("p2")),
            missing(StructuralNode::new(NodeKind::Paragraph, "Beta one.", other, 1).with_id("p1")),
        ]);
        let outcome = optimizer(500, 1, 1000).optimize_with_glossary(&h, None);

        let batched: usize = outcome.batches.iter().map(|b| b.node_ids.len()).sum();
        let windows: usize = outcome.context_windows.values().map(|w| w.len()).sum();
        assert_eq!(windows, batched);

        let first = outcome.context_window(FILE, "p1").unwrap();
        assert_eq!(first.following_text.as_deref(), Some("Alpha two."));
        let second = outcome.context_window(other, "p1").unwrap();
        assert_eq!(second.following_text, None);
    }

    #[test]
    fn test_without_hierarchy_groups_by_size_only() {
        let h = hierarchy(&[
            missing(StructuralNode::section("# A", 1, FILE, 1)),
            missing(para("One.", 2)),
            missing(StructuralNode::section("# B", 1, FILE, 3)),
            missing(para("Two.", 4)),
        ]);
        let mut config = OptimizerConfig::with_sizes(1000, 500, 2000);
        config.preserve_hierarchy = false;
        let batches = BatchOptimizer::new(config, CostModel::default())
            .unwrap()
            .optimize(&h);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].node_ids.len(), 4);
    }

    #[test]
    fn test_deterministic() {
        let input: Vec<_> = (0..12)
            .map(|i| missing(para(&"text ".repeat(i * 13 + 1), i + 1)))
            .collect();
        let h = hierarchy(&input);
        let first = optimizer(600, 200, 900).optimize(&h);
        for _ in 0..3 {
            assert_eq!(optimizer(600, 200, 900).optimize(&h), first);
        }
    }
}
