//! Quality scoring for optimized batches

use crate::batch::metrics::utilization;
use crate::batch::{Batch, OptimizationOutcome};
use crate::glossary::Glossary;
use crate::hierarchy::{DocumentHierarchy, TranslationTreeNode};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::LazyLock;

/// MyST-style cross-reference roles, e.g. ``{ref}`install` ``
static REFERENCE_ROLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?:ref|term)\}").unwrap());

const CALL_OVERHEAD: f64 = 100.0;

const WEIGHT_UTILIZATION: f64 = 0.4;
const WEIGHT_COHERENCE: f64 = 0.3;
const WEIGHT_CONTEXT: f64 = 0.2;
const WEIGHT_GLOSSARY: f64 = 0.1;

const OPTIMAL_UTILIZATION: f64 = 80.0;
const GOOD_UTILIZATION: f64 = 60.0;
const TINY_UTILIZATION: f64 = 30.0;
const INCOHERENT_SCORE: f64 = 50.0;

/// Percentages in `[0, 100]` for one batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchQualityScore {
    pub batch_id: usize,
    pub token_utilization: f64,
    pub semantic_coherence: f64,
    pub context_completeness: f64,
    pub glossary_coverage: f64,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranslationQualityReport {
    pub total_batches: usize,
    pub total_nodes: usize,
    pub average_efficiency: f64,
    pub call_reduction: f64,
    pub overhead_reduction: f64,
    pub terminology_consistency: f64,
    pub reference_preservation: f64,
    pub context_coverage: f64,
    /// Batches at 80% utilization or above
    pub optimal_batches: usize,
    /// Batches between 60% and 80%
    pub good_batches: usize,
    pub poor_batches: usize,
    pub warnings: Vec<String>,
    pub batch_scores: Vec<BatchQualityScore>,
}

/// Scores batches against the target size and the source hierarchy
#[derive(Debug, Clone)]
pub struct QualityEvaluator {
    target_size: usize,
}

impl QualityEvaluator {
    pub fn new(target_size: usize) -> Self {
        Self { target_size }
    }

    pub fn evaluate(
        &self,
        outcome: &OptimizationOutcome,
        hierarchy: &DocumentHierarchy,
        glossary: Option<&Glossary>,
    ) -> TranslationQualityReport {
        let batches = &outcome.batches;
        if batches.is_empty() {
            return TranslationQualityReport::default();
        }

        let glossary = glossary.filter(|g| !g.is_empty());
        let mut report = TranslationQualityReport {
            total_batches: batches.len(),
            total_nodes: hierarchy.total_nodes,
            ..TranslationQualityReport::default()
        };

        report.batch_scores = batches
            .iter()
            .map(|batch| {
                let nodes = batch_nodes(batch, hierarchy);
                self.score(batch, &nodes, outcome, glossary)
            })
            .collect();

        let count = report.batch_scores.len() as f64;
        report.average_efficiency =
            report.batch_scores.iter().map(|s| s.token_utilization).sum::<f64>() / count;
        if report.total_nodes > 0 {
            let nodes = report.total_nodes as f64;
            let batches = report.total_batches as f64;
            report.call_reduction = (nodes - batches) / nodes * 100.0;
            report.overhead_reduction =
                (nodes * CALL_OVERHEAD - batches * CALL_OVERHEAD) / (nodes * CALL_OVERHEAD) * 100.0;
        }

        report.terminology_consistency = if glossary.is_some() {
            report.batch_scores.iter().map(|s| s.glossary_coverage).sum::<f64>() / count
        } else {
            100.0
        };
        report.reference_preservation = reference_preservation(batches, hierarchy);
        report.context_coverage =
            report.batch_scores.iter().map(|s| s.context_completeness).sum::<f64>() / count;

        for score in &report.batch_scores {
            if score.token_utilization >= OPTIMAL_UTILIZATION {
                report.optimal_batches += 1;
            } else if score.token_utilization >= GOOD_UTILIZATION {
                report.good_batches += 1;
            } else {
                report.poor_batches += 1;
            }
        }

        report.warnings = warnings(&report);
        report
    }

    fn score(
        &self,
        batch: &Batch,
        nodes: &[&TranslationTreeNode],
        outcome: &OptimizationOutcome,
        glossary: Option<&Glossary>,
    ) -> BatchQualityScore {
        let token_utilization = utilization(batch.estimated_size, self.target_size);
        let semantic_coherence = semantic_coherence(nodes);
        let context_completeness = context_completeness(&batch.file_group, nodes, outcome);
        let glossary_coverage = glossary_coverage(batch, nodes, glossary);

        BatchQualityScore {
            batch_id: batch.id,
            token_utilization,
            semantic_coherence,
            context_completeness,
            glossary_coverage,
            overall_score: token_utilization * WEIGHT_UTILIZATION
                + semantic_coherence * WEIGHT_COHERENCE
                + context_completeness * WEIGHT_CONTEXT
                + glossary_coverage * WEIGHT_GLOSSARY,
        }
    }
}

fn batch_nodes<'a>(batch: &Batch, hierarchy: &'a DocumentHierarchy) -> Vec<&'a TranslationTreeNode> {
    hierarchy
        .file(&batch.file_group)
        .map(|tree| batch.node_ids.iter().filter_map(|id| tree.get(id)).collect())
        .unwrap_or_default()
}

/// Fewer distinct parents means a more coherent batch
fn semantic_coherence(nodes: &[&TranslationTreeNode]) -> f64 {
    if nodes.len() <= 1 {
        return 100.0;
    }
    let parents: HashSet<&str> = nodes.iter().filter_map(|n| n.parent_id.as_deref()).collect();
    match parents.len() {
        0 | 1 => 100.0,
        2 => 80.0,
        3 => 60.0,
        _ => 40.0,
    }
}

/// Share of nodes that carry any surrounding context
fn context_completeness(
    file_group: &str,
    nodes: &[&TranslationTreeNode],
    outcome: &OptimizationOutcome,
) -> f64 {
    if nodes.is_empty() {
        return 0.0;
    }
    let with_context = nodes
        .iter()
        .filter(|n| match outcome.context_window(file_group, &n.id) {
            Some(window) => {
                window.preceding_text.is_some()
                    || window.following_text.is_some()
                    || window.section_title.is_some()
            }
            None => {
                n.context.preceding_text.is_some()
                    || n.context.following_text.is_some()
                    || n.context.enclosing_section_title.is_some()
            }
        })
        .count();
    with_context as f64 / nodes.len() as f64 * 100.0
}

/// Share of glossary terms in the batch text that the batch is annotated with
fn glossary_coverage(batch: &Batch, nodes: &[&TranslationTreeNode], glossary: Option<&Glossary>) -> f64 {
    let Some(glossary) = glossary else {
        return 100.0;
    };

    let text = nodes.iter().map(|n| n.source.as_str()).collect::<Vec<_>>().join(" ");
    let found: BTreeSet<&str> = glossary
        .find_terms_in_text(&text)
        .into_iter()
        .map(|t| t.term.as_str())
        .collect();
    if found.is_empty() {
        return 100.0;
    }

    let annotated = batch
        .glossary_terms
        .iter()
        .filter(|t| found.contains(t.as_str()))
        .count();
    annotated as f64 / found.len() as f64 * 100.0
}

/// Share of cross-referencing nodes that share their batch with other nodes
fn reference_preservation(batches: &[Batch], hierarchy: &DocumentHierarchy) -> f64 {
    let mut total = 0;
    let mut preserved = 0;

    for batch in batches {
        for node in batch_nodes(batch, hierarchy) {
            if REFERENCE_ROLE_RE.is_match(&node.source) {
                total += 1;
                if batch.node_ids.len() > 1 {
                    preserved += 1;
                }
            }
        }
    }

    if total == 0 {
        100.0
    } else {
        preserved as f64 / total as f64 * 100.0
    }
}

fn warnings(report: &TranslationQualityReport) -> Vec<String> {
    let mut warnings = Vec::new();

    let tiny = report
        .batch_scores
        .iter()
        .filter(|s| s.token_utilization < TINY_UTILIZATION)
        .count();
    if tiny > 0 {
        warnings.push(format!(
            "Found {} very small batches (<30% utilization)",
            tiny
        ));
    }

    let incoherent = report
        .batch_scores
        .iter()
        .filter(|s| s.semantic_coherence < INCOHERENT_SCORE)
        .count();
    if incoherent > 0 {
        warnings.push(format!(
            "Found {} batches with poor semantic coherence",
            incoherent
        ));
    }

    if report.average_efficiency < GOOD_UTILIZATION {
        warnings.push(format!(
            "Low average batch efficiency: {:.1}%",
            report.average_efficiency
        ));
    }

    if report.poor_batches > report.optimal_batches {
        warnings.push("More poor than optimal batches; consider a smaller min_size or larger target_size".to_string());
    }

    warnings
}

impl fmt::Display for TranslationQualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Translation Quality Report")?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f)?;
        writeln!(f, "Batch statistics")?;
        writeln!(f, "  Total batches:       {}", self.total_batches)?;
        writeln!(f, "  Total nodes:         {}", self.total_nodes)?;
        writeln!(f, "  Avg efficiency:      {:.1}%", self.average_efficiency)?;
        writeln!(f)?;
        writeln!(f, "Optimization")?;
        writeln!(f, "  Calls reduced:       {:.1}%", self.call_reduction)?;
        writeln!(f, "  Overhead:            -{:.1}%", self.overhead_reduction)?;
        writeln!(f)?;
        writeln!(f, "Quality scores")?;
        writeln!(f, "  Terminology:         {:.1}%", self.terminology_consistency)?;
        writeln!(f, "  References:          {:.1}%", self.reference_preservation)?;
        writeln!(f, "  Context coverage:    {:.1}%", self.context_coverage)?;
        writeln!(f)?;
        writeln!(f, "Batch distribution")?;
        writeln!(f, "  Optimal (80-100%):   {} batches", self.optimal_batches)?;
        writeln!(f, "  Good (60-80%):       {} batches", self.good_batches)?;
        writeln!(f, "  Poor (<60%):         {} batches", self.poor_batches)?;

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings")?;
            for warning in &self.warnings {
                writeln!(f, "  - {}", warning)?;
            }
        }

        writeln!(f)?;
        let status = if self.average_efficiency >= OPTIMAL_UTILIZATION {
            "excellent"
        } else if self.average_efficiency >= GOOD_UTILIZATION {
            "good, room for improvement"
        } else {
            "poor"
        };
        write!(f, "Overall: {}", status)
    }
}
