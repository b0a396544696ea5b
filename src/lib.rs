//! Translation coverage tracking for multilingual documentation trees
//!
//! docdiff compares the structural nodes of a source-language document tree
//! with those of a target-language tree, works out which nodes still need
//! translating, and plans that work as a series of cost-bounded batches.
//!
//! # Overview
//!
//! 1. **Matching** ([`matcher`]) - pair every source node with at most one
//!    target node, by shared anchor first and by content similarity second
//! 2. **Hierarchy** ([`hierarchy`]) - rebuild the per-file section tree with
//!    translation status and neighbouring text for every node
//! 3. **Batching** ([`batch`]) - pack the nodes that need work into batches
//!    sized for one translation request each
//! 4. **Quality** ([`quality`]) - score the resulting batches
//!
//! Parsing markup into nodes happens elsewhere; node lists are read from
//! JSON through [`store`].
//!
//! # Example
//!
//! ```ignore
//! use docdiff::{DocDiffConfig, plan_translation};
//! use docdiff::store::load_nodes_from_file;
//!
//! let source = load_nodes_from_file("nodes/en.json".as_ref()).await?;
//! let target = load_nodes_from_file("nodes/ja.json".as_ref()).await?;
//!
//! let plan = plan_translation(&source, &target, "ja", &DocDiffConfig::default(), None)?;
//! for batch in &plan.outcome.batches {
//!     println!("{}: {} nodes ({})", batch.id, batch.node_ids.len(), batch.section_range);
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod glossary;
pub mod hierarchy;
pub mod language;
pub mod matcher;
pub mod node;
pub mod quality;
pub mod store;


pub use batch::{Batch, BatchOptimizer, OptimizationOutcome};
pub use config::{DocDiffConfig, MatcherConfig, OptimizerConfig};
pub use error::{Diagnostic, DocDiffError, DocDiffResult};
pub use glossary::{Glossary, GlossaryTerm};
pub use hierarchy::{DocumentHierarchy, HierarchyBuilder, TranslationTreeNode};
pub use matcher::{
    ComparisonResult, Correspondence, GreedyMatcher, MatchStatus, MatchingStrategy, compare,
};
pub use node::{NodeKind, StructuralNode};
pub use quality::{QualityEvaluator, TranslationQualityReport};
pub use store::{JsonNodeStore, MemoryNodeStore, NodeStore, load_nodes_from_file};

use serde::Serialize;

/// Everything one planning run produces
#[derive(Debug, Clone, Serialize)]
pub struct TranslationPlan {
    pub comparison: ComparisonResult,
    pub hierarchy: DocumentHierarchy,
    pub outcome: OptimizationOutcome,
    pub quality: TranslationQualityReport,
}

/// Match, build the hierarchy, batch and score in one go
///
/// The source language is `config.optimizer.source_language`.
///
/// # Errors
/// `InvalidConfig` or `InvalidLanguage` when the configuration or
/// `target_language` is unusable. Partial coverage is never an error.
pub fn plan_translation(
    source: &[StructuralNode],
    target: &[StructuralNode],
    target_language: &str,
    config: &DocDiffConfig,
    glossary: Option<&Glossary>,
) -> DocDiffResult<TranslationPlan> {
    config.validate()?;
    language::validate_language(target_language)?;

    let source_language = &config.optimizer.source_language;
    let optimizer = BatchOptimizer::new(config.optimizer.clone(), config.cost.clone())?;
    let matcher = GreedyMatcher::new(config.matcher.clone(), source_language, target_language);

    let comparison = compare(source, target, &matcher, source_language, target_language);
    let hierarchy =
        HierarchyBuilder::new(config.optimizer.context_window).build(&comparison.correspondences);
    let outcome = optimizer.optimize_with_glossary(&hierarchy, glossary);
    let quality =
        QualityEvaluator::new(config.optimizer.target_size).evaluate(&outcome, &hierarchy, glossary);

    Ok(TranslationPlan {
        comparison,
        hierarchy,
        outcome,
        quality,
    })
}
