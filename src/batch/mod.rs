//! Adaptive Batch Optimization
//!
//! Packs the nodes that still need translation into cost-bounded batches.
//!
//! # Overview
//!
//! 1. **Eligibility** - only missing and fuzzy nodes are batched
//! 2. **Grouping** - nodes sharing an enclosing section form one group
//! 3. **Merging** - small groups are packed together towards `target_size`
//! 4. **Splitting** - groups above `max_size` are cut between nodes
//! 5. **Finalizing** - each batch gets its section range, priority, theme
//!    and glossary terms
//! 6. **Ordering** - batches are sorted by priority and chained per file
//!    in document order
//!
//! # Example
//!
//! ```ignore
//! use docdiff::batch::BatchOptimizer;
//!
//! let optimizer = BatchOptimizer::new(OptimizerConfig::default(), CostModel::default())?;
//! for batch in optimizer.optimize(&hierarchy) {
//!     println!("{} {:?}", batch.id, batch.node_ids);
//! }
//! ```

pub mod context;
pub mod estimator;
pub mod metrics;
pub mod optimizer;
pub mod theme;

pub use context::ContextWindow;
pub use estimator::CostModel;
pub use metrics::OptimizationMetrics;
pub use optimizer::{BatchOptimizer, OptimizerPhase};
pub use theme::Theme;

use serde::Serialize;
use std::collections::BTreeMap;

/// A cost-bounded unit of translation work
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Batch {
    /// 1-based, in creation (document) order across the run
    pub id: usize,
    pub node_ids: Vec<String>,
    pub estimated_size: usize,
    pub file_group: String,
    pub section_range: String,
    /// Higher is emitted earlier
    pub priority: u32,
    /// Batches that must be translated before this one
    pub dependencies: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub glossary_terms: Vec<String>,
    /// A single node whose own cost exceeds `max_size`
    pub oversized: bool,
}

/// Result of one optimizer run
#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizationOutcome {
    /// Batches in emission order
    pub batches: Vec<Batch>,
    pub metrics: OptimizationMetrics,
    /// Context per file, then per batched node id; empty when context is
    /// disabled
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub context_windows: BTreeMap<String, BTreeMap<String, ContextWindow>>,
}

impl OptimizationOutcome {
    pub fn batch(&self, id: usize) -> Option<&Batch> {
        self.batches.iter().find(|b| b.id == id)
    }

    /// Context window of node `id` in file `file_group`
    pub fn context_window(&self, file_group: &str, id: &str) -> Option<&ContextWindow> {
        self.context_windows.get(file_group)?.get(id)
    }
}
