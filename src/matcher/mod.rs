//! Node Matching
//!
//! Decides, for every node of a source-language tree, whether a
//! corresponding node exists in the target-language tree and whether that
//! correspondence is an actual translation or an untouched copy.
//!
//! # Overview
//!
//! 1. **Structural candidate** - a target node sharing the source node's
//!    label (or, failing that, its name) is the same anchor
//! 2. **Content check** - near-identical content under one anchor means the
//!    text was copied, not translated
//! 3. **Similarity fallback** - nodes without an anchor match the most
//!    similar unused target node of the same kind
//!
//! Matching goes through the [`MatchingStrategy`] trait; [`GreedyMatcher`]
//! consumes targets first-match-wins in source order.
//!
//! # Example
//!
//! ```ignore
//! use docdiff::matcher::{GreedyMatcher, MatchingStrategy};
//!
//! let matcher = GreedyMatcher::new(MatcherConfig::default(), "en", "ja");
//! let outcome = matcher.match_nodes(&source_nodes, &target_nodes);
//! assert_eq!(outcome.correspondences.len(), source_nodes.len());
//! ```

pub mod coverage;
pub mod greedy;
pub mod index;
pub mod similarity;

pub use coverage::{
    ChangeClass, ComparisonResult, ContentChange, CoverageStats, KindCoverage, compare,
};
pub use greedy::GreedyMatcher;
pub use index::TargetIndex;
pub use similarity::similarity;

use crate::error::{DocDiffError, DocDiffResult, Diagnostic};
use crate::node::StructuralNode;
use serde::{Deserialize, Serialize};

/// Translation status of one source node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Anchored and textually divergent: translated
    Exact,
    /// Partially similar: translated but may be stale
    Fuzzy,
    /// No translation exists, or the target is a copy of the source
    Missing,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Exact => "exact",
            MatchStatus::Fuzzy => "fuzzy",
            MatchStatus::Missing => "missing",
        }
    }

    /// Missing and fuzzy nodes go into translation batches
    pub fn needs_translation(&self) -> bool {
        matches!(self, MatchStatus::Missing | MatchStatus::Fuzzy)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The matcher's verdict for one source node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correspondence {
    pub source: StructuralNode,
    pub target: Option<StructuralNode>,
    pub similarity: f64,
    pub status: MatchStatus,
}

impl Correspondence {
    /// Build a correspondence outside the matcher
    ///
    /// # Errors
    /// `InvalidSimilarity` when `similarity` is not a finite value in `[0.0, 1.0]`.
    pub fn try_new(
        source: StructuralNode,
        target: Option<StructuralNode>,
        similarity: f64,
        status: MatchStatus,
    ) -> DocDiffResult<Self> {
        if !similarity.is_finite() || !(0.0..=1.0).contains(&similarity) {
            return Err(DocDiffError::InvalidSimilarity(similarity));
        }
        Ok(Self {
            source,
            target,
            similarity,
            status,
        })
    }

    /// A source node with no translation
    pub fn missing(source: StructuralNode) -> Self {
        Self {
            source,
            target: None,
            similarity: 0.0,
            status: MatchStatus::Missing,
        }
    }

    pub fn is_translated(&self) -> bool {
        self.target.is_some()
    }

    pub fn needs_translation(&self) -> bool {
        self.status.needs_translation()
    }
}

/// Correspondences in source order plus any recovered inconsistencies
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchOutcome {
    pub correspondences: Vec<Correspondence>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A way of pairing source nodes with target nodes
///
/// Implementations must return exactly one correspondence per source node,
/// in source order, and must be deterministic for fixed inputs.
pub trait MatchingStrategy: Send + Sync {
    fn match_nodes(&self, source: &[StructuralNode], target: &[StructuralNode]) -> MatchOutcome;

    /// Name of the strategy, used in logs
    fn strategy_name(&self) -> &str;
}
