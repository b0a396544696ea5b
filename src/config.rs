//! Configuration for matching, batching and cost estimation
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! {
//!     "matcher": { "language_pairs": { "en-fr": 0.15 } },
//!     "optimizer": { "target_size": 1200, "source_language": "ja" }
//! }
//! ```

use crate::batch::estimator::CostModel;
use crate::error::{DocDiffError, DocDiffResult};
use crate::language::normalize_language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Upper bound for the context window; anything larger is a caller mistake
pub const MAX_CONTEXT_WINDOW: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocDiffConfig {
    pub matcher: MatcherConfig,
    pub optimizer: OptimizerConfig,
    pub cost: CostModel,
}

impl DocDiffConfig {
    /// Load a configuration file
    ///
    /// # Errors
    /// - File read errors
    /// - Invalid JSON
    /// - Values that fail [`DocDiffConfig::validate`]
    pub fn from_file(path: &Path) -> DocDiffResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: DocDiffConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DocDiffResult<()> {
        self.matcher.validate()?;
        self.optimizer.validate()?;
        self.cost.validate()
    }
}

/// Thresholds for the node matcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum similarity for a content-only (same kind) match
    pub similarity_threshold: f64,
    /// Above this, two contents are treated as the same untranslated text
    pub identical_threshold: f64,
    /// Below this, a same-anchor pair counts as a full translation
    pub exact_threshold: f64,
    /// Per language pair override of `exact_threshold`, keyed `"<src>-<tgt>"`
    pub language_pairs: BTreeMap<String, f64>,
    /// Multiplier applied when both nodes live in corresponding files
    pub same_file_bonus: f64,
    /// Length ratio under which similarity is taken as zero
    pub length_ratio_cutoff: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            identical_threshold: 0.95,
            exact_threshold: 0.3,
            language_pairs: BTreeMap::new(),
            same_file_bonus: 1.2,
            length_ratio_cutoff: 0.3,
        }
    }
}

impl MatcherConfig {
    /// The exact-match cut-off for a given language pair
    pub fn exact_threshold_for(&self, source_language: &str, target_language: &str) -> f64 {
        let key = format!(
            "{}-{}",
            normalize_language(source_language),
            normalize_language(target_language)
        );
        self.language_pairs
            .get(&key)
            .copied()
            .unwrap_or(self.exact_threshold)
    }

    pub fn validate(&self) -> DocDiffResult<()> {
        let unit_fields = [
            ("similarity_threshold", self.similarity_threshold),
            ("identical_threshold", self.identical_threshold),
            ("exact_threshold", self.exact_threshold),
            ("length_ratio_cutoff", self.length_ratio_cutoff),
        ];
        for (field, value) in unit_fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DocDiffError::InvalidConfig(format!(
                    "{} must be within [0.0, 1.0], got {}",
                    field, value
                )));
            }
        }
        for (pair, value) in &self.language_pairs {
            if !value.is_finite() || !(0.0..=1.0).contains(value) {
                return Err(DocDiffError::InvalidConfig(format!(
                    "exact threshold for '{}' must be within [0.0, 1.0], got {}",
                    pair, value
                )));
            }
            if *value > self.identical_threshold {
                return Err(DocDiffError::InvalidConfig(format!(
                    "exact threshold for '{}' ({}) exceeds identical_threshold ({})",
                    pair, value, self.identical_threshold
                )));
            }
        }
        if self.exact_threshold > self.identical_threshold {
            return Err(DocDiffError::InvalidConfig(format!(
                "exact_threshold ({}) exceeds identical_threshold ({})",
                self.exact_threshold, self.identical_threshold
            )));
        }
        if !self.same_file_bonus.is_finite() || self.same_file_bonus < 1.0 {
            return Err(DocDiffError::InvalidConfig(format!(
                "same_file_bonus must be a finite value >= 1.0, got {}",
                self.same_file_bonus
            )));
        }
        Ok(())
    }
}

/// Batch size band and optimizer switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub target_size: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub source_language: String,
    pub context_window: usize,
    pub preserve_hierarchy: bool,
    pub enable_context: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            target_size: 1500,
            min_size: 500,
            max_size: 2000,
            source_language: "en".to_string(),
            context_window: 3,
            preserve_hierarchy: true,
            enable_context: true,
        }
    }
}

impl OptimizerConfig {
    /// A config with the given size band and defaults elsewhere
    pub fn with_sizes(target_size: usize, min_size: usize, max_size: usize) -> Self {
        Self {
            target_size,
            min_size,
            max_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> DocDiffResult<()> {
        if self.max_size == 0 {
            return Err(DocDiffError::InvalidConfig(
                "max_size must be greater than zero".to_string(),
            ));
        }
        if self.min_size > self.max_size {
            return Err(DocDiffError::InvalidConfig(format!(
                "min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if self.target_size < self.min_size || self.target_size > self.max_size {
            return Err(DocDiffError::InvalidConfig(format!(
                "target_size ({}) must lie within [{}, {}]",
                self.target_size, self.min_size, self.max_size
            )));
        }
        if self.context_window > MAX_CONTEXT_WINDOW {
            return Err(DocDiffError::InvalidConfig(format!(
                "context_window ({}) exceeds {}",
                self.context_window, MAX_CONTEXT_WINDOW
            )));
        }
        crate::language::validate_language(&self.source_language)
            .map_err(|e| DocDiffError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = DocDiffConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.optimizer.target_size, 1500);
        assert_eq!(config.optimizer.min_size, 500);
        assert_eq!(config.optimizer.max_size, 2000);
        assert_eq!(config.optimizer.context_window, 3);
        assert_eq!(config.matcher.similarity_threshold, 0.8);
    }

    #[test]
    fn test_min_exceeds_max_is_fatal() {
        let config = OptimizerConfig::with_sizes(600, 800, 700);
        assert!(matches!(
            config.validate(),
            Err(DocDiffError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_target_outside_band_is_fatal() {
        assert!(OptimizerConfig::with_sizes(100, 500, 2000).validate().is_err());
        assert!(OptimizerConfig::with_sizes(2500, 500, 2000).validate().is_err());
        assert!(OptimizerConfig::with_sizes(500, 500, 500).validate().is_ok());
    }

    #[test]
    fn test_zero_max_is_fatal() {
        assert!(OptimizerConfig::with_sizes(0, 0, 0).validate().is_err());
    }

    #[test]
    fn test_matcher_rejects_non_finite() {
        let config = MatcherConfig {
            similarity_threshold: f64::NAN,
            ..MatcherConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_language_pair_override() {
        let mut config = MatcherConfig::default();
        config.language_pairs.insert("en-fr".to_string(), 0.15);
        assert_eq!(config.exact_threshold_for("en", "fr"), 0.15);
        assert_eq!(config.exact_threshold_for("en-US", "fr-CA"), 0.15);
        assert_eq!(config.exact_threshold_for("en", "ja"), 0.3);
    }

    #[test]
    fn test_language_pair_above_identical_is_fatal() {
        let mut config = MatcherConfig::default();
        config.language_pairs.insert("en-ja".to_string(), 0.95);
        assert!(config.validate().is_ok());

        config.language_pairs.insert("en-ja".to_string(), 0.97);
        assert!(matches!(
            config.validate(),
            Err(DocDiffError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"optimizer": {{"target_size": 1200, "min_size": 400}}}}"#
        )
        .unwrap();

        let config = DocDiffConfig::from_file(file.path()).unwrap();
        assert_eq!(config.optimizer.target_size, 1200);
        assert_eq!(config.optimizer.min_size, 400);
        assert_eq!(config.optimizer.max_size, 2000);
        assert_eq!(config.matcher, MatcherConfig::default());
    }

    #[test]
    fn test_negative_size_rejected_by_parser() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"optimizer": {{"max_size": -5}}}}"#).unwrap();
        assert!(matches!(
            DocDiffConfig::from_file(file.path()),
            Err(DocDiffError::Json(_))
        ));
    }
}
