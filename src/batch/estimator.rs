//! Cost estimation in abstract cost units
//!
//! `cost = floor(chars × language multiplier × class adjustment × (1 + safety margin))`
//!
//! The tables are plain `BTreeMap`s so a config file can override single
//! entries and the estimate stays reproducible for identical inputs.

use crate::error::{DocDiffError, DocDiffResult};
use crate::language::normalize_language;
use crate::node::ContentClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FALLBACK_LANGUAGE: &str = "en";
const FALLBACK_MULTIPLIER: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Cost units per character, by base language
    pub language_multipliers: BTreeMap<String, f64>,
    pub content_adjustments: BTreeMap<ContentClass, f64>,
    /// Extra fraction added on top of every estimate
    pub safety_margin: f64,
    /// Packaging cost added once per node in a batch
    pub per_node_overhead: usize,
}

impl Default for CostModel {
    fn default() -> Self {
        let language_multipliers = [
            ("en", 0.25),
            ("ja", 0.5),
            ("zh", 0.5),
            ("ko", 0.5),
            ("es", 0.23),
            ("fr", 0.23),
            ("de", 0.22),
            ("ru", 0.3),
            ("ar", 0.35),
            ("code", 0.3),
        ]
        .into_iter()
        .map(|(lang, m)| (lang.to_string(), m))
        .collect();

        let content_adjustments = BTreeMap::from([
            (ContentClass::Text, 1.0),
            (ContentClass::Code, 1.2),
            (ContentClass::Equation, 1.5),
            (ContentClass::Table, 1.3),
            (ContentClass::List, 1.1),
            (ContentClass::Metadata, 0.8),
        ]);

        Self {
            language_multipliers,
            content_adjustments,
            safety_margin: 0.1,
            per_node_overhead: 50,
        }
    }
}

impl CostModel {
    pub fn validate(&self) -> DocDiffResult<()> {
        let factors = self
            .language_multipliers
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .chain(
                self.content_adjustments
                    .iter()
                    .map(|(k, v)| (format!("{:?}", k).to_lowercase(), *v)),
            );
        for (key, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(DocDiffError::InvalidConfig(format!(
                    "cost factor for '{}' must be a finite non-negative value, got {}",
                    key, value
                )));
            }
        }
        if !self.safety_margin.is_finite() || self.safety_margin < 0.0 {
            return Err(DocDiffError::InvalidConfig(format!(
                "safety_margin must be a finite non-negative value, got {}",
                self.safety_margin
            )));
        }
        Ok(())
    }

    fn language_multiplier(&self, language: &str) -> f64 {
        self.language_multipliers
            .get(&normalize_language(language))
            .or_else(|| self.language_multipliers.get(FALLBACK_LANGUAGE))
            .copied()
            .unwrap_or(FALLBACK_MULTIPLIER)
    }

    fn class_adjustment(&self, class: ContentClass) -> f64 {
        self.content_adjustments
            .get(&class)
            .or_else(|| self.content_adjustments.get(&ContentClass::Text))
            .copied()
            .unwrap_or(1.0)
    }

    /// Cost of `text` alone; empty text costs nothing
    pub fn estimate(&self, text: &str, class: ContentClass, language: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count() as f64;
        let cost = chars
            * self.language_multiplier(language)
            * self.class_adjustment(class)
            * (1.0 + self.safety_margin);
        cost.floor() as usize
    }

    /// Cost of a node in a batch: its text plus the per-node overhead
    pub fn node_cost(&self, text: &str, class: ContentClass, language: &str) -> usize {
        self.estimate(text, class, language) + self.per_node_overhead
    }

    /// Cost of a batch carrying `texts`, overhead included
    pub fn estimate_batch(&self, texts: &[(&str, ContentClass)], language: &str) -> usize {
        texts
            .iter()
            .map(|(text, class)| self.node_cost(text, *class, language))
            .sum()
    }

    pub fn fits_in_limit(&self, texts: &[(&str, ContentClass)], limit: usize, language: &str) -> bool {
        self.estimate_batch(texts, language) <= limit
    }

    /// Chunks of at most `max_cost` needed to carry `text`, at least one
    pub fn chunks_needed(&self, text: &str, max_cost: usize, class: ContentClass, language: &str) -> usize {
        let total = self.estimate(text, class, language);
        total.div_ceil(max_cost.max(1)).max(1)
    }

    /// How many leading texts fit in one batch under `max_cost`, at least one
    pub fn optimal_batch_len(&self, texts: &[(&str, ContentClass)], max_cost: usize, language: &str) -> usize {
        if texts.is_empty() {
            return 0;
        }

        let mut total = 0;
        let mut len = 0;
        for (text, class) in texts {
            let cost = self.node_cost(text, *class, language);
            if total + cost > max_cost {
                break;
            }
            total += cost;
            len += 1;
        }
        len.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_costs_zero() {
        let model = CostModel::default();
        assert_eq!(model.estimate("", ContentClass::Code, "ja"), 0);
    }

    #[test]
    fn test_estimate_floors() {
        let model = CostModel::default();
        // 11 × 0.25 × 1.0 × 1.1 = 3.025
        assert_eq!(model.estimate("Hello world", ContentClass::Text, "en"), 3);
        // 8 × 0.25 × 1.2 × 1.1 = 2.64
        assert_eq!(model.estimate("print(1)", ContentClass::Code, "en"), 2);
        assert_eq!(model.node_cost("print(1)", ContentClass::Code, "en"), 52);
    }

    #[test]
    fn test_language_multipliers() {
        let model = CostModel::default();
        let text = "a".repeat(100);
        assert_eq!(model.estimate(&text, ContentClass::Text, "en"), 27);
        assert_eq!(model.estimate(&text, ContentClass::Text, "ja"), 55);
        assert_eq!(model.estimate(&text, ContentClass::Text, "ja-JP"), 55);
        // unknown languages cost like English
        assert_eq!(model.estimate(&text, ContentClass::Text, "xx"), 27);
    }

    #[test]
    fn test_deterministic() {
        let model = CostModel::default();
        let text = "Tables | have | structure".repeat(7);
        let first = model.estimate(&text, ContentClass::Table, "de");
        for _ in 0..5 {
            assert_eq!(model.estimate(&text, ContentClass::Table, "de"), first);
        }
    }

    #[test]
    fn test_helpers() {
        let model = CostModel::default();
        let text = "a".repeat(400); // 110 units in English, 160 with overhead
        let texts = [
            (text.as_str(), ContentClass::Text),
            (text.as_str(), ContentClass::Text),
            (text.as_str(), ContentClass::Text),
        ];
        assert!(model.fits_in_limit(&texts[..1], 160, "en"));
        assert!(!model.fits_in_limit(&texts[..1], 159, "en"));
        assert!(model.fits_in_limit(&[], 0, "en"));
        assert_eq!(model.chunks_needed(&text, 50, ContentClass::Text, "en"), 3);
        assert_eq!(model.chunks_needed("", 50, ContentClass::Text, "en"), 1);

        assert_eq!(model.estimate_batch(&texts, "en"), 480);
        assert_eq!(model.optimal_batch_len(&texts, 350, "en"), 2);
        assert_eq!(model.optimal_batch_len(&texts, 10, "en"), 1);
        assert_eq!(model.optimal_batch_len(&[], 10, "en"), 0);
    }

    #[test]
    fn test_validate_rejects_negative_factor() {
        let mut model = CostModel::default();
        assert!(model.validate().is_ok());
        model.language_multipliers.insert("xx".to_string(), -1.0);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_partial_override_deserializes() {
        let model: CostModel = serde_json::from_str(r#"{"per_node_overhead": 10}"#).unwrap();
        assert_eq!(model.per_node_overhead, 10);
        assert_eq!(model.safety_margin, 0.1);
        assert_eq!(model.content_adjustments[&ContentClass::Equation], 1.5);
    }
}
