//! Batch optimization metrics

use super::Batch;
use serde::Serialize;
use std::fmt;

/// Assumed per-call overhead when comparing against one node per call
const CALL_OVERHEAD: f64 = 100.0;

/// Utilization above which a run counts as well optimized
const OPTIMIZED_UTILIZATION: f64 = 80.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizationMetrics {
    /// Nodes that went into batches
    pub total_nodes: usize,
    pub total_batches: usize,
    pub target_size: usize,
    pub average_size: f64,
    /// Mean of `min(100, size / target_size × 100)` over batches
    pub average_utilization: f64,
    pub min_size: usize,
    pub max_size: usize,
    /// Calls saved compared to sending every node on its own
    pub calls_saved: usize,
    pub overhead_reduction_percent: f64,
    pub oversized_batches: usize,
}

impl OptimizationMetrics {
    pub fn from_batches(batches: &[Batch], target_size: usize) -> Self {
        if batches.is_empty() {
            return Self {
                target_size,
                ..Self::default()
            };
        }

        let total_nodes: usize = batches.iter().map(|b| b.node_ids.len()).sum();
        let total_batches = batches.len();
        let sizes: Vec<usize> = batches.iter().map(|b| b.estimated_size).collect();

        let average_size = sizes.iter().sum::<usize>() as f64 / total_batches as f64;
        let average_utilization = sizes
            .iter()
            .map(|&s| utilization(s, target_size))
            .sum::<f64>()
            / total_batches as f64;

        let original_overhead = total_nodes as f64 * CALL_OVERHEAD;
        let optimized_overhead = total_batches as f64 * CALL_OVERHEAD;
        let overhead_reduction_percent = if original_overhead > 0.0 {
            (original_overhead - optimized_overhead) / original_overhead * 100.0
        } else {
            0.0
        };

        Self {
            total_nodes,
            total_batches,
            target_size,
            average_size,
            average_utilization,
            min_size: sizes.iter().copied().min().unwrap_or(0),
            max_size: sizes.iter().copied().max().unwrap_or(0),
            calls_saved: total_nodes.saturating_sub(total_batches),
            overhead_reduction_percent,
            oversized_batches: batches.iter().filter(|b| b.oversized).count(),
        }
    }

    pub fn is_optimized(&self) -> bool {
        self.average_utilization > OPTIMIZED_UTILIZATION
    }
}

/// Share of `target_size` a batch of `size` fills, capped at 100
pub fn utilization(size: usize, target_size: usize) -> f64 {
    if target_size == 0 {
        return 100.0;
    }
    (size as f64 / target_size as f64 * 100.0).min(100.0)
}

impl fmt::Display for OptimizationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let call_reduction = if self.total_nodes > 0 {
            self.calls_saved as f64 / self.total_nodes as f64 * 100.0
        } else {
            0.0
        };

        writeln!(f, "Batch Optimization Report")?;
        writeln!(f, "=========================")?;
        writeln!(f, "Total nodes:        {}", self.total_nodes)?;
        writeln!(f, "Total batches:      {}", self.total_batches)?;
        writeln!(f, "Batch efficiency:   {:.1}%", self.average_utilization)?;
        writeln!(f)?;
        writeln!(f, "Size statistics:")?;
        writeln!(f, "  Average:          {:.0} units/batch", self.average_size)?;
        writeln!(f, "  Min:              {} units", self.min_size)?;
        writeln!(f, "  Max:              {} units", self.max_size)?;
        writeln!(f, "  Target:           {} units", self.target_size)?;
        if self.oversized_batches > 0 {
            writeln!(f, "  Oversized:        {} batches", self.oversized_batches)?;
        }
        writeln!(f)?;
        writeln!(f, "Results:")?;
        writeln!(
            f,
            "  Calls saved:      {} ({:.1}% reduction)",
            self.calls_saved, call_reduction
        )?;
        writeln!(
            f,
            "  Overhead:         {:.1}% reduction",
            self.overhead_reduction_percent
        )?;
        writeln!(f)?;
        write!(
            f,
            "Status: {}",
            if self.is_optimized() {
                "optimized"
            } else {
                "sub-optimal"
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(id: usize, nodes: usize, size: usize) -> Batch {
        Batch {
            id,
            node_ids: (0..nodes).map(|i| format!("n{}-{}", id, i)).collect(),
            estimated_size: size,
            file_group: "docs/en/a.md".to_string(),
            ..Batch::default()
        }
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = OptimizationMetrics::from_batches(&[], 1500);
        assert_eq!(metrics.total_batches, 0);
        assert_eq!(metrics.average_utilization, 0.0);
        assert_eq!(metrics.target_size, 1500);
    }

    #[test]
    fn test_metrics_values() {
        let batches = vec![batch(1, 6, 1500), batch(2, 2, 750), batch(3, 2, 3000)];
        let metrics = OptimizationMetrics::from_batches(&batches, 1500);

        assert_eq!(metrics.total_nodes, 10);
        assert_eq!(metrics.total_batches, 3);
        assert_eq!(metrics.calls_saved, 7);
        assert_eq!(metrics.min_size, 750);
        assert_eq!(metrics.max_size, 3000);
        assert!((metrics.average_size - 1750.0).abs() < 1e-9);
        // 100 + 50 + 100 (capped)
        assert!((metrics.average_utilization - 250.0 / 3.0).abs() < 1e-9);
        assert!((metrics.overhead_reduction_percent - 70.0).abs() < 1e-9);
        assert!(metrics.is_optimized());
    }

    #[test]
    fn test_display_report() {
        let metrics = OptimizationMetrics::from_batches(&[batch(1, 4, 750)], 1500);
        let report = metrics.to_string();
        assert!(report.contains("Total nodes:        4"));
        assert!(report.contains("Batch efficiency:   50.0%"));
        assert!(report.contains("Calls saved:      3 (75.0% reduction)"));
        assert!(report.ends_with("Status: sub-optimal"));
    }
}
