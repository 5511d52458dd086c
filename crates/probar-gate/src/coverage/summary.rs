//! Coverage Summary Statistics
//!
//! Per-metric totals computed from one or more [`FileCoverage`](super::FileCoverage)
//! records. Summaries are read-only values; recompute them from the model when the
//! model changes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coverage metric category
///
/// The declaration order is the canonical evaluation and reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Executable statements
    Statements,
    /// Branch arms (if/else, match arms)
    Branches,
    /// Source lines that start a statement
    Lines,
    /// Functions and methods
    Functions,
}

impl Metric {
    /// All metrics in canonical order
    pub const ALL: [Self; 4] = [
        Self::Statements,
        Self::Branches,
        Self::Lines,
        Self::Functions,
    ];

    /// Lowercase metric name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Statements => "statements",
            Self::Branches => "branches",
            Self::Lines => "lines",
            Self::Functions => "functions",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Totals for a single metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Number of trackable units
    pub total: u64,
    /// Number of units executed at least once
    pub covered: u64,
    /// Number of units excluded from the totals
    pub skipped: u64,
    /// Coverage percentage, floored to two decimals (100 when total is 0)
    pub pct: f64,
}

impl MetricSummary {
    /// Create a summary from raw counts
    ///
    /// `covered` is clamped to `total`.
    #[must_use]
    pub fn new(total: u64, covered: u64) -> Self {
        let covered = covered.min(total);
        Self {
            total,
            covered,
            skipped: 0,
            pct: percent(covered, total),
        }
    }

    /// Number of units never executed
    #[must_use]
    pub const fn uncovered(&self) -> u64 {
        self.total.saturating_sub(self.covered)
    }

    /// Combine two summaries of the same metric
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        let mut merged = Self::new(
            self.total.saturating_add(other.total),
            self.covered.saturating_add(other.covered),
        );
        merged.skipped = self.skipped.saturating_add(other.skipped);
        merged
    }
}

impl Default for MetricSummary {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Coverage percentage, floored to two decimal places
///
/// An empty metric is vacuously fully covered.
#[must_use]
pub fn percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let hundredths = u128::from(covered) * 10_000 / u128::from(total);
    hundredths as f64 / 100.0
}

/// Aggregate coverage summary across all four metrics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Statement coverage
    pub statements: MetricSummary,
    /// Branch coverage
    pub branches: MetricSummary,
    /// Line coverage
    pub lines: MetricSummary,
    /// Function coverage
    pub functions: MetricSummary,
}

impl CoverageSummary {
    /// Create an empty summary
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the summary for a metric
    #[must_use]
    pub const fn metric(&self, metric: Metric) -> &MetricSummary {
        match metric {
            Metric::Statements => &self.statements,
            Metric::Branches => &self.branches,
            Metric::Lines => &self.lines,
            Metric::Functions => &self.functions,
        }
    }

    /// Set the summary for a metric
    pub fn set_metric(&mut self, metric: Metric, summary: MetricSummary) {
        match metric {
            Metric::Statements => self.statements = summary,
            Metric::Branches => self.branches = summary,
            Metric::Lines => self.lines = summary,
            Metric::Functions => self.functions = summary,
        }
    }

    /// Fold another summary into this one
    pub fn merge(&mut self, other: &Self) {
        for metric in Metric::ALL {
            let combined = self.metric(metric).combine(other.metric(metric));
            self.set_metric(metric, combined);
        }
    }
}
