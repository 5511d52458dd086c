//! Threshold Evaluation
//!
//! Each configured threshold is signed:
//!
//! - `>= 0`: minimum coverage percentage (`pct < threshold` fails)
//! - `< 0`: maximum number of uncovered units (`uncovered > |threshold|` fails)
//! - absent or not finite (`.nan`, `.inf`): no constraint
//!
//! Evaluation is pure. All violations for a scope are collected in metric order
//! (statements, branches, lines, functions); nothing short-circuits.

use crate::coverage::{CoverageSummary, Metric};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Name of the scope that covers the whole run
pub const GLOBAL_SCOPE: &str = "global";

/// Thresholds for one scope
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricThresholds {
    /// Statement threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statements: Option<f64>,
    /// Branch threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<f64>,
    /// Line threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<f64>,
    /// Function threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<f64>,
}

impl MetricThresholds {
    /// Create thresholds with no constraints
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statement threshold
    #[must_use]
    pub fn with_statements(mut self, value: f64) -> Self {
        self.statements = Some(value);
        self
    }

    /// Set the branch threshold
    #[must_use]
    pub fn with_branches(mut self, value: f64) -> Self {
        self.branches = Some(value);
        self
    }

    /// Set the line threshold
    #[must_use]
    pub fn with_lines(mut self, value: f64) -> Self {
        self.lines = Some(value);
        self
    }

    /// Set the function threshold
    #[must_use]
    pub fn with_functions(mut self, value: f64) -> Self {
        self.functions = Some(value);
        self
    }

    /// Threshold configured for a metric
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Statements => self.statements,
            Metric::Branches => self.branches,
            Metric::Lines => self.lines,
            Metric::Functions => self.functions,
        }
    }

    /// Check if no metric is constrained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

/// Thresholds by scope name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdPolicy {
    scopes: BTreeMap<String, MetricThresholds>,
}

impl ThresholdPolicy {
    /// Create an empty policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy with only a global scope
    #[must_use]
    pub fn global(thresholds: MetricThresholds) -> Self {
        Self::new().with_scope(GLOBAL_SCOPE, thresholds)
    }

    /// Add or replace a scope
    #[must_use]
    pub fn with_scope(mut self, name: impl Into<String>, thresholds: MetricThresholds) -> Self {
        let _ = self.scopes.insert(name.into(), thresholds);
        self
    }

    /// Thresholds for a scope
    #[must_use]
    pub fn scope(&self, name: &str) -> Option<&MetricThresholds> {
        self.scopes.get(name)
    }

    /// Scope names other than `global`
    ///
    /// Path and glob scopes are not evaluated yet.
    #[must_use]
    pub fn unsupported_scopes(&self) -> Vec<&str> {
        self.scopes
            .keys()
            .map(String::as_str)
            .filter(|name| *name != GLOBAL_SCOPE)
            .collect()
    }

    /// Evaluate the global scope against a run summary
    ///
    /// A policy without a global scope never fails.
    #[must_use]
    pub fn evaluate_global(&self, summary: &CoverageSummary) -> Vec<ThresholdViolation> {
        self.scope(GLOBAL_SCOPE)
            .map(|thresholds| evaluate(GLOBAL_SCOPE, summary, thresholds))
            .unwrap_or_default()
    }
}

/// How a threshold was violated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// Coverage percentage below the required minimum
    Percentage {
        /// Actual coverage percentage
        actual: f64,
        /// Required minimum percentage
        required: f64,
    },
    /// More uncovered units than allowed
    UncoveredCount {
        /// Actual uncovered units
        actual: u64,
        /// Maximum allowed uncovered units
        ceiling: u64,
    },
}

/// A single failed threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdViolation {
    /// Scope the threshold belongs to
    pub scope: String,
    /// Metric that failed
    pub metric: Metric,
    /// Actual versus required values
    pub kind: ViolationKind,
}

impl ThresholdViolation {
    /// Human-readable message naming the metric and both numbers
    #[must_use]
    pub fn message(&self) -> String {
        match self.kind {
            ViolationKind::Percentage { actual, required } => format!(
                "\"{}\" coverage threshold for {} ({}%) not met: {}%",
                self.scope, self.metric, required, actual
            ),
            ViolationKind::UncoveredCount { actual, ceiling } => format!(
                "\"{}\" uncovered count for {} ({}) exceeds maximum allowed ({})",
                self.scope, self.metric, actual, ceiling
            ),
        }
    }
}

impl fmt::Display for ThresholdViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Evaluate one scope's thresholds against a summary
///
/// Returns one violation per failing metric, in canonical metric order.
#[must_use]
pub fn evaluate(
    scope: &str,
    summary: &CoverageSummary,
    thresholds: &MetricThresholds,
) -> Vec<ThresholdViolation> {
    Metric::ALL
        .iter()
        .filter_map(|&metric| {
            let threshold = thresholds.get(metric)?;
            check_metric(summary, metric, threshold).map(|kind| ThresholdViolation {
                scope: scope.to_string(),
                metric,
                kind,
            })
        })
        .collect()
}

fn check_metric(summary: &CoverageSummary, metric: Metric, threshold: f64) -> Option<ViolationKind> {
    if !threshold.is_finite() {
        warn!(%metric, threshold, "ignoring non-finite coverage threshold");
        return None;
    }
    let actual = summary.metric(metric);

    if threshold >= 0.0 {
        (actual.pct < threshold).then_some(ViolationKind::Percentage {
            actual: actual.pct,
            required: threshold,
        })
    } else {
        let ceiling = (-threshold).floor() as u64;
        let uncovered = actual.uncovered();
        (uncovered > ceiling).then_some(ViolationKind::UncoveredCount {
            actual: uncovered,
            ceiling,
        })
    }
}
