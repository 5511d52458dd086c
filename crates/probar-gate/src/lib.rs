//! Probar Gate: Coverage Aggregation and Threshold Enforcement
//!
//! Probar Gate sits at the end of a test run. It merges the coverage every test
//! file reports, registers in-scope files no test touched as fully uncovered,
//! writes reports, and fails the run when the configured thresholds are missed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PROBAR GATE Architecture                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Test File  │    │ Coverage   │    │ Reconciler │            │
//! │   │ Results    │───►│ Model      │◄───│ (untested  │            │
//! │   │ (JSON)     │    │ (merge)    │    │  files)    │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           │                                      │
//! │              ┌────────────┴────────────┐                         │
//! │              ▼                         ▼                         │
//! │       ┌────────────┐            ┌────────────┐                   │
//! │       │ Report     │            │ Threshold  │──► pass / fail    │
//! │       │ Writers    │            │ Evaluator  │                   │
//! │       └────────────┘            └────────────┘                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use probar_gate::{
//!     CoverageHooks, CoverageOptions, CoverageReporter, DirectoryModuleIndex, RunContext,
//!     TestFileResult,
//! };
//!
//! let options = CoverageOptions::new("/work/project")
//!     .with_collect_coverage_from(["src/**/*.rs"]);
//! let mut reporter = CoverageReporter::new();
//!
//! reporter.on_file_complete(&TestFileResult::new("tests/a.rs"));
//!
//! let index = DirectoryModuleIndex::new("/work/project");
//! let outcome = reporter.on_run_complete(&options, &RunContext::new(&index));
//! if outcome.failed() {
//!     std::process::exit(1);
//! }
//! ```

#![warn(missing_docs)]

/// Coverage schema, accumulated model, summaries and zero-coverage synthesis
pub mod coverage;

/// Coverage options (`collectCoverageFrom`, `coverageThreshold`, ...)
pub mod config;

/// Report writers (json, json-summary, lcov, text-summary)
pub mod formatters;

/// Tracing subscriber setup
pub mod logging;

/// Untested-file reconciliation
pub mod reconcile;

/// Run lifecycle hooks and the coverage reporter
pub mod reporter;

/// Threshold policy and evaluation
pub mod threshold;

mod result;

pub use config::CoverageOptions;
pub use coverage::{
    CoverageMap, CoverageModel, CoverageSummary, CoverageSynthesizer, FileCoverage, Metric,
    MetricSummary,
};
pub use formatters::{ReportWriter, WriterRegistry};
pub use reconcile::{
    DirectoryModuleIndex, GlobMatcher, ModuleIndex, PatternMatcher, Reconciler, SourceLoader,
    StaticModuleIndex,
};
pub use reporter::{
    CoverageHooks, CoverageReporter, CoverageSink, RunContext, RunOutcome, TestFileResult,
};
pub use result::{GateError, GateResult};
pub use threshold::{MetricThresholds, ThresholdPolicy, ThresholdViolation, ViolationKind};
