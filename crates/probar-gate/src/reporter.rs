//! Coverage Reporter - run lifecycle orchestration
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  CoverageReporter (one per run)                                        │
//! │                                                                        │
//! │  on_file_complete ──► decode + validate ──► CoverageModel::merge       │
//! │        (×N, any order)        │ malformed: warn, drop, continue        │
//! │                                                                        │
//! │  on_run_complete                                                       │
//! │    1. Reconciler      untested files → zero coverage                   │
//! │    2. WriterRegistry  json / lcov / ... (failures logged, not fatal)   │
//! │    3. Thresholds      violations → terminal error (run fails)          │
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Toyota Principles Applied
//!
//! - **Jidoka**: A threshold miss stops the line after every violation is known
//! - **Andon**: Diagnostics are collected for the run report, never swallowed

use crate::config::CoverageOptions;
use crate::coverage::{
    CoverageMap, CoverageModel, CoverageSummary, CoverageSynthesizer, DefaultSynthesizer,
};
use crate::formatters::{ReportWriter, WriterRegistry};
use crate::reconcile::{
    FsSourceLoader, GlobMatcher, ModuleIndex, PatternMatcher, ReconcileOutcome, Reconciler,
    SourceLoader,
};
use crate::result::{GateError, GateResult};
use crate::threshold::ThresholdViolation;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Coverage produced by one completed test file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TestFileResult {
    /// Path of the test file that ran
    pub test_path: PathBuf,
    /// Raw coverage payload (absent when coverage collection is disabled)
    pub coverage: Option<serde_json::Value>,
}

impl TestFileResult {
    /// Result for a test file without coverage
    #[must_use]
    pub fn new(test_path: impl Into<PathBuf>) -> Self {
        Self {
            test_path: test_path.into(),
            coverage: None,
        }
    }

    /// Attach a coverage payload
    #[must_use]
    pub fn with_coverage(mut self, coverage: serde_json::Value) -> Self {
        self.coverage = Some(coverage);
        self
    }

    /// Decode the payload
    ///
    /// Returns `None` when there is nothing to merge (no payload, `null`, or an
    /// empty object).
    fn decode(&self) -> Option<GateResult<CoverageMap>> {
        match self.coverage {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Object(ref map)) if map.is_empty() => None,
            Some(ref value) => Some(CoverageMap::from_json(value)),
        }
    }
}

/// Collaborators available when the run completes
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    /// Every file the project knows about
    pub module_index: &'a dyn ModuleIndex,
}

impl std::fmt::Debug for RunContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext").finish_non_exhaustive()
    }
}

impl<'a> RunContext<'a> {
    /// Create a context
    #[must_use]
    pub fn new(module_index: &'a dyn ModuleIndex) -> Self {
        Self { module_index }
    }
}

/// Result of the run-completion phase
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Final aggregate summary (after reconciliation)
    pub summary: CoverageSummary,
    /// What reconciliation added or skipped
    pub reconcile: ReconcileOutcome,
    /// Threshold violations, in metric order
    pub violations: Vec<ThresholdViolation>,
    /// Non-fatal problems encountered during the run
    pub diagnostics: Vec<String>,
}

impl RunOutcome {
    /// Check if coverage fails the run
    #[must_use]
    pub fn failed(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Lifecycle hooks a test runner calls on its coverage reporter
pub trait CoverageHooks {
    /// Called once per completed test file; never fails
    fn on_file_complete(&mut self, result: &TestFileResult);

    /// Called once after every test file completed
    fn on_run_complete(
        &mut self,
        options: &CoverageOptions,
        context: &RunContext<'_>,
    ) -> RunOutcome;

    /// Terminal error of the last completed run, if it failed
    fn last_error(&self) -> Option<&GateError>;
}

/// Aggregates coverage for one run and enforces thresholds at the end
pub struct CoverageReporter {
    model: CoverageModel,
    writers: WriterRegistry,
    matcher: Box<dyn GlobMatcher>,
    loader: Box<dyn SourceLoader>,
    synthesizer: Box<dyn CoverageSynthesizer>,
    diagnostics: Vec<String>,
    last_error: Option<GateError>,
}

impl std::fmt::Debug for CoverageReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageReporter")
            .field("files", &self.model.len())
            .field("writers", &self.writers)
            .field("diagnostics", &self.diagnostics.len())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Default for CoverageReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageReporter {
    /// Reporter with the built-in writers and file-system collaborators
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: CoverageModel::new(),
            writers: WriterRegistry::with_defaults(),
            matcher: Box::new(PatternMatcher::new()),
            loader: Box::new(FsSourceLoader),
            synthesizer: Box::new(DefaultSynthesizer::new()),
            diagnostics: Vec::new(),
            last_error: None,
        }
    }

    /// Register an extra writer (replaces a built-in of the same name)
    #[must_use]
    pub fn with_writer(mut self, writer: Box<dyn ReportWriter>) -> Self {
        self.writers.register(writer);
        self
    }

    /// Replace the whole writer registry
    #[must_use]
    pub fn with_writers(mut self, writers: WriterRegistry) -> Self {
        self.writers = writers;
        self
    }

    /// Replace the glob matcher
    #[must_use]
    pub fn with_matcher(mut self, matcher: Box<dyn GlobMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Replace the source loader
    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn SourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the zero-coverage synthesizer
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: Box<dyn CoverageSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Current accumulated model
    #[must_use]
    pub fn model(&self) -> &CoverageModel {
        &self.model
    }

    /// Diagnostics recorded since the last run completed
    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Move everything collected by a sink into this reporter
    pub fn absorb(&mut self, sink: &CoverageSink) {
        let (model, diagnostics) = sink.drain();
        self.model.merge(model.into_map());
        self.diagnostics.extend(diagnostics);
    }

    fn record_diagnostic(&mut self, message: String) {
        self.diagnostics.push(message);
    }
}

impl CoverageHooks for CoverageReporter {
    fn on_file_complete(&mut self, result: &TestFileResult) {
        let Some(decoded) = result.decode() else {
            debug!(test = %result.test_path.display(), "no coverage recorded");
            return;
        };

        match decoded {
            Ok(partial) => {
                debug!(
                    test = %result.test_path.display(),
                    files = partial.len(),
                    "merging coverage"
                );
                self.model.merge(partial);
            }
            Err(e) => {
                warn!(
                    test = %result.test_path.display(),
                    error = %e,
                    "discarding malformed coverage"
                );
                self.record_diagnostic(format!("{}: {e}", result.test_path.display()));
            }
        }
    }

    fn on_run_complete(
        &mut self,
        options: &CoverageOptions,
        context: &RunContext<'_>,
    ) -> RunOutcome {
        self.last_error = None;
        let mut model = std::mem::take(&mut self.model);

        // 1. Untested files
        let reconcile = Reconciler::new(&*self.matcher, &*self.loader, &*self.synthesizer)
            .reconcile(
                options.collect_patterns(),
                &options.root_dir,
                context.module_index,
                &mut model,
            );
        for (_, reason) in &reconcile.skipped {
            self.record_diagnostic(reason.clone());
        }

        // 2. Reports
        let dir = options.resolved_coverage_directory();
        for failure in self.writers.write_all(&options.reporters(), &dir, &model) {
            self.record_diagnostic(failure.to_string());
        }

        // 3. Thresholds
        let summary = model.summary();
        let violations = match options.coverage_threshold {
            Some(ref policy) => {
                for scope in policy.unsupported_scopes() {
                    warn!(scope, "per-path coverage thresholds are not evaluated");
                    self.record_diagnostic(format!(
                        "coverage threshold scope \"{scope}\" ignored: only \"global\" is evaluated"
                    ));
                }
                let violations = policy.evaluate_global(&summary);
                if violations.is_empty() {
                    info!(files = model.len(), "coverage thresholds met");
                }
                violations
            }
            None => {
                debug!(files = model.len(), "no coverage thresholds configured");
                Vec::new()
            }
        };

        if !violations.is_empty() {
            for violation in &violations {
                error!(metric = %violation.metric, "{violation}");
            }
            self.last_error = Some(GateError::ThresholdsNotMet {
                violations: violations.clone(),
            });
        }

        RunOutcome {
            summary,
            reconcile,
            violations,
            diagnostics: std::mem::take(&mut self.diagnostics),
        }
    }

    fn last_error(&self) -> Option<&GateError> {
        self.last_error.as_ref()
    }
}

/// Thread-safe front for parallel workers
///
/// Every clone feeds the same model; merges are serialized by a mutex. Hand the
/// collected data to a [`CoverageReporter`] with [`CoverageReporter::absorb`].
#[derive(Debug, Clone, Default)]
pub struct CoverageSink {
    inner: Arc<Mutex<SinkState>>,
}

#[derive(Debug, Default)]
struct SinkState {
    model: CoverageModel,
    diagnostics: Vec<String>,
}

impl CoverageSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one test file's coverage; malformed payloads are logged and dropped
    pub fn submit(&self, result: &TestFileResult) {
        // Decode outside the lock
        let Some(decoded) = result.decode() else {
            return;
        };
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match decoded {
            Ok(partial) => state.model.merge(partial),
            Err(e) => {
                warn!(
                    test = %result.test_path.display(),
                    error = %e,
                    "discarding malformed coverage"
                );
                state
                    .diagnostics
                    .push(format!("{}: {e}", result.test_path.display()));
            }
        }
    }

    /// Number of files collected so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .model
            .len()
    }

    /// Check if nothing was collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the collected model and diagnostics, leaving the sink empty
    #[must_use]
    pub fn drain(&self) -> (CoverageModel, Vec<String>) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let drained = std::mem::take(&mut *guard);
        (drained.model, drained.diagnostics)
    }
}
