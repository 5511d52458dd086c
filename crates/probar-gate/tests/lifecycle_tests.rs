//! End-to-end run lifecycle tests
//!
//! Each test builds a throwaway project on disk, feeds per-test coverage through
//! the reporter hooks, and checks artifacts, reconciliation and the gate decision.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::float_cmp)]

use probar_gate::coverage::Range;
use probar_gate::{
    CoverageHooks, CoverageMap, CoverageOptions, CoverageReporter, CoverageSink,
    DirectoryModuleIndex, FileCoverage, GateError, Metric, MetricThresholds, RunContext,
    StaticModuleIndex, ThresholdPolicy, TestFileResult, ViolationKind,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LIB_RS: &str = "pub fn double(x: u32) -> u32 {
    let y = x * 2;
    y
}
";

const UNTESTED_RS: &str = "pub fn pick(flag: bool) -> u8 {
    if flag {
        return 1;
    }
    0
}
";

/// Project layout:
///
/// ```text
/// src/lib.rs          exercised by tests
/// src/untested.rs     never loaded
/// src/gen/table.rs    excluded by a negated glob
/// README.md           out of scope
/// ```
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src/gen")).unwrap();
    fs::write(root.join("src/lib.rs"), LIB_RS).unwrap();
    fs::write(root.join("src/untested.rs"), UNTESTED_RS).unwrap();
    fs::write(root.join("src/gen/table.rs"), "pub const T: u8 = 0;\n").unwrap();
    fs::write(root.join("README.md"), "# demo\n").unwrap();
    dir
}

/// Coverage a test run would report for `src/lib.rs`
fn lib_coverage(root: &Path, hits: u64) -> serde_json::Value {
    let path = root.join("src/lib.rs");
    let mut file = FileCoverage::new(path.to_string_lossy());
    let _ = file.add_function("double", Range::lines(1, 1), Range::lines(1, 4), hits);
    let _ = file.add_statement(Range::lines(2, 2), hits);
    let _ = file.add_statement(Range::lines(3, 3), hits);
    serde_json::to_value(CoverageMap::from(file)).unwrap()
}

fn options(root: &Path) -> CoverageOptions {
    CoverageOptions::new(root).with_collect_coverage_from(["src/**/*.rs", "!src/gen/**"])
}

fn run(reporter: &mut CoverageReporter, options: &CoverageOptions) -> probar_gate::RunOutcome {
    let index = DirectoryModuleIndex::new(&options.root_dir);
    reporter.on_run_complete(options, &RunContext::new(&index))
}

// ============================================================================
// Reconciliation
// ============================================================================

#[test]
fn test_untested_files_count_as_uncovered() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();
    reporter.on_file_complete(
        &TestFileResult::new(root.join("tests/double.rs")).with_coverage(lib_coverage(root, 1)),
    );

    let outcome = run(&mut reporter, &options(root));

    assert_eq!(outcome.reconcile.added, vec![root.join("src/untested.rs")]);
    assert!(outcome.reconcile.skipped.is_empty());
    // lib.rs: 2 covered; untested.rs: if, return, tail `0`
    assert_eq!(outcome.summary.statements.total, 5);
    assert_eq!(outcome.summary.statements.covered, 2);
    assert_eq!(outcome.summary.functions.total, 2);
    assert_eq!(outcome.summary.branches.total, 2);
    assert_eq!(outcome.summary.branches.covered, 0);
}

#[test]
fn test_tested_file_is_not_overwritten() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();
    reporter.on_file_complete(&TestFileResult::new("t1").with_coverage(lib_coverage(root, 3)));

    let outcome = run(&mut reporter, &options(root).with_coverage_reporters(["json"]));

    let written = fs::read_to_string(root.join("coverage/coverage-final.json")).unwrap();
    let map = CoverageMap::from_json_str(&written).unwrap();
    let lib = map
        .files()
        .find(|f| f.path.ends_with("lib.rs"))
        .expect("lib.rs in report");
    assert_eq!(lib.s.values().copied().collect::<Vec<_>>(), vec![3, 3]);
    assert!(!outcome.reconcile.added.contains(&root.join("src/lib.rs")));
}

#[test]
fn test_without_patterns_nothing_is_reconciled() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();

    let outcome = run(&mut reporter, &CoverageOptions::new(root));

    assert!(outcome.reconcile.is_empty());
    assert_eq!(outcome.summary.statements.total, 0);
    assert_eq!(outcome.summary.statements.pct, 100.0);
}

#[test]
fn test_unreadable_file_is_skipped_not_fatal() {
    let dir = project();
    let root = dir.path();
    fs::write(root.join("src/binary.rs"), [0xff, 0xfe, 0x00]).unwrap();
    let mut reporter = CoverageReporter::new();

    let outcome = run(&mut reporter, &options(root));

    assert_eq!(outcome.reconcile.skipped.len(), 1);
    assert_eq!(outcome.reconcile.skipped[0].0, root.join("src/binary.rs"));
    assert_eq!(outcome.reconcile.added.len(), 2);
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.contains("Failed to collect coverage from")));
}

// ============================================================================
// Report writers
// ============================================================================

#[test]
fn test_default_reporters_write_artifacts() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();
    reporter.on_file_complete(&TestFileResult::new("t1").with_coverage(lib_coverage(root, 1)));

    let outcome = run(&mut reporter, &options(root));

    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let out = root.join("coverage");
    assert!(out.join("coverage-final.json").exists());
    assert!(out.join("coverage-summary.txt").exists());
    let lcov = fs::read_to_string(out.join("lcov.info")).unwrap();
    assert_eq!(lcov.matches("end_of_record").count(), 2);
    assert!(lcov.contains("FNDA:1,double"));
}

#[test]
fn test_json_summary_has_total_and_files() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();
    reporter.on_file_complete(&TestFileResult::new("t1").with_coverage(lib_coverage(root, 1)));

    let _ = run(
        &mut reporter,
        &options(root).with_coverage_reporters(["json-summary"]),
    );

    let raw = fs::read_to_string(root.join("coverage/coverage-summary.json")).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(summary["total"]["statements"]["total"], 5);
    let lib_key = root.join("src/lib.rs").to_string_lossy().into_owned();
    assert_eq!(summary[lib_key.as_str()]["statements"]["pct"], 100.0);
}

#[test]
fn test_writer_failure_does_not_block_thresholds() {
    let dir = project();
    let root = dir.path();
    // A plain file where the coverage directory should go
    let blocked = root.join("blocked");
    fs::write(&blocked, "").unwrap();
    let mut reporter = CoverageReporter::new();
    reporter.on_file_complete(&TestFileResult::new("t1").with_coverage(lib_coverage(root, 0)));

    let options = options(root)
        .with_coverage_directory(&blocked)
        .with_coverage_reporters(["json", "lcov"])
        .with_coverage_threshold(ThresholdPolicy::global(
            MetricThresholds::new().with_functions(50.0),
        ));
    let outcome = run(&mut reporter, &options);

    assert_eq!(outcome.diagnostics.len(), 2);
    assert!(outcome.diagnostics[0].contains("Report writer 'json' failed"));
    assert!(outcome.failed());
    assert_eq!(outcome.violations[0].metric, Metric::Functions);
}

#[test]
fn test_unknown_reporter_is_a_diagnostic() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();

    let outcome = run(
        &mut reporter,
        &options(root).with_coverage_reporters(["clover", "json"]),
    );

    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(outcome.diagnostics[0].contains("clover"));
    assert!(root.join("coverage/coverage-final.json").exists());
    assert!(!outcome.failed());
}

// ============================================================================
// Threshold gate
// ============================================================================

#[test]
fn test_percentage_threshold_fails_run() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();
    reporter.on_file_complete(&TestFileResult::new("t1").with_coverage(lib_coverage(root, 1)));

    let options = options(root).with_coverage_threshold(ThresholdPolicy::global(
        MetricThresholds::new()
            .with_statements(80.0)
            .with_lines(10.0),
    ));
    let outcome = run(&mut reporter, &options);

    assert_eq!(outcome.violations.len(), 1);
    assert_eq!(
        outcome.violations[0].kind,
        ViolationKind::Percentage {
            actual: 40.0,
            required: 80.0
        }
    );
    assert_eq!(
        outcome.violations[0].to_string(),
        "\"global\" coverage threshold for statements (80%) not met: 40%"
    );
    let Some(GateError::ThresholdsNotMet { violations }) = reporter.last_error() else {
        panic!("expected ThresholdsNotMet");
    };
    assert_eq!(violations, &outcome.violations);
}

#[test]
fn test_uncovered_count_threshold() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();

    // Both branch arms of untested.rs are uncovered
    let strict = options(root).with_coverage_threshold(ThresholdPolicy::global(
        MetricThresholds::new().with_branches(-1.0),
    ));
    let outcome = run(&mut reporter, &strict);
    assert_eq!(
        outcome.violations[0].kind,
        ViolationKind::UncoveredCount {
            actual: 2,
            ceiling: 1
        }
    );

    let lenient = options(root).with_coverage_threshold(ThresholdPolicy::global(
        MetricThresholds::new().with_branches(-2.0),
    ));
    let outcome = run(&mut reporter, &lenient);
    assert!(!outcome.failed());
    assert!(reporter.last_error().is_none());
}

#[test]
fn test_violations_follow_metric_order() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();

    let options = options(root).with_coverage_threshold(ThresholdPolicy::global(
        MetricThresholds::new()
            .with_functions(100.0)
            .with_lines(100.0)
            .with_branches(100.0)
            .with_statements(100.0),
    ));
    let outcome = run(&mut reporter, &options);

    let metrics: Vec<Metric> = outcome.violations.iter().map(|v| v.metric).collect();
    assert_eq!(metrics, Metric::ALL.to_vec());
}

#[test]
fn test_config_file_drives_the_run() {
    let dir = project();
    let root = dir.path();
    let config = root.join("coverage.yml");
    fs::write(
        &config,
        "collectCoverageFrom: ['src/**/*.rs', '!src/gen/**']\n\
         coverageReporters: [lcov]\n\
         coverageThreshold:\n  global:\n    functions: 100\n  ./src/gen/:\n    lines: 0\n",
    )
    .unwrap();

    let options = CoverageOptions::load(&config).unwrap();
    let mut reporter = CoverageReporter::new();
    reporter.on_file_complete(&TestFileResult::new("t1").with_coverage(lib_coverage(root, 1)));
    let outcome = run(&mut reporter, &options);

    assert!(root.join("coverage/lcov.info").exists());
    assert!(!root.join("coverage/coverage-final.json").exists());
    assert_eq!(outcome.violations.len(), 1);
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.contains("./src/gen/")));
}

// ============================================================================
// Decode boundary and run isolation
// ============================================================================

#[test]
fn test_malformed_payload_is_discarded() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();
    let mut bad = lib_coverage(root, 5);
    let key = root.join("src/lib.rs").to_string_lossy().into_owned();
    bad[key.as_str()]["s"]["9"] = serde_json::json!(1);

    reporter.on_file_complete(&TestFileResult::new("bad").with_coverage(bad));
    reporter.on_file_complete(&TestFileResult::new("good").with_coverage(lib_coverage(root, 1)));
    let outcome = run(&mut reporter, &CoverageOptions::new(root));

    assert_eq!(outcome.summary.statements.covered, 2);
    assert_eq!(outcome.summary.functions.total, 1);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(outcome.diagnostics[0].starts_with("bad"));
}

#[test]
fn test_runs_do_not_share_state() {
    let dir = project();
    let root = dir.path();
    let mut reporter = CoverageReporter::new();
    reporter.on_file_complete(&TestFileResult::new("t1").with_coverage(lib_coverage(root, 1)));
    let first = run(&mut reporter, &CoverageOptions::new(root));
    let second = run(&mut reporter, &CoverageOptions::new(root));

    assert_eq!(first.summary.statements.total, 2);
    assert_eq!(second.summary.statements.total, 0);
}

#[test]
fn test_static_index_with_relative_paths() {
    let dir = project();
    let root = dir.path();
    let index = StaticModuleIndex::new([
        PathBuf::from("src/untested.rs"),
        PathBuf::from("README.md"),
    ]);
    let mut reporter = CoverageReporter::new();

    let outcome = reporter.on_run_complete(&options(root), &RunContext::new(&index));

    assert_eq!(outcome.reconcile.added, vec![root.join("src/untested.rs")]);
}

#[test]
fn test_parallel_workers_feed_one_reporter() {
    let dir = project();
    let root = dir.path().to_path_buf();
    let sink = CoverageSink::new();

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let sink = sink.clone();
            let root = root.clone();
            let _ = scope.spawn(move || {
                let payload = lib_coverage(&root, 1);
                sink.submit(&TestFileResult::new(format!("t{worker}")).with_coverage(payload));
            });
        }
    });

    let mut reporter = CoverageReporter::new();
    reporter.absorb(&sink);
    let outcome = run(&mut reporter, &CoverageOptions::new(&root));

    let lib = reporter.model().file(&root.join("src/lib.rs").to_string_lossy());
    assert!(lib.is_none(), "model is discarded after the run");
    assert_eq!(outcome.summary.functions.covered, 1);
    assert_eq!(outcome.summary.statements.total, 2);
}
