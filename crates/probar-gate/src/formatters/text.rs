//! Text summary writer
//!
//! ```text
//! =============================== Coverage summary ===============================
//! Statements   : 70% ( 7/10 )
//! Branches     : 60% ( 6/10 )
//! Lines        : 75% ( 6/8 )
//! Functions    : 100% ( 2/2 )
//! ================================================================================
//! ```

use super::{write_artifact, ReportWriter};
use crate::coverage::{CoverageModel, CoverageSummary, Metric};
use crate::result::GateResult;
use std::fmt::Write;
use std::path::Path;
use tracing::info;

const WIDTH: usize = 80;
const TITLE: &str = " Coverage summary ";

/// Renders the four-line run summary
#[derive(Debug, Clone, Copy)]
pub struct TextSummaryFormatter<'a> {
    summary: &'a CoverageSummary,
}

impl<'a> TextSummaryFormatter<'a> {
    /// Create a formatter for a summary
    #[must_use]
    pub const fn new(summary: &'a CoverageSummary) -> Self {
        Self { summary }
    }

    /// One line per metric, in canonical order
    #[must_use]
    pub fn metric_lines(&self) -> Vec<String> {
        Metric::ALL
            .iter()
            .map(|&metric| {
                let m = self.summary.metric(metric);
                format!(
                    "{:<13}: {}% ( {}/{} )",
                    capitalize(metric.as_str()),
                    m.pct,
                    m.covered,
                    m.total
                )
            })
            .collect()
    }

    /// Full framed summary
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();
        let side = (WIDTH - TITLE.len()) / 2;
        let _ = writeln!(
            output,
            "{}{TITLE}{}",
            "=".repeat(side),
            "=".repeat(WIDTH - TITLE.len() - side)
        );
        for line in self.metric_lines() {
            let _ = writeln!(output, "{line}");
        }
        let _ = writeln!(output, "{}", "=".repeat(WIDTH));
        output
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Writes `coverage-summary.txt` and logs the summary
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSummaryWriter;

impl ReportWriter for TextSummaryWriter {
    fn name(&self) -> &str {
        "text-summary"
    }

    fn write(&self, dir: &Path, model: &CoverageModel) -> GateResult<()> {
        let summary = model.summary();
        let formatter = TextSummaryFormatter::new(&summary);
        for line in formatter.metric_lines() {
            info!("{line}");
        }
        write_artifact(dir, "coverage-summary.txt", &formatter.generate())
    }
}
