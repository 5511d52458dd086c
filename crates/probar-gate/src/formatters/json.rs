//! JSON writers: raw counters and summaries

use super::{write_artifact, ReportWriter};
use crate::coverage::{CoverageModel, CoverageSummary};
use crate::result::GateResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Writes the full model to `coverage-final.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWriter;

impl ReportWriter for JsonWriter {
    fn name(&self) -> &str {
        "json"
    }

    fn write(&self, dir: &Path, model: &CoverageModel) -> GateResult<()> {
        let json = serde_json::to_string(model)?;
        write_artifact(dir, "coverage-final.json", &json)
    }
}

/// Run total plus one summary per file
#[derive(Debug, Serialize)]
struct SummaryDocument<'a> {
    total: CoverageSummary,
    #[serde(flatten)]
    files: BTreeMap<&'a str, CoverageSummary>,
}

/// Writes per-file and total summaries to `coverage-summary.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSummaryWriter;

impl ReportWriter for JsonSummaryWriter {
    fn name(&self) -> &str {
        "json-summary"
    }

    fn write(&self, dir: &Path, model: &CoverageModel) -> GateResult<()> {
        let document = SummaryDocument {
            total: model.summary(),
            files: model.file_summaries().into_iter().collect(),
        };
        let json = serde_json::to_string_pretty(&document)?;
        write_artifact(dir, "coverage-summary.json", &json)
    }
}
