//! Coverage Model for Probar Gate
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  PROBAR GATE COVERAGE MODEL                                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  JSON payload → CoverageMap (validated) → CoverageModel::merge  │
//! │                                               ↓                  │
//! │  untested source → CoverageSynthesizer → add_file_coverage      │
//! │                                               ↓                  │
//! │                                     CoverageSummary (4 metrics) │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Toyota Way Principles Applied
//!
//! - **Poka-Yoke**: Explicit schema validated at the merge boundary
//! - **Jidoka**: Malformed payloads are rejected, never trusted

mod file;
mod map;
mod summary;
mod synth;

pub use file::{BranchMeta, FileCoverage, FunctionMeta, Position, Range};
pub use map::{CoverageMap, CoverageModel};
pub use summary::{percent, CoverageSummary, Metric, MetricSummary};
pub use synth::{CoverageSynthesizer, DefaultSynthesizer, LineSynthesizer, RustSourceSynthesizer};
