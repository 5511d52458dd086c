//! Per-File Coverage Schema
//!
//! Explicit schema for the counters a single source file carries. Field names
//! follow the `coverage-final.json` layout so payloads from common JavaScript and
//! Rust tooling decode without an adapter:
//!
//! ```text
//! {
//!   "path": "/abs/src/lib.rs",
//!   "statementMap": { "0": { "start": {..}, "end": {..} } },   "s": { "0": 3 },
//!   "fnMap":        { "0": { "name": .., "decl": .., "loc": .. } }, "f": { "0": 1 },
//!   "branchMap":    { "0": { "type": "if", "locations": [..] } },   "b": { "0": [1, 0] }
//! }
//! ```
//!
//! Every counter must have a map entry and vice versa; [`FileCoverage::validate`]
//! enforces that at the decode boundary.

use super::{CoverageSummary, Metric, MetricSummary};
use crate::result::{GateError, GateResult};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// A line/column position in a source file (1-based lines)
///
/// Both fields default so the empty `{}` written for an implicit `else` arm decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0 when unknown)
    #[serde(default)]
    pub line: u32,
    /// Column number (absent for some end positions)
    #[serde(default)]
    pub column: Option<u32>,
}

impl Position {
    /// Create a position
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self {
            line,
            column: Some(column),
        }
    }
}

/// A source span
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Range {
    /// Start of the span
    pub start: Position,
    /// End of the span
    pub end: Position,
}

impl Range {
    /// Create a span from start and end positions
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Span covering whole lines
    #[must_use]
    pub const fn lines(start: u32, end: u32) -> Self {
        Self {
            start: Position::new(start, 0),
            end: Position::new(end, 0),
        }
    }
}

/// Function declaration metadata
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionMeta {
    /// Function name
    pub name: String,
    /// Span of the declaration (signature)
    pub decl: Range,
    /// Span of the whole function
    pub loc: Range,
    /// Line of the declaration
    #[serde(default)]
    pub line: u32,
}

/// Branch point metadata
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchMeta {
    /// Branch kind (e.g. "if", "match")
    #[serde(rename = "type")]
    pub kind: String,
    /// Span of the whole branching construct
    #[serde(default)]
    pub loc: Range,
    /// One span per arm
    pub locations: Vec<Range>,
    /// Line of the construct
    #[serde(default)]
    pub line: u32,
}

/// Coverage counters for a single source file
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Absolute file path
    pub path: String,
    /// Statement spans by id
    #[serde(rename = "statementMap")]
    pub statement_map: BTreeMap<u32, Range>,
    /// Function metadata by id
    #[serde(rename = "fnMap")]
    pub fn_map: BTreeMap<u32, FunctionMeta>,
    /// Branch metadata by id
    #[serde(rename = "branchMap")]
    pub branch_map: BTreeMap<u32, BranchMeta>,
    /// Statement hit counts
    pub s: BTreeMap<u32, u64>,
    /// Function hit counts
    pub f: BTreeMap<u32, u64>,
    /// Branch arm hit counts
    pub b: BTreeMap<u32, Vec<u64>>,
}

impl FileCoverage {
    /// Create an empty record for a path
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Register a statement and return its id
    pub fn add_statement(&mut self, range: Range, hits: u64) -> u32 {
        let id = next_id(&self.statement_map);
        let _ = self.statement_map.insert(id, range);
        let _ = self.s.insert(id, hits);
        id
    }

    /// Register a function and return its id
    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        decl: Range,
        loc: Range,
        hits: u64,
    ) -> u32 {
        let id = next_id(&self.fn_map);
        let meta = FunctionMeta {
            name: name.into(),
            decl,
            loc,
            line: decl.start.line,
        };
        let _ = self.fn_map.insert(id, meta);
        let _ = self.f.insert(id, hits);
        id
    }

    /// Register a branch point and return its id
    ///
    /// `hits` is padded with zeros (or truncated) to one counter per location.
    pub fn add_branch(
        &mut self,
        kind: impl Into<String>,
        loc: Range,
        locations: Vec<Range>,
        mut hits: Vec<u64>,
    ) -> u32 {
        let id = next_id(&self.branch_map);
        hits.resize(locations.len(), 0);
        let meta = BranchMeta {
            kind: kind.into(),
            loc,
            locations,
            line: loc.start.line,
        };
        let _ = self.branch_map.insert(id, meta);
        let _ = self.b.insert(id, hits);
        id
    }

    /// Check structural consistency between maps and counters
    ///
    /// # Errors
    ///
    /// Returns [`GateError::MergeDecode`] naming the first inconsistency found.
    pub fn validate(&self) -> GateResult<()> {
        if self.path.is_empty() {
            return Err(GateError::merge_decode("file coverage has an empty path"));
        }
        check_keys(&self.path, "statement", &self.statement_map, &self.s)?;
        check_keys(&self.path, "function", &self.fn_map, &self.f)?;
        check_keys(&self.path, "branch", &self.branch_map, &self.b)?;

        for (id, meta) in &self.branch_map {
            let arms = self.b.get(id).map_or(0, Vec::len);
            if arms != meta.locations.len() {
                return Err(GateError::merge_decode(format!(
                    "{}: branch {id} has {arms} counters but {} locations",
                    self.path,
                    meta.locations.len()
                )));
            }
        }
        Ok(())
    }

    /// Add another record's counters into this one
    ///
    /// Hit counts are summed unit-wise. Units only the other record knows are
    /// adopted together with their map entries.
    ///
    /// When both records describe the same id differently, the result does not
    /// depend on merge order: the smallest span or metadata wins, and for branches
    /// the description with the most arms wins before that.
    pub fn merge(&mut self, other: &Self) {
        resolve(&mut self.statement_map, &other.statement_map, |a, b| a < b);
        resolve(&mut self.fn_map, &other.fn_map, |a, b| a < b);
        resolve(&mut self.branch_map, &other.branch_map, |a, b| {
            (Reverse(a.locations.len()), a) < (Reverse(b.locations.len()), b)
        });

        for (id, hits) in &other.s {
            let slot = self.s.entry(*id).or_insert(0);
            *slot = slot.saturating_add(*hits);
        }
        for (id, hits) in &other.f {
            let slot = self.f.entry(*id).or_insert(0);
            *slot = slot.saturating_add(*hits);
        }
        for (id, arms) in &other.b {
            let slot = self.b.entry(*id).or_default();
            if slot.len() < arms.len() {
                slot.resize(arms.len(), 0);
            }
            for (mine, theirs) in slot.iter_mut().zip(arms) {
                *mine = mine.saturating_add(*theirs);
            }
        }
    }

    /// Hit count per line
    ///
    /// A statement counts towards the line it starts on; a line shared by several
    /// statements reports the highest count among them.
    #[must_use]
    pub fn line_hits(&self) -> BTreeMap<u32, u64> {
        let mut lines = BTreeMap::new();
        for (id, range) in &self.statement_map {
            let hits = self.s.get(id).copied().unwrap_or(0);
            let slot = lines.entry(range.start.line).or_insert(0);
            if hits > *slot {
                *slot = hits;
            }
        }
        lines
    }

    /// Lines that start a statement but were never executed
    #[must_use]
    pub fn uncovered_lines(&self) -> Vec<u32> {
        self.line_hits()
            .into_iter()
            .filter(|(_, hits)| *hits == 0)
            .map(|(line, _)| line)
            .collect()
    }

    /// Check whether any unit in this record was executed
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.s.values().any(|&h| h > 0)
            || self.f.values().any(|&h| h > 0)
            || self.b.values().flatten().any(|&h| h > 0)
    }

    /// Compute the per-metric summary for this file
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        let mut summary = CoverageSummary::new();

        summary.set_metric(Metric::Statements, counted(self.s.values()));
        summary.set_metric(Metric::Functions, counted(self.f.values()));
        summary.set_metric(Metric::Branches, counted(self.b.values().flatten()));
        summary.set_metric(Metric::Lines, counted(self.line_hits().values()));

        summary
    }
}

/// Summary over a set of hit counters
fn counted<'a>(hits: impl Iterator<Item = &'a u64>) -> MetricSummary {
    let (total, covered) = hits.fold((0u64, 0u64), |(total, covered), &h| {
        (total + 1, covered + u64::from(h > 0))
    });
    MetricSummary::new(total, covered)
}

/// Fold another map's entries into `mine`; `prefer(incoming, existing)` picks the keeper
fn resolve<V: Clone>(
    mine: &mut BTreeMap<u32, V>,
    theirs: &BTreeMap<u32, V>,
    prefer: impl Fn(&V, &V) -> bool,
) {
    for (id, incoming) in theirs {
        match mine.get_mut(id) {
            Some(existing) => {
                if prefer(incoming, existing) {
                    existing.clone_from(incoming);
                }
            }
            None => {
                let _ = mine.insert(*id, incoming.clone());
            }
        }
    }
}

/// Next free id in a map (one past the largest)
fn next_id<V>(map: &BTreeMap<u32, V>) -> u32 {
    map.keys().next_back().map_or(0, |last| last + 1)
}

/// Map and counter keys must be identical
fn check_keys<A, B>(
    path: &str,
    unit: &str,
    map: &BTreeMap<u32, A>,
    counters: &BTreeMap<u32, B>,
) -> GateResult<()> {
    let declared: BTreeSet<u32> = map.keys().copied().collect();
    let counted: BTreeSet<u32> = counters.keys().copied().collect();

    if let Some(id) = counted.difference(&declared).next() {
        return Err(GateError::merge_decode(format!(
            "{path}: {unit} counter {id} has no map entry"
        )));
    }
    if let Some(id) = declared.difference(&counted).next() {
        return Err(GateError::merge_decode(format!(
            "{path}: {unit} {id} has no counter"
        )));
    }
    Ok(())
}
