//! Coverage Model: the accumulated per-file state for one run
//!
//! ```text
//! test file done ──► CoverageMap::from_json ──► CoverageModel::merge
//!                        (validate)                 (sum counters)
//! run done ─────────► Reconciler ──► add_file_coverage (zero-hit skeletons)
//!                     writers / thresholds ──► summary()
//! ```
//!
//! Merging sums hit counts, so the final summary does not depend on the order in
//! which test files finish.

use super::{CoverageSummary, FileCoverage};
use crate::result::{GateError, GateResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decoded per-test coverage payload: file path -> counters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageMap(BTreeMap<String, FileCoverage>);

impl CoverageMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and validate a JSON payload
    ///
    /// # Errors
    ///
    /// Returns [`GateError::MergeDecode`] if the payload does not match the schema,
    /// if a key disagrees with its record's path, or if a record is inconsistent.
    pub fn from_json(value: &serde_json::Value) -> GateResult<Self> {
        let map: Self = Self::deserialize(value)
            .map_err(|e| GateError::merge_decode(e.to_string()))?;
        map.validate()?;
        Ok(map)
    }

    /// Decode and validate a JSON string
    ///
    /// # Errors
    ///
    /// Same as [`CoverageMap::from_json`].
    pub fn from_json_str(json: &str) -> GateResult<Self> {
        let map: Self =
            serde_json::from_str(json).map_err(|e| GateError::merge_decode(e.to_string()))?;
        map.validate()?;
        Ok(map)
    }

    /// Check every record and its key
    ///
    /// # Errors
    ///
    /// Returns [`GateError::MergeDecode`] for the first inconsistent record.
    pub fn validate(&self) -> GateResult<()> {
        for (key, file) in &self.0 {
            if *key != file.path {
                return Err(GateError::merge_decode(format!(
                    "payload key {key} does not match record path {}",
                    file.path
                )));
            }
            file.validate()?;
        }
        Ok(())
    }

    /// Insert a record keyed by its own path
    pub fn insert(&mut self, file: FileCoverage) {
        let _ = self.0.insert(file.path.clone(), file);
    }

    /// Number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the map holds no files
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over records in path order
    pub fn files(&self) -> impl Iterator<Item = &FileCoverage> {
        self.0.values()
    }
}

impl From<FileCoverage> for CoverageMap {
    fn from(file: FileCoverage) -> Self {
        let mut map = Self::new();
        map.insert(file);
        map
    }
}

impl FromIterator<FileCoverage> for CoverageMap {
    fn from_iter<I: IntoIterator<Item = FileCoverage>>(iter: I) -> Self {
        let mut map = Self::new();
        for file in iter {
            map.insert(file);
        }
        map
    }
}

impl IntoIterator for CoverageMap {
    type Item = (String, FileCoverage);
    type IntoIter = std::collections::btree_map::IntoIter<String, FileCoverage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Accumulated coverage for a whole run
///
/// Owned by exactly one reporter; mutation needs `&mut`, which keeps merges
/// single-writer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageModel {
    files: BTreeMap<String, FileCoverage>,
}

impl CoverageModel {
    /// Create an empty model
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a partial payload into the model
    ///
    /// New files are inserted verbatim; known files have their counters summed.
    pub fn merge(&mut self, partial: CoverageMap) {
        for (path, incoming) in partial {
            match self.files.get_mut(&path) {
                Some(existing) => existing.merge(&incoming),
                None => {
                    let _ = self.files.insert(path, incoming);
                }
            }
        }
    }

    /// Insert a single record keyed by its path, replacing any existing entry
    pub fn add_file_coverage(&mut self, entry: FileCoverage) {
        if self.files.contains_key(&entry.path) {
            tracing::debug!(path = %entry.path, "replacing existing file coverage");
        }
        let _ = self.files.insert(entry.path.clone(), entry);
    }

    /// Recompute the aggregate summary across every file
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        let mut total = CoverageSummary::new();
        for file in self.files.values() {
            total.merge(&file.summary());
        }
        total
    }

    /// Per-file summaries in path order
    #[must_use]
    pub fn file_summaries(&self) -> Vec<(&str, CoverageSummary)> {
        self.files
            .values()
            .map(|file| (file.path.as_str(), file.summary()))
            .collect()
    }

    /// Check if a path is present
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Get the record for a path
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    /// Iterate over records in path order
    pub fn files(&self) -> impl Iterator<Item = &FileCoverage> {
        self.files.values()
    }

    /// Number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the model is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Convert the model into a payload-shaped map
    #[must_use]
    pub fn into_map(self) -> CoverageMap {
        self.files.into_values().collect()
    }
}
