//! Coverage Report Writers
//!
//! Writers are looked up by name (`coverageReporters`) and each produces its
//! artifacts in the coverage directory:
//!
//! | name           | artifact                 |
//! |----------------|--------------------------|
//! | `json`         | `coverage-final.json`    |
//! | `json-summary` | `coverage-summary.json`  |
//! | `lcov`         | `lcov.info`              |
//! | `text-summary` | `coverage-summary.txt`   |
//!
//! A failing writer never stops the others.

mod json;
mod lcov;
mod text;

pub use json::{JsonSummaryWriter, JsonWriter};
pub use lcov::{LcovFormatter, LcovWriter};
pub use text::{TextSummaryFormatter, TextSummaryWriter};

use crate::coverage::CoverageModel;
use crate::result::{GateError, GateResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, error};

/// Writers enabled when no `coverageReporters` are configured
pub const DEFAULT_REPORTERS: &[&str] = &["json", "lcov", "text-summary"];

/// Serializes the coverage model into on-disk artifacts
pub trait ReportWriter: Send + Sync {
    /// Name used in `coverageReporters`
    fn name(&self) -> &str;

    /// Write artifacts for `model` into `dir`
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or file I/O fails.
    fn write(&self, dir: &Path, model: &CoverageModel) -> GateResult<()>;
}

/// Create `dir` if needed and write `contents` to `dir/file_name`
pub(crate) fn write_artifact(
    dir: &Path,
    file_name: impl AsRef<Path>,
    contents: &str,
) -> GateResult<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, contents)?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote coverage artifact");
    Ok(())
}

/// Report writers addressed by name
#[derive(Default)]
pub struct WriterRegistry {
    writers: BTreeMap<String, Box<dyn ReportWriter>>,
}

impl std::fmt::Debug for WriterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterRegistry")
            .field("writers", &self.names())
            .finish()
    }
}

impl WriterRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in writer
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(JsonWriter));
        registry.register(Box::new(JsonSummaryWriter));
        registry.register(Box::new(LcovWriter::new()));
        registry.register(Box::new(TextSummaryWriter));
        registry
    }

    /// Add a writer, replacing any writer with the same name
    pub fn register(&mut self, writer: Box<dyn ReportWriter>) {
        let _ = self.writers.insert(writer.name().to_string(), writer);
    }

    /// Check if a writer is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.writers.contains_key(name)
    }

    /// Registered writer names in order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.writers.keys().map(String::as_str).collect()
    }

    /// Run a single writer by name
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ReportWrite`] if the writer is unknown or fails.
    pub fn write(&self, name: &str, dir: &Path, model: &CoverageModel) -> GateResult<()> {
        let writer = self
            .writers
            .get(name)
            .ok_or_else(|| GateError::report_write(name, "unknown coverage reporter"))?;

        writer.write(dir, model).map_err(|e| match e {
            GateError::ReportWrite { .. } => e,
            other => GateError::report_write(name, other.to_string()),
        })
    }

    /// Run every named writer, collecting failures instead of stopping
    #[must_use]
    pub fn write_all(&self, names: &[String], dir: &Path, model: &CoverageModel) -> Vec<GateError> {
        names
            .iter()
            .filter_map(|name| {
                let err = self.write(name, dir, model).err()?;
                error!(writer = %name, dir = %dir.display(), error = %err, "coverage report failed");
                Some(err)
            })
            .collect()
    }
}
