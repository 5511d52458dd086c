//! LCOV Report Formatter
//!
//! Generates LCOV-format coverage reports for CI integration.
//!
//! ## LCOV Format
//!
//! ```text
//! TN:<test name>
//! SF:<source file>
//! FN:<line>,<function name>
//! FNDA:<execution count>,<function name>
//! FNF:<functions found>
//! FNH:<functions hit>
//! BRDA:<line>,<block>,<branch>,<taken>
//! BRF:<branches found>
//! BRH:<branches hit>
//! DA:<line>,<execution count>
//! LF:<lines found>
//! LH:<lines hit>
//! end_of_record
//! ```

use super::{write_artifact, ReportWriter};
use crate::coverage::{CoverageModel, FileCoverage};
use crate::result::GateResult;
use std::fmt::Write;
use std::path::Path;

/// LCOV format report generator
#[derive(Debug)]
pub struct LcovFormatter<'a> {
    model: &'a CoverageModel,
    test_name: Option<String>,
}

impl<'a> LcovFormatter<'a> {
    /// Create a new LCOV formatter from coverage data
    #[must_use]
    pub fn new(model: &'a CoverageModel) -> Self {
        Self {
            model,
            test_name: None,
        }
    }

    /// Set the test name for the report
    #[must_use]
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }

    /// Generate LCOV format report as a string
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        for file in self.model.files() {
            match self.test_name {
                Some(ref name) => {
                    let _ = writeln!(output, "TN:{name}");
                }
                None => output.push_str("TN:\n"),
            }
            Self::write_record(&mut output, file);
        }

        output
    }

    /// Save the LCOV report to a file, creating missing parent directories
    ///
    /// # Errors
    ///
    /// Returns error if file write fails
    pub fn save(&self, path: &Path) -> GateResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let file_name = path.file_name().unwrap_or(path.as_os_str());
        write_artifact(dir, file_name, &self.generate())
    }

    fn write_record(output: &mut String, file: &FileCoverage) {
        let _ = writeln!(output, "SF:{}", file.path);

        // Functions (FN, FNDA)
        for meta in file.fn_map.values() {
            let _ = writeln!(output, "FN:{},{}", meta.decl.start.line, meta.name);
        }
        let mut functions_hit = 0;
        for (id, meta) in &file.fn_map {
            let count = file.f.get(id).copied().unwrap_or(0);
            let _ = writeln!(output, "FNDA:{count},{}", meta.name);
            if count > 0 {
                functions_hit += 1;
            }
        }
        let _ = writeln!(output, "FNF:{}", file.fn_map.len());
        let _ = writeln!(output, "FNH:{functions_hit}");

        // Branches (BRDA)
        let mut branches_found = 0;
        let mut branches_hit = 0;
        for (id, meta) in &file.branch_map {
            let arms = file.b.get(id).map(Vec::as_slice).unwrap_or_default();
            for (arm, count) in arms.iter().enumerate() {
                let _ = writeln!(output, "BRDA:{},{id},{arm},{count}", meta.loc.start.line);
                branches_found += 1;
                if *count > 0 {
                    branches_hit += 1;
                }
            }
        }
        let _ = writeln!(output, "BRF:{branches_found}");
        let _ = writeln!(output, "BRH:{branches_hit}");

        // Line data (DA)
        let lines = file.line_hits();
        let mut lines_hit = 0;
        for (line, count) in &lines {
            let _ = writeln!(output, "DA:{line},{count}");
            if *count > 0 {
                lines_hit += 1;
            }
        }
        let _ = writeln!(output, "LF:{}", lines.len());
        let _ = writeln!(output, "LH:{lines_hit}");

        output.push_str("end_of_record\n");
    }
}

/// Writes `lcov.info`
#[derive(Debug, Clone, Default)]
pub struct LcovWriter {
    test_name: Option<String>,
}

impl LcovWriter {
    /// Create a writer with an empty test name
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the test name emitted in `TN:` records
    #[must_use]
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }
}

impl ReportWriter for LcovWriter {
    fn name(&self) -> &str {
        "lcov"
    }

    fn write(&self, dir: &Path, model: &CoverageModel) -> GateResult<()> {
        let mut formatter = LcovFormatter::new(model);
        if let Some(ref name) = self.test_name {
            formatter = formatter.with_test_name(name.clone());
        }
        formatter.save(&dir.join("lcov.info"))
    }
}
