//! Coverage configuration
//!
//! Mirrors the coverage keys of a test-runner config file:
//!
//! ```yaml
//! rootDir: /work/project
//! collectCoverageFrom: ["src/**/*.rs", "!src/generated/**"]
//! coverageDirectory: target/coverage
//! coverageReporters: [json, lcov, text-summary]
//! coverageThreshold:
//!   global: { statements: 80, branches: -10 }
//! ```

use crate::formatters::DEFAULT_REPORTERS;
use crate::result::{GateError, GateResult};
use crate::threshold::ThresholdPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default coverage output directory, relative to the root
pub const DEFAULT_COVERAGE_DIRECTORY: &str = "coverage";

/// Coverage options consumed at run completion
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageOptions {
    /// Globs selecting the files that must appear in coverage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect_coverage_from: Option<Vec<String>>,
    /// Output directory for report artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_directory: Option<PathBuf>,
    /// Enabled report writer names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_reporters: Option<Vec<String>>,
    /// Threshold policy by scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_threshold: Option<ThresholdPolicy>,
    /// Root for relative path resolution
    #[serde(default)]
    pub root_dir: PathBuf,
}

impl CoverageOptions {
    /// Create options rooted at `root_dir`
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Parse options from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json_str(json: &str) -> GateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse options from YAML
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml_str(yaml: &str) -> GateResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load options from a `.json`, `.yaml` or `.yml` file
    ///
    /// A missing `rootDir` defaults to the directory containing the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unsupported
    /// extension, or fails to parse.
    pub fn load(path: &Path) -> GateResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut options = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            Some("yaml" | "yml") => Self::from_yaml_str(&content)?,
            _ => {
                return Err(GateError::config(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };
        if options.root_dir.as_os_str().is_empty() {
            options.root_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
        }
        Ok(options)
    }

    /// Set the in-scope globs
    #[must_use]
    pub fn with_collect_coverage_from<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collect_coverage_from = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the coverage directory
    #[must_use]
    pub fn with_coverage_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.coverage_directory = Some(dir.into());
        self
    }

    /// Set the enabled report writers
    #[must_use]
    pub fn with_coverage_reporters<I, S>(mut self, reporters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.coverage_reporters = Some(reporters.into_iter().map(Into::into).collect());
        self
    }

    /// Set the threshold policy
    #[must_use]
    pub fn with_coverage_threshold(mut self, policy: ThresholdPolicy) -> Self {
        self.coverage_threshold = Some(policy);
        self
    }

    /// Coverage directory resolved against the root
    #[must_use]
    pub fn resolved_coverage_directory(&self) -> PathBuf {
        match self.coverage_directory {
            Some(ref dir) if dir.is_absolute() => dir.clone(),
            Some(ref dir) => self.root_dir.join(dir),
            None => self.root_dir.join(DEFAULT_COVERAGE_DIRECTORY),
        }
    }

    /// Enabled report writers, falling back to the defaults
    #[must_use]
    pub fn reporters(&self) -> Vec<String> {
        self.coverage_reporters.clone().unwrap_or_else(|| {
            DEFAULT_REPORTERS
                .iter()
                .map(|name| (*name).to_string())
                .collect()
        })
    }

    /// In-scope globs, if any
    #[must_use]
    pub fn collect_patterns(&self) -> Option<&[String]> {
        self.collect_coverage_from.as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::Metric;
    use crate::threshold::GLOBAL_SCOPE;

    #[test]
    fn test_defaults() {
        let options = CoverageOptions::new("/proj");
        assert_eq!(
            options.resolved_coverage_directory(),
            PathBuf::from("/proj/coverage")
        );
        assert_eq!(options.reporters(), vec!["json", "lcov", "text-summary"]);
        assert!(options.collect_patterns().is_none());
        assert!(options.coverage_threshold.is_none());
    }

    #[test]
    fn test_relative_directory_resolves_against_root() {
        let options = CoverageOptions::new("/proj").with_coverage_directory("target/cov");
        assert_eq!(
            options.resolved_coverage_directory(),
            PathBuf::from("/proj/target/cov")
        );
    }

    #[test]
    fn test_absolute_directory_is_kept() {
        let options = CoverageOptions::new("/proj").with_coverage_directory("/tmp/cov");
        assert_eq!(
            options.resolved_coverage_directory(),
            PathBuf::from("/tmp/cov")
        );
    }

    #[test]
    fn test_from_json_camel_case_keys() {
        let options = CoverageOptions::from_json_str(
            r#"{
                "rootDir": "/proj",
                "collectCoverageFrom": ["src/**/*.rs", "!src/gen/**"],
                "coverageReporters": ["lcov"],
                "coverageThreshold": {"global": {"lines": 90, "branches": -4}}
            }"#,
        )
        .unwrap();

        assert_eq!(options.root_dir, PathBuf::from("/proj"));
        assert_eq!(options.collect_patterns().unwrap().len(), 2);
        assert_eq!(options.reporters(), vec!["lcov"]);
        let global = options
            .coverage_threshold
            .as_ref()
            .and_then(|p| p.scope(GLOBAL_SCOPE))
            .copied()
            .unwrap();
        assert_eq!(global.get(Metric::Lines), Some(90.0));
        assert_eq!(global.get(Metric::Branches), Some(-4.0));
    }

    #[test]
    fn test_from_yaml() {
        let options = CoverageOptions::from_yaml_str(
            "rootDir: /proj\ncoverageDirectory: out\ncoverageThreshold:\n  global:\n    statements: 75\n",
        )
        .unwrap();
        assert_eq!(options.resolved_coverage_directory(), PathBuf::from("/proj/out"));
        let global = options.coverage_threshold.unwrap();
        assert_eq!(
            global.scope(GLOBAL_SCOPE).unwrap().statements,
            Some(75.0)
        );
    }

    #[test]
    fn test_load_defaults_root_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.yml");
        std::fs::write(&path, "collectCoverageFrom: ['**/*.rs']\n").unwrap();

        let options = CoverageOptions::load(&path).unwrap();
        assert_eq!(options.root_dir, dir.path());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.toml");
        std::fs::write(&path, "").unwrap();

        let err = CoverageOptions::load(&path).unwrap_err();
        assert!(matches!(err, GateError::Config { .. }));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(
            CoverageOptions::from_json_str("{").unwrap_err(),
            GateError::Json(_)
        ));
    }
}
