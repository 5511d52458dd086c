//! Untested-File Reconciliation
//!
//! Files matched by `collectCoverageFrom` that no test ever loaded are missing
//! from the model and would silently inflate the totals. The reconciler finds
//! them and registers zero-hit skeletons so they count as uncovered.
//!
//! ```text
//! ModuleIndex ──► relative paths ──► GlobMatcher ──► in-scope set
//!                                                        │
//!                          not in model? ◄───────────────┘
//!                               │
//!                SourceLoader ──► CoverageSynthesizer ──► add_file_coverage
//! ```
//!
//! A file that cannot be read or analyzed is skipped with a diagnostic; the rest
//! of the set is still reconciled.

use crate::coverage::{CoverageModel, CoverageSynthesizer, FileCoverage};
use crate::result::{GateError, GateResult};
use glob::{MatchOptions, Pattern};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directories never descended into by [`DirectoryModuleIndex`]
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "coverage"];

/// Source of every file path the project knows about
pub trait ModuleIndex {
    /// All known file paths (absolute, or relative to the root directory)
    fn files(&self) -> Vec<PathBuf>;
}

/// Matches relative paths against ordered glob patterns
pub trait GlobMatcher: Send + Sync {
    /// Return the subset of `paths` selected by `patterns`
    fn matches(&self, paths: &[String], patterns: &[String]) -> Vec<String>;
}

/// Reads source text for untested files
pub trait SourceLoader: Send + Sync {
    /// Read the file at `path`
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ReconcileRead`] if the file cannot be read.
    fn load(&self, path: &Path) -> GateResult<String>;
}

/// Module index over a fixed list of paths
#[derive(Debug, Clone, Default)]
pub struct StaticModuleIndex {
    files: Vec<PathBuf>,
}

impl StaticModuleIndex {
    /// Create an index from paths
    #[must_use]
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

impl ModuleIndex for StaticModuleIndex {
    fn files(&self) -> Vec<PathBuf> {
        self.files.clone()
    }
}

/// Module index that walks a directory tree
///
/// Hidden entries and build/output directories are skipped. Unreadable
/// directories are logged and ignored.
#[derive(Debug, Clone)]
pub struct DirectoryModuleIndex {
    root: PathBuf,
}

impl DirectoryModuleIndex {
    /// Create an index rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => {
                    if !SKIPPED_DIRS.contains(&&*name) {
                        Self::walk(&path, out);
                    }
                }
                Ok(kind) if kind.is_file() => out.push(path),
                _ => {}
            }
        }
    }
}

impl ModuleIndex for DirectoryModuleIndex {
    fn files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk(&self.root, &mut files);
        files.sort();
        files
    }
}

/// Ordered glob matcher backed by `glob::Pattern`
///
/// Patterns are applied in order: a plain pattern adds its matches to the
/// selection, a `!`-prefixed pattern removes its matches. `*` does not cross
/// `/`; use `**` for that.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternMatcher;

impl PatternMatcher {
    /// Create a matcher
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    const fn options() -> MatchOptions {
        MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        }
    }
}

impl GlobMatcher for PatternMatcher {
    fn matches(&self, paths: &[String], patterns: &[String]) -> Vec<String> {
        let mut selected = vec![false; paths.len()];

        for raw in patterns {
            let (negated, body) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw.as_str()),
            };
            let pattern = match Pattern::new(body) {
                Ok(pattern) => pattern,
                Err(e) => {
                    warn!(pattern = %raw, error = %e, "ignoring invalid coverage pattern");
                    continue;
                }
            };
            for (idx, path) in paths.iter().enumerate() {
                if pattern.matches_with(path, Self::options()) {
                    selected[idx] = !negated;
                }
            }
        }

        paths
            .iter()
            .zip(selected)
            .filter_map(|(path, keep)| keep.then(|| path.clone()))
            .collect()
    }
}

/// Reads sources from the file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceLoader;

impl SourceLoader for FsSourceLoader {
    fn load(&self, path: &Path) -> GateResult<String> {
        fs::read_to_string(path).map_err(|e| GateError::reconcile_read(path, e.to_string()))
    }
}

/// What a reconciliation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Files registered with zero coverage
    pub added: Vec<PathBuf>,
    /// Files that could not be synthesized, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

impl ReconcileOutcome {
    /// Check if nothing was added or skipped
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.skipped.is_empty()
    }
}

/// Fills the model with zero-coverage records for untested in-scope files
pub struct Reconciler<'a> {
    matcher: &'a dyn GlobMatcher,
    loader: &'a dyn SourceLoader,
    synthesizer: &'a dyn CoverageSynthesizer,
}

impl std::fmt::Debug for Reconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler from its collaborators
    #[must_use]
    pub fn new(
        matcher: &'a dyn GlobMatcher,
        loader: &'a dyn SourceLoader,
        synthesizer: &'a dyn CoverageSynthesizer,
    ) -> Self {
        Self {
            matcher,
            loader,
            synthesizer,
        }
    }

    /// Register every untested in-scope file in `model`
    ///
    /// No-op when `patterns` is absent or empty. Entries already in the model are
    /// never replaced.
    pub fn reconcile(
        &self,
        patterns: Option<&[String]>,
        root_dir: &Path,
        index: &dyn ModuleIndex,
        model: &mut CoverageModel,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let Some(patterns) = patterns.filter(|p| !p.is_empty()) else {
            return outcome;
        };

        // relative path -> absolute path, deduplicated and ordered
        let candidates: BTreeMap<String, PathBuf> = index
            .files()
            .into_iter()
            .map(|path| {
                let absolute = absolutize(root_dir, &path);
                (relative_to(root_dir, &absolute), absolute)
            })
            .collect();

        let relative: Vec<String> = candidates.keys().cloned().collect();
        let in_scope: BTreeSet<String> = self
            .matcher
            .matches(&relative, patterns)
            .into_iter()
            .collect();

        let untested: Vec<&PathBuf> = in_scope
            .iter()
            .filter_map(|rel| candidates.get(rel))
            .filter(|abs| !model.contains(&abs.to_string_lossy()))
            .collect();

        if untested.is_empty() {
            debug!(in_scope = in_scope.len(), "no untested files to reconcile");
            return outcome;
        }
        info!(count = untested.len(), "running coverage on untested files");

        for path in untested {
            match self.synthesize(path) {
                Ok(mut coverage) => {
                    coverage.path = path.to_string_lossy().into_owned();
                    debug!(path = %coverage.path, "registered zero coverage");
                    model.add_file_coverage(coverage);
                    outcome.added.push(path.clone());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to collect coverage");
                    outcome.skipped.push((path.clone(), e.to_string()));
                }
            }
        }

        outcome
    }

    fn synthesize(&self, path: &Path) -> GateResult<FileCoverage> {
        let source = self.loader.load(path)?;
        self.synthesizer.synthesize(path, &source)
    }
}

/// Join relative paths onto the root
fn absolutize(root_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root_dir.join(path)
    }
}

/// Path relative to the root with `/` separators; paths outside the root are kept whole
fn relative_to(root_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root_dir).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}
