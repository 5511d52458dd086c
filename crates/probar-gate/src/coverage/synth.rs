//! Zero-Coverage Synthesis for Untested Files
//!
//! Files in scope that no test executed still have to count against the totals.
//! A synthesizer reads the file's source and produces a structurally complete
//! [`FileCoverage`] with every counter at zero.
//!
//! - [`RustSourceSynthesizer`]: parses with `syn`; statements, functions, `if`/`match` branches
//! - [`LineSynthesizer`]: one statement per non-blank, non-comment line
//! - [`DefaultSynthesizer`]: picks one of the above by file extension

use super::{FileCoverage, Position, Range};
use crate::result::{GateError, GateResult};
use proc_macro2::Span;
use std::path::Path;
use syn::spanned::Spanned;
use syn::visit::Visit;

/// Builds zero-hit coverage records from source text
pub trait CoverageSynthesizer: Send + Sync {
    /// Produce a zero-coverage record for `path`
    ///
    /// # Errors
    ///
    /// Returns [`GateError::ReconcileRead`] if the source cannot be analyzed.
    fn synthesize(&self, path: &Path, source: &str) -> GateResult<FileCoverage>;
}

/// Synthesizer for Rust sources backed by `syn`
#[derive(Debug, Clone, Copy, Default)]
pub struct RustSourceSynthesizer;

impl RustSourceSynthesizer {
    /// Create a new synthesizer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CoverageSynthesizer for RustSourceSynthesizer {
    fn synthesize(&self, path: &Path, source: &str) -> GateResult<FileCoverage> {
        let file = syn::parse_file(source)
            .map_err(|e| GateError::reconcile_read(path, format!("parse error: {e}")))?;

        let mut visitor = SkeletonVisitor {
            coverage: FileCoverage::new(path.to_string_lossy()),
        };
        visitor.visit_file(&file);
        Ok(visitor.coverage)
    }
}

/// Walks a Rust AST and registers every countable unit with zero hits
struct SkeletonVisitor {
    coverage: FileCoverage,
}

impl SkeletonVisitor {
    fn add_function(&mut self, name: String, decl: Span, whole: Span) {
        let _ = self
            .coverage
            .add_function(name, span_range(decl), span_range(whole), 0);
    }
}

impl<'ast> Visit<'ast> for SkeletonVisitor {
    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.add_function(node.sig.ident.to_string(), node.sig.span(), node.span());
        syn::visit::visit_item_fn(self, node);
    }

    fn visit_impl_item_fn(&mut self, node: &'ast syn::ImplItemFn) {
        self.add_function(node.sig.ident.to_string(), node.sig.span(), node.span());
        syn::visit::visit_impl_item_fn(self, node);
    }

    fn visit_trait_item_fn(&mut self, node: &'ast syn::TraitItemFn) {
        // Only default methods have a body to execute
        if node.default.is_some() {
            self.add_function(node.sig.ident.to_string(), node.sig.span(), node.span());
        }
        syn::visit::visit_trait_item_fn(self, node);
    }

    fn visit_stmt(&mut self, node: &'ast syn::Stmt) {
        if !matches!(node, syn::Stmt::Item(_)) {
            let _ = self.coverage.add_statement(span_range(node.span()), 0);
        }
        syn::visit::visit_stmt(self, node);
    }

    fn visit_expr_if(&mut self, node: &'ast syn::ExprIf) {
        let then_arm = span_range(node.then_branch.span());
        let else_arm = node
            .else_branch
            .as_ref()
            .map_or_else(|| span_range(node.span()), |(_, expr)| span_range(expr.span()));
        let _ = self.coverage.add_branch(
            "if",
            span_range(node.span()),
            vec![then_arm, else_arm],
            Vec::new(),
        );
        syn::visit::visit_expr_if(self, node);
    }

    fn visit_expr_match(&mut self, node: &'ast syn::ExprMatch) {
        let arms: Vec<Range> = node.arms.iter().map(|arm| span_range(arm.span())).collect();
        if !arms.is_empty() {
            let _ = self
                .coverage
                .add_branch("match", span_range(node.span()), arms, Vec::new());
        }
        syn::visit::visit_expr_match(self, node);
    }
}

fn span_range(span: Span) -> Range {
    let start = span.start();
    let end = span.end();
    Range::new(
        Position::new(start.line as u32, start.column as u32),
        Position::new(end.line as u32, end.column as u32),
    )
}

/// Language-agnostic fallback: each non-blank, non-comment line is a statement
///
/// Block comments are not recognized.
#[derive(Debug, Clone)]
pub struct LineSynthesizer {
    comment_prefixes: Vec<String>,
}

impl LineSynthesizer {
    /// Create a synthesizer that skips `//` and `#` comment lines
    #[must_use]
    pub fn new() -> Self {
        Self {
            comment_prefixes: vec!["//".to_string(), "#".to_string()],
        }
    }

    /// Replace the comment prefixes
    #[must_use]
    pub fn with_comment_prefixes(mut self, prefixes: &[&str]) -> Self {
        self.comment_prefixes = prefixes.iter().map(|p| (*p).to_string()).collect();
        self
    }

    fn is_code(&self, line: &str) -> bool {
        let trimmed = line.trim();
        !trimmed.is_empty()
            && !self
                .comment_prefixes
                .iter()
                .any(|prefix| trimmed.starts_with(prefix.as_str()))
    }
}

impl Default for LineSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageSynthesizer for LineSynthesizer {
    fn synthesize(&self, path: &Path, source: &str) -> GateResult<FileCoverage> {
        let mut coverage = FileCoverage::new(path.to_string_lossy());
        for (idx, line) in source.lines().enumerate() {
            if self.is_code(line) {
                let number = idx as u32 + 1;
                let width = line.chars().count() as u32;
                let range = Range::new(Position::new(number, 0), Position::new(number, width));
                let _ = coverage.add_statement(range, 0);
            }
        }
        Ok(coverage)
    }
}

/// Dispatches `.rs` files to [`RustSourceSynthesizer`], everything else to
/// [`LineSynthesizer`]
#[derive(Debug, Clone, Default)]
pub struct DefaultSynthesizer {
    rust: RustSourceSynthesizer,
    fallback: LineSynthesizer,
}

impl DefaultSynthesizer {
    /// Create the default dispatcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CoverageSynthesizer for DefaultSynthesizer {
    fn synthesize(&self, path: &Path, source: &str) -> GateResult<FileCoverage> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("rs") => self.rust.synthesize(path, source),
            _ => self.fallback.synthesize(path, source),
        }
    }
}
