//! Import-usage analysis for Python source files.
//!
//! This module wires the analysis passes together: import extraction,
//! scope graph construction, reference collection, usage resolution, and
//! edit planning. One call to [`analyze`] covers a single source text;
//! [`analyze_project`] walks a directory tree the way the CLI does.
//!
//! # Features
//!
//! - One binding per imported name (plain, aliased, from-, star imports)
//! - Scope-aware resolution with shadowing and class-scope skipping
//! - References found in string type annotations and f-strings
//! - Re-export detection (`__all__`, redundant aliases)
//! - Minimal removal edits that preserve surrounding formatting
//!
//! # Example
//!
//! ```ignore
//! use pyprune::analysis::analyze;
//!
//! let analysis = analyze("import os\nimport sys\nprint(sys.argv)\n")?;
//! for usage in &analysis.usages {
//!     println!("{}: used={}", usage.binding.bound_name, usage.is_used);
//! }
//! ```

pub mod imports;
pub mod references;
pub mod scopes;
pub mod usage;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use thiserror::Error;
use walkdir::WalkDir;

use crate::edit::{plan_edits, EditPlan};
use crate::parser::{has_missing_nodes, ParseError, PythonParser};

// Re-export main types for convenience
pub use imports::{
    extract_imports, ImportBinding, ImportKind, ImportStatement, ImportTable, Position,
    StatementId,
};
pub use references::{collect_references, CollectedReferences, Reference, ReferenceContext};
pub use scopes::{build_scope_graph, BindingKind, ScopeGraph, ScopeId, ScopeKind};
pub use usage::{resolve_usage, UsageResult};

/// Errors that can occur during analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Non-fatal conditions attached to an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisWarning {
    /// Position metadata was incomplete (recovered parse); usages are
    /// reported but no edit plan was produced.
    PositionsIncomplete,
}

/// Caller-supplied configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Import names that are never planned for removal.
    pub exempt_names: HashSet<String>,
}

/// The result of analyzing one source text.
#[derive(Debug)]
pub struct Analysis {
    /// Usage verdict per import binding, in source order.
    pub usages: Vec<UsageResult>,
    /// Removal plan for the unused bindings; `None` when position metadata
    /// was too incomplete to anchor edits.
    pub edit_plan: Option<EditPlan>,
    pub warnings: Vec<AnalysisWarning>,
}

impl Analysis {
    /// Bindings reported unused, in source order.
    pub fn unused(&self) -> impl Iterator<Item = &UsageResult> {
        self.usages.iter().filter(|u| !u.is_used)
    }

    /// Number of bindings reported unused.
    pub fn unused_count(&self) -> usize {
        self.unused().count()
    }
}

/// Analyze one Python source text with default options.
pub fn analyze(source: &str) -> AnalysisResult<Analysis> {
    analyze_with_options(source, &AnalyzeOptions::default())
}

/// Analyze one Python source text.
///
/// Fails with a syntax error when the source is not well-formed; every
/// other condition is reported through the result itself.
pub fn analyze_with_options(source: &str, options: &AnalyzeOptions) -> AnalysisResult<Analysis> {
    let mut parser = PythonParser::new()?;
    let tree = parser.parse(source)?;
    let incomplete = has_missing_nodes(&tree);

    let table = extract_imports(&tree, source);
    let scopes = build_scope_graph(&tree, source, &table.bindings);
    let collected = collect_references(&tree, source);
    let usages = resolve_usage(&table, &scopes, &collected);

    let (edit_plan, warnings) = if incomplete {
        (None, vec![AnalysisWarning::PositionsIncomplete])
    } else {
        let plan = plan_edits(&table, &usages, source, &options.exempt_names);
        (Some(plan), Vec::new())
    };

    Ok(Analysis {
        usages,
        edit_plan,
        warnings,
    })
}

/// Analyze a single Python file from disk.
pub fn analyze_file(path: &Path, options: &AnalyzeOptions) -> AnalysisResult<Analysis> {
    if !is_python_file(path) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        return Err(AnalysisError::UnsupportedFileType(ext));
    }

    let source = fs::read_to_string(path)?;
    analyze_with_options(&source, options)
}

/// Analysis of one file within a project run.
#[derive(Debug)]
pub struct FileAnalysis {
    pub path: String,
    pub analysis: Analysis,
}

/// Results for every Python file under a root.
#[derive(Debug, Default)]
pub struct ProjectAnalysis {
    pub files: Vec<FileAnalysis>,
}

impl ProjectAnalysis {
    /// Total unused bindings across all files.
    pub fn total_unused(&self) -> usize {
        self.files.iter().map(|f| f.analysis.unused_count()).sum()
    }

    /// Number of files with at least one unused binding.
    pub fn files_with_unused(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.analysis.unused_count() > 0)
            .count()
    }
}

/// Analyze every Python file under a root path.
///
/// Each file is an independent run over its own source text; files that
/// fail to read or parse are reported and skipped.
pub fn analyze_project(root: &Path, options: &AnalyzeOptions) -> AnalysisResult<ProjectAnalysis> {
    let mut project = ProjectAnalysis::default();

    if root.is_file() {
        let analysis = analyze_file(root, options)?;
        project.files.push(FileAnalysis {
            path: root.display().to_string(),
            analysis,
        });
        return Ok(project);
    }

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e))
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_dir() || !is_python_file(path) {
            continue;
        }

        match analyze_file(path, options) {
            Ok(analysis) => {
                project.files.push(FileAnalysis {
                    path: path.display().to_string(),
                    analysis,
                });
            }
            Err(e) => {
                // Log error but continue with other files
                eprintln!("Warning: Failed to analyze {}: {}", path.display(), e);
            }
        }
    }

    Ok(project)
}

fn is_python_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("py") | Some("pyi")
    )
}

/// Check if a directory should be ignored during traversal.
fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }

    let name = entry.file_name().to_string_lossy();
    matches!(
        name.as_ref(),
        "__pycache__" | ".git" | ".venv" | "venv" | ".tox" | ".mypy_cache" | ".eggs" | "build"
            | "dist" | "site-packages" | "node_modules"
    )
}
