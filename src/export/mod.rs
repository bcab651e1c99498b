//! Export functionality for analysis results.
//!
//! This module provides exporters for outputting unused-import reports in
//! machine-readable (JSON) and documentation (Markdown) formats.

pub mod json;
pub mod markdown;

use std::io::{self, Write};

use crate::analysis::ProjectAnalysis;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON format - machine-readable, full data
    Json,
    /// Markdown format - documentation/reporting
    Markdown,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(format!(
                "Unknown export format: '{}'. Valid formats: json, markdown",
                s
            )),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// An unused import as it appears in a report.
#[derive(Debug, Clone)]
pub struct UnusedEntry {
    pub name: String,
    pub module: String,
    pub line: usize,
}

/// Report data for one analyzed file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    pub total_imports: usize,
    pub unused: Vec<UnusedEntry>,
}

/// Data container for export operations.
///
/// Holds the per-file results of a project analysis.
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    pub files: Vec<FileReport>,
}

impl ReportData {
    /// Create report data from project analysis results.
    pub fn from_project(project: &ProjectAnalysis) -> Self {
        let files = project
            .files
            .iter()
            .map(|file| FileReport {
                path: file.path.clone(),
                total_imports: file.analysis.usages.len(),
                unused: file
                    .analysis
                    .unused()
                    .map(|u| UnusedEntry {
                        name: u.binding.bound_name.clone(),
                        module: u.binding.origin_module.clone(),
                        line: u.binding.position.line,
                    })
                    .collect(),
            })
            .collect();

        Self { files }
    }

    /// Total unused imports across all files.
    pub fn total_unused(&self) -> usize {
        self.files.iter().map(|f| f.unused.len()).sum()
    }

    /// Number of files with at least one unused import.
    pub fn files_with_unused(&self) -> usize {
        self.files.iter().filter(|f| !f.unused.is_empty()).count()
    }
}

/// Trait for exporters.
pub trait Exporter {
    /// Export the data to the given writer.
    fn export<W: Write>(&self, data: &ReportData, writer: &mut W) -> io::Result<()>;
}

/// Export data in the specified format.
pub fn export<W: Write>(format: ExportFormat, data: &ReportData, writer: &mut W) -> io::Result<()> {
    match format {
        ExportFormat::Json => json::JsonExporter.export(data, writer),
        ExportFormat::Markdown => markdown::MarkdownExporter.export(data, writer),
    }
}

/// Export data to a string.
pub fn export_to_string(format: ExportFormat, data: &ReportData) -> io::Result<String> {
    let mut buffer = Vec::new();
    export(format, data, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
