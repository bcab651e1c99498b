//! JSON export implementation.
//!
//! Exports unused-import analysis results in JSON format for
//! machine-readable output.

use std::io::{self, Write};

use serde::Serialize;

use super::{Exporter, ReportData};

/// JSON exporter implementation.
pub struct JsonExporter;

/// Serializable unused import for JSON output.
#[derive(Serialize)]
struct JsonUnusedImport {
    name: String,
    module: String,
    line: usize,
}

/// Serializable per-file entry for JSON output.
#[derive(Serialize)]
struct JsonFile {
    path: String,
    total_imports: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unused: Vec<JsonUnusedImport>,
}

/// Summary statistics for JSON output.
#[derive(Serialize)]
struct JsonSummary {
    files_analyzed: usize,
    files_with_unused: usize,
    total_unused: usize,
}

/// Root JSON export structure.
#[derive(Serialize)]
struct JsonExport {
    summary: JsonSummary,
    files: Vec<JsonFile>,
}

impl Exporter for JsonExporter {
    fn export<W: Write>(&self, data: &ReportData, writer: &mut W) -> io::Result<()> {
        let files: Vec<JsonFile> = data
            .files
            .iter()
            .map(|f| JsonFile {
                path: f.path.clone(),
                total_imports: f.total_imports,
                unused: f
                    .unused
                    .iter()
                    .map(|u| JsonUnusedImport {
                        name: u.name.clone(),
                        module: u.module.clone(),
                        line: u.line,
                    })
                    .collect(),
            })
            .collect();

        let export = JsonExport {
            summary: JsonSummary {
                files_analyzed: data.files.len(),
                files_with_unused: data.files_with_unused(),
                total_unused: data.total_unused(),
            },
            files,
        };

        let json = serde_json::to_string_pretty(&export)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(writer, "{}", json)
    }
}
