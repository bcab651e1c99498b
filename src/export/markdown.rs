//! Markdown export implementation.
//!
//! Exports unused-import analysis results in Markdown format for
//! documentation and reporting.

use std::io::{self, Write};

use super::{Exporter, ReportData};

/// Markdown exporter implementation.
pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn export<W: Write>(&self, data: &ReportData, writer: &mut W) -> io::Result<()> {
        // Title
        writeln!(writer, "# Unused Import Report")?;
        writeln!(writer)?;

        // Summary section
        writeln!(writer, "## Summary")?;
        writeln!(writer)?;
        writeln!(writer, "| Metric | Count |")?;
        writeln!(writer, "|--------|-------|")?;
        writeln!(writer, "| Files Analyzed | {} |", data.files.len())?;
        writeln!(writer, "| Files With Unused Imports | {} |", data.files_with_unused())?;
        writeln!(writer, "| Total Unused Imports | {} |", data.total_unused())?;
        writeln!(writer)?;

        // Per-file sections
        let flagged: Vec<_> = data.files.iter().filter(|f| !f.unused.is_empty()).collect();

        if flagged.is_empty() {
            writeln!(writer, "No unused imports found.")?;
            return Ok(());
        }

        writeln!(writer, "## Files")?;
        writeln!(writer)?;

        for file in flagged {
            writeln!(writer, "### {}", file.path)?;
            writeln!(writer)?;
            writeln!(writer, "| Name | Module | Line |")?;
            writeln!(writer, "|------|--------|------|")?;
            for unused in &file.unused {
                writeln!(
                    writer,
                    "| {} | {} | {} |",
                    unused.name, unused.module, unused.line
                )?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}
