use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pyprune::analysis::{analyze_project, AnalyzeOptions, ProjectAnalysis};
use pyprune::edit::apply_edits;
use pyprune::export::{export_to_string, ExportFormat, ReportData};

#[derive(Parser)]
#[command(name = "pyprune")]
#[command(version = "0.1.0")]
#[command(about = "Python unused-import analyzer with safe removal edit planning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze Python files and report unused imports
    Analyze {
        /// File or directory to analyze (defaults to current directory)
        #[arg(short, long, default_value = ".")]
        path: String,

        /// Output format: text, json, or markdown
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Apply the removal edits to the files in place
        #[arg(long)]
        fix: bool,

        /// Import names that are never removed (comma separated)
        #[arg(long, value_delimiter = ',')]
        exempt: Vec<String>,
    },
    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Analyze {
            path,
            format,
            fix,
            exempt,
        }) => {
            let options = AnalyzeOptions {
                exempt_names: exempt.iter().cloned().collect::<HashSet<_>>(),
            };
            let project = analyze_project(Path::new(path), &options)
                .with_context(|| format!("Failed to analyze {}", path))?;

            if *fix {
                apply_fixes(&project, &options)?;
            }

            match format.as_str() {
                "text" => print_text_report(&project),
                _ => {
                    let export_format: ExportFormat =
                        format.parse().map_err(anyhow::Error::msg)?;
                    let report = ReportData::from_project(&project);
                    print!("{}", export_to_string(export_format, &report)?);
                }
            }
        }
        Some(Commands::Version) => {
            println!("pyprune v{}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            println!("pyprune - Python unused-import analyzer");
            println!("Run 'pyprune analyze' to scan for unused imports");
            println!("Run 'pyprune --help' for more information");
        }
    }

    Ok(())
}

fn print_text_report(project: &ProjectAnalysis) {
    for file in &project.files {
        for usage in file.analysis.unused() {
            println!(
                "{}:{}: `{}` imported but unused (from {})",
                file.path, usage.binding.position.line, usage.binding.bound_name,
                usage.binding.origin_module
            );
        }
        if let Some(plan) = &file.analysis.edit_plan {
            for warning in &plan.warnings {
                println!("{}: warning: {}", file.path, warning.message);
            }
        }
    }

    println!(
        "\n{} unused import(s) across {} file(s)",
        project.total_unused(),
        project.files.len()
    );
}

/// Rewrite each file from its edit plan. Files whose plan was suppressed
/// (incomplete positions) are left untouched.
fn apply_fixes(project: &ProjectAnalysis, options: &AnalyzeOptions) -> Result<()> {
    let mut fixed = 0;

    for file in &project.files {
        let Some(plan) = &file.analysis.edit_plan else {
            eprintln!("Warning: Skipping fix for {} (incomplete positions)", file.path);
            continue;
        };
        if plan.is_empty() {
            continue;
        }

        let path = Path::new(&file.path);
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", file.path))?;

        // the plan was produced for exactly this text; re-check to be safe
        let analysis = pyprune::analysis::analyze_with_options(&source, options)?;
        if let Some(plan) = analysis.edit_plan {
            let cleaned = apply_edits(&source, &plan);
            if cleaned != source {
                fs::write(path, cleaned)
                    .with_context(|| format!("Failed to write {}", file.path))?;
                fixed += 1;
            }
        }
    }

    println!("Fixed {} file(s)", fixed);
    Ok(())
}
