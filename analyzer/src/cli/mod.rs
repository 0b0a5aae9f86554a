//! Command-line front-end. Thin by design: it discovers trace files, drives
//! the library pipeline, and writes the rendered report.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

use crate::models::suggestion::Priority;
use crate::services::aggregator::AnalysisOptions;
use crate::services::exporter::{ExportFormat, ExportOptions};
use crate::services::suggester::SuggesterOptions;
use crate::Analyzer;

#[derive(Parser)]
#[command(
    name = "bha",
    about = "Build hotspot analyzer for compiler time traces",
    version,
    long_about = None
)]
pub struct Cli {
    /// Enable verbose output (info level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Custom trace filter (overrides other flags)
    #[arg(long, global = true, env = "RUST_LOG")]
    pub trace_filter: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze trace files and emit a report
    #[command(visible_alias = "a")]
    Analyze {
        /// Trace files, or directories to scan for *.json traces
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Length cap for the most/slowest metric lists
        #[arg(long, default_value_t = 10)]
        top_k: usize,

        /// Skip suggestion generation
        #[arg(long)]
        no_suggestions: bool,

        /// Drop suggestions below this priority
        #[arg(long, value_enum, default_value = "low")]
        min_priority: Priority,

        /// Compact JSON output
        #[arg(long)]
        compact: bool,

        /// Distinct TUs a header needs to become a PCH candidate
        #[arg(long)]
        pch_min_includers: Option<usize>,

        /// Summed include time (ms) a header needs to become a PCH candidate
        #[arg(long)]
        pch_min_ms: Option<f64>,

        /// Compile time (ms) above which a TU counts as slow
        #[arg(long)]
        slow_tu_ms: Option<f64>,

        /// Instantiation count that marks a template as heavy
        #[arg(long)]
        heavy_tmpl_count: Option<u64>,

        /// Summed instantiation time (ms) that marks a template as heavy
        #[arg(long)]
        heavy_tmpl_ms: Option<f64>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            paths,
            format,
            output,
            top_k,
            no_suggestions,
            min_priority,
            compact,
            pch_min_includers,
            pch_min_ms,
            slow_tu_ms,
            heavy_tmpl_count,
            heavy_tmpl_ms,
        } => {
            let files = discover_trace_files(&paths)?;
            if files.is_empty() {
                bail!("no trace files found under the given paths");
            }
            debug!(count = files.len(), "trace files discovered");

            let mut suggester_options = SuggesterOptions::default();
            if let Some(v) = pch_min_includers {
                suggester_options.pch_min_includers = v;
            }
            if let Some(v) = pch_min_ms {
                suggester_options.pch_min_ms = v;
            }
            if let Some(v) = slow_tu_ms {
                suggester_options.slow_tu_ms = v;
            }
            if let Some(v) = heavy_tmpl_count {
                suggester_options.heavy_tmpl_count = v;
            }
            if let Some(v) = heavy_tmpl_ms {
                suggester_options.heavy_tmpl_ms = v;
            }

            let mut analyzer = Analyzer::with_options(
                AnalysisOptions {
                    top_k,
                    ..AnalysisOptions::default()
                },
                suggester_options,
            );
            for file in &files {
                // Discovery already established existence; late disappearance
                // is collected by analyze() like any other parse failure.
                analyzer.add_trace_path(file.clone());
            }

            let parsed_units = analyzer.analyze()?.file_count;
            for failure in analyzer.parse_failures() {
                eprintln!("warning: skipped {}: {}", failure.path.display(), failure.error);
            }
            if parsed_units == 0 {
                bail!("none of the {} trace files parsed", files.len());
            }
            if !no_suggestions {
                analyzer.suggestions()?;
            }

            let export_options = ExportOptions {
                pretty_print: !compact,
                include_suggestions: !no_suggestions,
                min_priority,
                ..ExportOptions::default()
            };
            let content = analyzer.export(format, &export_options)?;

            match output {
                Some(path) => fs::write(&path, content)
                    .with_context(|| format!("failed to write report to {}", path.display()))?,
                None => println!("{content}"),
            }
            Ok(())
        }
    }
}

/// Expand directory arguments into the `*.json` files below them, sorted for
/// a deterministic unit order. File arguments pass through untouched.
fn discover_trace_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}
