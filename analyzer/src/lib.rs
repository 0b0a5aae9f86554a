//! BHA - build hotspot analyzer.
//!
//! Parses compiler-emitted build traces (clang `-ftime-trace` Chrome-trace
//! JSON), folds them into aggregate include/template/symbol/dependency
//! metrics, and derives ranked compile-time optimization suggestions.
//!
//! The pipeline is pure and deterministic: raw trace bytes -> parser ->
//! [`CompilationUnit`] -> aggregator -> [`AnalysisResult`] -> suggester ->
//! ranked [`Suggestion`] list. Parsing performs the only I/O; everything
//! downstream is a function of its inputs.
//!
//! ```no_run
//! use bha::Analyzer;
//!
//! let mut analyzer = Analyzer::new();
//! analyzer.add_trace_file("build/main.json")?;
//! analyzer.analyze()?;
//! for suggestion in analyzer.suggestions()? {
//!     println!("{}: {}", suggestion.priority, suggestion.title);
//! }
//! # anyhow::Ok(())
//! ```

pub mod cli;
pub mod models;
pub mod services;

use anyhow::{bail, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::warn;

// Public exports for library consumers.
pub use models::duration::Duration;
pub use models::error::{ParseFailure, TraceError, TraceErrorKind};
pub use models::metrics::{
    AnalysisResult, DependencyMetrics, FileMetrics, IncludeMetrics, SymbolMetrics, TemplateMetrics,
};
pub use models::suggestion::{CodeChange, Confidence, Priority, Suggestion, SuggestionType};
pub use models::trace::{
    BuildTrace, CompilationUnit, CompilerType, IncludeInfo, SymbolInfo, TemplateInstantiation,
};
pub use services::aggregator::{run_full_analysis, AnalysisOptions};
pub use services::exporter::{export_to_string, ExportFormat, ExportOptions};
pub use services::suggester::{generate_suggestions, SuggesterOptions};
pub use services::trace_parser::{parse_trace_bytes, parse_trace_file};

enum TraceInput {
    File(PathBuf),
    Content(String),
}

/// High-level interface over the analysis pipeline.
///
/// Accumulates trace files and raw trace content, then parses everything in
/// one deterministic pass. Per-file parse failures are collected, not fatal:
/// the analysis proceeds with the units that parsed and
/// [`Analyzer::parse_failures`] reports the rest.
#[derive(Default)]
pub struct Analyzer {
    inputs: Vec<TraceInput>,
    analysis_options: AnalysisOptions,
    suggester_options: SuggesterOptions,
    trace: Option<BuildTrace>,
    result: Option<AnalysisResult>,
    suggestions: Option<Vec<Suggestion>>,
    failures: Vec<ParseFailure>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(analysis: AnalysisOptions, suggester: SuggesterOptions) -> Self {
        Analyzer {
            analysis_options: analysis,
            suggester_options: suggester,
            ..Analyzer::default()
        }
    }

    /// Queue a trace file, verifying eagerly that it exists.
    pub fn add_trace_file(&mut self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TraceError::NotFound {
                path: path.to_path_buf(),
            });
        }
        self.inputs.push(TraceInput::File(path.to_path_buf()));
        Ok(())
    }

    /// Queue a trace file without the existence check; a missing file shows
    /// up later as a collected parse failure.
    pub fn add_trace_path(&mut self, path: impl Into<PathBuf>) {
        self.inputs.push(TraceInput::File(path.into()));
    }

    /// Queue raw trace content (e.g. `-ftime-trace` JSON held in memory).
    pub fn add_trace_content(&mut self, content: impl Into<String>) {
        self.inputs.push(TraceInput::Content(content.into()));
    }

    /// Parse every queued input and fold the surviving units into metrics.
    ///
    /// Parsing runs in parallel but units are fed to the aggregator in the
    /// order the inputs were added, keeping results reproducible.
    pub fn analyze(&mut self) -> Result<&AnalysisResult> {
        if self.inputs.is_empty() {
            bail!("no trace files or content added");
        }

        let parsed: Vec<Result<CompilationUnit, (PathBuf, TraceError)>> = self
            .inputs
            .par_iter()
            .map(|input| match input {
                TraceInput::File(path) => {
                    parse_trace_file(path).map_err(|err| (path.clone(), err))
                }
                TraceInput::Content(content) => {
                    parse_trace_bytes(content.as_bytes(), "<content>")
                        .map_err(|err| (PathBuf::from("<content>"), err))
                }
            })
            .collect();

        let mut trace = BuildTrace::new();
        self.failures.clear();
        for item in parsed {
            match item {
                Ok(unit) => trace.add_unit(unit),
                Err((path, error)) => {
                    warn!(path = %path.display(), error = %error, "skipping unparseable trace");
                    self.failures.push(ParseFailure { path, error });
                }
            }
        }

        let result = run_full_analysis(&trace, &self.analysis_options);
        self.trace = Some(trace);
        self.suggestions = None;
        Ok(self.result.insert(result))
    }

    /// Inputs that failed to parse during the last [`Analyzer::analyze`] run.
    pub fn parse_failures(&self) -> &[ParseFailure] {
        &self.failures
    }

    /// Ranked suggestions for the last analysis. Requires
    /// [`Analyzer::analyze`] to have run.
    pub fn suggestions(&mut self) -> Result<&[Suggestion]> {
        let (Some(trace), Some(result)) = (&self.trace, &self.result) else {
            bail!("analyze() must run before suggestions()");
        };
        if self.suggestions.is_none() {
            self.suggestions = Some(generate_suggestions(
                trace,
                result,
                &self.suggester_options,
            ));
        }
        Ok(self.suggestions.as_deref().unwrap_or_default())
    }

    /// Render the last analysis in the requested format.
    pub fn export(&self, format: ExportFormat, options: &ExportOptions) -> Result<String> {
        let Some(result) = &self.result else {
            bail!("analyze() must run before export()");
        };
        let suggestions = self.suggestions.as_deref().unwrap_or(&[]);
        export_to_string(result, suggestions, format, options)
    }
}

/// Analyze a single trace file with default options.
pub fn analyze_trace(path: impl AsRef<Path>) -> Result<AnalysisResult> {
    let mut analyzer = Analyzer::new();
    analyzer.add_trace_file(path)?;
    Ok(analyzer.analyze()?.clone())
}

/// Analyze several trace files with default options, with partial-progress
/// semantics for unparseable inputs.
pub fn analyze_traces(paths: &[PathBuf]) -> Result<AnalysisResult> {
    let mut analyzer = Analyzer::new();
    for path in paths {
        analyzer.add_trace_file(path)?;
    }
    Ok(analyzer.analyze()?.clone())
}
