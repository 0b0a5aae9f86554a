//! Aggregated metric views over a build trace, and the canonical dictionary
//! shape the external emitters consume.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::duration::Duration;

/// Metrics for a single compilation unit, in trace input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub file_path: String,
    pub compile_time_ms: f64,
    pub include_count: usize,
    pub template_instantiation_count: usize,
    pub lines_of_code: usize,
    pub include_depth: usize,
    pub is_header: bool,
    pub includers: Vec<String>,
}

impl FileMetrics {
    pub fn to_dict(&self) -> Value {
        json!({
            "file_path": self.file_path,
            "compile_time_ms": self.compile_time_ms,
            "include_count": self.include_count,
            "template_instantiation_count": self.template_instantiation_count,
            "lines_of_code": self.lines_of_code,
            "include_depth": self.include_depth,
            "is_header": self.is_header,
            "includers": self.includers,
        })
    }
}

/// A header and how many times it was included across the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCount {
    pub path: String,
    pub count: usize,
}

/// A header and its summed include time in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTime {
    pub path: String,
    pub time_ms: f64,
}

/// A template name and its summed instantiation count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCount {
    pub name: String,
    pub count: u64,
}

/// A template name and its summed instantiation time in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameTime {
    pub name: String,
    pub time_ms: f64,
}

/// Include metrics folded across all units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludeMetrics {
    pub total_includes: usize,
    pub unique_includes: usize,
    pub max_depth: usize,
    pub total_include_time: Duration,
    /// Top-K by occurrence count, descending; ties alphabetical on path.
    pub most_included: Vec<PathCount>,
    /// Top-K by summed include time, descending; ties alphabetical on path.
    pub slowest_includes: Vec<PathTime>,
}

impl IncludeMetrics {
    pub fn to_dict(&self) -> Value {
        json!({
            "total_includes": self.total_includes,
            "unique_includes": self.unique_includes,
            "max_depth": self.max_depth,
            "total_include_time_ms": self.total_include_time.as_millis_f64(),
            "most_included": self.most_included
                .iter()
                .map(|e| json!({"path": e.path, "count": e.count}))
                .collect::<Vec<_>>(),
            "slowest_includes": self.slowest_includes
                .iter()
                .map(|e| json!({"path": e.path, "time_ms": e.time_ms}))
                .collect::<Vec<_>>(),
        })
    }
}

/// Template instantiation metrics folded across all units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateMetrics {
    pub total_instantiations: u64,
    /// Distinct `(template_name, specialization)` pairs after merging.
    pub unique_templates: usize,
    pub total_template_time: Duration,
    /// Keyed on template name only, summed across specializations.
    pub most_instantiated: Vec<NameCount>,
    pub slowest_templates: Vec<NameTime>,
}

impl TemplateMetrics {
    pub fn to_dict(&self) -> Value {
        json!({
            "total_instantiations": self.total_instantiations,
            "unique_templates": self.unique_templates,
            "total_template_time_ms": self.total_template_time.as_millis_f64(),
            "most_instantiated": self.most_instantiated
                .iter()
                .map(|e| json!({"name": e.name, "count": e.count}))
                .collect::<Vec<_>>(),
            "slowest_templates": self.slowest_templates
                .iter()
                .map(|e| json!({"name": e.name, "time_ms": e.time_ms}))
                .collect::<Vec<_>>(),
        })
    }
}

/// Symbol totals across all units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetrics {
    pub total_symbols: usize,
    pub inline_symbols: usize,
    pub template_symbols: usize,
    pub total_symbol_size: u64,
}

impl SymbolMetrics {
    pub fn to_dict(&self) -> Value {
        json!({
            "total_symbols": self.total_symbols,
            "inline_symbols": self.inline_symbols,
            "template_symbols": self.template_symbols,
            "total_symbol_size": self.total_symbol_size,
        })
    }
}

/// Dependency-graph metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyMetrics {
    /// Deduplicated includer -> included edges.
    pub total_dependencies: usize,
    /// SCCs of size > 1, i.e. genuine include cycles.
    pub circular_dependencies: usize,
    pub max_dependency_depth: usize,
    /// Total SCC count, singletons included.
    pub strongly_connected_components: usize,
}

impl DependencyMetrics {
    pub fn to_dict(&self) -> Value {
        json!({
            "total_dependencies": self.total_dependencies,
            "circular_dependencies": self.circular_dependencies,
            "max_dependency_depth": self.max_dependency_depth,
            "strongly_connected_components": self.strongly_connected_components,
        })
    }
}

/// Complete analysis result. Owns every metric collection; never mutated
/// after the aggregator returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_metrics: Vec<FileMetrics>,
    pub include_metrics: IncludeMetrics,
    pub template_metrics: TemplateMetrics,
    pub symbol_metrics: SymbolMetrics,
    pub dependency_metrics: DependencyMetrics,
    pub total_compile_time: Duration,
    pub file_count: usize,
}

impl AnalysisResult {
    /// Canonical dictionary view for JSON export.
    pub fn to_dict(&self) -> Value {
        json!({
            "bha_version": env!("CARGO_PKG_VERSION"),
            "summary": {
                "total_compile_time_ms": self.total_compile_time.as_millis_f64(),
                "file_count": self.file_count,
            },
            "file_metrics": self.file_metrics.iter().map(FileMetrics::to_dict).collect::<Vec<_>>(),
            "include_metrics": self.include_metrics.to_dict(),
            "template_metrics": self.template_metrics.to_dict(),
            "symbol_metrics": self.symbol_metrics.to_dict(),
            "dependency_metrics": self.dependency_metrics.to_dict(),
        })
    }
}
