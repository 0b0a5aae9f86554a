//! Folds compilation units into an [`AnalysisResult`].
//!
//! Every fold is a deterministic function of the unit order the caller
//! provides: accumulation runs over hash maps for speed, but each Top-K
//! selection re-sorts with a total ordering (metric descending, key
//! ascending) before truncating, so results are bit-identical across runs.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::models::duration::Duration;
use crate::models::metrics::{
    AnalysisResult, FileMetrics, IncludeMetrics, NameCount, NameTime, PathCount, PathTime,
    SymbolMetrics, TemplateMetrics,
};
use crate::models::trace::{is_header_path, normalize_header_path, BuildTrace};
use crate::services::dependency_graph::IncludeGraph;

/// Options for a full analysis pass.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Length cap for the most/slowest lists.
    pub top_k: usize,
    pub include_symbols: bool,
    /// When false, `FileMetrics.file_path` keeps the source path verbatim.
    pub normalize_paths: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            top_k: 10,
            include_symbols: true,
            normalize_paths: true,
        }
    }
}

/// Fold a build trace into aggregate metrics. Never fails; an empty trace
/// yields a result with all counts zero.
pub fn run_full_analysis(trace: &BuildTrace, options: &AnalysisOptions) -> AnalysisResult {
    let units = &trace.units;
    let graph = IncludeGraph::from_units(units);

    let mut file_metrics = Vec::with_capacity(units.len());
    let mut total_compile_time = Duration::ZERO;

    let mut include_counts: FxHashMap<String, usize> = FxHashMap::default();
    let mut include_times: FxHashMap<String, Duration> = FxHashMap::default();
    let mut total_includes = 0usize;
    let mut total_include_time = Duration::ZERO;

    // Instantiations merge on (name, specialization); the top lists then
    // re-key on the name alone, summed across specializations.
    let mut merged_templates: FxHashMap<(String, String), (u64, Duration)> = FxHashMap::default();
    let mut total_instantiations = 0u64;
    let mut total_template_time = Duration::ZERO;

    let mut symbol_metrics = SymbolMetrics::default();

    for unit in units {
        total_compile_time += unit.total_time;

        let normalized = normalize_header_path(&unit.source_file);
        let file_path = if options.normalize_paths {
            normalized.clone()
        } else {
            unit.source_file.clone()
        };
        file_metrics.push(FileMetrics {
            file_path,
            compile_time_ms: unit.total_time.as_millis_f64(),
            include_count: unit.includes.len(),
            template_instantiation_count: unit.templates.len(),
            lines_of_code: 0,
            include_depth: graph.depth_of(&normalized),
            is_header: is_header_path(&normalized),
            includers: graph.includers_of(&normalized),
        });

        for inc in &unit.includes {
            total_includes += 1;
            total_include_time += inc.include_time;
            *include_counts.entry(inc.header_path.clone()).or_default() += 1;
            *include_times.entry(inc.header_path.clone()).or_default() += inc.include_time;
        }

        for tmpl in &unit.templates {
            total_instantiations += u64::from(tmpl.instantiation_count);
            total_template_time += tmpl.instantiation_time;
            let entry = merged_templates
                .entry((tmpl.template_name.clone(), tmpl.specialization.clone()))
                .or_insert((0, Duration::ZERO));
            entry.0 += u64::from(tmpl.instantiation_count);
            entry.1 += tmpl.instantiation_time;
        }

        if options.include_symbols {
            for sym in &unit.symbols {
                symbol_metrics.total_symbols += 1;
                symbol_metrics.inline_symbols += usize::from(sym.is_inline);
                symbol_metrics.template_symbols += usize::from(sym.is_template);
                symbol_metrics.total_symbol_size += sym.size_bytes;
            }
        }
    }

    let mut name_counts: FxHashMap<String, u64> = FxHashMap::default();
    let mut name_times: FxHashMap<String, Duration> = FxHashMap::default();
    for ((name, _), (count, time)) in &merged_templates {
        *name_counts.entry(name.clone()).or_default() += count;
        *name_times.entry(name.clone()).or_default() += *time;
    }

    let include_metrics = IncludeMetrics {
        total_includes,
        unique_includes: include_counts.len(),
        max_depth: graph.max_depth(),
        total_include_time,
        most_included: top_k_entries(&include_counts, options.top_k)
            .into_iter()
            .map(|(path, count)| PathCount { path, count })
            .collect(),
        slowest_includes: top_k_entries(&include_times, options.top_k)
            .into_iter()
            .map(|(path, time)| PathTime {
                path,
                time_ms: time.as_millis_f64(),
            })
            .collect(),
    };

    let template_metrics = TemplateMetrics {
        total_instantiations,
        unique_templates: merged_templates.len(),
        total_template_time,
        most_instantiated: top_k_entries(&name_counts, options.top_k)
            .into_iter()
            .map(|(name, count)| NameCount { name, count })
            .collect(),
        slowest_templates: top_k_entries(&name_times, options.top_k)
            .into_iter()
            .map(|(name, time)| NameTime {
                name,
                time_ms: time.as_millis_f64(),
            })
            .collect(),
    };

    debug!(
        files = units.len(),
        includes = total_includes,
        instantiations = total_instantiations,
        "analysis complete"
    );

    AnalysisResult {
        file_metrics,
        include_metrics,
        template_metrics,
        symbol_metrics,
        dependency_metrics: graph.metrics(),
        total_compile_time,
        file_count: units.len(),
    }
}

/// Top-K by metric descending, key ascending on ties. The full sort keeps
/// the selection independent of map iteration order.
fn top_k_entries<V: Copy + Ord>(map: &FxHashMap<String, V>, k: usize) -> Vec<(String, V)> {
    let mut entries: Vec<(String, V)> = map.iter().map(|(key, &v)| (key.clone(), v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(k);
    entries
}
