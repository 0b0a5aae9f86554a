//! Suggestion rules.
//!
//! Each rule is a pure function over the build trace and its analysis
//! result. Rules emit zero or more candidate suggestions; the engine then
//! deduplicates on `(type, file_path, title)` keeping the higher estimated
//! impact, and sorts by priority descending, impact descending, title
//! ascending. Estimated impacts never go below zero.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::models::duration::Duration;
use crate::models::metrics::AnalysisResult;
use crate::models::suggestion::{Confidence, Priority, Suggestion, SuggestionType};
use crate::models::trace::{BuildTrace, CompilerType};

/// Rule thresholds, all overridable. An empty `enabled_rules` runs every
/// rule.
#[derive(Debug, Clone)]
pub struct SuggesterOptions {
    /// Distinct TUs a header must appear in to become a PCH candidate.
    pub pch_min_includers: usize,
    /// Summed include time (ms) a header must cost to become a PCH candidate.
    pub pch_min_ms: f64,
    /// Compile time (ms) above which a single TU counts as slow.
    pub slow_tu_ms: f64,
    /// Distinct TUs for the forward-declaration rule.
    pub fwd_min_includers: usize,
    /// Instantiation count that marks a template as heavy.
    pub heavy_tmpl_count: u64,
    /// Summed instantiation time (ms) that marks a template as heavy.
    pub heavy_tmpl_ms: f64,
    /// Minimum TU count for the unity-build rule.
    pub unity_min_files: usize,
    /// Mean compile time (ms) below which unity builds pay off.
    pub unity_mean_ms: f64,
    /// Distinct TUs for the PIMPL rule.
    pub pimpl_min_includers: usize,
    /// Summed include time (ms) for the PIMPL rule.
    pub pimpl_min_ms: f64,
    pub enabled_rules: Vec<SuggestionType>,
}

impl Default for SuggesterOptions {
    fn default() -> Self {
        SuggesterOptions {
            pch_min_includers: 10,
            pch_min_ms: 500.0,
            slow_tu_ms: 5000.0,
            fwd_min_includers: 5,
            heavy_tmpl_count: 50,
            heavy_tmpl_ms: 1000.0,
            unity_min_files: 20,
            unity_mean_ms: 500.0,
            pimpl_min_includers: 10,
            pimpl_min_ms: 300.0,
            enabled_rules: Vec::new(),
        }
    }
}

impl SuggesterOptions {
    fn rule_enabled(&self, rule: SuggestionType) -> bool {
        self.enabled_rules.is_empty() || self.enabled_rules.contains(&rule)
    }
}

/// Per-header statistics the header-centric rules share.
#[derive(Default)]
struct HeaderStats {
    /// Indices of the distinct TUs this header appears in.
    tus: FxHashSet<usize>,
    time: Duration,
    is_system: bool,
}

/// Generate ranked optimization suggestions. Empty input yields an empty
/// list, never an error.
pub fn generate_suggestions(
    trace: &BuildTrace,
    result: &AnalysisResult,
    options: &SuggesterOptions,
) -> Vec<Suggestion> {
    let mut candidates = Vec::new();

    let headers = collect_header_stats(trace);
    // Deterministic rule order regardless of map iteration.
    let mut header_names: Vec<&String> = headers.keys().collect();
    header_names.sort();

    if options.rule_enabled(SuggestionType::Pch) {
        pch_header_rule(trace, result, options, &headers, &header_names, &mut candidates);
        slow_tu_rule(result, options, &mut candidates);
    }
    if options.rule_enabled(SuggestionType::ForwardDeclaration) {
        forward_declaration_rule(trace, options, &headers, &header_names, &mut candidates);
    }
    if options.rule_enabled(SuggestionType::TemplateOptimization) {
        heavy_template_rule(trace, options, &mut candidates);
    }
    if options.rule_enabled(SuggestionType::UnityBuild) {
        unity_build_rule(result, options, &mut candidates);
    }
    if options.rule_enabled(SuggestionType::ModuleMigration) {
        module_migration_rule(trace, result, &mut candidates);
    }
    if options.rule_enabled(SuggestionType::Pimpl) {
        pimpl_rule(trace, options, &headers, &header_names, &mut candidates);
    }

    let suggestions = dedup_and_rank(candidates);
    debug!(count = suggestions.len(), "suggestions generated");
    suggestions
}

fn collect_header_stats(trace: &BuildTrace) -> FxHashMap<String, HeaderStats> {
    let mut stats: FxHashMap<String, HeaderStats> = FxHashMap::default();
    for (tu, unit) in trace.units.iter().enumerate() {
        for inc in &unit.includes {
            let entry = stats.entry(inc.header_path.clone()).or_default();
            entry.tus.insert(tu);
            entry.time += inc.include_time;
            entry.is_system |= inc.is_system;
        }
    }
    stats
}

fn affected_tus(trace: &BuildTrace, stats: &HeaderStats) -> Vec<String> {
    let mut files: Vec<String> = stats
        .tus
        .iter()
        .map(|&tu| trace.units[tu].source_file.clone())
        .collect();
    files.sort();
    files
}

/// Confidence drops one level when fewer than three samples back the
/// suggestion.
fn with_evidence(confidence: Confidence, samples: usize) -> Confidence {
    if samples < 3 {
        confidence.downgraded()
    } else {
        confidence
    }
}

/// Headers included widely and expensively belong in a precompiled header.
fn pch_header_rule(
    trace: &BuildTrace,
    result: &AnalysisResult,
    options: &SuggesterOptions,
    headers: &FxHashMap<String, HeaderStats>,
    header_names: &[&String],
    out: &mut Vec<Suggestion>,
) {
    let total_ms = result.total_compile_time.as_millis_f64();
    for &name in header_names {
        let stats = &headers[name];
        let tu_count = stats.tus.len();
        let time_ms = stats.time.as_millis_f64();
        if tu_count < options.pch_min_includers || time_ms < options.pch_min_ms {
            continue;
        }

        let share = if total_ms > 0.0 { time_ms / total_ms } else { 0.0 };
        let impact =
            (0.7 * time_ms * (tu_count as f64 - 1.0) / tu_count as f64).max(0.0);
        out.push(Suggestion {
            suggestion_type: SuggestionType::Pch,
            priority: if share >= 0.10 {
                Priority::High
            } else {
                Priority::Medium
            },
            title: format!("Add {name} to a precompiled header"),
            description: format!(
                "{name} is included by {tu_count} translation units and costs \
                 {time_ms:.0}ms of include time in total"
            ),
            file_path: name.clone(),
            line_number: 0,
            estimated_impact_ms: impact,
            confidence: with_evidence(
                if share >= 0.20 {
                    Confidence::High
                } else {
                    Confidence::Medium
                },
                tu_count,
            ),
            affected_files: affected_tus(trace, stats),
            code_changes: Vec::new(),
        });
    }
}

/// A single TU past the slow threshold gets a PCH suggestion of its own.
fn slow_tu_rule(result: &AnalysisResult, options: &SuggesterOptions, out: &mut Vec<Suggestion>) {
    for fm in &result.file_metrics {
        if fm.compile_time_ms <= options.slow_tu_ms {
            continue;
        }
        out.push(Suggestion {
            suggestion_type: SuggestionType::Pch,
            priority: Priority::High,
            title: format!("Consider PCH for {}", fm.file_path),
            description: format!("File takes {:.0}ms to compile", fm.compile_time_ms),
            file_path: fm.file_path.clone(),
            line_number: 0,
            estimated_impact_ms: (fm.compile_time_ms * 0.3).max(0.0),
            confidence: Confidence::Medium,
            affected_files: vec![fm.file_path.clone()],
            code_changes: Vec::new(),
        });
    }
}

/// Widely included project headers with no template instantiations
/// attributed to them are forward-declaration candidates.
fn forward_declaration_rule(
    trace: &BuildTrace,
    options: &SuggesterOptions,
    headers: &FxHashMap<String, HeaderStats>,
    header_names: &[&String],
    out: &mut Vec<Suggestion>,
) {
    let template_locations: FxHashSet<&str> = trace
        .units
        .iter()
        .flat_map(|u| u.templates.iter())
        .filter(|t| !t.location_file.is_empty())
        .map(|t| t.location_file.as_str())
        .collect();

    for &name in header_names {
        let stats = &headers[name];
        let tu_count = stats.tus.len();
        if stats.is_system
            || tu_count < options.fwd_min_includers
            || template_locations.contains(name.as_str())
        {
            continue;
        }
        let time_ms = stats.time.as_millis_f64();
        out.push(Suggestion {
            suggestion_type: SuggestionType::ForwardDeclaration,
            priority: Priority::Medium,
            title: format!("Forward-declare types from {name}"),
            description: format!(
                "{name} is included by {tu_count} translation units; forward \
                 declarations can remove the include from most of them"
            ),
            file_path: name.clone(),
            line_number: 0,
            estimated_impact_ms: (0.5 * time_ms).max(0.0),
            confidence: with_evidence(Confidence::Low, tu_count),
            affected_files: affected_tus(trace, stats),
            code_changes: Vec::new(),
        });
    }
}

/// Templates with large instantiation counts or summed time.
fn heavy_template_rule(trace: &BuildTrace, options: &SuggesterOptions, out: &mut Vec<Suggestion>) {
    let mut counts: FxHashMap<&str, u64> = FxHashMap::default();
    let mut times: FxHashMap<&str, Duration> = FxHashMap::default();
    for unit in &trace.units {
        for tmpl in &unit.templates {
            *counts.entry(tmpl.template_name.as_str()).or_default() +=
                u64::from(tmpl.instantiation_count);
            *times.entry(tmpl.template_name.as_str()).or_default() += tmpl.instantiation_time;
        }
    }

    let mut names: Vec<&str> = counts.keys().copied().collect();
    names.sort_unstable();

    for name in names {
        let count = counts[name];
        let time_ms = times[name].as_millis_f64();
        if count < options.heavy_tmpl_count && time_ms < options.heavy_tmpl_ms {
            continue;
        }
        out.push(Suggestion {
            suggestion_type: SuggestionType::TemplateOptimization,
            priority: if time_ms >= 2000.0 {
                Priority::High
            } else {
                Priority::Medium
            },
            title: format!("Reduce instantiations of {name}"),
            description: format!(
                "{name} was instantiated {count} times for {time_ms:.0}ms; extern \
                 templates or a type-erased interface can cut the repeat cost"
            ),
            file_path: String::new(),
            line_number: 0,
            estimated_impact_ms: (0.4 * time_ms).max(0.0),
            confidence: with_evidence(Confidence::Medium, count as usize),
            affected_files: Vec::new(),
            code_changes: Vec::new(),
        });
    }
}

/// Many quick TUs amortize well in a unity build. Requires a positive total
/// so an all-zero-duration trace stays silent.
fn unity_build_rule(
    result: &AnalysisResult,
    options: &SuggesterOptions,
    out: &mut Vec<Suggestion>,
) {
    let file_count = result.file_count;
    let total_ms = result.total_compile_time.as_millis_f64();
    if file_count < options.unity_min_files || total_ms <= 0.0 {
        return;
    }
    let mean_ms = total_ms / file_count as f64;
    if mean_ms >= options.unity_mean_ms {
        return;
    }
    out.push(Suggestion {
        suggestion_type: SuggestionType::UnityBuild,
        priority: Priority::Medium,
        title: "Adopt a unity build".to_string(),
        description: format!(
            "{file_count} translation units average {mean_ms:.0}ms each; batching \
             them into unity source files amortizes the shared header cost"
        ),
        file_path: String::new(),
        line_number: 0,
        estimated_impact_ms: (0.25 * total_ms).max(0.0),
        confidence: with_evidence(Confidence::Low, file_count),
        affected_files: result
            .file_metrics
            .iter()
            .map(|fm| fm.file_path.clone())
            .collect(),
        code_changes: Vec::new(),
    });
}

/// Clang builds that spend most of their time in includes are module
/// migration candidates.
fn module_migration_rule(
    trace: &BuildTrace,
    result: &AnalysisResult,
    out: &mut Vec<Suggestion>,
) {
    if trace.units.is_empty() || trace.units.iter().any(|u| u.compiler != CompilerType::Clang) {
        return;
    }
    let total_ms = result.total_compile_time.as_millis_f64();
    let include_ms = result.include_metrics.total_include_time.as_millis_f64();
    if total_ms <= 0.0 || include_ms / total_ms <= 0.4 {
        return;
    }
    out.push(Suggestion {
        suggestion_type: SuggestionType::ModuleMigration,
        priority: Priority::Low,
        title: "Evaluate C++20 module migration".to_string(),
        description: format!(
            "Include processing accounts for {:.0}% of the build; modules replace \
             repeated textual inclusion with importable compiled interfaces",
            100.0 * include_ms / total_ms
        ),
        file_path: String::new(),
        line_number: 0,
        estimated_impact_ms: (0.2 * include_ms).max(0.0),
        confidence: with_evidence(Confidence::Low, trace.units.len()),
        affected_files: Vec::new(),
        code_changes: Vec::new(),
    });
}

/// Headers that define out-of-line, non-template symbols and are included
/// widely can hide their implementation behind a PIMPL.
fn pimpl_rule(
    trace: &BuildTrace,
    options: &SuggesterOptions,
    headers: &FxHashMap<String, HeaderStats>,
    header_names: &[&String],
    out: &mut Vec<Suggestion>,
) {
    let defining_headers: FxHashSet<&str> = trace
        .units
        .iter()
        .flat_map(|u| u.symbols.iter())
        .filter(|s| !s.is_template && !s.definition_file.is_empty())
        .map(|s| s.definition_file.as_str())
        .collect();

    for &name in header_names {
        if !defining_headers.contains(name.as_str()) {
            continue;
        }
        let stats = &headers[name];
        let tu_count = stats.tus.len();
        let time_ms = stats.time.as_millis_f64();
        if tu_count < options.pimpl_min_includers || time_ms < options.pimpl_min_ms {
            continue;
        }
        out.push(Suggestion {
            suggestion_type: SuggestionType::Pimpl,
            priority: Priority::Medium,
            title: format!("Apply the PIMPL idiom in {name}"),
            description: format!(
                "{name} defines non-template symbols and is included by {tu_count} \
                 translation units; moving the implementation behind a pointer \
                 shrinks the visible surface"
            ),
            file_path: name.clone(),
            line_number: 0,
            estimated_impact_ms: (0.3 * time_ms).max(0.0),
            confidence: with_evidence(Confidence::Low, tu_count),
            affected_files: affected_tus(trace, stats),
            code_changes: Vec::new(),
        });
    }
}

/// Deduplicate on `(type, file_path, title)` keeping the higher impact (then
/// higher confidence), and rank the survivors.
fn dedup_and_rank(candidates: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut best: FxHashMap<(SuggestionType, String, String), Suggestion> = FxHashMap::default();
    for candidate in candidates {
        match best.entry(candidate.dedup_key()) {
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            std::collections::hash_map::Entry::Occupied(mut slot) => {
                let kept = slot.get();
                let better = candidate.estimated_impact_ms > kept.estimated_impact_ms
                    || (candidate.estimated_impact_ms == kept.estimated_impact_ms
                        && candidate.confidence > kept.confidence);
                if better {
                    slot.insert(candidate);
                }
            }
        }
    }
    let mut suggestions: Vec<Suggestion> = best.into_values().collect();
    suggestions.sort_by(|a, b| a.rank_cmp(b));
    suggestions
}
