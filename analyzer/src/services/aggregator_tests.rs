use pretty_assertions::assert_eq;

use crate::models::duration::Duration;
use crate::models::trace::{BuildTrace, CompilationUnit, IncludeInfo, TemplateInstantiation};
use crate::services::aggregator::{run_full_analysis, AnalysisOptions};
use crate::services::trace_parser::parse_trace_bytes;

fn unit(source: &str, total_ms: f64) -> CompilationUnit {
    let mut unit = CompilationUnit::new(source);
    unit.total_time = Duration::from_millis_f64(total_ms);
    unit
}

fn include(header: &str, time_ms: f64) -> IncludeInfo {
    IncludeInfo::new(header, Duration::from_millis_f64(time_ms))
}

#[test]
fn test_empty_trace_is_all_zero_not_an_error() {
    let result = run_full_analysis(&BuildTrace::new(), &AnalysisOptions::default());
    assert_eq!(result.file_count, 0);
    assert!(result.file_metrics.is_empty());
    assert_eq!(result.total_compile_time, Duration::ZERO);
    assert_eq!(result.include_metrics.total_includes, 0);
    assert_eq!(result.template_metrics.total_instantiations, 0);
    assert_eq!(result.dependency_metrics.strongly_connected_components, 0);
}

#[test]
fn test_single_clang_trace_scenario() {
    // One trace with the four core event kinds, driven through the parser.
    let json = r#"{"traceEvents":[
        {"name":"Total ExecuteCompiler","dur":2000000},
        {"name":"Total Frontend","dur":1500000},
        {"name":"Total Backend","dur":500000},
        {"name":"Source","dur":100000,"args":{"detail":"iostream"}}
    ]}"#;
    let unit = parse_trace_bytes(json.as_bytes(), "main.cpp").unwrap();
    let trace = BuildTrace::from_units(vec![unit]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());

    assert_eq!(result.file_count, 1);
    assert_eq!(result.total_compile_time.as_millis_f64(), 2000.0);
    assert_eq!(result.file_metrics.len(), 1);
    assert_eq!(result.file_metrics[0].include_count, 1);
    assert_eq!(result.include_metrics.total_includes, 1);
    assert_eq!(result.include_metrics.most_included.len(), 1);
    assert_eq!(result.include_metrics.most_included[0].path, "iostream");
    assert_eq!(result.include_metrics.most_included[0].count, 1);
    // Frontend + backend fits inside the total.
    assert!(
        trace.units[0].frontend_time + trace.units[0].backend_time
            <= trace.units[0].total_time + Duration::from_micros_f64(1.0)
    );
}

#[test]
fn test_file_metrics_preserve_input_order() {
    let trace = BuildTrace::from_units(vec![unit("z.cpp", 5.0), unit("a.cpp", 10.0)]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());
    assert_eq!(result.file_metrics[0].file_path, "z.cpp");
    assert_eq!(result.file_metrics[1].file_path, "a.cpp");
}

#[test]
fn test_compile_time_sum_matches_total() {
    let trace = BuildTrace::from_units(vec![unit("a.cpp", 10.5), unit("b.cpp", 20.25)]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());
    let sum: f64 = result.file_metrics.iter().map(|f| f.compile_time_ms).sum();
    assert!((sum - result.total_compile_time.as_millis_f64()).abs() < 1e-9);
}

#[test]
fn test_duplicate_includes_merge_in_aggregation() {
    let mut a = unit("a.cpp", 1.0);
    a.includes.push(include("vector", 10.0));
    a.includes.push(include("vector", 15.0));
    let mut b = unit("b.cpp", 1.0);
    b.includes.push(include("vector", 5.0));

    let trace = BuildTrace::from_units(vec![a, b]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());

    assert_eq!(result.include_metrics.total_includes, 3);
    assert_eq!(result.include_metrics.unique_includes, 1);
    assert_eq!(result.include_metrics.most_included[0].count, 3);
    assert_eq!(result.include_metrics.slowest_includes[0].time_ms, 30.0);
    assert_eq!(
        result.include_metrics.total_include_time,
        Duration::from_millis_f64(30.0)
    );
}

#[test]
fn test_tie_break_is_alphabetical() {
    // Identical counts and times order lexicographically on path.
    let mut a = unit("a.cpp", 1.0);
    a.includes.push(include("zeta.h", 10.0));
    a.includes.push(include("alpha.h", 10.0));

    let trace = BuildTrace::from_units(vec![a]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());

    assert_eq!(result.include_metrics.most_included[0].path, "alpha.h");
    assert_eq!(result.include_metrics.most_included[1].path, "zeta.h");
    assert_eq!(result.include_metrics.slowest_includes[0].path, "alpha.h");
    assert_eq!(result.include_metrics.slowest_includes[1].path, "zeta.h");
}

#[test]
fn test_top_k_respects_option() {
    let mut a = unit("a.cpp", 1.0);
    for i in 0..15 {
        a.includes.push(include(&format!("h{i:02}.h"), 1.0));
    }
    let trace = BuildTrace::from_units(vec![a]);

    let result = run_full_analysis(
        &trace,
        &AnalysisOptions {
            top_k: 3,
            ..AnalysisOptions::default()
        },
    );
    assert_eq!(result.include_metrics.most_included.len(), 3);
    assert_eq!(result.include_metrics.unique_includes, 15);

    let default = run_full_analysis(&trace, &AnalysisOptions::default());
    assert_eq!(default.include_metrics.most_included.len(), 10);
}

#[test]
fn test_template_merge_and_by_name_rollup() {
    // 60 instantiations of std::vector<int> at 20ms each collapse into one
    // merged entry.
    let mut a = unit("a.cpp", 1.0);
    for _ in 0..60 {
        a.templates.push(TemplateInstantiation::from_detail(
            "std::vector<int>",
            Duration::from_millis_f64(20.0),
        ));
    }
    let trace = BuildTrace::from_units(vec![a]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());

    assert_eq!(result.template_metrics.total_instantiations, 60);
    // All 60 share one (name, specialization) pair.
    assert_eq!(result.template_metrics.unique_templates, 1);
    assert_eq!(result.template_metrics.most_instantiated[0].name, "std::vector");
    assert_eq!(result.template_metrics.most_instantiated[0].count, 60);
    assert_eq!(result.template_metrics.slowest_templates[0].time_ms, 1200.0);
}

#[test]
fn test_template_specializations_roll_up_by_name() {
    let mut a = unit("a.cpp", 1.0);
    a.templates.push(TemplateInstantiation::from_detail(
        "std::vector<int>",
        Duration::from_millis_f64(5.0),
    ));
    a.templates.push(TemplateInstantiation::from_detail(
        "std::vector<double>",
        Duration::from_millis_f64(7.0),
    ));
    let trace = BuildTrace::from_units(vec![a]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());

    assert_eq!(result.template_metrics.unique_templates, 2);
    assert_eq!(result.template_metrics.most_instantiated.len(), 1);
    assert_eq!(result.template_metrics.most_instantiated[0].count, 2);
    assert_eq!(result.template_metrics.slowest_templates[0].time_ms, 12.0);
}

#[test]
fn test_header_classification_and_depth() {
    let mut header_unit = unit("widget.hpp", 2.0);
    header_unit.includes.push(include("base.h", 1.0));
    let trace = BuildTrace::from_units(vec![header_unit]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());

    assert!(result.file_metrics[0].is_header);
    assert_eq!(result.file_metrics[0].include_depth, 1);
    assert_eq!(result.include_metrics.max_depth, 1);
    assert_eq!(result.dependency_metrics.total_dependencies, 1);
}

#[test]
fn test_cycle_reflected_in_dependency_metrics() {
    // a.h -> b.h -> a.h.
    let mut a = unit("main.cpp", 1.0);
    a.includes.push(IncludeInfo {
        is_direct: false,
        included_by: Some("a.h".into()),
        ..include("b.h", 1.0)
    });
    a.includes.push(IncludeInfo {
        is_direct: false,
        included_by: Some("b.h".into()),
        ..include("a.h", 1.0)
    });
    let trace = BuildTrace::from_units(vec![a]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());
    assert!(result.dependency_metrics.circular_dependencies >= 1);
}

#[test]
fn test_determinism_across_runs() {
    let json = r#"{"traceEvents":[
        {"name":"Total ExecuteCompiler","dur":500000},
        {"name":"Source","dur":1000,"args":{"detail":"a.h"}},
        {"name":"Source","dur":1000,"args":{"detail":"b.h"}},
        {"name":"Source","dur":2000,"args":{"detail":"c.h"}},
        {"name":"InstantiateClass","dur":300,"args":{"detail":"std::map<int, int>"}}
    ]}"#;
    let parse = || {
        let unit = parse_trace_bytes(json.as_bytes(), "tu.cpp").unwrap();
        let trace = BuildTrace::from_units(vec![unit.clone(), unit]);
        run_full_analysis(&trace, &AnalysisOptions::default())
    };
    let first = parse();
    let second = parse();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first.to_dict()).unwrap(),
        serde_json::to_string(&second.to_dict()).unwrap()
    );
}

#[test]
fn test_symbols_excluded_when_option_off() {
    use crate::models::trace::{SymbolInfo, SymbolKind};
    let mut a = unit("a.cpp", 1.0);
    a.symbols.push(SymbolInfo {
        name: "f".into(),
        mangled_name: "_Z1fv".into(),
        symbol_type: SymbolKind::Function,
        size_bytes: 128,
        is_inline: true,
        is_template: false,
        definition_file: "a.h".into(),
        definition_line: 3,
    });
    let trace = BuildTrace::from_units(vec![a]);

    let with = run_full_analysis(&trace, &AnalysisOptions::default());
    assert_eq!(with.symbol_metrics.total_symbols, 1);
    assert_eq!(with.symbol_metrics.inline_symbols, 1);
    assert_eq!(with.symbol_metrics.total_symbol_size, 128);

    let without = run_full_analysis(
        &trace,
        &AnalysisOptions {
            include_symbols: false,
            ..AnalysisOptions::default()
        },
    );
    assert_eq!(without.symbol_metrics.total_symbols, 0);
}

#[test]
fn test_normalize_paths_option_controls_display_path() {
    let trace = BuildTrace::from_units(vec![unit("src\\win.cpp", 1.0)]);

    let normalized = run_full_analysis(&trace, &AnalysisOptions::default());
    assert_eq!(normalized.file_metrics[0].file_path, "src/win.cpp");

    let verbatim = run_full_analysis(
        &trace,
        &AnalysisOptions {
            normalize_paths: false,
            ..AnalysisOptions::default()
        },
    );
    assert_eq!(verbatim.file_metrics[0].file_path, "src\\win.cpp");
}
