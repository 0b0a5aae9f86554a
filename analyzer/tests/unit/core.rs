//! End-to-end pipeline tests over real files: parse -> aggregate -> suggest
//! -> export.

use std::fs;
use std::path::PathBuf;

use bha::{
    analyze_traces, generate_suggestions, parse_trace_file, run_full_analysis, AnalysisOptions,
    Analyzer, BuildTrace, ExportFormat, ExportOptions, Priority, SuggesterOptions, SuggestionType,
    TraceErrorKind,
};

fn write_trace(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

fn pch_scenario_trace(dir: &tempfile::TempDir) -> Vec<PathBuf> {
    // Twelve TUs, each including H once at 60ms, 100ms total each.
    (0..12)
        .map(|i| {
            write_trace(
                dir,
                &format!("tu{i:02}.json"),
                r#"{"traceEvents":[
                    {"name":"Total ExecuteCompiler","dur":100000},
                    {"name":"Total Frontend","dur":80000},
                    {"name":"Total Backend","dur":20000},
                    {"name":"Source","dur":60000,"args":{"detail":"H"}}
                ]}"#,
            )
        })
        .collect()
}

#[test]
fn test_full_pipeline_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let paths = pch_scenario_trace(&dir);

    let units: Vec<_> = paths
        .iter()
        .map(|p| parse_trace_file(p).unwrap())
        .collect();
    let trace = BuildTrace::from_units(units);
    let result = run_full_analysis(&trace, &AnalysisOptions::default());

    assert_eq!(result.file_count, 12);
    assert_eq!(result.total_compile_time.as_millis_f64(), 1200.0);
    assert_eq!(result.include_metrics.total_includes, 12);
    assert_eq!(result.include_metrics.unique_includes, 1);
    assert_eq!(result.include_metrics.most_included[0].count, 12);

    let suggestions = generate_suggestions(&trace, &result, &SuggesterOptions::default());
    let pch = suggestions
        .iter()
        .find(|s| s.suggestion_type == SuggestionType::Pch)
        .expect("PCH candidate expected");
    assert_eq!(pch.priority, Priority::High);
    assert!((pch.estimated_impact_ms - 462.0).abs() < 1.0);

    // Frontend/backend invariant holds for every parsed unit.
    for unit in &trace.units {
        assert!(
            unit.frontend_time + unit.backend_time
                <= unit.total_time + bha::Duration::from_micros_f64(1.0)
        );
    }
}

#[test]
fn test_analyzer_facade_with_partial_failures() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_trace(
        &dir,
        "good.json",
        r#"{"traceEvents":[{"name":"Total ExecuteCompiler","dur":1000000}]}"#,
    );
    let bad = write_trace(&dir, "bad.json", r#"{"traceEvents":[{"na"#);

    let mut analyzer = Analyzer::new();
    analyzer.add_trace_file(&good).unwrap();
    analyzer.add_trace_file(&bad).unwrap();

    let result = analyzer.analyze().unwrap();
    assert_eq!(result.file_count, 1);
    assert_eq!(analyzer.parse_failures().len(), 1);
    assert_eq!(
        analyzer.parse_failures()[0].error.kind(),
        TraceErrorKind::Truncated
    );
}

#[test]
fn test_analyze_traces_rejects_missing_file_eagerly() {
    let err = analyze_traces(&[PathBuf::from("/no/such/file.json")]).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_json_round_trip_law() {
    let dir = tempfile::tempdir().unwrap();
    let paths = pch_scenario_trace(&dir);
    let result = analyze_traces(&paths).unwrap();

    let dict = result.to_dict();
    let text = serde_json::to_string(&dict).unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(dict, reparsed);
    assert_eq!(reparsed["summary"]["total_compile_time_ms"], 1200.0);
    assert_eq!(reparsed["include_metrics"]["most_included"][0]["path"], "H");
}

#[test]
fn test_every_export_format_renders() {
    let dir = tempfile::tempdir().unwrap();
    let paths = pch_scenario_trace(&dir);

    let mut analyzer = Analyzer::new();
    for path in &paths {
        analyzer.add_trace_file(path).unwrap();
    }
    analyzer.analyze().unwrap();
    analyzer.suggestions().unwrap();

    let options = ExportOptions::default();
    for format in [
        ExportFormat::Json,
        ExportFormat::Html,
        ExportFormat::Csv,
        ExportFormat::Sarif,
        ExportFormat::Markdown,
    ] {
        let content = analyzer.export(format, &options).unwrap();
        assert!(!content.is_empty(), "{format:?} produced empty output");
    }

    let sarif: serde_json::Value =
        serde_json::from_str(&analyzer.export(ExportFormat::Sarif, &options).unwrap()).unwrap();
    assert_eq!(sarif["runs"][0]["tool"]["driver"]["name"], "bha");
    let results = sarif["runs"][0]["results"].as_array().unwrap();
    assert!(!results.is_empty());
    // High-priority PCH suggestion maps to a SARIF error.
    assert!(results.iter().any(|r| r["ruleId"] == "pch" && r["level"] == "error"));
}

#[test]
fn test_min_priority_export_filter() {
    let dir = tempfile::tempdir().unwrap();
    let paths = pch_scenario_trace(&dir);

    let mut analyzer = Analyzer::new();
    for path in &paths {
        analyzer.add_trace_file(path).unwrap();
    }
    analyzer.analyze().unwrap();
    analyzer.suggestions().unwrap();

    let strict = ExportOptions {
        min_priority: Priority::Critical,
        ..ExportOptions::default()
    };
    let doc: serde_json::Value =
        serde_json::from_str(&analyzer.export(ExportFormat::Json, &strict).unwrap()).unwrap();
    assert!(doc["suggestions"].as_array().unwrap().is_empty());
}
