//! Report emitters.
//!
//! The core's canonical view is `AnalysisResult::to_dict` /
//! `Suggestion::to_dict`; the emitters here render that view as JSON, HTML,
//! CSV, SARIF 2.1.0 or Markdown. Priority filtering and entry caps never
//! error; they just shrink the output.

use anyhow::Result;
use chrono::Utc;
use csv::Writer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::metrics::AnalysisResult;
use crate::models::suggestion::{Priority, Suggestion, SuggestionType};

/// Supported output formats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Html,
    Csv,
    Sarif,
    Markdown,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "html" => Ok(ExportFormat::Html),
            "csv" => Ok(ExportFormat::Csv),
            "sarif" => Ok(ExportFormat::Sarif),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(format!("invalid export format: {s}")),
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub pretty_print: bool,
    pub include_metadata: bool,
    pub include_suggestions: bool,
    /// Carried for interface parity; no emitter consumes it currently.
    pub include_raw_data: bool,
    pub min_priority: Priority,
    /// 0 means unlimited.
    pub max_entries: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            pretty_print: true,
            include_metadata: true,
            include_suggestions: true,
            include_raw_data: false,
            min_priority: Priority::Low,
            max_entries: 0,
        }
    }
}

/// Render the analysis result and suggestions in the requested format.
pub fn export_to_string(
    result: &AnalysisResult,
    suggestions: &[Suggestion],
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<String> {
    let filtered = filter_suggestions(suggestions, options);
    match format {
        ExportFormat::Json => export_json(result, &filtered, options),
        ExportFormat::Html => Ok(export_html(result, &filtered, options)),
        ExportFormat::Csv => export_csv(result, &filtered, options),
        ExportFormat::Sarif => export_sarif(&filtered, options),
        ExportFormat::Markdown => Ok(export_markdown(result, &filtered, options)),
    }
}

/// Apply the priority floor and entry cap. Never errors; over-filtering
/// simply yields an empty list.
pub fn filter_suggestions<'a>(
    suggestions: &'a [Suggestion],
    options: &ExportOptions,
) -> Vec<&'a Suggestion> {
    let mut filtered: Vec<&Suggestion> = suggestions
        .iter()
        .filter(|s| s.priority >= options.min_priority)
        .collect();
    if options.max_entries > 0 {
        filtered.truncate(options.max_entries);
    }
    filtered
}

fn export_json(
    result: &AnalysisResult,
    suggestions: &[&Suggestion],
    options: &ExportOptions,
) -> Result<String> {
    let mut doc = result.to_dict();
    if let Some(obj) = doc.as_object_mut() {
        if options.include_suggestions {
            obj.insert(
                "suggestions".to_string(),
                Value::Array(suggestions.iter().map(|s| s.to_dict()).collect()),
            );
        }
        if options.include_metadata {
            obj.insert(
                "metadata".to_string(),
                json!({
                    "tool": "bha",
                    "version": env!("CARGO_PKG_VERSION"),
                    "generated_at": Utc::now().to_rfc3339(),
                }),
            );
        }
    }
    let text = if options.pretty_print {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    Ok(text)
}

fn export_csv(
    result: &AnalysisResult,
    suggestions: &[&Suggestion],
    options: &ExportOptions,
) -> Result<String> {
    let mut wtr = Writer::from_writer(vec![]);

    if options.include_suggestions {
        wtr.write_record([
            "type",
            "priority",
            "title",
            "file_path",
            "line_number",
            "estimated_impact_ms",
            "confidence",
            "description",
        ])?;
        for s in suggestions {
            wtr.write_record([
                s.suggestion_type.as_str(),
                s.priority.name(),
                &s.title,
                &s.file_path,
                &s.line_number.to_string(),
                &format!("{:.3}", s.estimated_impact_ms),
                s.confidence.name(),
                &s.description,
            ])?;
        }
    } else {
        wtr.write_record([
            "file_path",
            "compile_time_ms",
            "include_count",
            "template_instantiation_count",
            "include_depth",
            "is_header",
        ])?;
        for fm in &result.file_metrics {
            wtr.write_record([
                fm.file_path.as_str(),
                &format!("{:.3}", fm.compile_time_ms),
                &fm.include_count.to_string(),
                &fm.template_instantiation_count.to_string(),
                &fm.include_depth.to_string(),
                &fm.is_header.to_string(),
            ])?;
        }
    }

    let data = wtr.into_inner()?;
    Ok(String::from_utf8(data)?)
}

/// SARIF severity mapping: Critical/High -> error, Medium -> warning,
/// Low -> note.
fn sarif_level(priority: Priority) -> &'static str {
    match priority {
        Priority::Critical | Priority::High => "error",
        Priority::Medium => "warning",
        Priority::Low => "note",
    }
}

fn export_sarif(suggestions: &[&Suggestion], options: &ExportOptions) -> Result<String> {
    let rules: Vec<Value> = SuggestionType::all()
        .into_iter()
        .map(|t| {
            json!({
                "id": t.as_str(),
                "name": t.as_str(),
                "shortDescription": { "text": format!("{t} optimization suggestion") },
            })
        })
        .collect();

    let results: Vec<Value> = suggestions
        .iter()
        .map(|s| {
            json!({
                "ruleId": s.suggestion_type.as_str(),
                "level": sarif_level(s.priority),
                "message": { "text": format!("{}: {}", s.title, s.description) },
                "locations": [{
                    "physicalLocation": {
                        "artifactLocation": { "uri": s.file_path },
                        "region": { "startLine": s.line_number.max(1) }
                    }
                }],
                "properties": {
                    "estimated_impact_ms": s.estimated_impact_ms,
                    "confidence": s.confidence.name(),
                }
            })
        })
        .collect();

    let sarif = json!({
        "version": "2.1.0",
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "bha",
                    "version": env!("CARGO_PKG_VERSION"),
                    "rules": rules
                }
            },
            "results": results
        }]
    });

    let text = if options.pretty_print {
        serde_json::to_string_pretty(&sarif)?
    } else {
        serde_json::to_string(&sarif)?
    };
    Ok(text)
}

fn capped<'a, T>(items: &'a [T], options: &ExportOptions) -> &'a [T] {
    if options.max_entries > 0 && items.len() > options.max_entries {
        &items[..options.max_entries]
    } else {
        items
    }
}

fn export_markdown(
    result: &AnalysisResult,
    suggestions: &[&Suggestion],
    options: &ExportOptions,
) -> String {
    let mut md = String::with_capacity(8_192);

    md.push_str("# Build Hotspot Report\n\n");
    if options.include_metadata {
        md.push_str(&format!(
            "Generated: {}\n\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    md.push_str("## Summary\n\n");
    md.push_str(&format!(
        "- **Total compile time**: {:.1}ms\n",
        result.total_compile_time.as_millis_f64()
    ));
    md.push_str(&format!("- **Files analyzed**: {}\n", result.file_count));
    md.push_str(&format!(
        "- **Includes**: {} ({} unique, {:.1}ms)\n",
        result.include_metrics.total_includes,
        result.include_metrics.unique_includes,
        result.include_metrics.total_include_time.as_millis_f64()
    ));
    md.push_str(&format!(
        "- **Template instantiations**: {} ({} unique)\n",
        result.template_metrics.total_instantiations, result.template_metrics.unique_templates
    ));
    md.push_str(&format!(
        "- **Include cycles**: {}\n\n",
        result.dependency_metrics.circular_dependencies
    ));

    if !result.include_metrics.slowest_includes.is_empty() {
        md.push_str("## Slowest Includes\n\n");
        md.push_str("| Rank | Header | Time (ms) |\n");
        md.push_str("|------|--------|-----------|\n");
        for (i, entry) in capped(&result.include_metrics.slowest_includes, options)
            .iter()
            .enumerate()
        {
            md.push_str(&format!(
                "| {} | {} | {:.1} |\n",
                i + 1,
                entry.path,
                entry.time_ms
            ));
        }
        md.push('\n');
    }

    if !result.template_metrics.slowest_templates.is_empty() {
        md.push_str("## Slowest Templates\n\n");
        md.push_str("| Rank | Template | Time (ms) |\n");
        md.push_str("|------|----------|-----------|\n");
        for (i, entry) in capped(&result.template_metrics.slowest_templates, options)
            .iter()
            .enumerate()
        {
            md.push_str(&format!(
                "| {} | `{}` | {:.1} |\n",
                i + 1,
                entry.name,
                entry.time_ms
            ));
        }
        md.push('\n');
    }

    if options.include_suggestions && !suggestions.is_empty() {
        md.push_str("## Suggestions\n\n");
        for s in suggestions {
            md.push_str(&format!(
                "### [{}] {}\n\n{}\n\n- Estimated impact: {:.0}ms\n- Confidence: {}\n",
                s.priority, s.title, s.description, s.estimated_impact_ms, s.confidence
            ));
            if !s.file_path.is_empty() {
                md.push_str(&format!("- File: `{}`\n", s.file_path));
            }
            md.push('\n');
        }
    }

    md
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn export_html(
    result: &AnalysisResult,
    suggestions: &[&Suggestion],
    options: &ExportOptions,
) -> String {
    let mut html = String::with_capacity(16_384);
    html.push_str(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Build Hotspot Report</title>\n<style>\n\
         body { font-family: sans-serif; margin: 2em; }\n\
         table { border-collapse: collapse; margin-bottom: 1.5em; }\n\
         th, td { border: 1px solid #ccc; padding: 4px 10px; text-align: left; }\n\
         th { background: #f0f0f0; }\n\
         </style>\n</head>\n<body>\n",
    );

    html.push_str("<h1>Build Hotspot Report</h1>\n");
    html.push_str(&format!(
        "<p>Total compile time: {:.1}ms across {} files.</p>\n",
        result.total_compile_time.as_millis_f64(),
        result.file_count
    ));

    html.push_str("<h2>Files</h2>\n<table>\n<tr><th>File</th><th>Compile (ms)</th>\
                   <th>Includes</th><th>Instantiations</th></tr>\n");
    for fm in capped(&result.file_metrics, options) {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{:.1}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(&fm.file_path),
            fm.compile_time_ms,
            fm.include_count,
            fm.template_instantiation_count
        ));
    }
    html.push_str("</table>\n");

    if !result.include_metrics.most_included.is_empty() {
        html.push_str("<h2>Most Included Headers</h2>\n<table>\n\
                       <tr><th>Header</th><th>Count</th></tr>\n");
        for entry in capped(&result.include_metrics.most_included, options) {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                html_escape(&entry.path),
                entry.count
            ));
        }
        html.push_str("</table>\n");
    }

    if options.include_suggestions && !suggestions.is_empty() {
        html.push_str("<h2>Suggestions</h2>\n<table>\n<tr><th>Priority</th><th>Title</th>\
                       <th>Impact (ms)</th><th>Confidence</th></tr>\n");
        for s in suggestions {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{:.0}</td><td>{}</td></tr>\n",
                s.priority,
                html_escape(&s.title),
                s.estimated_impact_ms,
                s.confidence
            ));
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}
