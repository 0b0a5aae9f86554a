//! Trace document parsing.
//!
//! Detects the trace dialect from content, then lowers the document into one
//! [`CompilationUnit`] with a pure per-format strategy function. Event order
//! is preserved; duplicate events are left for the aggregator to merge.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, trace};

use crate::models::duration::Duration;
use crate::models::error::TraceError;
use crate::models::trace::{CompilationUnit, CompilerType, IncludeInfo, TemplateInstantiation};

/// Trace dialects the detector distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraceFormat {
    /// Chrome-trace JSON as emitted by clang `-ftime-trace`.
    ChromeTrace,
    /// GCC `-ftime-report` text output.
    GccTimeReport,
    Unknown,
}

/// Parse one trace file into a compilation unit.
///
/// The file handle is scoped to the read and released on every exit path.
pub fn parse_trace_file(path: impl AsRef<Path>) -> Result<CompilationUnit, TraceError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => TraceError::NotFound {
            path: path.to_path_buf(),
        },
        _ => TraceError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    })?;
    parse_trace_bytes(&bytes, &path.display().to_string())
}

/// Parse an in-memory trace document. `source_hint` becomes the synthesized
/// unit's `source_file` and names the input in errors.
pub fn parse_trace_bytes(bytes: &[u8], source_hint: &str) -> Result<CompilationUnit, TraceError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(doc) => match detect_json_format(&doc) {
            TraceFormat::ChromeTrace => {
                debug!(source = source_hint, "detected Chrome-trace document");
                parse_chrome_trace(&doc, source_hint)
            }
            _ => Err(TraceError::InvalidFormat {
                source_hint: source_hint.to_string(),
                reason: "top-level object with a traceEvents array required".to_string(),
            }),
        },
        Err(json_err) => {
            // A truncated Chrome trace can contain the GCC text markers, so
            // only non-JSON-looking input goes through text detection.
            if !looks_like_json(bytes) && detect_text_format(bytes) == TraceFormat::GccTimeReport {
                debug!(source = source_hint, "detected GCC time-report document");
                Err(TraceError::Unsupported {
                    source_hint: source_hint.to_string(),
                    reason: "GCC time-report traces are not supported yet".to_string(),
                })
            } else {
                Err(TraceError::Truncated {
                    source_hint: source_hint.to_string(),
                    reason: json_err.to_string(),
                })
            }
        }
    }
}

fn detect_json_format(doc: &Value) -> TraceFormat {
    match doc.get("traceEvents") {
        Some(events) if events.is_array() => TraceFormat::ChromeTrace,
        _ => TraceFormat::Unknown,
    }
}

fn looks_like_json(bytes: &[u8]) -> bool {
    matches!(
        bytes.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{') | Some(b'[')
    )
}

fn detect_text_format(bytes: &[u8]) -> TraceFormat {
    let text = String::from_utf8_lossy(bytes);
    let has_time_in = text.lines().any(|line| line.contains("time in"));
    if has_time_in || text.contains("Total ExecuteCompiler") {
        TraceFormat::GccTimeReport
    } else {
        TraceFormat::Unknown
    }
}

/// Chrome-trace strategy. Events are classified by exact name; everything
/// else is ignored. Negative durations clamp to zero, and the last
/// occurrence of a total wins.
fn parse_chrome_trace(doc: &Value, source_hint: &str) -> Result<CompilationUnit, TraceError> {
    let Some(events) = doc.get("traceEvents").and_then(Value::as_array) else {
        return Err(TraceError::InvalidFormat {
            source_hint: source_hint.to_string(),
            reason: "traceEvents is not an array".to_string(),
        });
    };

    let mut unit = CompilationUnit::new(source_hint);
    unit.compiler = CompilerType::Clang;

    let mut recognized = 0usize;
    for event in events {
        let Some(name) = event.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(dur_us) = event.get("dur").and_then(Value::as_f64) else {
            continue;
        };
        recognized += 1;
        let dur = Duration::from_micros_f64(dur_us);

        match name {
            "Total ExecuteCompiler" => unit.total_time = dur,
            "Total Frontend" => unit.frontend_time = dur,
            "Total Backend" => unit.backend_time = dur,
            "Source" => match event_detail(event) {
                Some(detail) => unit.includes.push(IncludeInfo::new(detail, dur)),
                None => trace!(source = source_hint, "dropping Source event without args.detail"),
            },
            "InstantiateClass" | "InstantiateFunction" => match event_detail(event) {
                Some(detail) => unit
                    .templates
                    .push(TemplateInstantiation::from_detail(detail, dur)),
                None => trace!(
                    source = source_hint,
                    event = name,
                    "dropping instantiation event without args.detail"
                ),
            },
            _ => {}
        }
    }

    if recognized == 0 && !events.is_empty() {
        return Err(TraceError::InvalidFormat {
            source_hint: source_hint.to_string(),
            reason: "no recognized events".to_string(),
        });
    }

    Ok(unit)
}

fn event_detail(event: &Value) -> Option<&str> {
    event.get("args")?.get("detail")?.as_str()
}
