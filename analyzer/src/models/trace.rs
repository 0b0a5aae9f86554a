//! Trace entities: the normalized model a parsed compiler trace lowers into.

use serde::{Deserialize, Serialize};

use crate::models::duration::Duration;

/// Compiler that produced a trace. Detected from trace content, never from
/// the file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompilerType {
    #[default]
    Unknown,
    Clang,
    Gcc,
    Msvc,
    Intel,
    Nvcc,
}

/// Unify separators to `/` and strip trailing whitespace. Case is preserved.
pub fn normalize_header_path(path: &str) -> String {
    path.replace('\\', "/").trim_end().to_string()
}

/// True for the header extensions `.h`, `.hh`, `.hpp`, `.hxx` and `.H`
/// (exact match, so `.HPP` is not a header).
pub fn is_header_path(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((_, ext)) => matches!(ext, "h" | "hh" | "hpp" | "hxx" | "H"),
        None => false,
    }
}

/// A single include directive observed during compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludeInfo {
    pub header_path: String,
    pub include_time: Duration,
    pub line_number: u32,
    pub is_system: bool,
    /// Direct includes are attributed to the TU source file; indirect ones
    /// to the intermediate header in `included_by`.
    pub is_direct: bool,
    pub included_by: Option<String>,
}

impl IncludeInfo {
    pub fn new(header_path: impl AsRef<str>, include_time: Duration) -> Self {
        IncludeInfo {
            header_path: normalize_header_path(header_path.as_ref()),
            include_time,
            line_number: 0,
            is_system: false,
            is_direct: true,
            included_by: None,
        }
    }
}

/// One template instantiation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInstantiation {
    /// Template name without the argument list.
    pub template_name: String,
    /// Argument list verbatim as emitted by the compiler, brackets included.
    pub specialization: String,
    pub instantiation_time: Duration,
    pub location_file: String,
    pub location_line: u32,
    pub instantiation_count: u32,
}

impl TemplateInstantiation {
    /// Split a compiler-emitted detail string such as `std::vector<int>` into
    /// name and specialization at the first `<`.
    pub fn from_detail(detail: &str, instantiation_time: Duration) -> Self {
        let (template_name, specialization) = match detail.find('<') {
            Some(pos) => (detail[..pos].trim_end().to_string(), detail[pos..].to_string()),
            None => (detail.to_string(), String::new()),
        };
        TemplateInstantiation {
            template_name,
            specialization,
            instantiation_time,
            location_file: String::new(),
            location_line: 0,
            instantiation_count: 1,
        }
    }
}

/// Kind of a recorded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Variable,
    Other,
}

/// A symbol defined by a compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub mangled_name: String,
    pub symbol_type: SymbolKind,
    pub size_bytes: u64,
    pub is_inline: bool,
    pub is_template: bool,
    pub definition_file: String,
    pub definition_line: u32,
}

/// One translation unit with everything its trace recorded.
///
/// `source_file` is set at parse time and never mutated afterwards. Event
/// order from the trace is preserved in `includes` and `templates`;
/// duplicates are merged by the aggregator, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub source_file: String,
    pub compiler: CompilerType,
    pub total_time: Duration,
    pub frontend_time: Duration,
    pub backend_time: Duration,
    pub includes: Vec<IncludeInfo>,
    pub templates: Vec<TemplateInstantiation>,
    pub symbols: Vec<SymbolInfo>,
}

impl CompilationUnit {
    pub fn new(source_file: impl Into<String>) -> Self {
        CompilationUnit {
            source_file: source_file.into(),
            compiler: CompilerType::Unknown,
            total_time: Duration::ZERO,
            frontend_time: Duration::ZERO,
            backend_time: Duration::ZERO,
            includes: Vec::new(),
            templates: Vec::new(),
            symbols: Vec::new(),
        }
    }
}

/// Ordered collection of compilation units forming a complete build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildTrace {
    pub units: Vec<CompilationUnit>,
    pub total_build_time: Duration,
    /// Annotation only; does not affect any sum.
    pub parallel_jobs: u32,
}

impl BuildTrace {
    pub fn new() -> Self {
        BuildTrace {
            units: Vec::new(),
            total_build_time: Duration::ZERO,
            parallel_jobs: 1,
        }
    }

    pub fn from_units(units: Vec<CompilationUnit>) -> Self {
        let total_build_time = units.iter().map(|u| u.total_time).sum();
        BuildTrace {
            units,
            total_build_time,
            parallel_jobs: 1,
        }
    }

    pub fn add_unit(&mut self, unit: CompilationUnit) {
        self.total_build_time += unit.total_time;
        self.units.push(unit);
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }
}
