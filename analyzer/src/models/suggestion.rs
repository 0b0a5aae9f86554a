//! Optimization suggestions and their closed, ordered classification enums.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;

/// Kinds of optimization suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Pch,
    ForwardDeclaration,
    IncludeOptimization,
    TemplateOptimization,
    HeaderSplit,
    Pimpl,
    UnityBuild,
    ModuleMigration,
    Custom,
}

impl SuggestionType {
    /// Stable wire value, also used as the SARIF rule id.
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::Pch => "pch",
            SuggestionType::ForwardDeclaration => "forward_declaration",
            SuggestionType::IncludeOptimization => "include_optimization",
            SuggestionType::TemplateOptimization => "template_optimization",
            SuggestionType::HeaderSplit => "header_split",
            SuggestionType::Pimpl => "pimpl",
            SuggestionType::UnityBuild => "unity_build",
            SuggestionType::ModuleMigration => "module_migration",
            SuggestionType::Custom => "custom",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            SuggestionType::Pch,
            SuggestionType::ForwardDeclaration,
            SuggestionType::IncludeOptimization,
            SuggestionType::TemplateOptimization,
            SuggestionType::HeaderSplit,
            SuggestionType::Pimpl,
            SuggestionType::UnityBuild,
            SuggestionType::ModuleMigration,
            SuggestionType::Custom,
        ]
    }
}

impl std::fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggestion priority, totally ordered Low < Medium < High < Critical.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Uppercase name as exported in the canonical dictionary.
    pub fn name(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
            Priority::Critical => write!(f, "Critical"),
        }
    }
}

/// Confidence in a suggestion, totally ordered Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn name(&self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }

    /// One level down, saturating at Low. Applied when the evidence behind a
    /// suggestion has fewer than three samples.
    pub fn downgraded(self) -> Self {
        match self {
            Confidence::High => Confidence::Medium,
            Confidence::Medium | Confidence::Low => Confidence::Low,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => write!(f, "Low"),
            Confidence::Medium => write!(f, "Medium"),
            Confidence::High => write!(f, "High"),
        }
    }
}

/// A concrete edit a suggestion proposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChange {
    pub file: String,
    pub before: String,
    pub after: String,
}

/// One actionable compile-time optimization suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub file_path: String,
    pub line_number: u32,
    pub estimated_impact_ms: f64,
    pub confidence: Confidence,
    pub affected_files: Vec<String>,
    pub code_changes: Vec<CodeChange>,
}

impl Suggestion {
    /// Identity for deduplication within one result set.
    pub fn dedup_key(&self) -> (SuggestionType, String, String) {
        (
            self.suggestion_type,
            self.file_path.clone(),
            self.title.clone(),
        )
    }

    /// Ranking order: priority descending, estimated impact descending,
    /// title ascending.
    pub fn rank_cmp(&self, other: &Suggestion) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| {
                other
                    .estimated_impact_ms
                    .partial_cmp(&self.estimated_impact_ms)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| self.title.cmp(&other.title))
    }

    pub fn to_dict(&self) -> Value {
        json!({
            "type": self.suggestion_type.as_str(),
            "priority": self.priority.name(),
            "title": self.title,
            "description": self.description,
            "file_path": self.file_path,
            "line_number": self.line_number,
            "estimated_impact_ms": self.estimated_impact_ms,
            "confidence": self.confidence.name(),
            "affected_files": self.affected_files,
            "code_changes": self.code_changes.iter().map(|c| json!({
                "file": c.file,
                "before": c.before,
                "after": c.after,
            })).collect::<Vec<_>>(),
        })
    }
}
