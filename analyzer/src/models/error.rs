use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced at the parser boundary.
///
/// The aggregator and suggester have no failure modes; everything that can go
/// wrong goes wrong here.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("trace file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("invalid trace format in {source_hint}: {reason}")]
    InvalidFormat { source_hint: String, reason: String },

    #[error("unsupported trace format in {source_hint}: {reason}")]
    Unsupported { source_hint: String, reason: String },

    #[error("truncated or malformed trace in {source_hint}: {reason}")]
    Truncated { source_hint: String, reason: String },

    #[error("failed to read trace file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Discriminant of [`TraceError`], for callers that classify failures
/// without matching on the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceErrorKind {
    NotFound,
    InvalidFormat,
    Unsupported,
    Truncated,
    Io,
}

impl TraceError {
    pub fn kind(&self) -> TraceErrorKind {
        match self {
            TraceError::NotFound { .. } => TraceErrorKind::NotFound,
            TraceError::InvalidFormat { .. } => TraceErrorKind::InvalidFormat,
            TraceError::Unsupported { .. } => TraceErrorKind::Unsupported,
            TraceError::Truncated { .. } => TraceErrorKind::Truncated,
            TraceError::Io { .. } => TraceErrorKind::Io,
        }
    }
}

impl std::fmt::Display for TraceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceErrorKind::NotFound => write!(f, "not-found"),
            TraceErrorKind::InvalidFormat => write!(f, "invalid-format"),
            TraceErrorKind::Unsupported => write!(f, "unsupported"),
            TraceErrorKind::Truncated => write!(f, "truncated"),
            TraceErrorKind::Io => write!(f, "io"),
        }
    }
}

/// One failed input in a multi-file run. Collected, not fatal: the analysis
/// proceeds with the units that did parse.
#[derive(Debug)]
pub struct ParseFailure {
    pub path: PathBuf,
    pub error: TraceError,
}
