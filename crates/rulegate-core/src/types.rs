//! Core types for findings and scan results.

use miette::{Diagnostic, SourceSpan};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level of a rule and of the findings it produces.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, never blocks a write.
    Info,
    /// Warning that should be addressed.
    #[default]
    Warn,
    /// Error that must be fixed.
    Error,
}

impl Severity {
    /// Parses a severity token (`error`, `warn`, `info`), case-insensitively.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" => Some(Self::Warn),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Half-open byte range `[start, end)` into a unit of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first matched byte.
    pub start: usize,
    /// Byte offset one past the last matched byte.
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length of the span in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true for a zero-width span.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One concrete match of a rule against a unit of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Id of the rule that produced this finding.
    pub rule_id: String,
    /// Severity copied from the rule.
    pub severity: Severity,
    /// Human-readable message copied from the rule.
    pub message: String,
    /// Matched byte range.
    pub span: Span,
    /// Path of the unit of text the finding belongs to.
    pub source: PathBuf,
    /// Line of `span.start` (1-indexed).
    pub line: usize,
    /// Column of `span.start` in characters (1-indexed).
    pub column: usize,
}

impl Finding {
    /// Formats the finding for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        format!(
            "{} at {}:{}:{}\n  {}: {}\n",
            self.rule_id,
            self.source.display(),
            self.line,
            self.column,
            self.severity,
            self.message,
        )
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} [{}] {}",
            self.source.display(),
            self.line,
            self.column,
            self.severity,
            self.rule_id,
            self.message
        )
    }
}

/// Converts a [`Finding`] to a miette diagnostic for rich terminal rendering.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("[{rule_id}] {message}")]
pub struct FindingDiagnostic {
    rule_id: String,
    message: String,
    #[label("{severity}")]
    span: SourceSpan,
    severity: Severity,
}

impl From<&Finding> for FindingDiagnostic {
    fn from(f: &Finding) -> Self {
        Self {
            rule_id: f.rule_id.clone(),
            message: f.message.clone(),
            span: SourceSpan::from((f.span.start, f.span.len())),
            severity: f.severity,
        }
    }
}

/// Result of scanning a set of files.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// All findings, file by file in scan order.
    pub findings: Vec<Finding>,
    /// Number of files matched.
    pub files_scanned: usize,
    /// Number of files skipped because they were not valid UTF-8 text.
    pub files_skipped: usize,
    /// Whether the file cap stopped the scan early.
    pub capped: bool,
}

impl ScanReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are any error findings.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Returns findings filtered by severity.
    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .collect()
    }

    /// Counts findings as `(errors, warnings, infos)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        count_by_severity(&self.findings)
    }
}

/// Counts findings as `(errors, warnings, infos)`.
#[must_use]
pub fn count_by_severity(findings: &[Finding]) -> (usize, usize, usize) {
    findings
        .iter()
        .fold((0, 0, 0), |(e, w, i), f| match f.severity {
            Severity::Error => (e + 1, w, i),
            Severity::Warn => (e, w + 1, i),
            Severity::Info => (e, w, i + 1),
        })
}
