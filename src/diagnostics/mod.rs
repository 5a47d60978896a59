//! Normalized diagnostic model shared by every tool parser.
//!
//! Each external tool speaks its own loosely structured text dialect. Parsers
//! turn that text into a [`DiagnosticReport`], or into `None` when the run was
//! clean, so the aggregator never has to know which tool produced what.

use serde::Serialize;

/// Captured result of one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToolResult {
    /// Combined stdout followed by stderr
    pub text: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

impl RawToolResult {
    pub fn new(text: impl Into<String>, exit_code: i32) -> Self {
        Self {
            text: text.into(),
            exit_code,
            timed_out: false,
        }
    }

    pub fn timed_out(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_code: 1,
            timed_out: true,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One located issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub severity: Severity,
    /// Rule or error identifier (`semi`, `TS2322`, `B105`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(file: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
            severity,
            code: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, line: Option<u32>, column: Option<u32>) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Per-tool outcome for the edited file.
///
/// Only constructed when the tool left something for the caller to act on;
/// a clean run is represented by the absence of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    pub tool_name: String,
    pub total_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    /// May be empty when the tool only reports a count
    pub diagnostics: Vec<Diagnostic>,
    pub rendered_summary: String,
}

impl DiagnosticReport {
    pub fn new(tool_name: &str, rendered_summary: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            total_count: 0,
            error_count: 0,
            warning_count: 0,
            diagnostics: Vec::new(),
            rendered_summary: rendered_summary.into(),
        }
    }

    /// Report for a nonzero exit whose output could not be read in detail.
    pub fn unparsed(tool_name: &str, rendered_summary: impl Into<String>) -> Self {
        let mut report = Self::new(tool_name, rendered_summary);
        report.total_count = 1;
        report
    }

    pub fn with_counts(mut self, total: usize, errors: usize, warnings: usize) -> Self {
        self.total_count = total;
        self.error_count = errors;
        self.warning_count = warnings;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Turns one tool's raw output into a report.
///
/// Implementations must be pure: same input, same output, no I/O.
pub trait OutputParser: Send + Sync {
    fn tool_name(&self) -> &'static str;

    fn parse(&self, raw: &RawToolResult) -> Option<DiagnosticReport>;
}

/// Last path component, split on `/` the way tool output spells paths.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim();
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
