use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{base_name, Diagnostic, DiagnosticReport, OutputParser, RawToolResult, Severity};

const TOOL: &str = "TypeScript";

// src/app.ts(10,5): error TS2322: Type 'string' is not assignable to type 'number'.
static ERROR_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)\((\d+),(\d+)\): error (TS\d+): (.+)$").unwrap());

/// Full-detail parser for `tsc --noEmit`.
///
/// Every error is listed; type errors are few and each one needs its own fix.
pub struct TscParser;

impl OutputParser for TscParser {
    fn tool_name(&self) -> &'static str {
        TOOL
    }

    fn parse(&self, raw: &RawToolResult) -> Option<DiagnosticReport> {
        if raw.exit_code == 0 || raw.is_blank() {
            return None;
        }

        let mut header_file: Option<String> = None;
        let mut details = Vec::new();
        let mut diagnostics = Vec::new();

        for line in raw.text.lines() {
            let Some(caps) = ERROR_ROW.captures(line.trim()) else {
                continue;
            };
            let file = base_name(&caps[1]).to_string();
            let (row, col, code, message) = (&caps[2], &caps[3], &caps[4], caps[5].trim());

            header_file.get_or_insert_with(|| file.clone());
            details.push(format!("  - {file}({row},{col}): {code}: {message}"));
            diagnostics.push(
                Diagnostic::new(file, Severity::Error, message)
                    .at(row.parse().ok(), col.parse().ok())
                    .with_code(code),
            );
        }

        if diagnostics.is_empty() {
            return None;
        }

        let count = diagnostics.len();
        let mut rendered = match &header_file {
            Some(file) => format!("{TOOL}: {count} error(s) in {file}"),
            None => format!("{TOOL}: {count} error(s)"),
        };
        for detail in &details {
            rendered.push('\n');
            rendered.push_str(detail);
        }

        Some(
            DiagnosticReport::new(TOOL, rendered)
                .with_counts(count, count, 0)
                .with_diagnostics(diagnostics),
        )
    }
}
