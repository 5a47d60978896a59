use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{base_name, Diagnostic, DiagnosticReport, OutputParser, RawToolResult, Severity};

const TOOL: &str = "ruff";
const ALL_CLEAR: &str = "All checks passed";

// "0 remaining" as a whole count, not the tail of "10 remaining"
static ZERO_REMAINING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^0-9])0 remaining").unwrap());
static REMAINING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) remaining").unwrap());
// app.py:3:8: F401 [*] `os` imported but unused
static CONCISE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?):(\d+):(\d+): ([A-Z]+[0-9]+) (.+)$").unwrap());

/// Parser for `ruff check --fix`: reports what the autofix pass left behind.
pub struct RuffParser;

impl RuffParser {
    fn diagnostics(output: &str) -> Vec<Diagnostic> {
        output
            .lines()
            .filter_map(|line| CONCISE_ROW.captures(line.trim()))
            .map(|caps| {
                let message = caps[5].trim_start_matches("[*]").trim();
                Diagnostic::new(base_name(&caps[1]), Severity::Error, message)
                    .at(caps[2].parse().ok(), caps[3].parse().ok())
                    .with_code(&caps[4])
            })
            .collect()
    }

    fn remaining(output: &str) -> Option<usize> {
        REMAINING.captures(output).and_then(|caps| caps[1].parse().ok())
    }
}

impl OutputParser for RuffParser {
    fn tool_name(&self) -> &'static str {
        TOOL
    }

    fn parse(&self, raw: &RawToolResult) -> Option<DiagnosticReport> {
        let output = raw.text.as_str();
        if ZERO_REMAINING.is_match(output) || output.contains(ALL_CLEAR) {
            return None;
        }

        let diagnostics = Self::diagnostics(output);
        let total = Self::remaining(output)
            .filter(|n| *n > 0)
            .unwrap_or(diagnostics.len())
            .max(1);

        let fix_summary = output
            .lines()
            .find(|line| line.contains("remaining") && line.contains("fixed"));
        let rendered = match fix_summary {
            Some(line) => format!("{TOOL}: {}", line.trim()),
            None if !output.trim().is_empty() => format!("{TOOL} issues:\n{}", output.trim()),
            None => return None,
        };

        Some(
            DiagnosticReport::new(TOOL, rendered)
                .with_counts(total, total, 0)
                .with_diagnostics(diagnostics),
        )
    }
}
