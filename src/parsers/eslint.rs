use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{base_name, Diagnostic, DiagnosticReport, OutputParser, RawToolResult, Severity};

const TOOL: &str = "ESLint";
const ZERO_PROBLEMS: &str = "✖ 0 problems";

static SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"✖ (\d+) problems? \((\d+) errors?, (\d+) warnings?\)").unwrap());
//   12:5  error  'x' is assigned a value but never used  no-unused-vars
static ISSUE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+(\d+):(\d+)\s+(warning|error)\s+(.+?)\s+([\w@/-]+)\s*$").unwrap());

/// Parses ESLint's stylish formatter output.
///
/// The exit code is ignored: ESLint exits nonzero for config problems and zero
/// for warning-only runs, so only the summary line is trusted.
pub struct EslintParser;

struct Summary {
    total: usize,
    errors: usize,
    warnings: usize,
}

/// Issues sharing a rule id, in the order the rule was first seen.
struct RuleGroup {
    rule: String,
    lines: Vec<u32>,
}

impl EslintParser {
    fn summary(output: &str) -> Option<Summary> {
        let caps = SUMMARY.captures(output)?;
        Some(Summary {
            total: caps[1].parse().ok()?,
            errors: caps[2].parse().ok()?,
            warnings: caps[3].parse().ok()?,
        })
    }

    /// First unindented line; stylish prints a file header before its rows.
    fn file_header(output: &str) -> Option<&str> {
        output
            .lines()
            .find(|line| !line.trim().is_empty() && !line.starts_with(' '))
            .map(base_name)
    }

    fn counts_label(summary: &Summary) -> String {
        if summary.errors > 0 && summary.warnings > 0 {
            format!("{} error(s), {} warning(s)", summary.errors, summary.warnings)
        } else if summary.errors > 0 {
            format!("{} error(s)", summary.errors)
        } else {
            format!("{} warning(s)", summary.warnings)
        }
    }
}

impl OutputParser for EslintParser {
    fn tool_name(&self) -> &'static str {
        TOOL
    }

    fn parse(&self, raw: &RawToolResult) -> Option<DiagnosticReport> {
        let output = raw.text.as_str();
        if output.trim().is_empty() || output.contains(ZERO_PROBLEMS) {
            return None;
        }

        let summary = Self::summary(output)?;
        if summary.total == 0 {
            return None;
        }

        let file = Self::file_header(output);
        let mut groups: Vec<RuleGroup> = Vec::new();
        let mut diagnostics = Vec::new();

        for line in output.lines() {
            let Some(caps) = ISSUE_ROW.captures(line) else {
                continue;
            };
            let Ok(line_no) = caps[1].parse::<u32>() else {
                continue;
            };
            let rule = &caps[5];
            let severity = if &caps[3] == "error" { Severity::Error } else { Severity::Warning };

            diagnostics.push(
                Diagnostic::new(file.unwrap_or_default(), severity, caps[4].trim())
                    .at(Some(line_no), caps[2].parse().ok())
                    .with_code(rule),
            );
            match groups.iter_mut().find(|g| g.rule == rule) {
                Some(group) => group.lines.push(line_no),
                None => groups.push(RuleGroup {
                    rule: rule.to_string(),
                    lines: vec![line_no],
                }),
            }
        }

        let counts = Self::counts_label(&summary);
        if groups.is_empty() {
            // Summary parsed but rows did not: report the count and nothing else.
            return Some(
                DiagnosticReport::new(TOOL, format!("{TOOL}: {counts}"))
                    .with_counts(summary.total, summary.errors, summary.warnings),
            );
        }

        let mut rendered = match file {
            Some(file) => format!("{TOOL}: {counts} in {file}"),
            None => format!("{TOOL}: {counts}"),
        };

        // Stable sort keeps first-seen order among equal counts.
        groups.sort_by(|a, b| b.lines.len().cmp(&a.lines.len()));
        for group in &groups {
            let lines = group
                .lines
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            rendered.push_str(&format!("\n  - {}: {}× (lines {})", group.rule, group.lines.len(), lines));
        }

        Some(
            DiagnosticReport::new(TOOL, rendered)
                .with_counts(summary.total, summary.errors, summary.warnings)
                .with_diagnostics(diagnostics),
        )
    }
}
