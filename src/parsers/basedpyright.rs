//! basedpyright: full detail for errors, count only for warnings.
//!
//! Error rows are followed by indented context lines that belong to them, so
//! the scan is a two-state machine. A block opens on an error row, grows on
//! context lines and closes on anything else.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{base_name, Diagnostic, DiagnosticReport, OutputParser, RawToolResult, Severity};

const TOOL: &str = "basedpyright";

static ERROR_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+.+:\d+:\d+ - error:").unwrap());
static WARNING_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+.+:\d+:\d+ - warning:").unwrap());
static CONTEXT_ROW: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s{4,}[A-Z"]"#).unwrap());
static ERROR_DETAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(.+):(\d+):(\d+) - error: (.*)$").unwrap());
static RULE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((report\w+)\)\s*$").unwrap());
static ERROR_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) errors?\b").unwrap());
static WARNING_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+) warnings?\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Error,
    Warning,
    Context,
    Other,
}

fn classify(line: &str) -> LineKind {
    if ERROR_ROW.is_match(line) {
        LineKind::Error
    } else if WARNING_ROW.is_match(line) {
        LineKind::Warning
    } else if !line.trim().is_empty() && CONTEXT_ROW.is_match(line) {
        LineKind::Context
    } else {
        LineKind::Other
    }
}

enum ScanState<'a> {
    Idle,
    Accumulating(Vec<&'a str>),
}

/// Collect every error block, each one the error row plus its context lines.
fn error_blocks(output: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut state = ScanState::Idle;

    for line in output.lines() {
        state = match (classify(line), state) {
            (LineKind::Error, ScanState::Accumulating(block)) => {
                blocks.push(block);
                ScanState::Accumulating(vec![line])
            }
            (LineKind::Error, ScanState::Idle) => ScanState::Accumulating(vec![line]),
            (LineKind::Context, ScanState::Accumulating(mut block)) => {
                block.push(line);
                ScanState::Accumulating(block)
            }
            (LineKind::Context, ScanState::Idle) => ScanState::Idle,
            (LineKind::Warning | LineKind::Other, ScanState::Accumulating(block)) => {
                blocks.push(block);
                ScanState::Idle
            }
            (LineKind::Warning | LineKind::Other, ScanState::Idle) => ScanState::Idle,
        };
    }
    if let ScanState::Accumulating(block) = state {
        blocks.push(block);
    }
    blocks
}

fn count(re: &Regex, summary: &str) -> usize {
    re.captures(summary)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

fn block_diagnostic(block: &[&str]) -> Option<Diagnostic> {
    let caps = ERROR_DETAIL.captures(block.first()?)?;
    let mut message = caps[4].trim().to_string();
    for context in &block[1..] {
        message.push('\n');
        message.push_str(context.trim());
    }
    let mut diagnostic = Diagnostic::new(base_name(&caps[1]), Severity::Error, message)
        .at(caps[2].parse().ok(), caps[3].parse().ok());
    // The rule id trails the last line of the block
    if let Some(rule) = block.last().and_then(|line| RULE_SUFFIX.captures(line)) {
        diagnostic = diagnostic.with_code(&rule[1]);
    }
    Some(diagnostic)
}

pub struct BasedpyrightParser;

impl OutputParser for BasedpyrightParser {
    fn tool_name(&self) -> &'static str {
        TOOL
    }

    fn parse(&self, raw: &RawToolResult) -> Option<DiagnosticReport> {
        let output = raw.text.trim_end();
        let summary = output
            .lines()
            .rev()
            .find(|line| line.contains(" error") && line.contains(" warning"))?
            .trim();

        let errors = count(&ERROR_COUNT, summary);
        let warnings = count(&WARNING_COUNT, summary);
        if errors == 0 && warnings == 0 {
            return None;
        }

        let blocks = error_blocks(output);
        let diagnostics: Vec<Diagnostic> = blocks.iter().filter_map(|b| block_diagnostic(b)).collect();

        let rendered = if blocks.is_empty() {
            summary.to_string()
        } else {
            let mut text = blocks
                .iter()
                .map(|block| block.join("\n"))
                .collect::<Vec<_>>()
                .join("\n");
            text.push('\n');
            text.push_str(summary);
            text
        };

        Some(
            DiagnosticReport::new(TOOL, rendered)
                .with_counts(errors + warnings, errors, warnings)
                .with_diagnostics(diagnostics),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "\
/proj/app.py
  /proj/app.py:3:5 - error: Type \"Literal['x']\" is not assignable to declared type \"int\"
    \"Literal['x']\" is not assignable to \"int\" (reportAssignmentType)
  /proj/app.py:7:1 - warning: Import \"os\" is not accessed (reportUnusedImport)
  /proj/app.py:9:12 - error: Cannot access attribute \"foo\" for class \"str\"
    Attribute \"foo\" is unknown (reportAttributeAccessIssue)
2 errors, 1 warning, 0 notes
";

    fn parse(text: &str) -> Option<DiagnosticReport> {
        BasedpyrightParser.parse(&RawToolResult::new(text, 1))
    }

    #[test]
    fn no_summary_or_zero_counts_is_silent() {
        assert!(parse("").is_none());
        assert!(parse("Searching for source files\nNo configuration file found.").is_none());
        assert!(parse("0 errors, 0 warnings, 0 notes").is_none());
    }

    #[test]
    fn ten_errors_is_not_zero_errors() {
        let report = parse("10 errors, 0 warnings, 0 notes").unwrap();
        assert_eq!(report.error_count, 10);
        assert_eq!(report.rendered_summary, "10 errors, 0 warnings, 0 notes");
    }

    #[test]
    fn errors_are_expanded_and_warnings_counted() {
        let report = parse(MIXED).unwrap();
        let expected = "  /proj/app.py:3:5 - error: Type \"Literal['x']\" is not assignable to declared type \"int\"\n    \"Literal['x']\" is not assignable to \"int\" (reportAssignmentType)\n  /proj/app.py:9:12 - error: Cannot access attribute \"foo\" for class \"str\"\n    Attribute \"foo\" is unknown (reportAttributeAccessIssue)\n2 errors, 1 warning, 0 notes";
        assert_eq!(report.rendered_summary, expected);
        assert_eq!((report.error_count, report.warning_count), (2, 1));
        assert!(!report.rendered_summary.contains("Import \"os\""));
    }

    #[test]
    fn warnings_only_yields_summary_alone() {
        let out = "/p/a.py\n  /p/a.py:1:1 - warning: something (reportFoo)\n0 errors, 1 warning, 0 notes";
        assert_eq!(parse(out).unwrap().rendered_summary, "0 errors, 1 warning, 0 notes");
    }

    #[test]
    fn warning_row_closes_open_block() {
        let out = "  /p/a.py:1:1 - error: first\n  /p/a.py:2:1 - warning: w\n    Dangling context\n1 error, 1 warning, 0 notes";
        let blocks = error_blocks(out);
        assert_eq!(blocks, vec![vec!["  /p/a.py:1:1 - error: first"]]);
        let _ = parse(out).unwrap();
    }

    #[test]
    fn consecutive_errors_form_separate_blocks() {
        let out = "  /p/a.py:1:1 - error: one\n  /p/a.py:2:1 - error: two\n    Context two";
        let blocks = error_blocks(out);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], vec!["  /p/a.py:2:1 - error: two", "    Context two"]);
    }

    #[test]
    fn error_blocks_carry_rule_codes() {
        let report = parse(MIXED).unwrap();
        assert_eq!(report.diagnostics.len(), 2);
        let first = &report.diagnostics[0];
        assert_eq!(first.file, "app.py");
        assert_eq!((first.line, first.column), (Some(3), Some(5)));
        assert_eq!(first.code.as_deref(), Some("reportAssignmentType"));
        assert_eq!(report.diagnostics[1].code.as_deref(), Some("reportAttributeAccessIssue"));
    }
}
