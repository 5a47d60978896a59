use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{base_name, Diagnostic, DiagnosticReport, OutputParser, RawToolResult, Severity};

const TOOL: &str = "Prettier";

static WARN_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)\[warn\] (.+)$").unwrap());
// [error] path/to/file.ts: SyntaxError: Unexpected token (12:4)
static SYNTAX_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[error\] ([^:]+): (\w+): (.+?) \((\d+):(\d+)\)").unwrap());
static ERROR_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[error\] ([^\s:]+)").unwrap());

/// Prettier runs with `--write`, so exit code alone tells most of the story:
/// 0 formatted or clean, 1 left something unformatted, 2 could not parse.
pub struct PrettierParser;

impl PrettierParser {
    fn unformatted(output: &str) -> DiagnosticReport {
        match WARN_LINE.captures(output) {
            Some(caps) => {
                let file = base_name(&caps[1]).to_string();
                DiagnosticReport::new(TOOL, format!("{TOOL}: Formatting needed in {file} (--write failed?)"))
                    .with_counts(1, 0, 1)
                    .with_diagnostics(vec![Diagnostic::new(file, Severity::Warning, "Formatting needed")])
            }
            None => DiagnosticReport::unparsed(TOOL, format!("{TOOL}: Formatting issues detected")),
        }
    }

    fn syntax_error(output: &str) -> Option<DiagnosticReport> {
        if let Some(caps) = SYNTAX_ERROR.captures(output) {
            let file = base_name(&caps[1]).to_string();
            let error_type = caps[2].trim();
            let message = caps[3].trim();
            let line = &caps[4];
            let col = &caps[5];

            let rendered = format!("{TOOL}: Syntax error at {file}:{line}:{col}\n  {error_type}: {message}");
            let diagnostic = Diagnostic::new(file, Severity::Error, message)
                .at(line.parse().ok(), col.parse().ok())
                .with_code(error_type);
            return Some(
                DiagnosticReport::new(TOOL, rendered)
                    .with_counts(1, 1, 0)
                    .with_diagnostics(vec![diagnostic]),
            );
        }

        if !output.contains("[error]") {
            return None;
        }
        let rendered = match ERROR_FILE.captures(output) {
            Some(caps) => format!("{TOOL}: Syntax error in {}", base_name(&caps[1])),
            None => format!("{TOOL}: Syntax error detected"),
        };
        Some(DiagnosticReport::unparsed(TOOL, rendered).with_counts(1, 1, 0))
    }
}

impl OutputParser for PrettierParser {
    fn tool_name(&self) -> &'static str {
        TOOL
    }

    fn parse(&self, raw: &RawToolResult) -> Option<DiagnosticReport> {
        match raw.exit_code {
            0 => None,
            1 => Some(Self::unformatted(&raw.text)),
            2 => Self::syntax_error(&raw.text).or_else(|| Some(unexpected_exit(2))),
            code => Some(unexpected_exit(code)),
        }
    }
}

fn unexpected_exit(code: i32) -> DiagnosticReport {
    DiagnosticReport::unparsed(TOOL, format!("{TOOL}: Unexpected exit code {code}"))
}
