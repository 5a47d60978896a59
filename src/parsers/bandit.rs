use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::{base_name, Diagnostic, DiagnosticReport, OutputParser, RawToolResult, Severity};

const TOOL: &str = "bandit";
const SEVERITY_MARKER: &str = "Total issues (by severity):";
/// Marker line plus the Undefined/Low/Medium/High rows that follow it.
const SEVERITY_WINDOW: usize = 5;
const LEVELS: [&str; 3] = ["Low:", "Medium:", "High:"];

// >> Issue: [B105:hardcoded_password_string] Possible hardcoded password: 'x'
static ISSUE: Lazy<Regex> = Lazy::new(|| Regex::new(r">> Issue: \[(\w+)(?::\w+)?\] (.+)$").unwrap());
static ISSUE_SEVERITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"Severity: (\w+)").unwrap());
static LOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Location: (.+?):(\d+)(?::(\d+))?\s*$").unwrap());

/// Security scan summary: only the non-zero severity totals are surfaced.
pub struct BanditParser;

struct SeverityTotals {
    rendered: Vec<String>,
    low: usize,
    medium: usize,
    high: usize,
}

impl BanditParser {
    /// Totals from the first severity block that lists a non-zero level.
    fn severity_totals(lines: &[&str]) -> Option<SeverityTotals> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(SEVERITY_MARKER))
            .find_map(|(start, _)| Self::window_totals(&lines[start..]))
    }

    fn window_totals(window: &[&str]) -> Option<SeverityTotals> {
        let mut totals = SeverityTotals {
            rendered: Vec::new(),
            low: 0,
            medium: 0,
            high: 0,
        };

        for line in window.iter().take(SEVERITY_WINDOW) {
            let line = line.trim();
            if !LEVELS.iter().any(|level| line.contains(level)) || line.ends_with(": 0") {
                continue;
            }
            let parts: Vec<&str> = line.split(':').collect();
            let [severity, count] = parts.as_slice() else {
                continue;
            };
            let (severity, count) = (severity.trim(), count.trim());
            let n = count.parse::<usize>().unwrap_or(0);
            match severity {
                "Low" => totals.low += n,
                "Medium" => totals.medium += n,
                "High" => totals.high += n,
                _ => {}
            }
            totals.rendered.push(format!("{severity}: {count}"));
        }

        (!totals.rendered.is_empty()).then_some(totals)
    }

    fn issues(lines: &[&str]) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        for line in lines {
            if let Some(caps) = ISSUE.captures(line) {
                diagnostics.push(Diagnostic::new("", Severity::Info, caps[2].trim()).with_code(&caps[1]));
                continue;
            }
            let Some(current) = diagnostics.last_mut() else {
                continue;
            };
            if let Some(caps) = ISSUE_SEVERITY.captures(line) {
                current.severity = match &caps[1] {
                    "High" => Severity::Error,
                    "Medium" => Severity::Warning,
                    _ => Severity::Info,
                };
            } else if let Some(caps) = LOCATION.captures(line) {
                current.file = base_name(&caps[1]).to_string();
                current.line = caps[2].parse().ok();
                current.column = caps.get(3).and_then(|c| c.as_str().parse().ok());
            }
        }
        diagnostics
    }
}

impl OutputParser for BanditParser {
    fn tool_name(&self) -> &'static str {
        TOOL
    }

    fn parse(&self, raw: &RawToolResult) -> Option<DiagnosticReport> {
        if raw.exit_code == 0 || raw.is_blank() {
            return None;
        }

        let lines: Vec<&str> = raw.text.trim().lines().collect();
        let diagnostics = Self::issues(&lines);

        if let Some(totals) = Self::severity_totals(&lines) {
            let total = totals.low + totals.medium + totals.high;
            return Some(
                DiagnosticReport::new(TOOL, format!("{TOOL}: {}", totals.rendered.join(", ")))
                    .with_counts(total.max(1), totals.high, totals.medium)
                    .with_diagnostics(diagnostics),
            );
        }

        if raw.text.contains("Issue:") {
            let count = diagnostics.len();
            return Some(
                DiagnosticReport::new(TOOL, format!("{TOOL}: Security issues detected"))
                    .with_counts(count.max(1), 0, 0)
                    .with_diagnostics(diagnostics),
            );
        }

        None
    }
}
