//! Post-edit quality hook: runs each edited file's linters, formatters and
//! type checkers, and reports only what they could not fix.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Safely truncate a UTF-8 string to a maximum number of characters
pub fn truncate_utf8_safe(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}

/// Hook configuration: timeouts, launchers, disabled tools, ignore globs
pub mod config;

/// Normalized diagnostic model and the output parser trait
pub mod diagnostics;

pub mod error;

/// One output parser per external tool
pub mod parsers;

/// File-class routing and tool sequencing
pub mod pipeline;

pub mod report;

/// External process execution with timeouts
pub mod runner;

pub mod timings;

pub use config::{load_config, Config};
pub use diagnostics::{Diagnostic, DiagnosticReport, OutputParser, RawToolResult, Severity};
pub use error::{HookError, RunnerError};
pub use pipeline::{FileClass, Pipeline, PipelineRun, Tool};
pub use runner::{CommandRunner, SecurityConfig, ToolInvocation, ToolRunner};

/// Claude Code Hook input data structure - actual fields from Claude Code
#[derive(Debug, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub hook_event_name: Option<String>,
}

impl HookInput {
    pub fn from_json(text: &str) -> Result<Self, HookError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// PostToolUse hook output
#[derive(Debug, Serialize)]
pub struct PostToolUseOutput {
    #[serde(rename = "hookSpecificOutput")]
    pub hook_specific_output: PostToolUseHookOutput,
}

#[derive(Debug, Serialize)]
pub struct PostToolUseHookOutput {
    #[serde(rename = "hookEventName")]
    pub hook_event_name: String,
    #[serde(rename = "additionalContext")]
    pub additional_context: String,
}

impl PostToolUseOutput {
    pub fn new(additional_context: String) -> Self {
        Self {
            hook_specific_output: PostToolUseHookOutput {
                hook_event_name: "PostToolUse".to_string(),
                additional_context,
            },
        }
    }
}

/// Get file path from tool input
pub fn extract_file_path(tool_input: &HashMap<String, serde_json::Value>) -> String {
    tool_input
        .get("file_path")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Run the quality pipeline for the file named in `input`.
///
/// `None` means stay silent: unsupported or missing file, ignored path, no
/// project root, or nothing left to report.
pub fn run_hook(input: &HookInput, cfg: &Config, runner: &dyn ToolRunner) -> Option<PostToolUseOutput> {
    let file_path = extract_file_path(&input.tool_input);
    if FileClass::from_path(&file_path).is_none() {
        tracing::debug!(path = %file_path, "unsupported file type");
        return None;
    }
    if config::should_ignore_path(cfg, &file_path) {
        tracing::debug!(path = %file_path, "path matches ignore globs");
        return None;
    }

    let path = Path::new(&file_path);
    if !path.exists() {
        tracing::debug!(path = %file_path, "edited file does not exist");
        return None;
    }

    let Some(pipeline) = Pipeline::for_file(path) else {
        tracing::debug!(path = %file_path, "no project root found");
        return None;
    };

    let run = pipeline.run(cfg, runner);
    if timings::enabled() {
        tracing::info!(target: "quality_gate_hooks::timings", "{}", run.timings.summary().trim_end());
    }
    let reports = run.reports;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.clone());
    let message = report::aggregate(&file_name, &reports)?;

    tracing::info!(
        path = %file_path,
        reports = reports.len(),
        issues = reports.iter().map(|r| r.total_count).sum::<usize>(),
        "quality issues remain"
    );
    Some(PostToolUseOutput::new(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate_utf8_safe("héllo", 5), "héllo");
        assert_eq!(truncate_utf8_safe("✖✖✖✖", 3), "✖✖…");
    }

    #[test]
    fn output_serializes_with_protocol_names() {
        let out = PostToolUseOutput::new("Code quality for a.py:\n- ruff: x".to_string());
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["hookSpecificOutput"]["hookEventName"], "PostToolUse");
        assert_eq!(v["hookSpecificOutput"]["additionalContext"], "Code quality for a.py:\n- ruff: x");
    }

    #[test]
    fn hook_input_tolerates_missing_fields() {
        let input = HookInput::from_json(r#"{"tool_input": {"file_path": "x.ts"}}"#).unwrap();
        assert_eq!(extract_file_path(&input.tool_input), "x.ts");
        let input = HookInput::from_json("{}").unwrap();
        assert_eq!(extract_file_path(&input.tool_input), "");
    }

    #[test]
    fn malformed_input_is_typed() {
        let err = HookInput::from_json("{not json").unwrap_err();
        assert!(matches!(err, HookError::InvalidInput(_)));
        assert!(err.to_string().starts_with("Invalid JSON input: "));
    }
}
