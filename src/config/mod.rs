use std::collections::HashSet;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::pipeline::Tool;

#[derive(Debug, Clone)]
pub struct Config {
    /// Per-tool wall-clock limit
    pub timeout_secs: u64,
    pub max_output_chars: usize,
    pub disabled_tools: HashSet<Tool>,
    pub ignore_globs: Option<GlobSet>,
    /// Prefix for JS/TS tools, e.g. `npx`
    pub node_launcher: Vec<String>,
    /// Prefix for Python tools, e.g. `uv run`
    pub python_launcher: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_output_chars: 10 * 1024 * 1024,
            disabled_tools: HashSet::new(),
            // None means: do not ignore anything
            ignore_globs: None,
            node_launcher: vec!["npx".to_string()],
            python_launcher: vec!["uv".to_string(), "run".to_string()],
        }
    }
}

impl Config {
    pub fn is_enabled(&self, tool: Tool) -> bool {
        !self.disabled_tools.contains(&tool)
    }

    /// Apply overrides from a parsed `.quality-hooks.json` document.
    pub fn apply_json(&mut self, json: &serde_json::Value) {
        if let Some(secs) = json.get("timeout_secs").and_then(|v| v.as_u64()) {
            self.timeout_secs = clamp_timeout(secs);
        }
        if let Some(list) = json.get("disabled_tools").and_then(|v| v.as_array()) {
            self.disabled_tools = parse_tools(list.iter().filter_map(|it| it.as_str()));
        }
        if let Some(globs) = json.get("ignore_globs").and_then(|v| v.as_array()) {
            if let Some(set) = build_globset(globs.iter().filter_map(|it| it.as_str())) {
                self.ignore_globs = Some(set);
            }
        }
        if let Some(launcher) = json.get("node_launcher").and_then(launcher_from_json) {
            self.node_launcher = launcher;
        }
        if let Some(launcher) = json.get("python_launcher").and_then(launcher_from_json) {
            self.python_launcher = launcher;
        }
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secs) = var("QUALITY_HOOKS_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok()) {
            self.timeout_secs = clamp_timeout(secs);
        }
        if let Some(val) = var("QUALITY_HOOKS_DISABLE") {
            self.disabled_tools = parse_tools(val.split(','));
        }
        if let Some(val) = var("QUALITY_HOOKS_IGNORE_GLOBS") {
            if let Some(set) = build_globset(val.split(',')) {
                self.ignore_globs = Some(set);
            }
        }
        if let Some(launcher) = var("QUALITY_HOOKS_NODE_LAUNCHER").and_then(|v| split_launcher(&v)) {
            self.node_launcher = launcher;
        }
        if let Some(launcher) = var("QUALITY_HOOKS_PYTHON_LAUNCHER").and_then(|v| split_launcher(&v)) {
            self.python_launcher = launcher;
        }
    }
}

/// Defaults, then the JSON config file, then environment variables.
///
/// The file comes from `QUALITY_HOOKS_CONFIG`, or `.quality-hooks.json` in the
/// working directory. An unreadable or malformed file is ignored.
pub fn load_config() -> Config {
    let mut cfg = Config::default();

    let cfg_path = std::env::var("QUALITY_HOOKS_CONFIG")
        .ok()
        .unwrap_or_else(|| ".quality-hooks.json".to_string());
    if let Ok(text) = std::fs::read_to_string(&cfg_path) {
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(json) => cfg.apply_json(&json),
            Err(e) => tracing::warn!(path = %cfg_path, error = %e, "ignoring malformed config file"),
        }
    }

    cfg.apply_env(|key| std::env::var(key).ok());
    cfg
}

pub fn should_ignore_path(cfg: &Config, path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    let p = std::path::Path::new(path);
    cfg.ignore_globs
        .as_ref()
        .map(|set| set.is_match(p))
        .unwrap_or(false)
}

fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(1, 600)
}

fn parse_tools<'a>(names: impl Iterator<Item = &'a str>) -> HashSet<Tool> {
    names
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|name| match name.parse::<Tool>() {
            Ok(tool) => Some(tool),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unknown tool in config");
                None
            }
        })
        .collect()
}

fn build_globset<'a>(patterns: impl Iterator<Item = &'a str>) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns.map(str::trim).filter(|s| !s.is_empty()) {
        if let Ok(glob) = Glob::new(pat) {
            builder.add(glob);
        }
    }
    builder.build().ok()
}

fn split_launcher(value: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = value.split_whitespace().map(String::from).collect();
    (!parts.is_empty()).then_some(parts)
}

fn launcher_from_json(value: &serde_json::Value) -> Option<Vec<String>> {
    match value {
        serde_json::Value::String(s) => split_launcher(s),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|it| it.as_str().map(String::from))
                .collect();
            (!parts.is_empty()).then_some(parts)
        }
        _ => None,
    }
}
