//! File-class routing and the fixed tool sequence for each class.
//!
//! Scripts go through Prettier, ESLint and tsc; Python goes through ruff,
//! basedpyright and bandit. Order is fixed so identical input always yields
//! identically ordered reports.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::diagnostics::{DiagnosticReport, OutputParser};
use crate::parsers::{BanditParser, BasedpyrightParser, EslintParser, PrettierParser, RuffParser, TscParser};
use crate::runner::{ToolInvocation, ToolRunner};
use crate::timings::{RunTimings, StepOutcome};

const SCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx"];
const PYTHON_EXTENSIONS: &[&str] = &[".py"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// TypeScript and JavaScript
    Script,
    Python,
}

impl FileClass {
    pub fn from_path(path: &str) -> Option<Self> {
        if SCRIPT_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            Some(FileClass::Script)
        } else if PYTHON_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            Some(FileClass::Python)
        } else {
            None
        }
    }

    pub fn tools(self) -> &'static [Tool] {
        match self {
            FileClass::Script => &[Tool::Prettier, Tool::Eslint, Tool::Tsc],
            FileClass::Python => &[Tool::Ruff, Tool::Basedpyright, Tool::Bandit],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Prettier,
    Eslint,
    Tsc,
    Ruff,
    Basedpyright,
    Bandit,
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::Prettier => "prettier",
            Tool::Eslint => "eslint",
            Tool::Tsc => "tsc",
            Tool::Ruff => "ruff",
            Tool::Basedpyright => "basedpyright",
            Tool::Bandit => "bandit",
        }
    }

    pub fn parser(self) -> &'static dyn OutputParser {
        match self {
            Tool::Prettier => &PrettierParser,
            Tool::Eslint => &EslintParser,
            Tool::Tsc => &TscParser,
            Tool::Ruff => &RuffParser,
            Tool::Basedpyright => &BasedpyrightParser,
            Tool::Bandit => &BanditParser,
        }
    }

    /// Auto-fix pass whose output is discarded before the real check.
    fn fix_args(self, target: &str) -> Option<Vec<&str>> {
        match self {
            Tool::Eslint => Some(vec!["eslint", "--fix", target]),
            _ => None,
        }
    }

    fn check_args(self, target: &str) -> Vec<&str> {
        match self {
            Tool::Prettier => vec!["prettier", "--write", target],
            Tool::Eslint => vec!["eslint", target],
            Tool::Tsc => vec!["tsc", "--noEmit", target],
            Tool::Ruff => vec!["ruff", "check", "--fix", target],
            Tool::Basedpyright => vec!["basedpyright", target],
            Tool::Bandit => vec!["bandit", "-q", target],
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prettier" => Ok(Tool::Prettier),
            "eslint" => Ok(Tool::Eslint),
            "tsc" | "typescript" => Ok(Tool::Tsc),
            "ruff" => Ok(Tool::Ruff),
            "basedpyright" | "pyright" => Ok(Tool::Basedpyright),
            "bandit" => Ok(Tool::Bandit),
            other => Err(format!("unknown tool: {other}")),
        }
    }
}

/// Where and on what path the tools of one file class run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub class: FileClass,
    /// Path handed to each tool
    pub target: String,
    pub cwd: Option<PathBuf>,
}

impl Pipeline {
    /// Resolve the pipeline for an existing file.
    ///
    /// Script tools run from the nearest ancestor holding `node_modules`, with
    /// the file path relative to it; without one there is nothing to run.
    /// Python tools run on the path as given.
    pub fn for_file(path: &Path) -> Option<Self> {
        let class = FileClass::from_path(&path.to_string_lossy())?;
        match class {
            FileClass::Script => {
                let root = find_node_root(path)?;
                let relative = path.strip_prefix(&root).ok()?;
                Some(Self {
                    class,
                    target: relative.to_string_lossy().into_owned(),
                    cwd: Some(root),
                })
            }
            FileClass::Python => Some(Self {
                class,
                target: path.to_string_lossy().into_owned(),
                cwd: None,
            }),
        }
    }

    fn launcher<'a>(&self, cfg: &'a Config) -> &'a [String] {
        match self.class {
            FileClass::Script => &cfg.node_launcher,
            FileClass::Python => &cfg.python_launcher,
        }
    }

    fn invocation(&self, cfg: &Config, args: &[&str]) -> ToolInvocation {
        let invocation = ToolInvocation::launched(self.launcher(cfg), args);
        match &self.cwd {
            Some(dir) => invocation.in_dir(dir),
            None => invocation,
        }
    }

    /// Run every enabled tool in order and keep the non-empty reports.
    pub fn run(&self, cfg: &Config, runner: &dyn ToolRunner) -> PipelineRun {
        let mut run = PipelineRun::default();
        for &tool in self.class.tools() {
            if !cfg.is_enabled(tool) {
                tracing::debug!(%tool, "skipping disabled tool");
                run.timings.record(tool, StepOutcome::Skipped, Duration::ZERO);
                continue;
            }
            let started = Instant::now();
            let (report, outcome) = self.run_tool(tool, cfg, runner);
            run.timings.record(tool, outcome, started.elapsed());
            run.reports.extend(report);
        }
        run
    }

    fn run_tool(&self, tool: Tool, cfg: &Config, runner: &dyn ToolRunner) -> (Option<DiagnosticReport>, StepOutcome) {
        if let Some(args) = tool.fix_args(&self.target) {
            runner.run(&self.invocation(cfg, &args));
        }
        let raw = runner.run(&self.invocation(cfg, &tool.check_args(&self.target)));
        let report = tool.parser().parse(&raw);

        let outcome = if raw.timed_out {
            StepOutcome::TimedOut
        } else if report.is_some() {
            StepOutcome::Reported
        } else {
            StepOutcome::Clean
        };
        tracing::debug!(%tool, exit_code = raw.exit_code, ?outcome, "tool step complete");
        (report, outcome)
    }
}

/// Reports and step timings of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineRun {
    pub reports: Vec<DiagnosticReport>,
    pub timings: RunTimings,
}

/// Nearest ancestor of `path` containing a `node_modules` directory.
pub fn find_node_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip(1)
        .find(|dir| dir.join("node_modules").exists())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_extension() {
        assert_eq!(FileClass::from_path("src/app.tsx"), Some(FileClass::Script));
        assert_eq!(FileClass::from_path("lib/x.js"), Some(FileClass::Script));
        assert_eq!(FileClass::from_path("tool.py"), Some(FileClass::Python));
        assert_eq!(FileClass::from_path("README.md"), None);
        assert_eq!(FileClass::from_path("main.rs"), None);
        assert_eq!(FileClass::from_path("types.d.mts"), None);
    }

    #[test]
    fn tool_order_is_fixed() {
        assert_eq!(FileClass::Script.tools(), &[Tool::Prettier, Tool::Eslint, Tool::Tsc]);
        assert_eq!(FileClass::Python.tools(), &[Tool::Ruff, Tool::Basedpyright, Tool::Bandit]);
    }

    #[test]
    fn tool_names_round_trip() {
        for tool in FileClass::Script.tools().iter().chain(FileClass::Python.tools()) {
            assert_eq!(tool.name().parse::<Tool>(), Ok(*tool));
        }
        assert!("mypy".parse::<Tool>().is_err());
    }

    #[test]
    fn invocation_uses_class_launcher_and_root() {
        let cfg = Config {
            node_launcher: vec!["pnpm".to_string(), "exec".to_string()],
            ..Config::default()
        };
        let script = Pipeline {
            class: FileClass::Script,
            target: "src/app.ts".to_string(),
            cwd: Some(PathBuf::from("/repo/web")),
        };
        let inv = script.invocation(&cfg, &Tool::Tsc.check_args(&script.target));
        assert_eq!(inv.command_line(), "pnpm exec tsc --noEmit src/app.ts");
        assert_eq!(inv.cwd.as_deref(), Some(Path::new("/repo/web")));

        let python = Pipeline {
            class: FileClass::Python,
            target: "/repo/svc.py".to_string(),
            cwd: None,
        };
        let launcher = python.launcher(&cfg).to_vec();
        drop(python);
        assert_eq!(launcher, vec!["uv", "run"]);
    }

    #[test]
    fn node_root_is_nearest_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("packages/web");
        std::fs::create_dir_all(pkg.join("node_modules")).unwrap();
        std::fs::create_dir_all(pkg.join("src")).unwrap();
        let file = pkg.join("src/app.ts");
        std::fs::write(&file, "export {};\n").unwrap();

        let pipeline = Pipeline::for_file(&file).unwrap();
        assert_eq!(pipeline.cwd.as_deref(), Some(pkg.as_path()));
        assert_eq!(pipeline.target, "src/app.ts");
    }

    #[test]
    fn script_without_node_modules_has_no_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("orphan.ts");
        std::fs::write(&file, "").unwrap();
        // A stray node_modules above the temp dir would make this flaky
        if find_node_root(&file).is_none() {
            assert!(Pipeline::for_file(&file).is_none());
        }
    }
}
