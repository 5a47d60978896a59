/// External tool invocation
///
/// Runs whitelisted linters and formatters with a wall-clock timeout. A run
/// never fails from the caller's point of view: spawn errors and timeouts are
/// folded into the returned text so parsers can degrade on them like any other
/// unexpected output.
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::diagnostics::RawToolResult;
use crate::error::RunnerError;
use crate::truncate_utf8_safe;

/// How long to wait for output after killing a timed-out tool
const REAP_GRACE: Duration = Duration::from_secs(1);

/// One command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    /// Build from a launcher prefix (`npx`, `uv run`) followed by the tool args.
    pub fn launched(launcher: &[String], args: &[&str]) -> Self {
        let mut parts = launcher.iter().cloned().chain(args.iter().map(|a| a.to_string()));
        let program = parts.next().unwrap_or_default();
        Self::new(program, parts)
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Executes tool invocations. Implementations must not panic or return early
/// on failure; every outcome is a [`RawToolResult`].
pub trait ToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> RawToolResult;
}

/// Resource and whitelist limits for spawned tools
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub max_execution_time: Duration,
    /// Combined output beyond this is truncated
    pub max_output_chars: usize,
    pub allowed_commands: HashSet<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let allowed_commands = [
            "npx",
            "uv",
            "prettier",
            "eslint",
            "tsc",
            "ruff",
            "basedpyright",
            "bandit",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            max_execution_time: Duration::from_secs(30),
            max_output_chars: 10 * 1024 * 1024,
            allowed_commands,
        }
    }
}

impl SecurityConfig {
    /// Limits from the hook config; configured launchers are whitelisted too.
    pub fn from_config(cfg: &Config) -> Self {
        let mut security = Self {
            max_execution_time: Duration::from_secs(cfg.timeout_secs),
            max_output_chars: cfg.max_output_chars,
            ..Self::default()
        };
        for launcher in [&cfg.node_launcher, &cfg.python_launcher] {
            if let Some(name) = launcher.first().and_then(|p| program_name(p)) {
                security.allowed_commands.insert(name);
            }
        }
        security
    }

    pub fn allow(mut self, command: &str) -> Self {
        self.allowed_commands.insert(command.to_string());
        self
    }
}

/// Process-backed [`ToolRunner`]
pub struct CommandRunner {
    config: SecurityConfig,
}

impl CommandRunner {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    fn validate(&self, invocation: &ToolInvocation) -> Result<(), RunnerError> {
        let program = program_name(&invocation.program).unwrap_or_default();
        if !self.config.allowed_commands.contains(&program) {
            return Err(RunnerError::NotAllowed(invocation.program.clone()));
        }

        // No shell is involved, so only control characters are rejected
        if let Some(arg) = invocation
            .args
            .iter()
            .find(|arg| arg.contains(['\0', '\n', '\r']))
        {
            return Err(RunnerError::UnsafeArgument(arg.clone()));
        }
        Ok(())
    }

    fn create_command(&self, invocation: &ToolInvocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;

            let cpu_secs = self.config.max_execution_time.as_secs().max(1) as libc::rlim_t;
            unsafe {
                cmd.pre_exec(move || {
                    // Own process group, so a timeout also reaches tools that
                    // launchers like npx or uv start as grandchildren
                    libc::setpgid(0, 0);
                    // CPU time backstop in case the wall-clock kill is missed
                    libc::setrlimit(
                        libc::RLIMIT_CPU,
                        &libc::rlimit {
                            rlim_cur: cpu_secs,
                            rlim_max: cpu_secs * 2,
                        },
                    );
                    Ok(())
                });
            }
        }

        cmd
    }

    fn execute(&self, invocation: &ToolInvocation) -> Result<Output, RunnerError> {
        self.validate(invocation)?;

        let timeout = self.config.max_execution_time;
        let child = self
            .create_command(invocation)
            .spawn()
            .map_err(RunnerError::Spawn)?;
        let child_id = child.id();

        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            let _ = tx.send(child.wait_with_output());
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => {
                let _ = waiter.join();
                result.map_err(RunnerError::Wait)
            }
            Err(_) => {
                kill_process_tree(child_id);
                // Pipes close once the group is gone; a straggler that escaped
                // it must not hold the hook past the grace period
                if rx.recv_timeout(REAP_GRACE).is_ok() {
                    let _ = waiter.join();
                } else {
                    tracing::warn!(pid = child_id, "tool output still open after kill");
                }
                Err(RunnerError::Timeout {
                    timeout_secs: timeout.as_secs(),
                })
            }
        }
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(SecurityConfig::default())
    }
}

impl ToolRunner for CommandRunner {
    fn run(&self, invocation: &ToolInvocation) -> RawToolResult {
        let command_line = invocation.command_line();
        let started = Instant::now();

        let result = match self.execute(invocation) {
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                RawToolResult::new(
                    truncate_utf8_safe(&text, self.config.max_output_chars),
                    output.status.code().unwrap_or(-1),
                )
            }
            Err(RunnerError::Timeout { timeout_secs }) => {
                tracing::warn!(command = %command_line, timeout_secs, "tool timed out");
                RawToolResult::timed_out(format!("Command timed out: {command_line}"))
            }
            Err(e) => {
                tracing::warn!(command = %command_line, error = %e, "tool invocation failed");
                RawToolResult::new(format!("Error running {command_line}: {e}"), 1)
            }
        };

        tracing::debug!(
            command = %command_line,
            exit_code = result.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool finished"
        );
        result
    }
}

/// Whitelist key for a program: its file name, so `/usr/bin/npx` is `npx`.
fn program_name(program: &str) -> Option<String> {
    std::path::Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn kill_process_tree(child_id: u32) {
    #[cfg(unix)]
    {
        let group = -(child_id as libc::pid_t);
        unsafe {
            libc::kill(group, libc::SIGTERM);
        }
        thread::sleep(Duration::from_millis(100));
        unsafe {
            libc::kill(group, libc::SIGKILL);
        }
    }

    #[cfg(windows)]
    {
        let _ = Command::new("taskkill")
            .args(["/PID", &child_id.to_string(), "/T", "/F"])
            .output();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_config_default() {
        let config = SecurityConfig::default();
        assert!(config.allowed_commands.contains("npx"));
        assert!(config.allowed_commands.contains("uv"));
        assert_eq!(config.max_execution_time, Duration::from_secs(30));
    }

    #[test]
    fn test_command_whitelist_is_folded_into_text() {
        let runner = CommandRunner::default();
        let result = runner.run(&ToolInvocation::new("rm", ["-rf", "/"]));
        assert_eq!(result.exit_code, 1);
        assert!(!result.timed_out);
        assert_eq!(result.text, "Error running rm -rf /: command 'rm' not in allowed whitelist");
    }

    #[test]
    fn test_control_characters_rejected() {
        let runner = CommandRunner::default();
        let result = runner.run(&ToolInvocation::new("ruff", ["check", "a\nb.py"]));
        assert_eq!(result.exit_code, 1);
        assert!(result.text.starts_with("Error running ruff check"));
    }

    #[test]
    fn test_launched_splits_prefix() {
        let inv = ToolInvocation::launched(&["uv".to_string(), "run".to_string()], &["ruff", "check", "a.py"]);
        assert_eq!(inv.program, "uv");
        assert_eq!(inv.args, vec!["run", "ruff", "check", "a.py"]);
        assert_eq!(inv.command_line(), "uv run ruff check a.py");
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_then_stderr_and_exit_code() {
        let runner = CommandRunner::new(SecurityConfig::default().allow("sh"));
        let result = runner.run(&ToolInvocation::new("sh", ["-c", "echo out; echo err >&2; exit 3"]));
        assert_eq!(result.text, "out\nerr\n");
        assert_eq!(result.exit_code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_and_reports() {
        let config = SecurityConfig {
            max_execution_time: Duration::from_millis(200),
            ..SecurityConfig::default().allow("sleep")
        };
        let runner = CommandRunner::new(config);
        let started = Instant::now();
        let result = runner.run(&ToolInvocation::new("sleep", ["5"]));
        assert!(result.timed_out);
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.text, "Command timed out: sleep 5");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_reaches_launched_grandchild() {
        // The shell forks sleep and keeps waiting, like npx or uv run
        let config = SecurityConfig {
            max_execution_time: Duration::from_millis(300),
            ..SecurityConfig::default().allow("sh")
        };
        let runner = CommandRunner::new(config);
        let started = Instant::now();
        let result = runner.run(&ToolInvocation::new("sh", ["-c", "sleep 6; true"]));
        assert!(result.timed_out);
        assert_eq!(result.text, "Command timed out: sh -c sleep 6; true");
        assert!(started.elapsed() < Duration::from_secs(3), "elapsed {:?}", started.elapsed());
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_binary_is_folded() {
        let runner = CommandRunner::new(SecurityConfig::default().allow("definitely-not-a-real-command-12345"));
        let result = runner.run(&ToolInvocation::new("definitely-not-a-real-command-12345", ["x"]));
        assert_eq!(result.exit_code, 1);
        assert!(result.text.starts_with("Error running definitely-not-a-real-command-12345 x: "));
    }
}
