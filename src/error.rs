use thiserror::Error;

/// Failures at the host protocol boundary. These are the only errors that end
/// the hook with a nonzero exit status.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Invalid JSON input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    #[error("failed to read hook input from stdin: {0}")]
    ReadInput(#[from] std::io::Error),
}

/// Failures while invoking an external tool. Never propagated past the
/// runner; they are folded into the tool's output text instead.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("command '{0}' not in allowed whitelist")]
    NotAllowed(String),

    #[error("argument contains control characters: {0:?}")]
    UnsafeArgument(String),

    #[error("{0}")]
    Spawn(std::io::Error),

    #[error("failed waiting for process: {0}")]
    Wait(std::io::Error),

    #[error("no exit status after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}
