//! Per-step timing for one hook run.
//!
//! The pipeline records every tool step it takes, including skipped ones, so
//! a slow edit can be traced back to the tool that ate the budget.

use std::fmt::Write as _;
use std::time::Duration;

use crate::pipeline::Tool;

pub fn enabled() -> bool {
    std::env::var("QUALITY_HOOKS_TIMINGS").map(|v| !v.is_empty()).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Disabled by config
    Skipped,
    Clean,
    Reported,
    /// Check run hit the wall-clock limit
    TimedOut,
}

impl StepOutcome {
    fn label(self) -> &'static str {
        match self {
            StepOutcome::Skipped => "skipped",
            StepOutcome::Clean => "clean",
            StepOutcome::Reported => "reported",
            StepOutcome::TimedOut => "timed out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTiming {
    pub tool: Tool,
    pub outcome: StepOutcome,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTimings {
    steps: Vec<StepTiming>,
}

impl RunTimings {
    pub fn record(&mut self, tool: Tool, outcome: StepOutcome, elapsed: Duration) {
        self.steps.push(StepTiming {
            tool,
            outcome,
            elapsed,
        });
    }

    /// Steps in the order they ran.
    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn total(&self) -> Duration {
        self.steps.iter().map(|s| s.elapsed).sum()
    }

    /// Slowest executed step; skipped steps never count.
    pub fn slowest(&self) -> Option<&StepTiming> {
        self.steps
            .iter()
            .filter(|s| s.outcome != StepOutcome::Skipped)
            .max_by_key(|s| s.elapsed)
    }

    pub fn summary(&self) -> String {
        if self.steps.is_empty() {
            return String::new();
        }
        let mut out = String::from("=== TOOL TIMINGS (ms) ===\n");
        for step in &self.steps {
            let _ = writeln!(out, "{}: {} {}", step.tool, step.elapsed.as_millis(), step.outcome.label());
        }
        let _ = write!(out, "total: {}", self.total().as_millis());
        if let Some(slowest) = self.slowest() {
            let _ = write!(out, " (slowest: {})", slowest.tool);
        }
        out.push('\n');
        out
    }
}
