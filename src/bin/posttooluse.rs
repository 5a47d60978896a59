use anyhow::Result;
use std::io::{self, Read};

use quality_gate_hooks::runner::{CommandRunner, SecurityConfig};
use quality_gate_hooks::{load_config, run_hook, HookError, HookInput};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Logs go to stderr; stdout carries only the hook response JSON.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,quality_gate_hooks::timings=info"));
    let json = std::env::var("QUALITY_HOOKS_LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let layer = fmt::layer().with_writer(io::stderr).with_target(false);
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}

fn read_input() -> Result<HookInput, HookError> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    HookInput::from_json(&buffer)
}

fn main() -> Result<()> {
    init_tracing();

    let hook_input = match read_input() {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let cfg = load_config();
    let runner = CommandRunner::new(SecurityConfig::from_config(&cfg));

    let output = run_hook(&hook_input, &cfg, &runner);

    if let Some(output) = output {
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}
