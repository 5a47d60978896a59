use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::tempdir;

// E2E: run compiled posttooluse binary, feed HookInput JSON via stdin
fn run_hook_binary(dir: &Path, input: &str, envs: &[(&str, String)]) -> Output {
    let bin_path = env!("CARGO_BIN_EXE_posttooluse");
    let mut cmd = Command::new(bin_path);
    cmd.current_dir(dir)
        .env_remove("QUALITY_HOOKS_CONFIG")
        .env_remove("QUALITY_HOOKS_DISABLE")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut child = cmd.spawn().expect("spawn posttooluse");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait output")
}

fn edit_event(file: &Path) -> String {
    serde_json::json!({
        "tool_name": "Edit",
        "tool_input": {"file_path": file.to_string_lossy(), "old_string": "a", "new_string": "b"},
        "session_id": "e2e",
        "hook_event_name": "PostToolUse"
    })
    .to_string()
}

#[test]
fn e2e_malformed_json_fails_loudly() {
    let temp = tempdir().expect("tempdir");
    let output = run_hook_binary(temp.path(), "{\"tool_input\": ", &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Invalid JSON input"), "stderr: {stderr}");
}

#[test]
fn e2e_unsupported_extension_is_silent() {
    let temp = tempdir().expect("tempdir");
    let file = temp.path().join("README.md");
    std::fs::write(&file, "# readme\n").unwrap();
    let output = run_hook_binary(temp.path(), &edit_event(&file), &[]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn e2e_missing_file_is_silent() {
    let temp = tempdir().expect("tempdir");
    let output = run_hook_binary(temp.path(), &edit_event(&temp.path().join("nope.ts")), &[]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn e2e_all_tools_disabled_is_silent() {
    let temp = tempdir().expect("tempdir");
    let file = temp.path().join("svc.py");
    std::fs::write(&file, "import os\n").unwrap();
    let output = run_hook_binary(
        temp.path(),
        &edit_event(&file),
        &[("QUALITY_HOOKS_DISABLE", "ruff,basedpyright,bandit".to_string())],
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[cfg(unix)]
#[test]
fn e2e_script_pipeline_with_fake_launcher() {
    use std::os::unix::fs::PermissionsExt;

    let temp = tempdir().expect("tempdir");
    let dir = temp.path();
    std::fs::create_dir_all(dir.join("node_modules")).unwrap();
    std::fs::create_dir_all(dir.join("src")).unwrap();
    let file = dir.join("src/app.ts");
    std::fs::write(&file, "const x: string = 1\n").unwrap();

    // Stands in for npx: replays canned tool output keyed by tool name
    let launcher = dir.join("fake-npx");
    std::fs::write(
        &launcher,
        r#"#!/bin/sh
case "$1" in
  prettier) echo "src/app.ts 12ms"; exit 0 ;;
  eslint)
    if [ "$2" = "--fix" ]; then exit 0; fi
    printf 'src/app.ts\n  1:20  error  Missing semicolon  semi\n\n\342\234\226 1 problem (1 error, 0 warnings)\n'
    exit 1 ;;
  tsc)
    echo "src/app.ts(1,7): error TS2322: Type 'number' is not assignable to type 'string'."
    exit 2 ;;
esac
exit 0
"#,
    )
    .unwrap();
    std::fs::set_permissions(&launcher, std::fs::Permissions::from_mode(0o755)).unwrap();

    let output = run_hook_binary(
        dir,
        &edit_event(&file),
        &[("QUALITY_HOOKS_NODE_LAUNCHER", launcher.to_string_lossy().into_owned())],
    );
    if !output.status.success() {
        panic!(
            "posttooluse exited with error: status={:?}\nSTDERR:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(v["hookSpecificOutput"]["hookEventName"], "PostToolUse");
    let ctx = v["hookSpecificOutput"]["additionalContext"].as_str().expect("string");
    assert_eq!(
        ctx,
        "Code quality for app.ts:\n\
         - ESLint: 1 error(s) in app.ts\n  - semi: 1× (lines 1)\n\
         - TypeScript: 1 error(s) in app.ts\n  - app.ts(1,7): TS2322: Type 'number' is not assignable to type 'string'."
    );
}
