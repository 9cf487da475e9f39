use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

/// Result of one worker process run.
pub struct WorkerRun {
    /// The single stdout line, without its newline.
    pub line: String,
    pub json: Value,
}

/// Runs the worker binary at `exe`, feeding `stdin`, and checks the protocol:
/// exit status 0 and exactly one newline-terminated line on stdout.
pub fn run_worker(exe: &str, args: &[&str], stdin: &[u8]) -> WorkerRun {
    let mut child = Command::new(exe)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn worker");
    {
        let mut pipe = child.stdin.take().expect("stdin pipe");
        // Workers that never read stdin may close it before we finish.
        let _ = pipe.write_all(stdin);
    }
    let output = child.wait_with_output().expect("wait for worker");
    assert!(
        output.status.success(),
        "worker exited with {:?}, stderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert!(stdout.ends_with('\n'), "stdout not newline-terminated: {stdout:?}");
    let line = stdout.trim_end_matches('\n').to_string();
    assert!(!line.contains('\n'), "more than one stdout line: {stdout:?}");
    let json: Value = serde_json::from_str(&line).expect("stdout is JSON");
    assert!(json.is_object(), "stdout is not a JSON object: {line}");
    WorkerRun { line, json }
}

pub fn error_of(run: &WorkerRun) -> Option<&str> {
    run.json.get("error").and_then(Value::as_str)
}
