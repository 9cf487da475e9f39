mod common;

use common::process::run_worker;

const MISSING: &str = r#"{"error": "missing arguments"}"#;

#[test]
fn every_worker_rejects_short_argument_lists() {
    let cases: [(&str, &[&str]); 7] = [
        (env!("CARGO_BIN_EXE_classify"), &[]),
        (env!("CARGO_BIN_EXE_classify"), &["a.png", "m.png"]),
        (env!("CARGO_BIN_EXE_segment"), &[]),
        (env!("CARGO_BIN_EXE_segment"), &["a.png"]),
        (env!("CARGO_BIN_EXE_process_mat"), &[]),
        (env!("CARGO_BIN_EXE_process_mat"), &["a.mat"]),
        (env!("CARGO_BIN_EXE_generate_pdf"), &[]),
    ];
    for (exe, args) in cases {
        let run = run_worker(exe, args, b"");
        assert_eq!(run.line, MISSING, "{exe} {args:?}");
    }
}

#[test]
fn missing_arguments_does_not_touch_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never/created.png");
    let run = run_worker(
        env!("CARGO_BIN_EXE_segment"),
        &[out.to_str().unwrap()],
        b"",
    );
    assert_eq!(run.line, MISSING);
    assert!(!dir.path().join("never").exists());
}
