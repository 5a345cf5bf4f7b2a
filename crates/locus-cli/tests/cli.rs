// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Integration tests for the `locus` binary. Each test runs a subcommand on
//! a scenario fixture and checks its output.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn locus(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_locus"))
        .args(["--color", "never"])
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run locus")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn assert_success(out: &Output) {
    assert!(out.status.success(), "locus failed:\nstdout: {}\nstderr: {}", stdout(out), stderr(out));
}

// ── lower ───────────────────────────────────────────────────────

#[test]
fn lower_to_c_emits_transfer_calls() {
    let file = fixture("remote_read.json");
    let out = locus(&["lower", file.to_str().unwrap()]);
    assert_success(&out);
    let text = stdout(&out);
    assert!(text.starts_with("int64_t read_remote(locus_locale_t r_locale, void* r_addr) {"), "{text}");
    assert!(text.contains("locus_comm_get(&x, r_locale, r_addr, INT64_C(8), 0, 4, 0);"), "{text}");
}

#[test]
fn lower_deferred_lir_with_and_without_passes() {
    let file = fixture("remote_read.json");
    let args = ["lower", file.to_str().unwrap(), "--target", "lir", "--mode", "deferred"];

    let out = locus(&args);
    assert_success(&out);
    assert!(stdout(&out).contains("locus_comm_get"));
    assert!(!stdout(&out).contains("wideptr"));
    assert!(stderr(&out).contains("deferred:"));

    let mut raw = args.to_vec();
    raw.push("--no-passes");
    let out = locus(&raw);
    assert_success(&out);
    assert!(stdout(&out).contains("wideptr"));
    assert!(!stdout(&out).contains("locus_comm_get"));
}

#[test]
fn deferred_c_is_rejected() {
    let file = fixture("remote_read.json");
    let out = locus(&["lower", file.to_str().unwrap(), "--mode", "deferred"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("target `c` does not support"), "{}", stderr(&out));
}

#[test]
fn forced_local_communication_drops_transfers() {
    let file = fixture("remote_read.json");
    let config = fixture("force_local.json");
    let out = locus(&["lower", file.to_str().unwrap(), "--config", config.to_str().unwrap()]);
    assert_success(&out);
    assert!(!stdout(&out).contains("locus_comm_"), "{}", stdout(&out));
}

// ── run ─────────────────────────────────────────────────────────

#[test]
fn run_reads_remote_word() {
    let file = fixture("remote_read.json");
    for mode in ["immediate", "deferred"] {
        let out = locus(&["run", file.to_str().unwrap(), "--mode", mode]);
        assert_success(&out);
        let text = stdout(&out);
        assert!(text.contains("=== Run OK ==="), "{text}");
        assert!(text.contains("result: 42"), "{mode}: {text}");
        assert!(text.contains("locus_comm_get"), "{text}");
    }
}

#[test]
fn run_record_update_applies_unordered_copy() {
    let file = fixture("record_update.json");
    let out = locus(&["run", file.to_str().unwrap()]);
    assert_success(&out);
    let text = stdout(&out);
    assert!(text.contains("comm: 4"), "{text}");
    assert!(text.contains("locus_comm_getput_unordered"), "{text}");
    assert!(!text.contains("pending unordered"), "{text}");
}

#[test]
fn run_on_missing_locale_fails() {
    let file = fixture("remote_read.json");
    let out = locus(&["run", file.to_str().unwrap(), "--locales", "2"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("no such locale: 3"), "{}", stderr(&out));
}

// ── build ───────────────────────────────────────────────────────

#[test]
fn build_writes_object_file() {
    let file = fixture("remote_read.json");
    let obj = std::env::temp_dir().join(format!("locus_test_{}.o", std::process::id()));
    let out = locus(&["build", file.to_str().unwrap(), "--mode", "deferred", "-o", obj.to_str().unwrap()]);
    assert_success(&out);
    let bytes = std::fs::read(&obj).unwrap();
    assert!(!bytes.is_empty());
    let _ = std::fs::remove_file(&obj);
}

// ── errors ──────────────────────────────────────────────────────

#[test]
fn malformed_scenario_is_reported() {
    let file = fixture("malformed.json");
    let out = locus(&["lower", file.to_str().unwrap()]);
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.starts_with("error:"), "{err}");
    assert!(err.contains("malformed scenario"), "{err}");
}

#[test]
fn missing_file_is_reported() {
    let out = locus(&["lower", "/nonexistent/scenario.json"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("reading /nonexistent/scenario.json"));
}
