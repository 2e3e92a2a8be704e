// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! End-to-end tests of the `oscore` binary

use std::fs::File;
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn oscore() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_oscore"));
    command.env_remove("RUST_LOG").env_remove("OSCORE_WAIT_TIMEOUT");
    command
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "oscore failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_resolve_canonicalizes_each_path() {
    let output = oscore()
        .args(["resolve", "--canonicalize", "/a/b/../c", "../../x", "a/./b/", "a/."])
        .output()
        .unwrap();
    assert_eq!(stdout_of(&output), "/a/c\n../../x\na/b/\na/.\n");
}

#[test]
fn test_resolve_without_options_is_identity() {
    let output = oscore().args(["resolve", "~/x//y"]).output().unwrap();
    assert_eq!(stdout_of(&output), "~/x//y\n");
}

#[test]
fn test_resolve_absolute_uses_current_directory() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = dir.path().canonicalize().unwrap();
    let output = oscore()
        .args(["resolve", "--absolute", "file"])
        .current_dir(&cwd)
        .output()
        .unwrap();
    assert_eq!(stdout_of(&output), format!("{}/file\n", cwd.display()));
}

#[test]
fn test_resolve_unknown_user_fails() {
    let output = oscore()
        .args(["resolve", "--expand-tilde", "~no-such-user-oscore/x"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no-such-user-oscore"), "{}", stderr);
}

#[test]
fn test_basename_and_dirname() {
    let output = oscore().args(["basename", "/usr/lib/"]).output().unwrap();
    assert_eq!(stdout_of(&output), "lib\n");
    let output = oscore().args(["dirname", "/usr/lib/"]).output().unwrap();
    assert_eq!(stdout_of(&output), "/usr\n");
}

#[test]
fn test_exec_maps_descriptor_onto_stdout() {
    let output = oscore()
        .args(["exec", "--map", "1=1", "--map", "3=1", "--", "sh", "-c", "echo via-three >&3"])
        .output()
        .unwrap();
    assert_eq!(stdout_of(&output), "via-three\n");
}

#[test]
fn test_exec_rejects_negative_target_without_exec() {
    let output = oscore()
        .args(["exec", "--map=-1=0", "true"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("must be non-negative"), "{}", stderr);
}

#[test]
fn test_wait_reports_readable_stdin() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"ready").unwrap();
    let stdin = File::open(file.path()).unwrap();

    let output = oscore()
        .args(["wait", "--read", "0", "--timeout", "0", "--json"])
        .stdin(Stdio::from(stdin))
        .output()
        .unwrap();
    let outcome: serde_json::Value = serde_json::from_str(stdout_of(&output).trim()).unwrap();
    assert_eq!(outcome["ready"], 1);
    assert_eq!(outcome["read"], serde_json::json!([0]));
    assert!(outcome["write"].is_null());
}

#[test]
fn test_wait_in_place_plain_output() {
    let stdin = File::open("/dev/null").unwrap();
    let output = oscore()
        .args(["wait", "--read", "0", "--timeout", "0,0", "--in-place"])
        .stdin(Stdio::from(stdin))
        .output()
        .unwrap();
    assert_eq!(stdout_of(&output), "ready: 1\nread: 0\n");
}

#[test]
fn test_wait_rejects_negative_timeout() {
    let output = oscore()
        .args(["wait", "--read", "0", "--timeout", "-5"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("timeout must be non-negative"), "{}", stderr);
}
