//! Daemon help and version specs
//!
//! Verify paseod --help, --version, and related flags work without
//! acquiring the daemon lock (no startup attempt).

use crate::prelude::*;
use std::process::Command;

fn paseod() -> Command {
    Command::new(paseod_binary())
}

#[test]
fn paseod_version_shows_version() {
    let output = paseod().arg("--version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with("paseod 0.1"),
        "expected version output, got: {stdout}"
    );
}

#[test]
fn paseod_short_version_shows_version() {
    let output = paseod().arg("-v").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with("paseod 0.1"),
        "expected version output, got: {stdout}"
    );
}

#[test]
fn paseod_help_shows_usage() {
    let output = paseod().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("USAGE:"),
        "expected USAGE section, got: {stdout}"
    );
    assert!(stdout.contains("--help"), "expected --help in output");
    assert!(stdout.contains("--version"), "expected --version in output");
}

#[test]
fn paseod_help_subcommand_shows_usage() {
    let output = paseod().arg("help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("USAGE:"),
        "expected USAGE section, got: {stdout}"
    );
}

#[test]
fn paseod_unknown_arg_fails() {
    let output = paseod().arg("--bogus").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unexpected argument"),
        "expected error message, got: {stderr}"
    );
}

/// Running paseod a second time against a `PASEO_HOME` already occupied by a
/// live daemon must fail cleanly rather than disrupt the running one.
#[test]
fn paseod_refuses_to_start_twice_in_same_home() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running");

    let output = paseod()
        .env("PASEO_HOME", env.home())
        .output()
        .expect("paseod should run");
    assert!(
        !output.status.success(),
        "paseod should fail when daemon is already running"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("already running"),
        "stderr should contain 'already running', got: {stderr}"
    );
    assert!(stderr.contains("pid:"), "stderr should contain pid, got: {stderr}");

    // The original daemon must still be reachable.
    env.paseo()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running");
}
