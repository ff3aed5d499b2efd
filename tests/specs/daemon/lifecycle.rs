//! Daemon lifecycle specs
//!
//! Verify daemon start/stop/status/restart lifecycle.

use crate::prelude::*;

#[test]
fn daemon_status_reports_not_running_before_start() {
    let env = Env::empty();

    env.paseo()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_start_reports_success() {
    let env = Env::empty();

    env.paseo()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon started");
}

#[test]
fn daemon_status_shows_running_after_start() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running");
}

#[test]
fn daemon_status_shows_server_id_and_version() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Server ID:")
        .stdout_has("Version:")
        .stdout_has("Agents: 0");
}

#[test]
fn daemon_start_is_idempotent() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("already running");
}

#[test]
fn daemon_stop_reports_success() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon stopped");
}

#[test]
fn daemon_stop_without_running_daemon_reports_not_running() {
    let env = Env::empty();

    env.paseo()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_status_reports_not_running_after_stop() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();
    env.paseo().args(&["daemon", "stop"]).passes();

    env.paseo()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn daemon_restart_brings_daemon_back_up() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["daemon", "restart"])
        .passes()
        .stdout_has("Daemon restarted");

    env.paseo()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running");
}

#[test]
fn daemon_creates_pid_file() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    let pid_file = env.home().join("daemon.pid");
    let has_pid = wait_for(SPEC_WAIT_MAX_MS, || pid_file.exists());
    assert!(has_pid, "daemon.pid file should exist");
}

#[test]
fn daemon_creates_version_file() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    let version_file = env.home().join("daemon.version");
    let has_version = wait_for(SPEC_WAIT_MAX_MS, || version_file.exists());
    assert!(has_version, "daemon.version file should exist");
}

#[test]
fn daemon_pid_file_removed_after_stop() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();
    env.paseo().args(&["daemon", "stop"]).passes();

    let pid_file = env.home().join("daemon.pid");
    assert!(!pid_file.exists(), "daemon.pid should be removed on stop");
}

/// A daemon killed with SIGKILL leaves a stale pid file; the next `status`
/// call should notice the process is gone rather than report it running.
#[test]
fn daemon_status_detects_crashed_daemon() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    let killed = env.daemon_kill();
    assert!(killed, "should be able to kill daemon");

    let dead = wait_for(SPEC_WAIT_MAX_MS, || {
        !env.paseo()
            .args(&["daemon", "status"])
            .passes()
            .stdout()
            .contains("Status: running")
    });
    assert!(dead, "daemon should be reported dead after SIGKILL");
}
