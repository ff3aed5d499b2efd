//! Agent lifecycle specs
//!
//! Verify `paseo agent` create/list/archive/send/cancel against a live
//! daemon. Spawning a real provider process is out of scope here (no
//! `claude`/`codex` binary is guaranteed to be on PATH in test
//! environments); these specs instead exercise the paths that don't
//! require one: daemon auto-start, cwd validation, the empty roster, and
//! not-found errors for unknown agent ids.

use crate::prelude::*;

#[test]
fn agent_list_on_empty_roster_shows_no_agents() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["agent", "list"])
        .passes()
        .stdout_has("No agents found");
}

#[test]
fn agent_list_does_not_auto_start_the_daemon() {
    let env = Env::empty();

    // `agent list` is a query, not an action, so it must fail outright
    // rather than silently spawning a daemon just to answer an empty list.
    env.paseo().args(&["agent", "list"]).fails();

    env.paseo()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Daemon not running");
}

#[test]
fn agent_create_auto_starts_the_daemon() {
    let env = Env::empty();

    // Create is an action and auto-starts the daemon, even though the bad
    // cwd below makes the request itself fail.
    env.paseo()
        .args(&[
            "agent", "create", "--provider", "claude", "--cwd", "/nonexistent/path",
            "--model", "claude-default",
        ])
        .fails();

    env.paseo()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running");
}

#[test]
fn agent_create_rejects_nonexistent_cwd() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&[
            "agent", "create", "--provider", "claude", "--cwd", "/nonexistent/path",
            "--model", "claude-default",
        ])
        .fails()
        .stderr_has("working directory does not exist");
}

#[test]
fn agent_archive_unknown_id_reports_not_found() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["agent", "archive", "does-not-exist"])
        .fails()
        .stderr_has("agent not found");
}

#[test]
fn agent_send_unknown_id_reports_not_found() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["agent", "send", "does-not-exist", "hello"])
        .fails()
        .stderr_has("agent not found");
}

#[test]
fn agent_cancel_unknown_id_reports_not_found() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["agent", "cancel", "does-not-exist"])
        .fails()
        .stderr_has("agent not found");
}

#[test]
fn agent_list_json_output_is_an_empty_array() {
    let env = Env::empty();
    env.paseo().args(&["daemon", "start"]).passes();

    env.paseo()
        .args(&["-o", "json", "agent", "list"])
        .passes()
        .stdout_eq("[]\n");
}
