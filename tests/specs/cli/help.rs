//! CLI help output specs
//!
//! Verify help text displays for all commands.

use crate::prelude::*;

#[test]
fn paseo_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn paseo_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:");
}

#[test]
fn paseo_agent_help_shows_subcommands() {
    cli()
        .args(&["agent", "--help"])
        .passes()
        .stdout_has("create")
        .stdout_has("resume")
        .stdout_has("archive")
        .stdout_has("send")
        .stdout_has("cancel")
        .stdout_has("list");
}

#[test]
fn paseo_daemon_help_shows_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("status");
}

#[test]
fn paseo_pair_help_shows_usage() {
    cli()
        .args(&["pair", "--help"])
        .passes()
        .stdout_has("Usage:");
}

#[test]
fn paseo_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}
