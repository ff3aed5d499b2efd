//! CLI error handling specs
//!
//! Verify error messages for invalid commands and arguments.

use crate::prelude::*;

#[test]
fn agent_create_missing_model_shows_error() {
    cli()
        .args(&["agent", "create", "--provider", "claude", "--cwd", "/tmp"])
        .fails()
        .stderr_has("--model");
}

#[test]
fn agent_create_unknown_provider_shows_error() {
    cli()
        .args(&[
            "agent", "create", "--provider", "bogus", "--cwd", "/tmp", "--model", "x",
        ])
        .fails()
        .stderr_has("bogus");
}

#[test]
fn agent_archive_missing_id_shows_error() {
    cli().args(&["agent", "archive"]).fails();
}

#[test]
fn unknown_subcommand_shows_error() {
    cli().args(&["bogus"]).fails();
}
