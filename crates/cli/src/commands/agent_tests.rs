// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::FromArgMatches;

#[test]
fn truncate_leaves_short_strings_alone() {
    assert_eq!(truncate("abc", 10), "abc");
}

#[test]
fn truncate_cuts_long_strings() {
    assert_eq!(truncate("abcdefgh", 4), "abcd");
}

#[test]
fn provider_arg_maps_to_provider_kind() {
    assert_eq!(ProviderKind::from(ProviderArg::Claude), ProviderKind::Claude);
    assert_eq!(ProviderKind::from(ProviderArg::Codex), ProviderKind::Codex);
}

#[test]
fn agent_create_requires_provider_cwd_and_model() {
    let matches = crate::cli_command().try_get_matches_from([
        "paseo",
        "agent",
        "create",
        "--provider",
        "claude",
        "--cwd",
        "/tmp/project",
        "--model",
        "claude-default",
    ]);
    assert!(matches.is_ok(), "{:?}", matches.err());
}

#[test]
fn agent_create_missing_required_flag_fails() {
    let matches =
        crate::cli_command().try_get_matches_from(["paseo", "agent", "create", "--provider", "claude"]);
    assert!(matches.is_err());
}

#[test]
fn agent_list_parses() {
    let matches = crate::cli_command()
        .try_get_matches_from(["paseo", "agent", "list"])
        .unwrap();
    let cli = crate::Cli::from_arg_matches(&matches).unwrap();
    assert!(matches!(
        cli.command,
        Some(crate::Commands::Agent(ref args)) if matches!(args.command, AgentCommand::List)
    ));
}
