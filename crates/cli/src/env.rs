// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::ClientError;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Resolve `PASEO_HOME`: `$PASEO_HOME` first, falling back to `~/.paseo`.
/// Mirrors `paseo_daemon::config`'s own resolution so the CLI and daemon
/// agree on where `daemon.pid`/`daemon.log`/`config.toml` live without the
/// CLI needing to parse the daemon's config file itself.
pub fn home_dir() -> Result<PathBuf, ClientError> {
    if let Ok(dir) = std::env::var("PASEO_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").map_err(|_| ClientError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".paseo"))
}

pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}

pub fn daemon_binary() -> Option<String> {
    std::env::var("PASEO_DAEMON_BINARY").ok()
}

pub fn cargo_manifest_dir() -> Option<String> {
    std::env::var("CARGO_MANIFEST_DIR").ok()
}

/// `host:port` the direct listener binds, as configured for the daemon
/// (defaults match `paseo_daemon::config::Config`'s own default).
pub fn listen_addr() -> String {
    std::env::var("PASEO_LISTEN").unwrap_or_else(|_| "127.0.0.1:4317".to_string())
}

pub fn timeout_connect_ms() -> Option<Duration> {
    parse_duration_ms("PASEO_TIMEOUT_CONNECT_MS")
}
pub fn timeout_exit_ms() -> Option<Duration> {
    parse_duration_ms("PASEO_TIMEOUT_EXIT_MS")
}
pub fn connect_poll_ms() -> Option<Duration> {
    parse_duration_ms("PASEO_CONNECT_POLL_MS")
}
