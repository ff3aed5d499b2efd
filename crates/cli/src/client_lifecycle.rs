// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle and diagnostic logging for the CLI client.

use std::path::PathBuf;

use crate::client::ClientError;
use crate::daemon_process::{
    cleanup_stale_pid, daemon_dir, daemon_listen_addr, force_kill_daemon, process_exists,
    read_daemon_pid, wait_for_exit,
};

/// Stop the daemon (graceful SIGTERM first, then SIGKILL).
///
/// The daemon has no wire-protocol shutdown request; `main.rs`'s
/// `tokio::select!` over `SIGTERM`/`SIGINT` is the only shutdown path, so
/// this sends a process signal rather than a `ClientMessage`.
/// Returns true if the daemon was stopped, false if it wasn't running.
pub async fn daemon_stop(kill: bool) -> Result<bool, ClientError> {
    let Some(pid) = read_daemon_pid()? else {
        if let Ok(dir) = daemon_dir() {
            cleanup_stale_pid(&dir);
        }
        return Ok(false);
    };

    if !process_exists(pid) {
        if let Ok(dir) = daemon_dir() {
            cleanup_stale_pid(&dir);
        }
        return Ok(false);
    }

    let timeout = crate::client::timeout_exit();

    if kill {
        force_kill_daemon(pid);
    } else {
        send_term(pid);
        if !wait_for_exit(pid, timeout).await && process_exists(pid) {
            force_kill_daemon(pid);
        }
    }
    wait_for_exit(pid, timeout).await;

    if let Ok(dir) = daemon_dir() {
        cleanup_stale_pid(&dir);
    }

    Ok(true)
}

fn send_term(pid: u32) {
    let _ = std::process::Command::new("kill")
        .args(["-15", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();
}

/// Write a diagnostic message to `<PASEO_HOME>/cli.log`.
fn write_cli_log(message: String) {
    use std::io::Write;
    use std::time::SystemTime;

    let log_path = daemon_dir()
        .unwrap_or_else(|_| {
            std::env::var("HOME")
                .map(|h| PathBuf::from(h).join(".paseo"))
                .unwrap_or_else(|_| PathBuf::from("/tmp"))
        })
        .join("cli.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let pid = std::process::id();
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "(unknown)".to_string());
        let home = std::env::var("PASEO_HOME").unwrap_or_else(|_| "(not set)".to_string());

        let _ = writeln!(
            file,
            "[ts={}] pid={} cwd={} PASEO_HOME={} {}",
            timestamp, pid, cwd, home, message
        );
    }
}

/// Log a connection error for debugging.
///
/// Writes diagnostic info to `<PASEO_HOME>/cli.log` when the CLI fails to
/// connect to the daemon. This helps debug issues in spawned agents where
/// stdout/stderr may not be visible.
pub fn log_connection_error(error: &ClientError) {
    write_cli_log(format!("addr={} error={}", daemon_listen_addr(), error));
}
