// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paseo Daemon (paseod)
//!
//! Background process that supervises external coding-agent providers and
//! bridges their canonical timelines to connected clients over WebSocket.
//!
//! Architecture:
//! - Direct listener: accepts inbound WebSocket connections on `Config::listen`.
//! - Relay client: when `Config::relay_endpoint` is set, dials out instead of
//!   (or in addition to) listening, end-to-end encrypting frames over the hop.
//! - Session bridge: one task per connected client, dispatching requests
//!   against the shared `AgentManager` and pushing responses/subscriptions.
//! - Notification dispatcher: turns `AttentionEvent`s into `attention_required`
//!   pushes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::Duration;

use paseo_daemon::bridge::{DispatchContext, SessionRegistry, KEEPALIVE_INTERVAL};
use paseo_daemon::config::{load_or_create_stable_id, Config};
use paseo_daemon::crypto::DaemonIdentity;
use paseo_daemon::lifecycle::{self, LifecycleError, StartupResult};
use paseo_daemon::listener;
use paseo_daemon::notify_dispatch::NotificationDispatcher;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("paseod {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("paseod {}", env!("CARGO_PKG_VERSION"));
                println!("Paseo Daemon - supervises coding-agent providers for paired clients");
                println!();
                println!("USAGE:");
                println!("    paseod");
                println!();
                println!("The daemon is typically started by the `paseo` CLI and should not");
                println!("be invoked directly. It accepts WebSocket connections per PASEO_LISTEN");
                println!("and/or dials out to PASEO_RELAY_ENDPOINT.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: paseod [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting paseo daemon");

    let StartupResult { mut daemon, attention_rx } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            let version = std::fs::read_to_string(&config.version_path)
                .unwrap_or_default()
                .trim()
                .to_string();

            eprintln!("paseod is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            if !version.is_empty() {
                let current_version = env!("CARGO_PKG_VERSION");
                if version == current_version {
                    eprintln!("  version: {version}");
                } else {
                    eprintln!("  version: {version} (outdated — current: {current_version})");
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            write_startup_error(&config, &e);
            error!("failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let identity = Arc::new(DaemonIdentity::load_or_create(&config.daemon_key_path)?);
    let server_id = load_or_create_stable_id(&config.server_id_path)?;
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "paseo-daemon".to_string());

    let registry = Arc::new(SessionRegistry::new());
    let ctx = Arc::new(DispatchContext {
        manager: daemon.manager.clone(),
        state: Arc::clone(&daemon.state),
        registry: Arc::clone(&registry),
    });

    tokio::spawn(
        NotificationDispatcher::new(Arc::clone(&registry), paseo_core::SystemClock, KEEPALIVE_INTERVAL)
            .run(attention_rx),
    );

    let listen_addr: std::net::SocketAddr = config.listen.parse().map_err(|e| {
        format!("invalid PASEO_LISTEN address {:?}: {e}", config.listen)
    })?;
    tokio::spawn(listener::direct::serve(
        listen_addr,
        config.allowed_hosts.clone(),
        server_id.clone(),
        hostname.clone(),
        Arc::clone(&ctx),
    ));

    if let Some(relay_endpoint) = config.relay_endpoint.clone() {
        info!(endpoint = %relay_endpoint, "relay client enabled");
        tokio::spawn(listener::relay::run(
            relay_endpoint,
            server_id.clone(),
            hostname.clone(),
            Arc::clone(&identity),
            Arc::clone(&ctx),
        ));
    }

    let offer_url = paseo_daemon::crypto::pairing_offer_url(&config.app_base_url, &server_id, &identity);
    info!(%offer_url, "pairing offer ready");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(listen = %config.listen, "daemon ready");
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("received SIGINT, shutting down..."),
    }

    daemon.shutdown()?;
    info!("daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `daemon.log.2` → `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently ignored
/// so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to log before anything else.
/// CLI uses this to find where the current startup attempt begins.
/// Full format: "--- paseod: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- paseod: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
/// This ensures the error is visible to the CLI even if the process exits quickly.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(&config.log_path) else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::Config(paseo_daemon::config::ConfigError::NoHome))?,
        config.log_path.file_name().ok_or(LifecycleError::Config(paseo_daemon::config::ConfigError::NoHome))?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
