// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: built-in defaults, overlaid by `<PASEO_HOME>/config.toml`,
//! overlaid by environment variables. CLI flags (the outermost layer) are applied
//! by the `paseo` CLI crate before the daemon process is spawned, by passing the
//! resolved values through `PASEO_*` env vars rather than daemon-side flag parsing —
//! the daemon itself never parses `std::env::args()` beyond `--help`/`--version`.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Default listen address when neither config file nor env var sets one.
const DEFAULT_LISTEN: &str = "127.0.0.1:4317";

/// Errors resolving or loading daemon configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory (set PASEO_HOME)")]
    NoHome,

    #[error("failed to read config file {0}: {1}")]
    ReadFile(PathBuf, std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    ParseFile(PathBuf, toml::de::Error),
}

/// Overlay parsed from `<PASEO_HOME>/config.toml`. Every field is optional —
/// an absent field falls through to the built-in default or an env var.
#[derive(Debug, Default, Deserialize)]
struct FileOverlay {
    listen: Option<String>,
    relay_endpoint: Option<String>,
    allowed_hosts: Option<Vec<String>>,
    app_base_url: Option<String>,
}

/// Fully resolved daemon configuration.
///
/// All derived paths are computed once in [`Config::load`] and threaded
/// through the rest of startup rather than re-derived at each use site.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (`PASEO_HOME`, default `~/.paseo`).
    pub home: PathBuf,
    /// `host:port` or `unix:<path>` the direct listener binds.
    pub listen: String,
    /// Relay endpoint used when the daemon is not directly reachable.
    pub relay_endpoint: Option<String>,
    /// Hosts permitted in the `Origin`/`Host` header of inbound WebSocket upgrades.
    pub allowed_hosts: Vec<String>,
    /// Base URL embedded in pairing offers, e.g. `https://paseo.app`.
    pub app_base_url: String,

    /// Directory holding one subdirectory per agent (`record.json`, `timeline/`,
    /// `persistence.json`).
    pub agents_dir: PathBuf,
    /// Paired-client trust records.
    pub pairings_path: PathBuf,
    /// Daemon's long-lived private key, written with mode 0600.
    pub daemon_key_path: PathBuf,
    /// Stable identifier this daemon presents in `welcome` and pairing offers,
    /// and registers under when dialing a relay.
    pub server_id_path: PathBuf,
    /// Stable CLI client identifier.
    pub cli_client_id_path: PathBuf,
    /// Non-blocking file log sink.
    pub log_path: PathBuf,
    /// Compressed snapshot of `MaterializedState`.
    pub snapshot_path: PathBuf,
    /// Lock/PID file preventing two daemons from sharing one `PASEO_HOME`.
    pub lock_path: PathBuf,
    /// Daemon version marker, read by clients to detect stale/outdated daemons.
    pub version_path: PathBuf,
}

impl Config {
    /// Resolve configuration: built-in defaults, overlaid by the TOML file
    /// under `PASEO_HOME` (if present), overlaid by `PASEO_*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let home = home_dir()?;

        let overlay = match std::fs::read_to_string(home.join("config.toml")) {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|e| ConfigError::ParseFile(home.join("config.toml"), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileOverlay::default(),
            Err(e) => return Err(ConfigError::ReadFile(home.join("config.toml"), e)),
        };

        let listen = std::env::var("PASEO_LISTEN")
            .ok()
            .or(overlay.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());

        let relay_endpoint = std::env::var("PASEO_RELAY_ENDPOINT")
            .ok()
            .or(overlay.relay_endpoint);

        let allowed_hosts = std::env::var("PASEO_ALLOWED_HOSTS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .or(overlay.allowed_hosts)
            .unwrap_or_else(|| vec!["localhost".to_string(), "127.0.0.1".to_string()]);

        let app_base_url = std::env::var("PASEO_APP_BASE_URL")
            .ok()
            .or(overlay.app_base_url)
            .unwrap_or_else(|| "https://paseo.app".to_string());

        Ok(Self {
            agents_dir: home.join("agents"),
            pairings_path: home.join("pairings.json"),
            daemon_key_path: home.join("daemon-key"),
            server_id_path: home.join("server-id"),
            cli_client_id_path: home.join("cli-client-id"),
            log_path: home.join("daemon.log"),
            snapshot_path: home.join("snapshot.json"),
            lock_path: home.join("daemon.pid"),
            version_path: home.join("daemon.version"),
            home,
            listen,
            relay_endpoint,
            allowed_hosts,
            app_base_url,
        })
    }
}

/// Read the stable identifier persisted at `path`, generating and persisting
/// a fresh UUID if none exists yet. Used for `server_id`/`cli_client_id`:
/// plain opaque strings, not trust anchors, so unlike `daemon-key` they need
/// no restrictive file mode.
pub fn load_or_create_stable_id(path: &std::path::Path) -> Result<String, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(id) => Ok(id.trim().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let id = uuid::Uuid::new_v4().to_string();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadFile(path.to_path_buf(), e))?;
            }
            std::fs::write(path, &id).map_err(|e| ConfigError::ReadFile(path.to_path_buf(), e))?;
            Ok(id)
        }
        Err(e) => Err(ConfigError::ReadFile(path.to_path_buf(), e)),
    }
}

/// Resolve `PASEO_HOME`: `$PASEO_HOME` first, falling back to `~/.paseo`.
fn home_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("PASEO_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(home).join(".paseo"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
