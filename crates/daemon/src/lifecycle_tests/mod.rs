// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use std::path::Path;

mod reconciliation;
mod restart;
mod startup_shutdown;

/// Build a `Config` pointing at a fresh temp directory, the way
/// `Config::load` would for `PASEO_HOME = dir`.
fn test_config(dir: &Path) -> Config {
    Config {
        home: dir.to_path_buf(),
        listen: "127.0.0.1:0".to_string(),
        relay_endpoint: None,
        allowed_hosts: vec!["localhost".to_string()],
        app_base_url: "https://paseo.app".to_string(),
        agents_dir: dir.join("agents"),
        pairings_path: dir.join("pairings.json"),
        daemon_key_path: dir.join("daemon-key"),
        server_id_path: dir.join("server-id"),
        cli_client_id_path: dir.join("cli-client-id"),
        log_path: dir.join("daemon.log"),
        snapshot_path: dir.join("snapshot.json"),
        lock_path: dir.join("daemon.pid"),
        version_path: dir.join("daemon.version"),
    }
}
