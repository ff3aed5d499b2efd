// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `paseo pair` - print a pairing offer URL for a mobile/desktop client.
//!
//! Reads the same on-disk identity and server id the running daemon uses,
//! so this works whether or not the daemon is currently up: the offer only
//! needs the daemon's public key and server id, not a live connection.

use anyhow::Result;
use clap::Args;
use paseo_daemon::config::{load_or_create_stable_id, Config};
use paseo_daemon::crypto::DaemonIdentity;

use crate::output::OutputFormat;

#[derive(Args)]
pub struct PairArgs {}

pub async fn pair(_args: PairArgs, format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let identity = DaemonIdentity::load_or_create(&config.daemon_key_path)?;
    let server_id = load_or_create_stable_id(&config.server_id_path)?;

    let url = paseo_daemon::crypto::pairing_offer_url(&config.app_base_url, &server_id, &identity);

    match format {
        OutputFormat::Text => println!("{}", url),
        OutputFormat::Json => {
            let obj = serde_json::json!({ "server_id": server_id, "pairing_url": url });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "pair_tests.rs"]
mod tests;
