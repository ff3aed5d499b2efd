// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relay transport: when a daemon is not directly reachable it dials out to
//! `Config::relay_endpoint` instead of listening, and speaks the same wire
//! protocol end-to-end encrypted over that hop with a per-connection
//! [`SessionCipher`] (SPEC_FULL.md §4.5).

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use paseo_core::{ClientId, DeviceType};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use super::AppContext;
use crate::bridge::{decode_or_status, run_session};
use crate::crypto::{generate_ephemeral, DaemonIdentity, SessionCipher};
use crate::protocol::{encode_server_message, ServerMessage};

/// Reconnect backoff between dropped relay sessions.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Dial `relay_endpoint` and run relay sessions until the process exits,
/// reconnecting with [`RECONNECT_DELAY`] backoff whenever the connection
/// drops. Each connection negotiates a fresh [`SessionCipher`] by exchanging
/// ephemeral X25519 public keys, the daemon's half signed by `identity` so
/// the relay-connected client can verify it is pairing with the expected
/// daemon.
pub async fn run(
    relay_endpoint: String,
    server_id: String,
    hostname: String,
    identity: Arc<DaemonIdentity>,
    ctx: Arc<AppContext>,
) {
    loop {
        match run_once(&relay_endpoint, &server_id, &hostname, &identity, ctx.clone()).await {
            Ok(()) => info!(endpoint = %relay_endpoint, "relay session ended"),
            Err(err) => warn!(endpoint = %relay_endpoint, error = %err, "relay session failed"),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn run_once(
    relay_endpoint: &str,
    server_id: &str,
    hostname: &str,
    identity: &DaemonIdentity,
    ctx: Arc<AppContext>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let (stream, _) = tokio_tungstenite::connect_async(relay_endpoint).await?;
    let (mut ws_tx, mut ws_rx) = stream.split();

    let (local_private, local_public) = match generate_ephemeral() {
        Ok(pair) => pair,
        Err(err) => {
            error!(error = %err, "failed to generate relay session keypair");
            return Ok(());
        }
    };
    let signature = identity.sign(&local_public);
    let handshake = serde_json::json!({
        "daemon_public_key": STANDARD.encode(&local_public),
        "signature": STANDARD.encode(signature.as_ref()),
    });
    if ws_tx.send(Message::Text(handshake.to_string().into())).await.is_err() {
        return Ok(());
    }

    let peer_public = match ws_rx.next().await {
        Some(Ok(Message::Text(text))) => match parse_peer_public_key(&text) {
            Some(bytes) => bytes,
            None => {
                warn!("relay handshake reply was not a valid public key announcement");
                return Ok(());
            }
        },
        _ => {
            warn!("relay connection closed before handshake completed");
            return Ok(());
        }
    };
    let cipher = match SessionCipher::from_agreement(local_private, &peer_public) {
        Ok(cipher) => cipher,
        Err(err) => {
            error!(error = %err, "relay session key agreement failed");
            return Ok(());
        }
    };

    let client_id = ClientId::new(uuid::Uuid::new_v4().to_string());
    info!(client = %client_id, "relay session established");

    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let outbound = run_session(ctx, client_id.clone(), DeviceType::Desktop, inbound_rx).await;
    outbound.push(ServerMessage::Welcome {
        server_id: server_id.to_string(),
        hostname: hostname.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        resumed: false,
    });

    let reader_outbound = outbound.clone();
    let reader = async {
        while let Some(frame) = ws_rx.next().await {
            let sealed = match frame {
                Ok(Message::Binary(bytes)) => bytes,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    warn!(client = %client_id, error = %err, "relay read error");
                    break;
                }
            };
            let plaintext = match cipher.open(&sealed) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(client = %client_id, error = %err, "dropping undecryptable relay frame");
                    continue;
                }
            };
            let text = match String::from_utf8(plaintext) {
                Ok(text) => text,
                Err(_) => continue,
            };
            match decode_or_status(&text) {
                Ok(message) => {
                    if inbound_tx.send(message).await.is_err() {
                        break;
                    }
                }
                Err(status) => reader_outbound.push(status),
            }
        }
    };

    let writer = async {
        loop {
            match outbound.recv().await {
                Some(message) => {
                    let Ok(text) = encode_server_message(&message) else {
                        continue;
                    };
                    let Ok(sealed) = cipher.seal(text.as_bytes()) else {
                        continue;
                    };
                    if ws_tx.send(Message::Binary(sealed)).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
    };

    tokio::join!(reader, writer);
    Ok(())
}

fn parse_peer_public_key(text: &str) -> Option<Vec<u8>> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let encoded = value.get("daemon_public_key")?.as_str()?;
    STANDARD.decode(encoded).ok()
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
