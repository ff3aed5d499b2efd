// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct transport: a locally-reachable daemon accepts WebSocket
//! connections on `Config::listen` at `/ws` (SPEC_FULL.md §4.5).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use paseo_core::{ClientId, DeviceType};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::AppContext;
use crate::bridge::{decode_or_status, run_session};
use crate::protocol::{encode_server_message, ServerMessage};

/// Serve the direct WebSocket listener on `addr` until the process exits.
pub async fn serve(
    addr: SocketAddr,
    allowed_hosts: Vec<String>,
    server_id: String,
    hostname: String,
    ctx: Arc<AppContext>,
) -> std::io::Result<()> {
    let state = Arc::new(AppState { ctx, allowed_hosts, server_id, hostname });
    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "direct listener bound");
    axum::serve(listener, app).await
}

struct AppState {
    ctx: Arc<AppContext>,
    allowed_hosts: Vec<String>,
    server_id: String,
    hostname: String,
}

fn host_is_allowed(headers: &HeaderMap, allowed_hosts: &[String]) -> bool {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h));
    match host {
        Some(host) => allowed_hosts.iter().any(|allowed| allowed == host),
        None => false,
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !host_is_allowed(&headers, &state.allowed_hosts) {
        warn!("rejected websocket upgrade from disallowed host");
        return axum::http::StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let client_id = ClientId::new(uuid::Uuid::new_v4().to_string());
    info!(client = %client_id, "direct connection accepted");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let outbound = run_session(state.ctx.clone(), client_id.clone(), DeviceType::Desktop, inbound_rx).await;

    let welcome = ServerMessage::Welcome {
        server_id: state.server_id.clone(),
        hostname: state.hostname.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        resumed: false,
    };
    outbound.push(welcome);

    let reader_outbound = outbound.clone();
    let reader = async {
        while let Some(frame) = ws_rx.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    warn!(client = %client_id, error = %err, "websocket read error");
                    break;
                }
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
                Some(message) => match encode_server_message(&message) {
                    Ok(text) => {
                        if ws_tx.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(client = %client_id, error = %err, "failed to encode server message"),
                },
                None => break,
            }
        }
    };

    tokio::join!(reader, writer);
    info!(client = %client_id, "direct connection closed");
}

#[cfg(test)]
#[path = "direct_tests.rs"]
mod tests;
