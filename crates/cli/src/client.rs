// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands.
//!
//! A thin WebSocket client against the direct listener's `/ws` endpoint.
//! Every request is a one-shot: connect, send one `ClientMessage`, read
//! frames until the matching response (correlated by `requestId`) arrives,
//! then close. There is no persistent connection held across commands.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use paseo_core::{AgentId, AgentRecord, ProviderKind, SubscriptionId};
use paseo_daemon::protocol::{ClientMessage, Outcome, ServerMessage};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Message;

use crate::client_lifecycle::log_connection_error;
use crate::daemon_process::{
    daemon_dir, daemon_listen_addr, probe_listener, read_startup_error, start_daemon_background,
    stop_daemon_sync, wrap_with_startup_error,
};

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for a single request/response round trip.
pub fn timeout_ipc() -> Duration {
    crate::env::timeout_connect_ms()
        .or_else(|| parse_duration_ms("PASEO_TIMEOUT_IPC_MS"))
        .unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for the daemon to start.
pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for a process to exit.
pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries.
pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running")]
    DaemonNotRunning,

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed message from daemon: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("request rejected: {message}")]
    Rejected { code: String, message: String },

    #[error("unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine state directory")]
    NoStateDir,
}

/// Information pulled from the `welcome` frame pushed immediately on connect.
pub struct Hello {
    pub server_id: String,
    pub hostname: String,
    pub version: String,
    pub resumed: bool,
}

/// A single request/response round trip against the daemon's direct listener.
pub struct DaemonClient {
    addr: String,
}

impl DaemonClient {
    /// For action commands - auto-start with version check, max 1 restart per process.
    pub fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start_once()
    }

    /// For query commands - connect only, no restart.
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// Semantic alias for `for_query()`, used by commands triggered by the
    /// agent itself rather than directly by the user.
    pub fn for_signal() -> Result<Self, ClientError> {
        Self::connect()
    }

    fn cli_version() -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn version_mismatch() -> bool {
        let Ok(dir) = daemon_dir() else {
            return false;
        };
        let version_path = dir.join("daemon.version");
        match std::fs::read_to_string(&version_path) {
            Ok(daemon_version) => daemon_version.trim() != Self::cli_version(),
            Err(_) => false,
        }
    }

    fn connect_or_start_once() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);

        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect_or_start();
        }

        if Self::version_mismatch() {
            RESTARTED.store(true, Ordering::SeqCst);
            eprintln!("warn: daemon version mismatch detected, restarting daemon");
            stop_daemon_sync();
        }

        Self::connect_or_start()
    }

    /// Connect to the daemon, auto-starting it if it is not reachable.
    pub fn connect_or_start() -> Result<Self, ClientError> {
        let addr = daemon_listen_addr();

        if probe_listener(&addr) {
            return Ok(Self { addr });
        }

        let child = start_daemon_background()?;
        Self::connect_with_retry(addr, timeout_connect(), child)
    }

    /// Connect to an existing daemon (no auto-start).
    pub fn connect() -> Result<Self, ClientError> {
        let addr = daemon_listen_addr();
        if !probe_listener(&addr) {
            let err = ClientError::DaemonNotRunning;
            log_connection_error(&err);
            return Err(err);
        }
        Ok(Self { addr })
    }

    fn connect_with_retry(
        addr: String,
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let poll_start = Instant::now();
                    while poll_start.elapsed() < timeout_exit() {
                        if let Some(err) = read_startup_error() {
                            return Err(ClientError::DaemonStartFailed(err));
                        }
                        std::thread::sleep(poll_interval());
                    }
                    return Err(ClientError::DaemonStartFailed(format!(
                        "exited with {status}"
                    )));
                }
                Ok(None) => {}
                Err(_) => {}
            }

            if probe_listener(&addr) {
                return Ok(Self { addr });
            }
            std::thread::sleep(poll_interval());
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    /// Open a connection, send one message, and collect `ServerMessage`
    /// frames until `matches` returns one. The `welcome` frame is always
    /// consumed first and handed to the caller for inspection.
    async fn roundtrip<F, T>(&self, request: ClientMessage, matches: F) -> Result<T, ClientError>
    where
        F: Fn(ServerMessage) -> Option<T>,
    {
        let url = format!("ws://{}/ws", self.addr);
        let (ws, _) = tokio::time::timeout(timeout_ipc(), tokio_tungstenite::connect_async(&url))
            .await
            .map_err(|_| ClientError::DaemonStartTimeout)??;
        let (mut write, mut read) = ws.split();

        // The direct listener pushes `welcome` immediately on connect.
        let _welcome = Self::next_server_message(&mut read).await?;

        let text = serde_json::to_string(&request)?;
        write.send(Message::Text(text)).await?;

        loop {
            let msg = tokio::time::timeout(timeout_ipc(), Self::next_server_message(&mut read))
                .await
                .map_err(|_| ClientError::DaemonStartTimeout)??;
            if let Some(result) = matches(msg) {
                let _ = write.close().await;
                return Ok(result);
            }
        }
    }

    async fn next_server_message(
        read: &mut (impl futures_util::Stream<
            Item = Result<Message, tokio_tungstenite::tungstenite::Error>,
        > + Unpin),
    ) -> Result<ServerMessage, ClientError> {
        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(_))) | None => {
                    return Err(ClientError::WebSocket(
                        tokio_tungstenite::tungstenite::Error::ConnectionClosed,
                    ))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    fn outcome<T>(request_id: &str, got_id: &str, outcome: Outcome<T>) -> Option<Result<T, ClientError>> {
        if got_id != request_id {
            return None;
        }
        Some(match outcome {
            Outcome::Ok(payload) => Ok(payload),
            Outcome::Error {
                code,
                message,
                details: _,
            } => Err(ClientError::Rejected {
                code: code.as_str().to_string(),
                message,
            }),
        })
    }

    /// Read the `welcome` frame pushed on connect, without sending a request.
    pub async fn hello(&self) -> Result<Hello, ClientError> {
        let url = format!("ws://{}/ws", self.addr);
        let (ws, _) = tokio::time::timeout(timeout_ipc(), tokio_tungstenite::connect_async(&url))
            .await
            .map_err(|_| ClientError::DaemonStartTimeout)??;
        let (mut write, mut read) = ws.split();
        let welcome = Self::next_server_message(&mut read).await?;
        let _ = write.close().await;
        match welcome {
            ServerMessage::Welcome {
                server_id,
                hostname,
                version,
                resumed,
            } => Ok(Hello {
                server_id,
                hostname,
                version,
                resumed,
            }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Create a new agent.
    pub async fn create_agent(
        &self,
        provider: ProviderKind,
        cwd: &str,
        mode_id: &str,
        model: &str,
        title: Option<String>,
    ) -> Result<AgentRecord, ClientError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = ClientMessage::CreateAgentRequest {
            request_id: request_id.clone(),
            provider,
            cwd: cwd.to_string(),
            mode_id: mode_id.to_string(),
            model: model.to_string(),
            extra: serde_json::Value::Null,
            title,
            labels: Default::default(),
        };
        self.roundtrip(request, move |msg| match msg {
            ServerMessage::CreateAgentResponse {
                request_id: got,
                outcome,
            } => Self::outcome(&request_id, &got, outcome).map(|r| r.map(|p| p.record)),
            _ => None,
        })
        .await?
    }

    /// Resume a previously archived or disconnected agent.
    pub async fn resume_agent(
        &self,
        provider: ProviderKind,
        cwd: &str,
        persistence: paseo_core::PersistenceHandle,
        title: Option<String>,
    ) -> Result<AgentRecord, ClientError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = ClientMessage::ResumeAgentRequest {
            request_id: request_id.clone(),
            provider,
            cwd: cwd.to_string(),
            persistence,
            title,
            labels: Default::default(),
        };
        self.roundtrip(request, move |msg| match msg {
            ServerMessage::ResumeAgentResponse {
                request_id: got,
                outcome,
            } => Self::outcome(&request_id, &got, outcome).map(|r| r.map(|p| p.record)),
            _ => None,
        })
        .await?
    }

    /// Archive an agent, returning its archival timestamp.
    pub async fn archive_agent(
        &self,
        agent_id: &str,
        force: bool,
    ) -> Result<std::time::SystemTime, ClientError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = ClientMessage::ArchiveAgentRequest {
            request_id: request_id.clone(),
            agent_id: AgentId::new(agent_id),
            force,
        };
        self.roundtrip(request, move |msg| match msg {
            ServerMessage::ArchiveAgentResponse {
                request_id: got,
                outcome,
            } => Self::outcome(&request_id, &got, outcome).map(|r| r.map(|p| p.archived_at)),
            _ => None,
        })
        .await?
    }

    /// Send a text message to a running agent.
    pub async fn send_message(&self, agent_id: &str, text: &str) -> Result<(), ClientError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = ClientMessage::SendMessageRequest {
            request_id: request_id.clone(),
            agent_id: AgentId::new(agent_id),
            text: text.to_string(),
            images: None,
        };
        self.roundtrip(request, move |msg| match msg {
            ServerMessage::SendMessageResponse {
                request_id: got,
                outcome,
            } => Self::outcome(&request_id, &got, outcome).map(|r| r.map(|_: paseo_daemon::protocol::EmptyPayload| ())),
            _ => None,
        })
        .await?
    }

    /// Cancel an agent's in-flight turn.
    pub async fn cancel(&self, agent_id: &str) -> Result<(), ClientError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let request = ClientMessage::CancelRequest {
            request_id: request_id.clone(),
            agent_id: AgentId::new(agent_id),
        };
        self.roundtrip(request, move |msg| match msg {
            ServerMessage::CancelResponse {
                request_id: got,
                outcome,
            } => Self::outcome(&request_id, &got, outcome).map(|r| r.map(|_: paseo_daemon::protocol::EmptyPayload| ())),
            _ => None,
        })
        .await?
    }

    /// List the current agent roster by subscribing to `agent_updates` and
    /// reading the snapshot the daemon pushes immediately on subscribe, then
    /// unsubscribing. There is no dedicated "list agents" request.
    pub async fn list_agents(&self) -> Result<Vec<AgentRecord>, ClientError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let subscription_id = SubscriptionId::new(uuid::Uuid::new_v4().to_string());
        let request = ClientMessage::SubscribeAgentUpdates {
            request_id: request_id.clone(),
            subscription_id: subscription_id.clone(),
        };

        let url = format!("ws://{}/ws", self.addr);
        let (ws, _) = tokio::time::timeout(timeout_ipc(), tokio_tungstenite::connect_async(&url))
            .await
            .map_err(|_| ClientError::DaemonStartTimeout)??;
        let (mut write, mut read) = ws.split();
        let _welcome = Self::next_server_message(&mut read).await?;

        let text = serde_json::to_string(&request)?;
        write.send(Message::Text(text)).await?;

        let mut ack_seen = false;
        let result = loop {
            let msg = tokio::time::timeout(timeout_ipc(), Self::next_server_message(&mut read))
                .await
                .map_err(|_| ClientError::DaemonStartTimeout)??;
            match msg {
                ServerMessage::SubscribeAgentUpdatesResponse {
                    request_id: got,
                    outcome,
                } if got == request_id => match outcome {
                    Outcome::Ok(_) => ack_seen = true,
                    Outcome::Error { code, message, .. } => {
                        break Err(ClientError::Rejected {
                            code: code.as_str().to_string(),
                            message,
                        })
                    }
                },
                ServerMessage::AgentUpdates {
                    subscription_id: sub,
                    agents,
                } if ack_seen && sub == subscription_id => break Ok(agents),
                _ => continue,
            }
        };

        let _ = write.close().await;
        result
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
