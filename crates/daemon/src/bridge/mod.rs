// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session bridge (SPEC_FULL.md §4.3): turns a transport-agnostic stream
//! of decoded client messages into calls against the agent manager and
//! timeline engine, and turns the resulting server messages into a bounded
//! outbound queue a transport task drains.
//!
//! Deliberately split from `listener/` (SPEC_FULL.md §4.5): this module
//! knows nothing about WebSockets, the relay, or pairing. A transport just
//! needs to decode frames into [`crate::protocol::ClientMessage`], call
//! [`run_session`], and re-encode whatever comes out of the returned
//! [`OutboundQueue`].

mod dispatch;
mod outbound;
mod registry;

pub use dispatch::{dispatch, DispatchContext};
pub use outbound::OutboundQueue;
pub use registry::{SessionHandle, SessionRegistry, SessionSnapshot};

use std::sync::Arc;
use std::time::Duration;

use paseo_core::{Clock, ClientId, DeviceType, IdGen};
use paseo_engine::ProviderResolver;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::protocol::{decode_client_message, ClientMessage, ProtocolError, ServerMessage};

/// Interval clients are expected to send `heartbeat`s at; a session is
/// considered stale after twice this (SPEC_FULL.md §4.4).
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// Drive one connected client's session to completion.
///
/// `inbound` yields already-decoded messages (the transport owns framing
/// and JSON decode failures, which it reports back as a
/// [`ServerMessage::error_status`] rather than handing to this loop). The
/// session registers itself, dispatches each message, and deregisters on
/// the way out so `agent_updates`/attention broadcasts stop reaching it.
pub async fn run_session<R: ProviderResolver, G: IdGen, C: Clock>(
    ctx: Arc<DispatchContext<R, G, C>>,
    client_id: ClientId,
    device_type: DeviceType,
    mut inbound: mpsc::Receiver<ClientMessage>,
) -> Arc<OutboundQueue> {
    let outbound = OutboundQueue::new();
    let session = Arc::new(SessionHandle::new(client_id.clone(), device_type, outbound.clone()));
    ctx.registry.insert(session.clone());
    info!(client = %client_id, "session started");

    tokio::spawn({
        let ctx = ctx.clone();
        let session = session.clone();
        async move {
            while let Some(message) = inbound.recv().await {
                dispatch(&ctx, &session, message).await;
            }
            ctx.registry.remove(&session.client_id);
            info!(client = %session.client_id, "session ended");
        }
    });

    outbound
}

/// Decode one inbound text frame, reporting a malformed frame as a
/// transport-level error status rather than dropping the connection
/// (SPEC_FULL.md §4.3: unknown message types elicit an error, the session
/// stays open).
pub fn decode_or_status(text: &str) -> Result<ClientMessage, ServerMessage> {
    decode_client_message(text).map_err(|err| match err {
        ProtocolError::Malformed { source, .. } => {
            warn!(error = %source, "malformed client message");
            ServerMessage::error_status(paseo_core::ErrorCode::BadRequest, source.to_string())
        }
        ProtocolError::Encode(_) => unreachable!("decode path never produces an encode error"),
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
