// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns one decoded [`ClientMessage`] into calls against the agent manager
//! and timeline engine, and the resulting [`ServerMessage`] onto the
//! session's outbound queue (SPEC_FULL.md §4.3).
//!
//! Subscriptions (`agent_stream`) spawn a forwarding task that outlives this
//! single dispatch call; everything else replies synchronously.

use std::sync::Arc;

use parking_lot::Mutex;
use paseo_core::{AgentRecord, Clock, IdGen};
use paseo_engine::{AgentManager, ManagerError, ProviderResolver};
use paseo_storage::MaterializedState;
use tokio::task::JoinHandle;
use tracing::warn;

use super::registry::{SessionHandle, SessionRegistry};
use crate::protocol::{
    AgentSnapshotPayload, AgentStreamEvent, ArchiveAgentPayload, ClientMessage, EmptyPayload,
    FetchAgentTimelinePayload, FetchDirection, Outcome, ServerMessage,
};
use crate::wire_error;

/// Everything a session's dispatch loop needs beyond its own
/// [`SessionHandle`]: the agent manager, the shared materialized state (for
/// `agent_updates` snapshots the manager itself doesn't enumerate), and the
/// registry every other connected session is tracked in.
pub struct DispatchContext<R: ProviderResolver, G: IdGen, C: Clock> {
    pub manager: AgentManager<R, G, C>,
    pub state: Arc<Mutex<MaterializedState>>,
    pub registry: Arc<SessionRegistry>,
}

impl<R: ProviderResolver, G: IdGen, C: Clock> DispatchContext<R, G, C> {
    fn agent_roster(&self) -> Vec<AgentRecord> {
        self.state.lock().agents.values().cloned().collect()
    }

    /// Broadcast the current roster to every `agent_updates` subscriber.
    ///
    /// Triggered after every successful mutating request, rather than on a
    /// timer or a dedicated change-feed: the manager has no internal
    /// "agent changed" signal of its own, so this is a pragmatic
    /// approximation of push-on-mutation that keeps subscribers within one
    /// request/response round trip of current.
    fn notify_roster_changed(&self) {
        self.registry.broadcast_agent_updates(self.agent_roster());
    }
}

pub async fn dispatch<R: ProviderResolver, G: IdGen, C: Clock>(
    ctx: &DispatchContext<R, G, C>,
    session: &Arc<SessionHandle>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::CreateAgentRequest {
            request_id,
            provider,
            cwd,
            mode_id,
            model,
            extra,
            title,
            labels,
        } => {
            let outcome = match ctx
                .manager
                .create_agent(paseo_engine::CreateAgentConfig {
                    provider,
                    cwd: cwd.into(),
                    mode_id,
                    model,
                    title,
                    labels,
                    extra,
                })
                .await
            {
                Ok(record) => Outcome::ok(AgentSnapshotPayload { record }),
                Err(err) => err_outcome(&err),
            };
            let is_ok = matches!(outcome, Outcome::Ok(_));
            session.outbound.push(ServerMessage::CreateAgentResponse { request_id, outcome });
            if is_ok {
                ctx.notify_roster_changed();
            }
        }
        ClientMessage::ResumeAgentRequest {
            request_id,
            provider,
            cwd,
            persistence,
            title,
            labels,
        } => {
            let outcome = match ctx
                .manager
                .resume_agent(paseo_engine::ResumeAgentConfig {
                    provider,
                    cwd: cwd.into(),
                    persistence,
                    title,
                    labels,
                })
                .await
            {
                Ok(record) => Outcome::ok(AgentSnapshotPayload { record }),
                Err(err) => err_outcome(&err),
            };
            let is_ok = matches!(outcome, Outcome::Ok(_));
            session.outbound.push(ServerMessage::ResumeAgentResponse { request_id, outcome });
            if is_ok {
                ctx.notify_roster_changed();
            }
        }
        ClientMessage::ArchiveAgentRequest { request_id, agent_id, force } => {
            let outcome = match ctx.manager.archive_agent(&agent_id, force).await {
                Ok(archived_at) => Outcome::ok(ArchiveAgentPayload { archived_at }),
                Err(err) => err_outcome(&err),
            };
            let is_ok = matches!(outcome, Outcome::Ok(_));
            session.outbound.push(ServerMessage::ArchiveAgentResponse { request_id, outcome });
            if is_ok {
                ctx.notify_roster_changed();
            }
        }
        ClientMessage::SetModeRequest { request_id, agent_id, mode_id } => {
            let outcome = match ctx.manager.set_mode(&agent_id, &mode_id) {
                Ok(()) => Outcome::ok(EmptyPayload {}),
                Err(err) => err_outcome(&err),
            };
            let is_ok = matches!(outcome, Outcome::Ok(_));
            session.outbound.push(ServerMessage::SetModeResponse { request_id, outcome });
            if is_ok {
                ctx.notify_roster_changed();
            }
        }
        ClientMessage::SetModelRequest { request_id, agent_id, model } => {
            let outcome = match ctx.manager.set_model(&agent_id, &model) {
                Ok(()) => Outcome::ok(EmptyPayload {}),
                Err(err) => err_outcome(&err),
            };
            let is_ok = matches!(outcome, Outcome::Ok(_));
            session.outbound.push(ServerMessage::SetModelResponse { request_id, outcome });
            if is_ok {
                ctx.notify_roster_changed();
            }
        }
        ClientMessage::SendMessageRequest { request_id, agent_id, text, images } => {
            let outcome = match ctx.manager.send_message(&agent_id, &text, images).await {
                Ok(()) => Outcome::ok(EmptyPayload {}),
                Err(err) => err_outcome(&err),
            };
            session.outbound.push(ServerMessage::SendMessageResponse { request_id, outcome });
        }
        ClientMessage::RespondPermissionRequest {
            request_id,
            agent_id,
            permission_request_id,
            resolution,
        } => {
            let outcome = match ctx
                .manager
                .respond_permission(&agent_id, &permission_request_id, resolution)
                .await
            {
                Ok(()) => Outcome::ok(EmptyPayload {}),
                Err(err) => err_outcome(&err),
            };
            session.outbound.push(ServerMessage::RespondPermissionResponse { request_id, outcome });
        }
        ClientMessage::CancelRequest { request_id, agent_id } => {
            let outcome = match ctx.manager.cancel(&agent_id).await {
                Ok(()) => Outcome::ok(EmptyPayload {}),
                Err(err) => err_outcome(&err),
            };
            session.outbound.push(ServerMessage::CancelResponse { request_id, outcome });
        }
        ClientMessage::FetchAgentTimelineRequest {
            request_id,
            agent_id,
            direction,
            cursor,
            limit,
            projection,
        } => {
            let outcome = match direction {
                FetchDirection::Tail => {
                    match ctx.manager.timeline().fetch_tail(&agent_id, limit, projection, cursor) {
                        Ok(page) => Outcome::ok(FetchAgentTimelinePayload { page }),
                        Err(err) => {
                            let (code, message) = wire_error::timeline_error(&err);
                            Outcome::err(code, message)
                        }
                    }
                }
                FetchDirection::Before | FetchDirection::After => Outcome::err(
                    paseo_core::ErrorCode::Unsupported,
                    "paging before/after the retained tail is not supported",
                ),
            };
            session
                .outbound
                .push(ServerMessage::FetchAgentTimelineResponse { request_id, outcome });
        }
        ClientMessage::SubscribeAgentUpdates { request_id, subscription_id } => {
            session.subscribe_agent_updates(subscription_id.clone());
            session.outbound.push(ServerMessage::SubscribeAgentUpdatesResponse {
                request_id,
                outcome: Outcome::ok(EmptyPayload {}),
            });
            session.outbound.push(ServerMessage::AgentUpdates {
                subscription_id,
                agents: ctx.agent_roster(),
            });
        }
        ClientMessage::UnsubscribeAgentUpdates { request_id, subscription_id } => {
            session.unsubscribe_agent_updates(&subscription_id);
            session.outbound.push(ServerMessage::UnsubscribeAgentUpdatesResponse {
                request_id,
                outcome: Outcome::ok(EmptyPayload {}),
            });
        }
        ClientMessage::SubscribeAgentStream { request_id, subscription_id, agent_id, cursor } => {
            match ctx.manager.timeline().subscribe(&agent_id, cursor) {
                Ok(rx) => {
                    let task =
                        spawn_agent_stream_forwarder(session.clone(), subscription_id.clone(), agent_id.clone(), rx);
                    session.track_agent_stream(subscription_id.clone(), agent_id.clone(), task);
                    session.outbound.push(ServerMessage::SubscribeAgentStreamResponse {
                        request_id,
                        outcome: Outcome::ok(EmptyPayload {}),
                    });
                }
                Err(err) => {
                    let (code, msg) = wire_error::timeline_error(&err);
                    session.outbound.push(ServerMessage::SubscribeAgentStreamResponse {
                        request_id,
                        outcome: Outcome::err(code, msg),
                    });
                }
            }
        }
        ClientMessage::UnsubscribeAgentStream { request_id, subscription_id } => {
            session.untrack_agent_stream(&subscription_id);
            session.outbound.push(ServerMessage::UnsubscribeAgentStreamResponse {
                request_id,
                outcome: Outcome::ok(EmptyPayload {}),
            });
        }
        ClientMessage::SubscribeCheckoutDiff { request_id, .. } => {
            session.outbound.push(ServerMessage::SubscribeCheckoutDiffResponse {
                request_id,
                outcome: Outcome::err(
                    paseo_core::ErrorCode::Unsupported,
                    "checkout diff streaming is not implemented",
                ),
            });
        }
        ClientMessage::UnsubscribeCheckoutDiff { request_id, .. } => {
            session.outbound.push(ServerMessage::UnsubscribeCheckoutDiffResponse {
                request_id,
                outcome: Outcome::ok(EmptyPayload {}),
            });
        }
        ClientMessage::Heartbeat { focused_agent_id, last_activity_at, app_visible, device_type } => {
            session.record_heartbeat(paseo_core::Heartbeat {
                focused_agent_id,
                last_activity_at,
                app_visible,
                device_type,
            });
        }
        ClientMessage::Ping => {
            session.outbound.push(ServerMessage::Pong);
        }
    }
}

fn err_outcome<T>(err: &ManagerError) -> Outcome<T> {
    let (code, message) = wire_error::manager_error(err);
    Outcome::err(code, message)
}

/// Forward a live timeline subscription onto the session's outbound queue
/// until the subscription is dropped (timeline closed) or the session
/// stops tracking it (an explicit unsubscribe drops the task via
/// `abort()`).
fn spawn_agent_stream_forwarder(
    session: Arc<SessionHandle>,
    subscription_id: paseo_core::SubscriptionId,
    agent_id: paseo_core::AgentId,
    mut rx: tokio::sync::mpsc::Receiver<paseo_engine::TimelineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let event = match event {
                paseo_engine::TimelineEvent::Append(entry) => AgentStreamEvent::Append { entry },
                paseo_engine::TimelineEvent::Reset(page) => AgentStreamEvent::Reset { page },
            };
            session.outbound.push(ServerMessage::AgentStream {
                subscription_id: subscription_id.clone(),
                agent_id: agent_id.clone(),
                event,
            });
        }
        warn!(agent = %agent_id, "agent stream subscription ended");
    })
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
