// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport + pairing (SPEC_FULL.md §4.5): the two ways a client reaches
//! this daemon's session bridge. `direct` accepts inbound WebSocket
//! connections on `Config::listen`; `relay` dials out to a configured relay
//! server and speaks the same wire protocol end-to-end encrypted over it.
//! Both hand decoded/encoded frames to [`crate::bridge::run_session`] — this
//! module owns sockets and framing, never agent or timeline state.

pub mod direct;
pub mod relay;

use crate::bridge::DispatchContext;

/// The session bridge's collaborators, concretely instantiated for the
/// `paseod` binary (see `crate::lifecycle::DaemonManager` for the same
/// pattern applied to `AgentManager`).
pub type AppContext =
    DispatchContext<paseo_engine::ProviderRegistry, paseo_core::UuidIdGen, paseo_core::SystemClock>;
