// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paired-host trust records and the persistence handle provider adapters use
//! to resume a conversation across daemon restarts.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

crate::define_id! {
    /// This daemon's stable identity as seen by paired clients / the relay.
    pub struct ServerId;
}

/// A client that has consumed this daemon's pairing offer and recorded its
/// public key as a trust anchor for the relay path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedHost {
    pub server_id: ServerId,
    pub daemon_public_key: Vec<u8>,
    pub label: Option<String>,
    pub last_seen: SystemTime,
}

/// Opaque descriptor letting a provider adapter resume a prior conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceHandle {
    pub provider: crate::ProviderKind,
    pub session_id: String,
    pub metadata: serde_json::Value,
}

#[cfg(test)]
#[path = "pairing_tests.rs"]
mod tests;
