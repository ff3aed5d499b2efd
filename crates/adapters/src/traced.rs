// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability.

use crate::provider::{
    ProviderAdapter, ProviderError, ProviderEvent, ProviderHandle, ProviderManifest,
    ProviderReconnectConfig, ProviderSpawnConfig,
};
use async_trait::async_trait;
use paseo_core::{AgentId, PermissionRequestId, PermissionResolution};
use tokio::sync::mpsc;
use tracing::Instrument;

/// Wrapper that adds tracing to any [`ProviderAdapter`].
#[derive(Clone)]
pub struct TracedProvider<P> {
    inner: P,
}

impl<P> TracedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<P: ProviderAdapter> ProviderAdapter for TracedProvider<P> {
    fn manifest(&self) -> ProviderManifest {
        self.inner.manifest()
    }

    async fn spawn(
        &self,
        config: ProviderSpawnConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError> {
        let span = tracing::info_span!(
            "provider.spawn",
            agent_id = %config.agent_id,
            cwd = %config.cwd.display(),
            mode_id = %config.mode_id,
        );
        async {
            tracing::info!(model = %config.model, "starting provider process");
            let start = std::time::Instant::now();
            let result = self.inner.spawn(config, event_tx).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(h) => tracing::info!(agent_id = %h.agent_id, elapsed_ms, "provider spawned"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "spawn failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn reconnect(
        &self,
        config: ProviderReconnectConfig,
        event_tx: mpsc::Sender<ProviderEvent>,
    ) -> Result<ProviderHandle, ProviderError> {
        let span = tracing::info_span!(
            "provider.reconnect",
            agent_id = %config.agent_id,
            session_id = %config.persistence.session_id,
        );
        async {
            tracing::info!("reconnecting to existing provider session");
            let start = std::time::Instant::now();
            let result = self.inner.reconnect(config, event_tx).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(h) => tracing::info!(agent_id = %h.agent_id, elapsed_ms, "provider reconnected"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "reconnect failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn send(&self, agent_id: &AgentId, text: &str, images: &[String]) -> Result<(), ProviderError> {
        tracing::info_span!("provider.send", %agent_id)
            .in_scope(|| tracing::debug!(text_len = text.len(), image_count = images.len(), "sending"));
        let result = self.inner.send(agent_id, text, images).await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, "send failed");
        }
        result
    }

    async fn respond_permission(
        &self,
        agent_id: &AgentId,
        request_id: &PermissionRequestId,
        resolution: &PermissionResolution,
    ) -> Result<(), ProviderError> {
        let result = self.inner.respond_permission(agent_id, request_id, resolution).await;
        tracing::info_span!("provider.respond_permission", %agent_id, request_id = %request_id)
            .in_scope(|| match &result {
                Ok(()) => tracing::info!(behavior = ?resolution.behavior, "permission resolved"),
                Err(e) => tracing::error!(error = %e, "respond_permission failed"),
            });
        result
    }

    async fn cancel(&self, agent_id: &AgentId) -> Result<(), ProviderError> {
        let result = self.inner.cancel(agent_id).await;
        tracing::info_span!("provider.cancel", %agent_id).in_scope(|| match &result {
            Ok(()) => tracing::info!("cancelled"),
            Err(e) => tracing::warn!(error = %e, "cancel failed"),
        });
        result
    }

    async fn kill(&self, agent_id: &AgentId) -> Result<(), ProviderError> {
        let result = self.inner.kill(agent_id).await;
        tracing::info_span!("provider.kill", %agent_id).in_scope(|| match &result {
            Ok(()) => tracing::info!("killed"),
            Err(e) => tracing::warn!(error = %e, "kill failed (may be expected)"),
        });
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
