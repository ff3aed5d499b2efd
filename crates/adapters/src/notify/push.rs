// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push notification adapter.
//!
//! The push provider itself (APNs/FCM) is an external collaborator; this
//! adapter only talks to the push-token store fronting it, the same way the
//! teacher's `BusNotifyAdapter` shelled out to `bd bus emit` rather than
//! implementing the event bus itself. Gated behind `PASEO_PUSH_ENDPOINT`:
//! when unset, all calls are a silent no-op, matching the teacher's
//! `OJ_BUS_EMIT` opt-in gate.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;

#[derive(Clone)]
pub struct PushNotifyAdapter {
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl Default for PushNotifyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PushNotifyAdapter {
    pub fn new() -> Self {
        Self {
            endpoint: std::env::var("PASEO_PUSH_ENDPOINT").ok(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotifyAdapter for PushNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let Some(endpoint) = self.endpoint.clone() else {
            return Ok(());
        };

        let body = serde_json::json!({ "title": title, "body": message });
        let client = self.client.clone();
        tokio::spawn(async move {
            tracing::info!(%endpoint, "enqueuing push notification");
            match client.post(&endpoint).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("push notification enqueued");
                }
                Ok(response) => {
                    tracing::warn!(status = %response.status(), "push endpoint returned non-success");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "push endpoint request failed");
                }
            }
        });

        Ok(())
    }
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod tests;
