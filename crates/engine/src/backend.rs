// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-Plane client.
//!
//! The engine makes exactly two outbound calls: fetching the default service
//! collection for a difficulty at provision time, and pushing the finished
//! Infrastructure back as a fire-and-forget notification.

use crate::error::EngineError;
use arena_core::{Infrastructure, MatchId, ServiceTemplate};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Control-Plane seam, implemented over HTTP in production and by
/// `FakeControlPlane` in tests.
#[async_trait]
pub trait ControlPlane: Send + Sync + 'static {
    async fn fetch_collection(&self, difficulty: &str)
        -> Result<Vec<ServiceTemplate>, EngineError>;

    async fn push_infrastructure(
        &self,
        match_id: &MatchId,
        infra: &Infrastructure,
    ) -> Result<(), EngineError>;
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    services: Vec<ServiceTemplate>,
}

/// HTTP Control-Plane client.
pub struct HttpControlPlane {
    base_url: String,
    client: reqwest::Client,
}

impl HttpControlPlane {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { base_url: base_url.into(), client }
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn fetch_collection(
        &self,
        difficulty: &str,
    ) -> Result<Vec<ServiceTemplate>, EngineError> {
        let url = format!("{}/api/match/default-collection", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("difficulty", difficulty)])
            .send()
            .await
            .map_err(|e| EngineError::ControlPlane(e.to_string()))?
            .error_for_status()
            .map_err(|e| EngineError::ControlPlane(e.to_string()))?;
        let collection: CollectionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ControlPlane(format!("bad collection body: {e}")))?;
        Ok(collection.services)
    }

    async fn push_infrastructure(
        &self,
        match_id: &MatchId,
        infra: &Infrastructure,
    ) -> Result<(), EngineError> {
        let url = format!("{}/api/match/infrastructure", self.base_url);
        let body = serde_json::json!({ "matchId": match_id, "infrastructure": infra });
        // Response body is not consumed; only transport-level failure matters.
        self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::ControlPlane(e.to_string()))?;
        debug!(match_id = %match_id, "infrastructure pushed to control plane");
        Ok(())
    }
}

/// Scriptable Control Plane for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeControlPlane {
    templates: parking_lot::Mutex<Vec<ServiceTemplate>>,
    pushes: parking_lot::Mutex<Vec<MatchId>>,
    fail_fetch: parking_lot::Mutex<bool>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeControlPlane {
    pub fn with_templates(templates: Vec<ServiceTemplate>) -> Self {
        Self {
            templates: parking_lot::Mutex::new(templates),
            pushes: parking_lot::Mutex::new(Vec::new()),
            fail_fetch: parking_lot::Mutex::new(false),
        }
    }

    pub fn empty() -> Self {
        Self::with_templates(Vec::new())
    }

    pub fn fail_fetch(&self) {
        *self.fail_fetch.lock() = true;
    }

    /// Make subsequent fetches return an empty collection.
    pub fn templates_clear(&self) {
        self.templates.lock().clear();
    }

    pub fn pushed_matches(&self) -> Vec<MatchId> {
        self.pushes.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn fetch_collection(
        &self,
        _difficulty: &str,
    ) -> Result<Vec<ServiceTemplate>, EngineError> {
        if *self.fail_fetch.lock() {
            return Err(EngineError::ControlPlane("forced fetch failure".to_string()));
        }
        Ok(self.templates.lock().clone())
    }

    async fn push_infrastructure(
        &self,
        match_id: &MatchId,
        _infra: &Infrastructure,
    ) -> Result<(), EngineError> {
        self.pushes.lock().push(match_id.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
