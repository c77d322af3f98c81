// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arena-sandbox: the only component that talks to the sandbox runtime.
//!
//! The [`SandboxRuntime`] trait covers network and container lifecycle plus
//! flag injection; [`DockerRuntime`] drives the Docker CLI through
//! `tokio::process::Command`. The driver is stateless apart from the
//! process-wide [`SubnetPool`]; callers provide ordering.

pub mod docker;
pub mod inject;
pub mod subnet;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSandbox, SandboxCall};

use arena_core::{ContainerId, MatchId, NetworkId, ServiceTemplate, TeamId};
use async_trait::async_trait;
use thiserror::Error;

pub use docker::DockerRuntime;
pub use subnet::SubnetPool;

/// Container label keys applied to every engine-owned resource.
pub mod labels {
    pub const MATCH_ID: &str = "match.id";
    pub const TEAM_ID: &str = "team.id";
    pub const SERVICE_TYPE: &str = "service.type";
    pub const TEMPLATE_ID: &str = "template.id";
}

/// Errors from sandbox runtime operations.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("network operation failed: {0}")]
    Network(String),
    #[error("container operation failed: {0}")]
    Container(String),
    #[error("image unavailable: {0}")]
    Image(String),
    #[error("flag injection failed: {0}")]
    Inject(String),
    #[error("invalid flag path: {0}")]
    InvalidPath(String),
    #[error("subnet pool exhausted")]
    SubnetExhausted,
    #[error("sandbox runtime unavailable: {0}")]
    Unavailable(String),
}

/// Isolated network created for one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRef {
    pub id: NetworkId,
    pub name: String,
    pub subnet: String,
}

/// A labeled container observed by recovery or the safety cron.
#[derive(Debug, Clone)]
pub struct LabeledContainer {
    pub id: ContainerId,
    pub name: String,
    pub match_id: MatchId,
    pub created_at_ms: Option<u64>,
}

/// A labeled network observed by recovery or the safety cron.
#[derive(Debug, Clone)]
pub struct LabeledNetwork {
    pub id: NetworkId,
    pub name: String,
    pub match_id: MatchId,
    pub attached_containers: usize,
}

/// Sandbox runtime operations, implemented by [`DockerRuntime`] and by the
/// test `FakeSandbox`.
#[async_trait]
pub trait SandboxRuntime: Send + Sync + 'static {
    /// Create (or return the existing) isolated network `match_<matchId>`.
    async fn create_network(&self, match_id: &MatchId) -> Result<NetworkRef, SandboxError>;

    /// Provision one container per template for a team. On any failure, every
    /// container already created by this call is removed before returning.
    async fn provision_team(
        &self,
        match_id: &MatchId,
        team_id: &TeamId,
        network: &NetworkRef,
        templates: &[ServiceTemplate],
    ) -> Result<Vec<arena_core::Container>, SandboxError>;

    /// Write `value` to `path` inside the container. The value is shell-escaped
    /// and the path rejected outright when it carries shell metacharacters.
    async fn inject_flag(
        &self,
        container_id: &ContainerId,
        path: &str,
        value: &str,
    ) -> Result<(), SandboxError>;

    /// Graceful stop (10s deadline) then force-remove. Idempotent; errors from
    /// already-gone containers are swallowed.
    async fn stop_and_remove(&self, container_id: &ContainerId) -> Result<(), SandboxError>;

    /// Remove the match's network by name; no-op when absent. Releases the
    /// subnet octet either way.
    async fn remove_network(&self, match_id: &MatchId) -> Result<(), SandboxError>;

    /// All containers carrying the engine's `match.id` label.
    async fn list_match_containers(&self) -> Result<Vec<LabeledContainer>, SandboxError>;

    /// All networks carrying the engine's `match.id` label or name prefix.
    async fn list_match_networks(&self) -> Result<Vec<LabeledNetwork>, SandboxError>;
}

/// Network name for a match, shared by creation, lookup, and recovery.
pub fn network_name(match_id: &MatchId) -> String {
    format!("match_{match_id}")
}

/// Derive the match id back out of an engine network name.
pub fn match_id_from_network_name(name: &str) -> Option<MatchId> {
    name.strip_prefix("match_").filter(|rest| !rest.is_empty()).map(MatchId::new)
}
