// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sandbox runtime for tests.
//!
//! Records every call, keeps a live container/network view for recovery
//! tests, and can be told to fail provisioning or injection on demand.

use crate::{
    network_name, LabeledContainer, LabeledNetwork, NetworkRef, SandboxError, SandboxRuntime,
};
use arena_core::{Container, ContainerId, MatchId, NetworkId, ServiceId, ServiceTemplate, TeamId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One recorded sandbox operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxCall {
    CreateNetwork(MatchId),
    ProvisionTeam { match_id: MatchId, team_id: TeamId, services: usize },
    InjectFlag { container_id: ContainerId, path: String },
    StopRemove(ContainerId),
    RemoveNetwork(MatchId),
}

#[derive(Default)]
struct Inner {
    calls: Vec<SandboxCall>,
    next_octet: u8,
    container_seq: u32,
    now_ms: u64,
    networks: HashMap<String, (NetworkRef, MatchId)>,
    containers: HashMap<ContainerId, LabeledContainer>,
    injected: HashMap<ContainerId, Vec<String>>,
    fail_team: Option<TeamId>,
    fail_inject_for: HashSet<ContainerId>,
    fail_create_network: bool,
}

/// Recording fake of the sandbox runtime.
#[derive(Clone)]
pub struct FakeSandbox {
    inner: Arc<Mutex<Inner>>,
}

impl Default for FakeSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSandbox {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                now_ms: 1_000_000,
                ..Inner::default()
            })),
        }
    }

    /// Fail any `provision_team` call for this team.
    pub fn fail_provision_for(&self, team: &TeamId) {
        self.inner.lock().fail_team = Some(team.clone());
    }

    /// Fail flag injections for this container.
    pub fn fail_injections_for(&self, container: &ContainerId) {
        self.inner.lock().fail_inject_for.insert(container.clone());
    }

    pub fn fail_create_network(&self) {
        self.inner.lock().fail_create_network = true;
    }

    /// Creation timestamp stamped onto subsequently provisioned containers.
    pub fn set_now_ms(&self, ms: u64) {
        self.inner.lock().now_ms = ms;
    }

    /// Seed a pre-existing labeled container (orphan scenarios).
    pub fn seed_container(&self, match_id: &MatchId, name: &str, created_at_ms: u64) -> ContainerId {
        let mut inner = self.inner.lock();
        inner.container_seq += 1;
        let id = ContainerId::new(format!("seeded-{}", inner.container_seq));
        inner.containers.insert(
            id.clone(),
            LabeledContainer {
                id: id.clone(),
                name: name.to_string(),
                match_id: match_id.clone(),
                created_at_ms: Some(created_at_ms),
            },
        );
        id
    }

    /// Seed a pre-existing labeled network (orphan scenarios).
    pub fn seed_network(&self, match_id: &MatchId) {
        let mut inner = self.inner.lock();
        inner.next_octet += 1;
        let octet = inner.next_octet;
        let name = network_name(match_id);
        let net = NetworkRef {
            id: NetworkId::new(format!("fakenet-{octet}")),
            name: name.clone(),
            subnet: format!("172.20.{octet}.0/24"),
        };
        inner.networks.insert(name, (net, match_id.clone()));
    }

    pub fn calls(&self) -> Vec<SandboxCall> {
        self.inner.lock().calls.clone()
    }

    /// Flag values injected into one container, in order.
    pub fn injected_values(&self, container: &ContainerId) -> Vec<String> {
        self.inner.lock().injected.get(container).cloned().unwrap_or_default()
    }

    pub fn live_container_ids(&self) -> Vec<ContainerId> {
        let mut ids: Vec<_> = self.inner.lock().containers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn has_network(&self, match_id: &MatchId) -> bool {
        self.inner.lock().networks.contains_key(&network_name(match_id))
    }
}

#[async_trait]
impl SandboxRuntime for FakeSandbox {
    async fn create_network(&self, match_id: &MatchId) -> Result<NetworkRef, SandboxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SandboxCall::CreateNetwork(match_id.clone()));
        if inner.fail_create_network {
            return Err(SandboxError::Network("forced network failure".to_string()));
        }
        let name = network_name(match_id);
        if let Some((net, _)) = inner.networks.get(&name) {
            return Ok(net.clone());
        }
        inner.next_octet += 1;
        let octet = inner.next_octet;
        let net = NetworkRef {
            id: NetworkId::new(format!("fakenet-{octet}")),
            name: name.clone(),
            subnet: format!("172.20.{octet}.0/24"),
        };
        inner.networks.insert(name, (net.clone(), match_id.clone()));
        Ok(net)
    }

    async fn provision_team(
        &self,
        match_id: &MatchId,
        team_id: &TeamId,
        _network: &NetworkRef,
        templates: &[ServiceTemplate],
    ) -> Result<Vec<Container>, SandboxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SandboxCall::ProvisionTeam {
            match_id: match_id.clone(),
            team_id: team_id.clone(),
            services: templates.len(),
        });
        if inner.fail_team.as_ref() == Some(team_id) {
            return Err(SandboxError::Container("forced provision failure".to_string()));
        }
        let mut containers = Vec::with_capacity(templates.len());
        for template in templates {
            inner.container_seq += 1;
            let seq = inner.container_seq;
            let id = ContainerId::new(format!("fake-{match_id}-{team_id}-{}", template.template_id));
            let now_ms = inner.now_ms;
            inner.containers.insert(
                id.clone(),
                LabeledContainer {
                    id: id.clone(),
                    name: format!("match-{match_id}-{team_id}-{}-{}", template.kind, template.template_id),
                    match_id: match_id.clone(),
                    created_at_ms: Some(now_ms),
                },
            );
            containers.push(Container {
                container_id: id,
                address: format!("172.20.1.{}", seq + 1),
                port: template.port,
                kind: template.kind,
                template_id: template.template_id.clone(),
                team_id: team_id.clone(),
                service_id: ServiceId::compose(team_id, &template.template_id),
                flag_path: template.flag_path.clone(),
                health_check: template.health_check.clone(),
            });
        }
        Ok(containers)
    }

    async fn inject_flag(
        &self,
        container_id: &ContainerId,
        path: &str,
        value: &str,
    ) -> Result<(), SandboxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SandboxCall::InjectFlag {
            container_id: container_id.clone(),
            path: path.to_string(),
        });
        if inner.fail_inject_for.contains(container_id) {
            return Err(SandboxError::Inject("forced injection failure".to_string()));
        }
        inner.injected.entry(container_id.clone()).or_default().push(value.to_string());
        Ok(())
    }

    async fn stop_and_remove(&self, container_id: &ContainerId) -> Result<(), SandboxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SandboxCall::StopRemove(container_id.clone()));
        inner.containers.remove(container_id);
        Ok(())
    }

    async fn remove_network(&self, match_id: &MatchId) -> Result<(), SandboxError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SandboxCall::RemoveNetwork(match_id.clone()));
        inner.networks.remove(&network_name(match_id));
        Ok(())
    }

    async fn list_match_containers(&self) -> Result<Vec<LabeledContainer>, SandboxError> {
        Ok(self.inner.lock().containers.values().cloned().collect())
    }

    async fn list_match_networks(&self) -> Result<Vec<LabeledNetwork>, SandboxError> {
        let inner = self.inner.lock();
        Ok(inner
            .networks
            .values()
            .map(|(net, match_id)| LabeledNetwork {
                id: net.id.clone(),
                name: net.name.clone(),
                match_id: match_id.clone(),
                attached_containers: inner
                    .containers
                    .values()
                    .filter(|c| &c.match_id == match_id)
                    .count(),
            })
            .collect())
    }
}
