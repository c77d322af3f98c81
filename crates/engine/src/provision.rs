// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot match stand-up, atomic in effect.
//!
//! Either the Infrastructure record is fully populated with tick-0 flags
//! injected, or every resource created along the way is removed again.
//! Rollback order: team B containers first, then team A, then the network.

use crate::error::EngineError;
use crate::Engine;
use arena_core::{flag, Clock, Container, Infrastructure, Match, MatchId, MatchMeta, TeamId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Image pulls dominate stand-up time, hence the long deadline.
pub const PROVISION_DEADLINE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct TeamSpec {
    pub team_id: TeamId,
    pub players: Vec<String>,
}

/// Body of the Provision RPC.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub match_id: MatchId,
    pub difficulty: String,
    pub team_a: TeamSpec,
    pub team_b: TeamSpec,
}

impl<C: Clock> Engine<C> {
    /// The Provision RPC: stand up infrastructure for a match that does not
    /// have any yet, registering the match record when absent.
    pub async fn provision(
        self: &Arc<Self>,
        req: ProvisionRequest,
    ) -> Result<Infrastructure, EngineError> {
        if self.store.has_infrastructure(&req.match_id) {
            return Err(EngineError::AlreadyProvisioned(req.match_id));
        }

        if self.store.get(&req.match_id).is_none() {
            let meta = MatchMeta {
                difficulty: req.difficulty.clone(),
                team_size: req.team_a.players.len().max(req.team_b.players.len()) as u32,
                team_a_id: req.team_a.team_id.clone(),
                team_b_id: req.team_b.team_id.clone(),
                team_a_players: req.team_a.players.clone(),
                team_b_players: req.team_b.players.clone(),
                admitted_at: self.clock.now(),
                admitted_at_ms: self.clock.epoch_ms(),
            };
            // Provision does not admit into RUNNING; the Start cap applies later.
            self.store.register(Match::new(req.match_id.clone(), meta), usize::MAX)?;
        }

        self.provision_infrastructure(&req.match_id, &req.difficulty, &req.team_a, &req.team_b)
            .await
    }

    /// Stand up network, containers, and tick-0 flags under the provisioning
    /// deadline. On timeout the partial resources are swept by label.
    pub(crate) async fn provision_infrastructure(
        self: &Arc<Self>,
        id: &MatchId,
        difficulty: &str,
        team_a: &TeamSpec,
        team_b: &TeamSpec,
    ) -> Result<Infrastructure, EngineError> {
        match tokio::time::timeout(
            PROVISION_DEADLINE,
            self.provision_inner(id, difficulty, team_a, team_b),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(match_id = %id, "provisioning deadline exceeded, sweeping partial resources");
                self.cleanup_match(id).await;
                Err(EngineError::ProvisionTimeout)
            }
        }
    }

    async fn provision_inner(
        self: &Arc<Self>,
        id: &MatchId,
        difficulty: &str,
        team_a: &TeamSpec,
        team_b: &TeamSpec,
    ) -> Result<Infrastructure, EngineError> {
        let templates = self.backend.fetch_collection(difficulty).await?;
        if templates.is_empty() {
            return Err(EngineError::EmptyCollection(difficulty.to_string()));
        }

        let network = self.sandbox.create_network(id).await?;

        let a_containers = match self
            .sandbox
            .provision_team(id, &team_a.team_id, &network, &templates)
            .await
        {
            Ok(containers) => containers,
            Err(e) => {
                self.rollback(id, &[], &[]).await;
                return Err(e.into());
            }
        };

        let b_containers = match self
            .sandbox
            .provision_team(id, &team_b.team_id, &network, &templates)
            .await
        {
            Ok(containers) => containers,
            Err(e) => {
                self.rollback(id, &[], &a_containers).await;
                return Err(e.into());
            }
        };

        // Tick-0 flags; any failure here unwinds the whole stand-up.
        for container in a_containers.iter().chain(b_containers.iter()) {
            let value = flag::generate(&self.config.flag_secret, id, &container.service_id, 0);
            if let Err(e) = self
                .sandbox
                .inject_flag(&container.container_id, &container.flag_path, &value)
                .await
            {
                self.rollback(id, &b_containers, &a_containers).await;
                return Err(e.into());
            }
        }

        let infra = Infrastructure {
            network_id: network.id,
            network_name: network.name,
            subnet: network.subnet,
            team_a: a_containers,
            team_b: b_containers,
        };
        self.store.set_infrastructure(id, infra.clone());
        info!(
            match_id = %id,
            %difficulty,
            services = infra.team_a.len() + infra.team_b.len(),
            subnet = %infra.subnet,
            "match provisioned"
        );

        // Fire-and-forget notification; the Control Plane catching up later
        // is not the provisioner's problem.
        let backend = Arc::clone(&self.backend);
        let push_id = id.clone();
        let push_infra = infra.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.push_infrastructure(&push_id, &push_infra).await {
                warn!(match_id = %push_id, error = %e, "infrastructure push failed");
            }
        });

        Ok(infra)
    }

    /// Unwind a failed stand-up: team B first, then team A, then the network.
    async fn rollback(&self, id: &MatchId, team_b: &[Container], team_a: &[Container]) {
        for container in team_b.iter().rev().chain(team_a.iter().rev()) {
            if let Err(e) = self.sandbox.stop_and_remove(&container.container_id).await {
                warn!(match_id = %id, container_id = %container.container_id, error = %e,
                    "rollback stop failed");
            }
        }
        if let Err(e) = self.sandbox.remove_network(id).await {
            warn!(match_id = %id, error = %e, "rollback network removal failed");
        }
    }
}

#[cfg(test)]
#[path = "provision_tests.rs"]
mod tests;
