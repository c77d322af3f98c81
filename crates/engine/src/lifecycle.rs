// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Match lifecycle state machine.
//!
//! Every `match.state` write in the process happens here (or in the tick
//! loop's running check, which only reads). Illegal transitions are no-ops
//! with a logged warning; Stop on an ENDED match is a no-op that succeeds.

use crate::error::EngineError;
use crate::provision::TeamSpec;
use crate::Engine;
use arena_core::{Clock, Match, MatchId, MatchMeta, MatchState, TeamId};
use std::sync::Arc;
use tracing::{info, warn};

/// Body of the Start RPC.
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub match_id: MatchId,
    pub difficulty: String,
    pub team_size: u32,
    pub team_a_players: Vec<String>,
    pub team_b_players: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Accepted,
    /// The match was already admitted; no second ticker is created.
    AlreadyAccepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// Repeat Stop on an ENDED match.
    AlreadyEnded,
}

/// Apply a transition, logging and ignoring illegal attempts.
pub(crate) fn transition_logged(record: &mut Match, to: MatchState) {
    if let Err(e) = record.transition(to) {
        warn!(match_id = %record.id, error = %e, "ignoring illegal transition");
    }
}

impl<C: Clock> Engine<C> {
    /// Admit a match and drive it toward RUNNING in the background.
    ///
    /// Idempotent for a known, non-ENDED match id: the call succeeds without
    /// side effects and never creates a second ticker.
    pub async fn start_match(self: &Arc<Self>, req: StartRequest) -> Result<StartOutcome, EngineError> {
        if let Some(shared) = self.store.get(&req.match_id) {
            let claimed = {
                let mut m = shared.lock();
                if m.state.is_ended() {
                    return Err(EngineError::AlreadyEnded(req.match_id));
                }
                // The record may predate Start (created by Provision); adopt
                // the rosters and team size the Start body carries.
                m.meta.team_size = req.team_size;
                if !req.team_a_players.is_empty() {
                    m.meta.team_a_players = req.team_a_players.clone();
                }
                if !req.team_b_players.is_empty() {
                    m.meta.team_b_players = req.team_b_players.clone();
                }
                m.meta.admitted_at = self.clock.now();
                m.meta.admitted_at_ms = self.clock.epoch_ms();
                // Claim initialization under the lock so a racing Start can
                // never spawn a second initializer (or a second ticker).
                m.transition(MatchState::Initializing).is_ok()
            };
            if !claimed {
                return Ok(StartOutcome::AlreadyAccepted);
            }
            self.spawn_initialization(req.match_id);
            return Ok(StartOutcome::Accepted);
        }

        let meta = MatchMeta {
            difficulty: req.difficulty,
            team_size: req.team_size,
            // Matches admitted without prior provisioning use the legacy
            // team identifiers on both the wire and the service-id prefix.
            team_a_id: TeamId::new("teamA"),
            team_b_id: TeamId::new("teamB"),
            team_a_players: req.team_a_players,
            team_b_players: req.team_b_players,
            admitted_at: self.clock.now(),
            admitted_at_ms: self.clock.epoch_ms(),
        };
        let shared = self
            .store
            .register(Match::new(req.match_id.clone(), meta), self.config.max_concurrent_matches)?;
        transition_logged(&mut shared.lock(), MatchState::Initializing);
        self.spawn_initialization(req.match_id);
        Ok(StartOutcome::Accepted)
    }

    fn spawn_initialization(self: &Arc<Self>, id: MatchId) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_initialization(&id).await;
        });
    }

    /// INITIALIZING -> RUNNING, aborting to ENDED on any failure. The caller
    /// has already claimed the CREATED -> INITIALIZING transition.
    pub(crate) async fn run_initialization(self: &Arc<Self>, id: &MatchId) {
        match self.initialize(id).await {
            Ok(()) => info!(match_id = %id, "match running"),
            Err(e) => {
                warn!(match_id = %id, error = %e, "initialization failed, aborting match");
                self.cleanup_match(id).await;
                if let Some(shared) = self.store.get(id) {
                    transition_logged(&mut shared.lock(), MatchState::Ended);
                }
            }
        }
    }

    async fn initialize(self: &Arc<Self>, id: &MatchId) -> Result<(), EngineError> {
        let shared = self.store.get(id).ok_or_else(|| EngineError::UnknownMatch(id.clone()))?;

        if !self.store.has_infrastructure(id) {
            let (difficulty, team_a, team_b) = {
                let m = shared.lock();
                (
                    m.meta.difficulty.clone(),
                    TeamSpec {
                        team_id: m.meta.team_a_id.clone(),
                        players: m.meta.team_a_players.clone(),
                    },
                    TeamSpec {
                        team_id: m.meta.team_b_id.clone(),
                        players: m.meta.team_b_players.clone(),
                    },
                )
            };
            self.provision_infrastructure(id, &difficulty, &team_a, &team_b).await?;
        }

        let infra =
            self.store.infrastructure(id).ok_or_else(|| EngineError::NoInfrastructure(id.clone()))?;
        {
            let mut m = shared.lock();
            for container in infra.all_containers() {
                m.health.entry(container.service_id.clone()).or_default();
                m.counters.entry(container.service_id.clone()).or_default();
            }
            // Tick counter is zero at RUNNING entry; tick-0 flags were
            // injected during provisioning.
            m.transition(MatchState::Running).map_err(|e| EngineError::Invalid(e.to_string()))?;
        }
        self.spawn_match_ticker(id.clone());
        Ok(())
    }

    /// Drive a match to ENDED: freeze scores, stop the ticker, clean up the
    /// sandbox best-effort. Safe to call from Stop, recovery, the safety
    /// cron, and shutdown.
    pub async fn stop_match(
        self: &Arc<Self>,
        id: &MatchId,
        reason: &str,
    ) -> Result<StopOutcome, EngineError> {
        let shared = self.store.get(id).ok_or_else(|| EngineError::UnknownMatch(id.clone()))?;

        let state = shared.lock().state;
        if state == MatchState::Ended {
            return Ok(StopOutcome::AlreadyEnded);
        }

        info!(match_id = %id, %reason, from = %state, "stopping match");
        self.cancel_ticker(id);
        {
            let mut m = shared.lock();
            match m.state {
                MatchState::Running => {
                    transition_logged(&mut m, MatchState::Ending);
                    m.freeze_result();
                }
                MatchState::Created => {
                    // Aborts route through INITIALIZING; no scores recorded.
                    transition_logged(&mut m, MatchState::Initializing);
                }
                _ => {}
            }
        }

        self.cleanup_match(id).await;

        {
            let mut m = shared.lock();
            if !m.state.is_ended() {
                transition_logged(&mut m, MatchState::Ended);
            }
        }
        Ok(StopOutcome::Stopped)
    }

    /// Best-effort teardown of a match's sandbox resources. Every step
    /// tolerates failure of the previous ones; the Infrastructure record is
    /// deleted last.
    pub(crate) async fn cleanup_match(&self, id: &MatchId) {
        match self.store.infrastructure(id) {
            Some(infra) => {
                for container in infra.team_b.iter().chain(infra.team_a.iter()) {
                    if let Err(e) = self.sandbox.stop_and_remove(&container.container_id).await {
                        warn!(match_id = %id, container_id = %container.container_id, error = %e,
                            "container cleanup failed");
                    }
                }
            }
            None => {
                // Partial provisioning leaves labeled containers with no
                // Infrastructure record; sweep them by label.
                if let Ok(listed) = self.sandbox.list_match_containers().await {
                    for container in listed.into_iter().filter(|c| &c.match_id == id) {
                        if let Err(e) = self.sandbox.stop_and_remove(&container.id).await {
                            warn!(match_id = %id, container_id = %container.id, error = %e,
                                "container cleanup failed");
                        }
                    }
                }
            }
        }

        if let Err(e) = self.sandbox.remove_network(id).await {
            warn!(match_id = %id, error = %e, "network cleanup failed");
        }
        self.store.remove_infrastructure(id);
    }

    /// The Cleanup RPC: tear down a known match's infrastructure. A repeat
    /// call is a no-op. Active matches are stopped first.
    pub async fn cleanup_rpc(self: &Arc<Self>, id: &MatchId) -> Result<(), EngineError> {
        let shared = self.store.get(id).ok_or_else(|| EngineError::UnknownMatch(id.clone()))?;
        let state = shared.lock().state;
        if state.is_ended() {
            self.cleanup_match(id).await;
            return Ok(());
        }
        self.stop_match(id, "cleanup requested").await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
