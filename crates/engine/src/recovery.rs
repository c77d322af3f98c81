// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boot reconciliation and the periodic safety cron.
//!
//! Recovery runs once before the RPC port opens and treats every labeled
//! sandbox resource without an in-memory match as an orphan. The safety cron
//! repeats a weaker sweep on an interval: over-age containers, empty
//! networks, and over-duration matches.

use crate::Engine;
use arena_core::{Clock, MatchId, MatchState};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

impl<C: Clock> Engine<C> {
    /// One-shot reconciliation of sandbox state against the in-memory store.
    /// Best-effort throughout; individual failures never abort startup.
    pub async fn reconcile_on_boot(self: &Arc<Self>) {
        let containers = match self.sandbox.list_match_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                warn!(error = %e, "recovery could not list containers");
                Vec::new()
            }
        };
        let networks = match self.sandbox.list_match_networks().await {
            Ok(networks) => networks,
            Err(e) => {
                warn!(error = %e, "recovery could not list networks");
                Vec::new()
            }
        };

        let match_ids: BTreeSet<MatchId> = containers
            .iter()
            .map(|c| c.match_id.clone())
            .chain(networks.iter().map(|n| n.match_id.clone()))
            .collect();

        let mut orphans = 0usize;
        for id in match_ids {
            match self.store.get(&id) {
                None => {
                    orphans += 1;
                    info!(match_id = %id, "removing orphaned match resources");
                    for container in containers.iter().filter(|c| c.match_id == id) {
                        if let Err(e) = self.sandbox.stop_and_remove(&container.id).await {
                            warn!(match_id = %id, container_id = %container.id, error = %e,
                                "orphan container removal failed");
                        }
                    }
                    if let Err(e) = self.sandbox.remove_network(&id).await {
                        warn!(match_id = %id, error = %e, "orphan network removal failed");
                    }
                }
                Some(shared) => {
                    let state = shared.lock().state;
                    if !state.is_ended() {
                        warn!(match_id = %id, from = %state, "aborting non-terminal match at recovery");
                        if let Err(e) = self.stop_match(&id, "recovery abort").await {
                            warn!(match_id = %id, error = %e, "recovery abort failed");
                        }
                    }
                }
            }
        }

        if orphans > 0 {
            info!(orphans, "recovery removed orphaned match resources");
        }
    }

    /// Spawn the periodic safety sweep.
    pub fn spawn_safety_cron(self: &Arc<Self>, cancel: CancellationToken) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.config.safety_cron_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                engine.safety_sweep().await;
            }
        });
    }

    /// One safety sweep pass; see the module doc for what it reclaims.
    pub async fn safety_sweep(self: &Arc<Self>) {
        let now_ms = self.clock.epoch_ms();
        let max_age_ms = self.config.max_container_age.as_millis() as u64;
        let max_duration_ms = self.config.max_match_duration.as_millis() as u64;

        let mut removed_containers = 0usize;
        let mut removed_networks = 0usize;
        let mut forced_ends = 0usize;

        // Over-duration matches end first so their resources are already
        // released when the container pass runs next time.
        for (id, shared) in self.store.all() {
            let (state, admitted_at_ms) = {
                let m = shared.lock();
                (m.state, m.meta.admitted_at_ms)
            };
            let overdue = now_ms.saturating_sub(admitted_at_ms) > max_duration_ms;
            if overdue && matches!(state, MatchState::Running | MatchState::Initializing) {
                warn!(match_id = %id, from = %state, "match exceeded max duration, forcing end");
                if let Err(e) = self.stop_match(&id, "max duration exceeded").await {
                    warn!(match_id = %id, error = %e, "forced end failed");
                } else {
                    forced_ends += 1;
                }
            }
        }

        if let Ok(containers) = self.sandbox.list_match_containers().await {
            for container in containers {
                let Some(created) = container.created_at_ms else { continue };
                if now_ms.saturating_sub(created) > max_age_ms {
                    warn!(container_id = %container.id, match_id = %container.match_id,
                        "removing over-age container");
                    if self.sandbox.stop_and_remove(&container.id).await.is_ok() {
                        removed_containers += 1;
                    }
                }
            }
        }

        if let Ok(networks) = self.sandbox.list_match_networks().await {
            for network in networks.into_iter().filter(|n| n.attached_containers == 0) {
                // A live match's network is legitimately empty only for a
                // moment during provisioning; leave those alone.
                let active = self
                    .store
                    .get(&network.match_id)
                    .is_some_and(|m| !m.lock().state.is_ended());
                if active {
                    continue;
                }
                if self.sandbox.remove_network(&network.match_id).await.is_ok() {
                    removed_networks += 1;
                }
            }
        }

        self.limiter.purge();
        info!(removed_containers, removed_networks, forced_ends, "safety sweep complete");
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
