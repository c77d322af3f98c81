// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory match registry and derived reads.
//!
//! The only mutable shared store in the process. Match records sit behind a
//! map of per-match locks: the outer map lock is held only to resolve the
//! `Arc`, and mutations run under the inner match lock. Lock order is always
//! outer-then-inner; nothing takes the outer lock while holding an inner one.

use crate::error::EngineError;
use arena_core::{Infrastructure, Match, MatchId, MatchState, ServiceId, TeamId, TeamSide, TeamStats};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub type SharedMatch = Arc<Mutex<Match>>;

#[derive(Default)]
pub struct StateStore {
    matches: Mutex<HashMap<MatchId, SharedMatch>>,
    infra: Mutex<HashMap<MatchId, Infrastructure>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new match, enforcing the concurrent-match cap atomically
    /// with the insert. Losers of the cap race get `CapacityExceeded` and no
    /// partial write.
    pub fn register(&self, record: Match, cap: usize) -> Result<SharedMatch, EngineError> {
        let mut matches = self.matches.lock();
        if matches.contains_key(&record.id) {
            return Err(EngineError::AlreadyRegistered(record.id));
        }
        let active = matches.values().filter(|m| !m.lock().state.is_ended()).count();
        if active >= cap {
            return Err(EngineError::CapacityExceeded { active });
        }
        let id = record.id.clone();
        let shared = Arc::new(Mutex::new(record));
        matches.insert(id, Arc::clone(&shared));
        Ok(shared)
    }

    pub fn get(&self, id: &MatchId) -> Option<SharedMatch> {
        self.matches.lock().get(id).cloned()
    }

    /// Matches whose state is not ENDED.
    pub fn active_count(&self) -> usize {
        self.matches.lock().values().filter(|m| !m.lock().state.is_ended()).count()
    }

    /// Snapshot of every registered match for iteration.
    pub fn all(&self) -> Vec<(MatchId, SharedMatch)> {
        self.matches.lock().iter().map(|(id, m)| (id.clone(), Arc::clone(m))).collect()
    }

    pub fn set_infrastructure(&self, id: &MatchId, infra: Infrastructure) {
        self.infra.lock().insert(id.clone(), infra);
    }

    pub fn infrastructure(&self, id: &MatchId) -> Option<Infrastructure> {
        self.infra.lock().get(id).cloned()
    }

    pub fn remove_infrastructure(&self, id: &MatchId) -> Option<Infrastructure> {
        self.infra.lock().remove(id)
    }

    pub fn has_infrastructure(&self, id: &MatchId) -> bool {
        self.infra.lock().contains_key(id)
    }

    /// Candidate service identifiers for flag validation: from the match's
    /// Infrastructure when provisioned, else the two legacy identifiers.
    pub fn service_ids(&self, id: &MatchId) -> Vec<ServiceId> {
        match self.infra.lock().get(id) {
            Some(infra) => infra.service_ids(),
            None => vec![
                ServiceId::new(format!("teamA_{id}")),
                ServiceId::new(format!("teamB_{id}")),
            ],
        }
    }

    pub fn current_tick(&self, id: &MatchId) -> Option<u64> {
        self.get(id).map(|m| m.lock().tick)
    }

    pub fn state(&self, id: &MatchId) -> Option<MatchState> {
        self.get(id).map(|m| m.lock().state)
    }

    pub fn is_flag_captured(&self, id: &MatchId, service: &ServiceId, tick: u64) -> bool {
        self.get(id).is_some_and(|m| m.lock().is_captured(service, tick))
    }

    /// Atomic check-and-set on the dedup map; false when already captured.
    pub fn record_flag_capture(
        &self,
        id: &MatchId,
        service: &ServiceId,
        tick: u64,
        team: &TeamId,
    ) -> bool {
        self.get(id).is_some_and(|m| m.lock().record_capture(service, tick, team))
    }

    pub fn scores(&self, id: &MatchId) -> Option<(i64, i64)> {
        self.get(id).map(|m| {
            let m = m.lock();
            (m.score(TeamSide::TeamA), m.score(TeamSide::TeamB))
        })
    }

    pub fn uptime_stats(&self, id: &MatchId) -> Option<(TeamStats, TeamStats)> {
        self.get(id).map(|m| {
            let m = m.lock();
            (m.stats_for(TeamSide::TeamA), m.stats_for(TeamSide::TeamB))
        })
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
