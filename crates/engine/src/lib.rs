// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arena-engine: match lifecycle, provisioning, scoring, and recovery.
//!
//! [`Engine`] owns the state store and drives every side effect through the
//! sandbox and Control-Plane seams. The HTTP surface in `arena-server` is a
//! thin dispatcher over the methods exposed here.

pub mod backend;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod probe;
pub mod provision;
pub mod ratelimit;
pub mod recovery;
pub mod store;
pub mod submit;
pub mod ticker;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use backend::{ControlPlane, HttpControlPlane};
pub use config::{ConfigError, EngineConfig};
pub use error::EngineError;
pub use lifecycle::{StartOutcome, StartRequest, StopOutcome};
pub use probe::{NetProber, Prober};
pub use provision::{ProvisionRequest, TeamSpec};
pub use submit::{RejectReason, SubmitOutcome};

#[cfg(any(test, feature = "test-support"))]
pub use backend::FakeControlPlane;
#[cfg(any(test, feature = "test-support"))]
pub use probe::FakeProber;

use arena_core::{Clock, FinalResult, Infrastructure, MatchId, MatchState, SystemClock, TeamId};
use arena_sandbox::SandboxRuntime;
use parking_lot::Mutex;
use ratelimit::SubmissionLimiter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use store::StateStore;
use tokio_util::sync::CancellationToken;

/// The match engine: one instance per process, shared behind `Arc`.
pub struct Engine<C: Clock = SystemClock> {
    pub(crate) config: EngineConfig,
    pub(crate) store: StateStore,
    pub(crate) sandbox: Arc<dyn SandboxRuntime>,
    pub(crate) backend: Arc<dyn ControlPlane>,
    pub(crate) prober: Arc<dyn Prober>,
    pub(crate) clock: C,
    pub(crate) limiter: SubmissionLimiter<C>,
    pub(crate) tickers: Mutex<HashMap<MatchId, CancellationToken>>,
    started_at: Instant,
}

impl<C: Clock> Engine<C> {
    pub fn new(
        config: EngineConfig,
        sandbox: Arc<dyn SandboxRuntime>,
        backend: Arc<dyn ControlPlane>,
        prober: Arc<dyn Prober>,
        clock: C,
    ) -> Arc<Self> {
        let limiter = SubmissionLimiter::new(clock.clone(), config.flag_submit_rate_max);
        Arc::new(Self {
            config,
            store: StateStore::new(),
            sandbox,
            backend,
            prober,
            started_at: clock.now(),
            clock,
            limiter,
            tickers: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Matches whose state is not ENDED.
    pub fn active_matches(&self) -> usize {
        self.store.active_count()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.clock.now().duration_since(self.started_at).as_secs()
    }

    /// Current wall-clock epoch milliseconds (the engine's clock, so tests
    /// can steer it).
    pub fn epoch_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    pub fn match_state(&self, id: &MatchId) -> Option<MatchState> {
        self.store.state(id)
    }

    pub fn infrastructure(&self, id: &MatchId) -> Option<Infrastructure> {
        self.store.infrastructure(id)
    }

    /// The frozen final result; available from ENDING onwards and stable
    /// across cleanup.
    pub fn result(&self, id: &MatchId) -> Result<FinalResult, EngineError> {
        let shared = self.store.get(id).ok_or_else(|| EngineError::UnknownMatch(id.clone()))?;
        let m = shared.lock();
        m.result.clone().ok_or_else(|| EngineError::NotEnded(id.clone()))
    }

    pub fn current_tick(&self, id: &MatchId) -> Option<u64> {
        self.store.current_tick(id)
    }

    /// Live (team A, team B) scores.
    pub fn scores(&self, id: &MatchId) -> Option<(i64, i64)> {
        self.store.scores(id)
    }

    pub fn uptime_stats(&self, id: &MatchId) -> Option<(arena_core::TeamStats, arena_core::TeamStats)> {
        self.store.uptime_stats(id)
    }

    /// Rate-limit gate for flag submissions; refusals are not counted.
    pub fn allow_submission(&self, match_id: &MatchId, team_id: &TeamId) -> bool {
        self.limiter.check(match_id, team_id)
    }

    /// Stop accepting ticks and drain all active matches with bounded effort.
    /// Partial cleanup is fine; recovery reconciles on the next boot.
    pub async fn shutdown(self: &Arc<Self>) {
        let active: Vec<MatchId> = self
            .store
            .all()
            .into_iter()
            .filter(|(_, m)| !m.lock().state.is_ended())
            .map(|(id, _)| id)
            .collect();
        tracing::info!(active = active.len(), "engine shutdown: draining active matches");
        for id in &active {
            self.cancel_ticker(id);
        }
        let drained = tokio::time::timeout(self.config.shutdown_drain, async {
            for id in &active {
                if let Err(e) = self.stop_match(id, "shutdown").await {
                    tracing::warn!(match_id = %id, error = %e, "shutdown stop failed");
                }
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!("shutdown drain timed out; recovery will reconcile on next boot");
        }
    }
}
