// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-match scoring tick loop.
//!
//! One task per RUNNING match with a thirty-second period; the first fire
//! lands thirty seconds after RUNNING entry. Probes and flag injections run
//! outside the match lock; score writes and the tick increment happen in one
//! locked section, so they are serialized with flag validation.

use crate::Engine;
use arena_core::{flag, Clock, ContainerId, MatchId, MatchState, TeamSide};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Score contribution of one captured flag.
pub const CAPTURE_BONUS: i64 = 10;

impl<C: Clock> Engine<C> {
    /// Start the tick loop for a RUNNING match. A second call for the same
    /// match is a no-op: one serialized producer of tick events per match.
    pub(crate) fn spawn_match_ticker(self: &Arc<Self>, match_id: MatchId) {
        let cancel = CancellationToken::new();
        {
            let mut tickers = self.tickers.lock();
            if tickers.contains_key(&match_id) {
                warn!(match_id = %match_id, "ticker already running, not starting another");
                return;
            }
            tickers.insert(match_id.clone(), cancel.clone());
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval fire completes immediately; consume it so the
            // first real tick lands a full period after RUNNING entry.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                if !engine.run_tick(&match_id).await {
                    break;
                }
            }
            engine.tickers.lock().remove(&match_id);
            debug!(match_id = %match_id, "ticker stopped");
        });
    }

    pub(crate) fn cancel_ticker(&self, match_id: &MatchId) {
        if let Some(token) = self.tickers.lock().remove(match_id) {
            token.cancel();
        }
    }

    #[cfg(test)]
    pub(crate) fn ticker_running(&self, match_id: &MatchId) -> bool {
        self.tickers.lock().contains_key(match_id)
    }

    /// One tick: probe, score, credit captures, rotate flags.
    ///
    /// Returns false when the match has left RUNNING and the loop should
    /// stop. A Stop that lands mid-probe freezes the scores first, so the
    /// tick's deltas are dropped at apply time.
    pub(crate) async fn run_tick(&self, match_id: &MatchId) -> bool {
        let Some(shared) = self.store.get(match_id) else {
            return false;
        };
        let tick = {
            let m = shared.lock();
            if m.state != MatchState::Running {
                return false;
            }
            m.tick
        };
        let Some(infra) = self.store.infrastructure(match_id) else {
            warn!(match_id = %match_id, "tick without infrastructure, skipping");
            return true;
        };

        // Probes happen outside the lock; there is no retry within a tick.
        let mut probes = Vec::new();
        for container in infra.all_containers() {
            let up = self.prober.probe(container).await;
            probes.push((container.clone(), up));
        }

        let now_ms = self.clock.epoch_ms();
        let rotations: Vec<(ContainerId, String, String)> = {
            let mut m = shared.lock();
            if m.state != MatchState::Running {
                // Scores were frozen while we probed; drop the deltas.
                return false;
            }

            for (container, up) in &probes {
                m.health.entry(container.service_id.clone()).or_default().record(*up, now_ms);
                let counter = m.counters.entry(container.service_id.clone()).or_default();
                if *up {
                    counter.up += 1;
                } else {
                    counter.down += 1;
                }
                if let Some(side) = m.side_of(&container.service_id) {
                    m.add_score(side, if *up { 1 } else { -1 });
                }
            }

            // Capture bonuses for the pre-increment tick. This finalizes
            // scoring for it; the submission window moves on below.
            for (service_id, team) in m.captures_at(tick) {
                let side = if team == m.meta.team_a_id { TeamSide::TeamA } else { TeamSide::TeamB };
                m.add_score(side, CAPTURE_BONUS);
                debug!(match_id = %match_id, service_id = %service_id, team = %team,
                    tick, "capture bonus credited");
            }

            let next = m.advance_tick();
            probes
                .iter()
                .map(|(container, _)| {
                    (
                        container.container_id.clone(),
                        container.flag_path.clone(),
                        flag::generate(
                            &self.config.flag_secret,
                            match_id,
                            &container.service_id,
                            next,
                        ),
                    )
                })
                .collect()
        };

        // Rotate flags outside the lock; individual failures do not abort
        // the tick and the flag value itself stays out of the logs.
        for (container_id, path, value) in rotations {
            if let Err(e) = self.sandbox.inject_flag(&container_id, &path, &value).await {
                warn!(match_id = %match_id, container_id = %container_id, error = %e,
                    "flag rotation failed for service");
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "ticker_tests.rs"]
mod tests;
