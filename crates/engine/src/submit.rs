// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flag submission pipeline.
//!
//! Validation is CPU-only and runs under the match lock, so the tick it
//! reads and the capture it records are consistent with the tick loop.
//! Submitted flag values never appear in logs or responses.

use crate::Engine;
use arena_core::{flag, Clock, MatchId, MatchState, ServiceId, TeamId};
use tracing::info;

/// Why a submission was rejected; `Display` gives the wire reason string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnknownMatch,
    NotRunning,
    MalformedFlag,
    InvalidOrExpired,
    AlreadyCaptured,
    OwnTeam,
}

arena_core::simple_display! {
    RejectReason {
        UnknownMatch => "unknown match",
        NotRunning => "match is not running",
        MalformedFlag => "invalid flag format",
        InvalidOrExpired => "invalid or expired flag",
        AlreadyCaptured => "flag already captured for this tick",
        OwnTeam => "cannot submit own team flag",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { service_id: ServiceId, tick: u64 },
    Rejected(RejectReason),
}

impl<C: Clock> Engine<C> {
    /// Validate a submitted flag and record the capture.
    ///
    /// The rate-limit gate ([`Engine::allow_submission`]) is applied by the
    /// HTTP surface before this runs.
    pub fn submit_flag(&self, match_id: &MatchId, team_id: &TeamId, submitted: &str) -> SubmitOutcome {
        use RejectReason::*;

        let Some(shared) = self.store.get(match_id) else {
            return SubmitOutcome::Rejected(UnknownMatch);
        };
        let candidates = self.store.service_ids(match_id);

        let mut m = shared.lock();
        if m.state != MatchState::Running {
            return SubmitOutcome::Rejected(NotRunning);
        }
        if flag::parse_body(submitted).is_none() {
            return SubmitOutcome::Rejected(MalformedFlag);
        }
        let Some(hit) =
            flag::validate(&self.config.flag_secret, match_id, submitted, m.tick, &candidates)
        else {
            return SubmitOutcome::Rejected(InvalidOrExpired);
        };
        if hit.service_id.owned_by(team_id) {
            return SubmitOutcome::Rejected(OwnTeam);
        }
        if !m.record_capture(&hit.service_id, hit.tick, team_id) {
            return SubmitOutcome::Rejected(AlreadyCaptured);
        }

        info!(
            match_id = %match_id,
            team_id = %team_id,
            service_id = %hit.service_id,
            tick = hit.tick,
            "flag captured"
        );
        SubmitOutcome::Accepted { service_id: hit.service_id, tick: hit.tick }
    }
}

#[cfg(test)]
#[path = "submit_tests.rs"]
mod tests;
