// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Match record and lifecycle state machine.
//!
//! `Match` is the single mutable record per competitive session. All state
//! transitions go through [`Match::transition`]; every other field mutation
//! happens while the owner holds the match's lock in the state store.

use crate::id::{MatchId, ServiceId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;

/// Score saturation bounds.
pub const SCORE_MIN: i64 = -1_000_000;
pub const SCORE_MAX: i64 = 1_000_000;

/// Lifecycle state of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchState {
    Created,
    Initializing,
    Running,
    Ending,
    Ended,
}

crate::simple_display! {
    MatchState {
        Created => "created",
        Initializing => "initializing",
        Running => "running",
        Ending => "ending",
        Ended => "ended",
    }
}

impl MatchState {
    /// Legality table for state transitions.
    ///
    /// `Running -> Ended` is the emergency path taken when best-effort
    /// cleanup is entered without passing through a clean `Ending`.
    pub fn can_transition(self, to: MatchState) -> bool {
        use MatchState::*;
        matches!(
            (self, to),
            (Created, Initializing)
                | (Initializing, Running)
                | (Initializing, Ended)
                | (Running, Ending)
                | (Running, Ended)
                | (Ending, Ended)
        )
    }

    pub fn is_ended(self) -> bool {
        matches!(self, MatchState::Ended)
    }
}

/// Attempted transition that the legality table rejects.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal match transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: MatchState,
    pub to: MatchState,
}

/// Which of the two fixed sides a team plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TeamSide {
    TeamA,
    TeamB,
}

crate::simple_display! {
    TeamSide {
        TeamA => "teamA",
        TeamB => "teamB",
    }
}

/// Final outcome of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Winner {
    TeamA,
    TeamB,
    Draw,
}

crate::simple_display! {
    Winner {
        TeamA => "teamA",
        TeamB => "teamB",
        Draw => "draw",
    }
}

/// Probe outcome for one service at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceStatus {
    Up,
    Down,
}

/// Rolling health record per (match, service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub last_probe_ms: u64,
    pub consecutive_failures: u32,
}

impl ServiceHealth {
    pub fn new() -> Self {
        Self { status: ServiceStatus::Up, last_probe_ms: 0, consecutive_failures: 0 }
    }

    /// Record a probe result. DOWN increments the failure streak, UP resets it.
    pub fn record(&mut self, up: bool, probed_at_ms: u64) {
        self.last_probe_ms = probed_at_ms;
        if up {
            self.status = ServiceStatus::Up;
            self.consecutive_failures = 0;
        } else {
            self.status = ServiceStatus::Down;
            self.consecutive_failures += 1;
        }
    }
}

impl Default for ServiceHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-service up/down tick counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpDown {
    pub up: u64,
    pub down: u64,
}

/// Aggregate statistics for one team, frozen into the final result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub flags_captured: u64,
    pub uptime_ticks: u64,
    pub downtime_ticks: u64,
}

/// One team's slice of the frozen final result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamReport {
    pub team_id: TeamId,
    pub players: Vec<String>,
    pub score: i64,
    pub stats: TeamStats,
}

/// Frozen result computed at RUNNING -> ENDING; identical on every read
/// afterwards, including after cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub match_id: MatchId,
    pub difficulty: String,
    pub team_a: TeamReport,
    pub team_b: TeamReport,
    pub winner: Winner,
}

/// Metadata captured at admission (Start).
#[derive(Debug, Clone)]
pub struct MatchMeta {
    pub difficulty: String,
    pub team_size: u32,
    pub team_a_id: TeamId,
    pub team_b_id: TeamId,
    pub team_a_players: Vec<String>,
    pub team_b_players: Vec<String>,
    /// Instant of admission, for max-duration enforcement.
    pub admitted_at: Instant,
    pub admitted_at_ms: u64,
}

impl MatchMeta {
    pub fn team_id(&self, side: TeamSide) -> &TeamId {
        match side {
            TeamSide::TeamA => &self.team_a_id,
            TeamSide::TeamB => &self.team_b_id,
        }
    }
}

/// A competitive session between two teams.
#[derive(Debug, Clone)]
pub struct Match {
    pub id: MatchId,
    pub state: MatchState,
    pub meta: MatchMeta,
    /// Monotonically non-decreasing; zero at RUNNING entry.
    pub tick: u64,
    pub health: HashMap<ServiceId, ServiceHealth>,
    pub counters: HashMap<ServiceId, UpDown>,
    score_a: i64,
    score_b: i64,
    /// Dedup map: (service, tick) -> capturing team. At most one entry per key.
    captures: HashMap<(ServiceId, u64), TeamId>,
    pub result: Option<FinalResult>,
}

impl Match {
    pub fn new(id: MatchId, meta: MatchMeta) -> Self {
        Self {
            id,
            state: MatchState::Created,
            meta,
            tick: 0,
            health: HashMap::new(),
            counters: HashMap::new(),
            score_a: 0,
            score_b: 0,
            captures: HashMap::new(),
            result: None,
        }
    }

    /// Apply a state transition, rejecting illegal ones.
    pub fn transition(&mut self, to: MatchState) -> Result<(), IllegalTransition> {
        if !self.state.can_transition(to) {
            return Err(IllegalTransition { from: self.state, to });
        }
        self.state = to;
        Ok(())
    }

    /// Advance the tick counter. The counter never moves backwards.
    pub fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn score(&self, side: TeamSide) -> i64 {
        match side {
            TeamSide::TeamA => self.score_a,
            TeamSide::TeamB => self.score_b,
        }
    }

    /// Add a score delta, saturating at the score bounds.
    pub fn add_score(&mut self, side: TeamSide, delta: i64) {
        let slot = match side {
            TeamSide::TeamA => &mut self.score_a,
            TeamSide::TeamB => &mut self.score_b,
        };
        *slot = slot.saturating_add(delta).clamp(SCORE_MIN, SCORE_MAX);
    }

    /// Which side owns a service, by the team-prefix rule.
    pub fn side_of(&self, service: &ServiceId) -> Option<TeamSide> {
        if service.owned_by(&self.meta.team_a_id) {
            Some(TeamSide::TeamA)
        } else if service.owned_by(&self.meta.team_b_id) {
            Some(TeamSide::TeamB)
        } else {
            None
        }
    }

    pub fn is_captured(&self, service: &ServiceId, tick: u64) -> bool {
        self.captures.contains_key(&(service.clone(), tick))
    }

    /// Atomically record a capture; returns false when (service, tick) is
    /// already taken. Caller holds the match lock.
    pub fn record_capture(&mut self, service: &ServiceId, tick: u64, team: &TeamId) -> bool {
        match self.captures.entry((service.clone(), tick)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(team.clone());
                true
            }
        }
    }

    /// Teams credited with a capture of `service` at exactly `tick`.
    pub fn captures_at(&self, tick: u64) -> Vec<(ServiceId, TeamId)> {
        self.captures
            .iter()
            .filter(|((_, t), _)| *t == tick)
            .map(|((s, _), team)| (s.clone(), team.clone()))
            .collect()
    }

    fn flags_captured_by(&self, team: &TeamId) -> u64 {
        self.captures.values().filter(|t| *t == team).count() as u64
    }

    fn ticks_for(&self, side: TeamSide) -> (u64, u64) {
        let mut up = 0;
        let mut down = 0;
        for (service, counter) in &self.counters {
            if self.side_of(service) == Some(side) {
                up += counter.up;
                down += counter.down;
            }
        }
        (up, down)
    }

    pub fn stats_for(&self, side: TeamSide) -> TeamStats {
        let (uptime_ticks, downtime_ticks) = self.ticks_for(side);
        TeamStats {
            flags_captured: self.flags_captured_by(self.meta.team_id(side)),
            uptime_ticks,
            downtime_ticks,
        }
    }

    /// Strictly-greater score wins; equality is a draw.
    pub fn compute_winner(&self) -> Winner {
        match self.score_a.cmp(&self.score_b) {
            std::cmp::Ordering::Greater => Winner::TeamA,
            std::cmp::Ordering::Less => Winner::TeamB,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }

    /// Freeze the final result from the current scores and stats. Idempotent:
    /// once frozen, later calls keep the first result.
    pub fn freeze_result(&mut self) -> &FinalResult {
        if self.result.is_none() {
            let report = |m: &Match, side: TeamSide| TeamReport {
                team_id: m.meta.team_id(side).clone(),
                players: match side {
                    TeamSide::TeamA => m.meta.team_a_players.clone(),
                    TeamSide::TeamB => m.meta.team_b_players.clone(),
                },
                score: m.score(side),
                stats: m.stats_for(side),
            };
            self.result = Some(FinalResult {
                match_id: self.id.clone(),
                difficulty: self.meta.difficulty.clone(),
                team_a: report(self, TeamSide::TeamA),
                team_b: report(self, TeamSide::TeamB),
                winner: self.compute_winner(),
            });
        }
        match &self.result {
            Some(result) => result,
            None => unreachable!("result frozen above"),
        }
    }
}

#[cfg(test)]
#[path = "matches_tests.rs"]
mod tests;
