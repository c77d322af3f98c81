// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flag-submission rate limiting.
//!
//! Submissions are counted per (match, team) in rolling one-minute windows.
//! The map lives behind its own lock; stale entries are dropped by a
//! periodic purge so abandoned matches do not accumulate counters.

use arena_core::{Clock, MatchId, TeamId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

pub const WINDOW: Duration = Duration::from_secs(60);

pub struct SubmissionLimiter<C: Clock> {
    clock: C,
    max_per_window: u32,
    windows: Mutex<HashMap<(MatchId, TeamId), VecDeque<u64>>>,
}

impl<C: Clock> SubmissionLimiter<C> {
    pub fn new(clock: C, max_per_window: u32) -> Self {
        Self { clock, max_per_window, windows: Mutex::new(HashMap::new()) }
    }

    /// Record one submission attempt. Returns false when the team is over its
    /// per-window ceiling for this match; a refused attempt is not counted.
    pub fn check(&self, match_id: &MatchId, team_id: &TeamId) -> bool {
        let now = self.clock.epoch_ms();
        let cutoff = now.saturating_sub(WINDOW.as_millis() as u64);
        let mut windows = self.windows.lock();
        let stamps = windows.entry((match_id.clone(), team_id.clone())).or_default();
        while stamps.front().is_some_and(|t| *t <= cutoff) {
            stamps.pop_front();
        }
        if stamps.len() >= self.max_per_window as usize {
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Drop keys whose newest stamp has aged out of the window.
    pub fn purge(&self) {
        let cutoff = self.clock.epoch_ms().saturating_sub(WINDOW.as_millis() as u64);
        self.windows.lock().retain(|_, stamps| stamps.back().is_some_and(|t| *t > cutoff));
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }
}

#[cfg(test)]
#[path = "ratelimit_tests.rs"]
mod tests;
