// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::meta;
use yare::parameterized;

fn running_match() -> Match {
    let mut m = Match::new(MatchId::new("m1"), meta("A", "B"));
    m.transition(MatchState::Initializing).unwrap();
    m.transition(MatchState::Running).unwrap();
    m
}

#[parameterized(
    created_to_initializing = { MatchState::Created, MatchState::Initializing, true },
    initializing_to_running = { MatchState::Initializing, MatchState::Running, true },
    initializing_to_ended = { MatchState::Initializing, MatchState::Ended, true },
    running_to_ending = { MatchState::Running, MatchState::Ending, true },
    running_to_ended = { MatchState::Running, MatchState::Ended, true },
    ending_to_ended = { MatchState::Ending, MatchState::Ended, true },
    created_to_running = { MatchState::Created, MatchState::Running, false },
    ended_to_running = { MatchState::Ended, MatchState::Running, false },
    ended_to_ended = { MatchState::Ended, MatchState::Ended, false },
    running_to_created = { MatchState::Running, MatchState::Created, false },
)]
fn transition_legality(from: MatchState, to: MatchState, legal: bool) {
    assert_eq!(from.can_transition(to), legal);
}

#[test]
fn illegal_transition_is_rejected_and_state_kept() {
    let mut m = Match::new(MatchId::new("m1"), meta("A", "B"));
    let err = m.transition(MatchState::Running).unwrap_err();
    assert_eq!(err, IllegalTransition { from: MatchState::Created, to: MatchState::Running });
    assert_eq!(m.state, MatchState::Created);
}

#[test]
fn state_serializes_uppercase() {
    assert_eq!(serde_json::to_string(&MatchState::Running).unwrap(), "\"RUNNING\"");
    assert_eq!(serde_json::to_string(&MatchState::Ended).unwrap(), "\"ENDED\"");
}

#[test]
fn score_saturates_at_bounds() {
    let mut m = running_match();
    m.add_score(TeamSide::TeamA, SCORE_MAX);
    m.add_score(TeamSide::TeamA, 500);
    assert_eq!(m.score(TeamSide::TeamA), SCORE_MAX);

    m.add_score(TeamSide::TeamB, SCORE_MIN);
    m.add_score(TeamSide::TeamB, -500);
    assert_eq!(m.score(TeamSide::TeamB), SCORE_MIN);

    // And it does not wrap on repeated saturating adds.
    m.add_score(TeamSide::TeamB, i64::MIN);
    assert_eq!(m.score(TeamSide::TeamB), SCORE_MIN);
}

#[test]
fn capture_dedup_admits_one_team() {
    let mut m = running_match();
    let sid = ServiceId::new("A_T1");
    assert!(m.record_capture(&sid, 3, &TeamId::new("B")));
    assert!(!m.record_capture(&sid, 3, &TeamId::new("B")));
    assert!(!m.record_capture(&sid, 3, &TeamId::new("A")));
    assert!(m.is_captured(&sid, 3));
    assert!(!m.is_captured(&sid, 4));
    // A different tick is a fresh slot.
    assert!(m.record_capture(&sid, 4, &TeamId::new("B")));
}

#[test]
fn captures_at_filters_by_tick() {
    let mut m = running_match();
    m.record_capture(&ServiceId::new("A_T1"), 2, &TeamId::new("B"));
    m.record_capture(&ServiceId::new("B_T1"), 2, &TeamId::new("A"));
    m.record_capture(&ServiceId::new("A_T2"), 3, &TeamId::new("B"));
    let at_2 = m.captures_at(2);
    assert_eq!(at_2.len(), 2);
    assert_eq!(m.captures_at(3).len(), 1);
    assert!(m.captures_at(9).is_empty());
}

#[test]
fn service_health_failure_streak() {
    let mut h = ServiceHealth::new();
    h.record(false, 10);
    h.record(false, 20);
    assert_eq!(h.status, ServiceStatus::Down);
    assert_eq!(h.consecutive_failures, 2);
    assert_eq!(h.last_probe_ms, 20);
    h.record(true, 30);
    assert_eq!(h.status, ServiceStatus::Up);
    assert_eq!(h.consecutive_failures, 0);
}

#[parameterized(
    a_wins = { 10, 3, Winner::TeamA },
    b_wins = { -2, 0, Winner::TeamB },
    draw = { 7, 7, Winner::Draw },
)]
fn winner_computation(a: i64, b: i64, expected: Winner) {
    let mut m = running_match();
    m.add_score(TeamSide::TeamA, a);
    m.add_score(TeamSide::TeamB, b);
    assert_eq!(m.compute_winner(), expected);
}

#[test]
fn freeze_result_is_stable() {
    let mut m = running_match();
    m.add_score(TeamSide::TeamA, 8);
    m.record_capture(&ServiceId::new("A_T1"), 1, &TeamId::new("B"));
    let first = m.freeze_result().clone();
    assert_eq!(first.winner, Winner::TeamA);
    assert_eq!(first.team_b.stats.flags_captured, 1);

    // Later score writes do not change the frozen result.
    m.add_score(TeamSide::TeamB, 100);
    assert_eq!(m.freeze_result(), &first);
}

#[test]
fn side_of_uses_team_prefix() {
    let m = running_match();
    assert_eq!(m.side_of(&ServiceId::new("A_T1")), Some(TeamSide::TeamA));
    assert_eq!(m.side_of(&ServiceId::new("B_T9")), Some(TeamSide::TeamB));
    assert_eq!(m.side_of(&ServiceId::new("C_T1")), None);
}
