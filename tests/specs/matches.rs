// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::common::{pass_one_tick, start_running, start_request, world, world_with};
use arena_core::{flag, MatchId, MatchState, ServiceId, TeamId, Winner};
use arena_engine::{EngineConfig, EngineError, ProvisionRequest, SubmitOutcome, TeamSpec};

fn provision_request(id: &str) -> ProvisionRequest {
    ProvisionRequest {
        match_id: MatchId::new(id),
        difficulty: "beginner".to_string(),
        team_a: TeamSpec { team_id: TeamId::new("A"), players: vec!["p1".to_string()] },
        team_b: TeamSpec { team_id: TeamId::new("B"), players: vec!["p2".to_string()] },
    }
}

#[tokio::test(start_paused = true)]
async fn two_service_match_provisions_and_accrues_uptime() {
    let w = world();

    let infra = w.engine.provision(provision_request("M1")).await.expect("provisioned");
    assert_eq!(infra.team_a.len() + infra.team_b.len(), 4);
    let ids = infra.service_ids();
    for expected in ["A_T1", "A_T2", "B_T1", "B_T2"] {
        assert!(ids.contains(&ServiceId::new(expected)), "missing {expected}");
    }
    assert!(infra.subnet.starts_with("172.20."));
    assert!(infra.subnet.ends_with(".0/24"));

    let id = start_running(&w, "M1").await;

    // Two tick periods with every service UP: +1 per service per tick.
    pass_one_tick().await;
    pass_one_tick().await;
    assert_eq!(w.engine.current_tick(&id), Some(2));
    assert_eq!(w.engine.scores(&id), Some((4, 4)));

    let (stats_a, stats_b) = w.engine.uptime_stats(&id).expect("stats");
    assert_eq!(stats_a.uptime_ticks, 4);
    assert_eq!(stats_b.downtime_ticks, 0);
}

#[tokio::test(start_paused = true)]
async fn capture_flow_from_submission_to_final_result() {
    let w = world();
    w.engine.provision(provision_request("M1")).await.expect("provisioned");
    let id = start_running(&w, "M1").await;
    let secret = w.engine.config().flag_secret.clone();

    // Team B captures A_T1's tick-0 flag.
    let captured = flag::generate(&secret, &id, &ServiceId::new("A_T1"), 0);
    assert!(matches!(
        w.engine.submit_flag(&id, &TeamId::new("B"), &captured),
        SubmitOutcome::Accepted { tick: 0, .. }
    ));

    // Repeat submission and own-team submission are both rejected.
    assert!(matches!(
        w.engine.submit_flag(&id, &TeamId::new("B"), &captured),
        SubmitOutcome::Rejected(arena_engine::RejectReason::AlreadyCaptured)
    ));
    assert!(matches!(
        w.engine.submit_flag(&id, &TeamId::new("A"), &captured),
        SubmitOutcome::Rejected(arena_engine::RejectReason::OwnTeam)
    ));

    // The tick body credits the capture bonus on top of uptime.
    pass_one_tick().await;
    assert_eq!(w.engine.scores(&id), Some((2, 12)));

    w.engine.stop_match(&id, "spec").await.expect("stopped");
    let result = w.engine.result(&id).expect("final result");
    assert_eq!(result.winner, Winner::TeamB);
    assert_eq!(result.team_a.score, 2);
    assert_eq!(result.team_b.score, 12);
    assert_eq!(result.team_b.stats.flags_captured, 1);
}

#[tokio::test(start_paused = true)]
async fn stale_flags_age_out_of_the_grace_window() {
    let w = world();
    w.engine.provision(provision_request("M1")).await.expect("provisioned");
    let id = start_running(&w, "M1").await;
    let secret = w.engine.config().flag_secret.clone();

    for _ in 0..5 {
        pass_one_tick().await;
    }
    assert_eq!(w.engine.current_tick(&id), Some(5));

    let submit = |service: &str, tick: u64, team: &str| {
        let value = flag::generate(&secret, &id, &ServiceId::new(service), tick);
        w.engine.submit_flag(&id, &TeamId::new(team), &value)
    };

    assert!(matches!(submit("A_T1", 5, "B"), SubmitOutcome::Accepted { tick: 5, .. }));
    assert!(matches!(submit("A_T2", 4, "B"), SubmitOutcome::Accepted { tick: 4, .. }));
    for stale in [3, 2, 1, 0] {
        assert!(matches!(
            submit("B_T1", stale, "A"),
            SubmitOutcome::Rejected(arena_engine::RejectReason::InvalidOrExpired)
        ));
    }
}

#[tokio::test]
async fn concurrent_match_cap_rejects_and_registers_nothing() {
    let mut config = EngineConfig::for_tests();
    config.max_concurrent_matches = 2;
    let w = world_with(config);
    start_running(&w, "M1").await;
    start_running(&w, "M2").await;

    assert!(matches!(
        w.engine.start_match(start_request("M3")).await,
        Err(EngineError::CapacityExceeded { active: 2 })
    ));
    assert_eq!(w.engine.match_state(&MatchId::new("M3")), None);
    assert_eq!(w.engine.active_matches(), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_ends_scoring_for_good() {
    let w = world();
    let id = start_running(&w, "M1").await;
    pass_one_tick().await;

    w.engine.stop_match(&id, "spec").await.expect("stopped");
    let frozen = w.engine.result(&id).expect("result");

    // Further tick periods change nothing once the match has ended.
    pass_one_tick().await;
    pass_one_tick().await;
    assert_eq!(w.engine.result(&id).expect("result"), frozen);
    assert_eq!(w.engine.match_state(&id), Some(MatchState::Ended));
}
