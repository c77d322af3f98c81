// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::common::{start_running, world, world_on, world_with};
use arena_core::{Clock, MatchId, MatchState};
use arena_engine::EngineConfig;
use arena_sandbox::FakeSandbox;
use std::time::Duration;

#[tokio::test]
async fn fresh_boot_self_heals_orphaned_resources() {
    // A previous process died between Stop and cleanup completion, leaving
    // labeled containers and the match network behind.
    let sandbox = FakeSandbox::new();
    let dead = MatchId::new("M1");
    sandbox.seed_container(&dead, "match-M1-A-web-T1", 500);
    sandbox.seed_container(&dead, "match-M1-B-web-T1", 500);
    sandbox.seed_network(&dead);

    let w = world_on(sandbox, EngineConfig::for_tests());
    w.engine.reconcile_on_boot().await;

    assert!(w.sandbox.live_container_ids().is_empty());
    assert!(!w.sandbox.has_network(&dead));
    // The orphan does not appear in any status read.
    assert_eq!(w.engine.match_state(&dead), None);
}

#[tokio::test]
async fn recovery_keeps_the_sandbox_clean_for_new_matches() {
    let sandbox = FakeSandbox::new();
    sandbox.seed_network(&MatchId::new("Mstale"));
    let w = world_on(sandbox, EngineConfig::for_tests());
    w.engine.reconcile_on_boot().await;

    // A brand new match provisions cleanly afterwards.
    let id = start_running(&w, "M2").await;
    assert!(w.sandbox.has_network(&id));
    assert_eq!(w.engine.match_state(&id), Some(MatchState::Running));
}

#[tokio::test]
async fn max_duration_forces_end_and_releases_resources() {
    let w = world();
    let id = start_running(&w, "M1").await;

    // Under the three-hour ceiling nothing happens.
    w.clock.advance(Duration::from_secs(2 * 3600));
    w.engine.safety_sweep().await;
    assert_eq!(w.engine.match_state(&id), Some(MatchState::Running));

    // Past it the match is forced to ENDED and its resources reclaimed.
    w.clock.advance(Duration::from_secs(3600 + 1));
    w.engine.safety_sweep().await;
    assert_eq!(w.engine.match_state(&id), Some(MatchState::Ended));
    assert!(w.sandbox.live_container_ids().is_empty());
    assert!(!w.sandbox.has_network(&id));

    // The frozen result is derived from the scores at the forced end.
    let result = w.engine.result(&id).expect("final result");
    assert_eq!(result.match_id, id);
}

#[tokio::test]
async fn over_age_containers_are_swept() {
    let mut config = EngineConfig::for_tests();
    config.max_container_age = Duration::from_secs(3600);
    let w = world_with(config);
    let stale = MatchId::new("Mstale");
    w.sandbox.seed_container(&stale, "match-Mstale-A-web-T1", w.clock.epoch_ms());

    w.engine.safety_sweep().await;
    assert_eq!(w.sandbox.live_container_ids().len(), 1);

    w.clock.advance(Duration::from_secs(3601));
    w.engine.safety_sweep().await;
    assert!(w.sandbox.live_container_ids().is_empty());
}
