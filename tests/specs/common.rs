// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world-building for the scenario specs.

use arena_core::test_support::template;
use arena_core::{FakeClock, MatchId, MatchState, ServiceKind};
use arena_engine::{
    ControlPlane, Engine, EngineConfig, FakeControlPlane, FakeProber, Prober, StartRequest,
};
use arena_sandbox::{FakeSandbox, SandboxRuntime};
use std::sync::Arc;

pub struct World {
    pub engine: Arc<Engine<FakeClock>>,
    pub clock: FakeClock,
    pub sandbox: FakeSandbox,
}

pub fn world() -> World {
    world_with(EngineConfig::for_tests())
}

pub fn world_with(config: EngineConfig) -> World {
    world_on(FakeSandbox::new(), config)
}

/// Build a world over an existing sandbox, as a fresh process boot would.
pub fn world_on(sandbox: FakeSandbox, config: EngineConfig) -> World {
    let clock = FakeClock::new();
    let backend: Arc<dyn ControlPlane> = Arc::new(FakeControlPlane::with_templates(vec![
        template("T1", ServiceKind::Web, 80, "/flag.txt"),
        template("T2", ServiceKind::Ssh, 22, "/flag"),
    ]));
    let prober: Arc<dyn Prober> = Arc::new(FakeProber::all_up());
    let sandbox_dyn: Arc<dyn SandboxRuntime> = Arc::new(sandbox.clone());
    let engine = Engine::new(config, sandbox_dyn, backend, prober, clock.clone());
    World { engine, clock, sandbox }
}

pub fn start_request(id: &str) -> StartRequest {
    StartRequest {
        match_id: MatchId::new(id),
        difficulty: "beginner".to_string(),
        team_size: 1,
        team_a_players: vec!["p1".to_string()],
        team_b_players: vec!["p2".to_string()],
    }
}

pub async fn wait_for_state(world: &World, id: &MatchId, state: MatchState) {
    for _ in 0..5000 {
        if world.engine.match_state(id) == Some(state) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("match {id} did not reach {state}");
}

pub async fn start_running(world: &World, id: &str) -> MatchId {
    let match_id = MatchId::new(id);
    world.engine.start_match(start_request(id)).await.expect("start accepted");
    wait_for_state(world, &match_id, MatchState::Running).await;
    match_id
}

/// Let paused tokio time move one tick period and the ticker task settle.
pub async fn pass_one_tick() {
    tokio::time::advance(std::time::Duration::from_secs(30)).await;
    for _ in 0..200 {
        tokio::task::yield_now().await;
    }
}
