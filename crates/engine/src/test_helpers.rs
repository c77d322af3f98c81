// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test harness: an engine wired to fakes.

use crate::backend::{ControlPlane, FakeControlPlane};
use crate::probe::{FakeProber, Prober};
use crate::{Engine, EngineConfig, StartRequest};
use arena_core::test_support::template;
use arena_core::{FakeClock, MatchId, MatchState, ServiceKind};
use arena_sandbox::{FakeSandbox, SandboxRuntime};
use std::sync::Arc;

pub(crate) struct Harness {
    pub engine: Arc<Engine<FakeClock>>,
    pub clock: FakeClock,
    pub sandbox: FakeSandbox,
    pub backend: Arc<FakeControlPlane>,
    pub prober: Arc<FakeProber>,
}

pub(crate) fn harness() -> Harness {
    harness_with_config(EngineConfig::for_tests())
}

pub(crate) fn harness_with_config(config: EngineConfig) -> Harness {
    let clock = FakeClock::new();
    let sandbox = FakeSandbox::new();
    let backend = Arc::new(FakeControlPlane::with_templates(vec![
        template("T1", ServiceKind::Web, 80, "/flag.txt"),
        template("T2", ServiceKind::Ssh, 22, "/flag"),
    ]));
    let prober = Arc::new(FakeProber::all_up());

    let sandbox_dyn: Arc<dyn SandboxRuntime> = Arc::new(sandbox.clone());
    let backend_dyn: Arc<dyn ControlPlane> = backend.clone();
    let prober_dyn: Arc<dyn Prober> = prober.clone();
    let engine = Engine::new(config, sandbox_dyn, backend_dyn, prober_dyn, clock.clone());

    Harness { engine, clock, sandbox, backend, prober }
}

pub(crate) fn start_request(id: &str) -> StartRequest {
    StartRequest {
        match_id: MatchId::new(id),
        difficulty: "beginner".to_string(),
        team_size: 1,
        team_a_players: vec!["p1".to_string()],
        team_b_players: vec!["p2".to_string()],
    }
}

/// Spin until the match reaches `state` (fakes finish within a few polls).
pub(crate) async fn wait_for_state(engine: &Arc<Engine<FakeClock>>, id: &MatchId, state: MatchState) {
    for _ in 0..5000 {
        if engine.match_state(id) == Some(state) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("match {id} did not reach {state}");
}

/// Start a match and wait for RUNNING.
pub(crate) async fn start_running(h: &Harness, id: &str) -> MatchId {
    let match_id = MatchId::new(id);
    h.engine.start_match(start_request(id)).await.expect("start accepted");
    wait_for_state(&h.engine, &match_id, MatchState::Running).await;
    match_id
}
