// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for route and auth tests: a router over an engine wired
//! to fakes, plus request helpers.

use crate::build_router;
use arena_core::test_support::template;
use arena_core::{FakeClock, MatchId, MatchState, ServiceKind};
use arena_engine::{ControlPlane, Engine, EngineConfig, FakeControlPlane, FakeProber, Prober};
use arena_sandbox::{FakeSandbox, SandboxRuntime};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub(crate) struct TestApp {
    pub router: Router,
    pub engine: Arc<Engine<FakeClock>>,
    pub clock: FakeClock,
    pub sandbox: FakeSandbox,
}

pub(crate) fn test_app() -> TestApp {
    test_app_with(EngineConfig::for_tests())
}

pub(crate) fn test_app_with(config: EngineConfig) -> TestApp {
    let clock = FakeClock::new();
    let sandbox = FakeSandbox::new();
    let backend: Arc<dyn ControlPlane> = Arc::new(FakeControlPlane::with_templates(vec![
        template("T1", ServiceKind::Web, 80, "/flag.txt"),
        template("T2", ServiceKind::Ssh, 22, "/flag"),
    ]));
    let prober: Arc<dyn Prober> = Arc::new(FakeProber::all_up());
    let sandbox_dyn: Arc<dyn SandboxRuntime> = Arc::new(sandbox.clone());
    let engine = Engine::new(config, sandbox_dyn, backend, prober, clock.clone());
    TestApp { router: build_router(Arc::clone(&engine)), engine, clock, sandbox }
}

pub(crate) const TEST_TOKEN: &str = "test-engine-secret";

pub(crate) fn authed_post(path: &str, body: &Value) -> Request<Body> {
    post_with_token(path, Some(TEST_TOKEN), body)
}

pub(crate) fn post_with_token(path: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    let builder = match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    };
    builder.body(Body::from(body.to_string())).expect("request")
}

pub(crate) fn authed_get(path: &str) -> Request<Body> {
    get_with_token(path, Some(TEST_TOKEN))
}

pub(crate) fn get_with_token(path: &str, token: Option<&str>) -> Request<Body> {
    let builder = Request::builder().method("GET").uri(path);
    let builder = match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    };
    builder.body(Body::empty()).expect("request")
}

/// Run one request through the router and decode the JSON body (null when
/// the body is empty or not JSON).
pub(crate) async fn call(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub(crate) async fn wait_for_state(app: &TestApp, id: &MatchId, state: MatchState) {
    for _ in 0..5000 {
        if app.engine.match_state(id) == Some(state) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("match {id} did not reach {state}");
}

/// Start a match through the HTTP surface and wait for RUNNING.
pub(crate) async fn start_running(app: &TestApp, id: &str) -> MatchId {
    let body = serde_json::json!({
        "matchId": id,
        "difficulty": "beginner",
        "teamSize": 1,
        "teamA": ["p1"],
        "teamB": ["p2"],
    });
    let (status, value) = call(app, authed_post("/engine/match/start", &body)).await;
    assert_eq!(status, StatusCode::OK, "start failed: {value}");
    let match_id = MatchId::new(id);
    wait_for_state(app, &match_id, MatchState::Running).await;
    match_id
}
