// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine RPC endpoints.
//!
//! Wire shapes follow the Control-Plane contract; every body is camelCase
//! JSON capped at 50 KiB. Handlers validate inputs, dispatch into the
//! engine, and map error kinds onto status codes. Responses never carry
//! internals or flag values.

use crate::auth;
use arena_core::{Clock, MatchId, TeamId};
use arena_engine::{
    Engine, EngineError, ProvisionRequest, StartRequest, SubmitOutcome, TeamSpec,
};
use axum::extract::{DefaultBodyLimit, Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Every JSON body is at most 50 KiB.
pub const MAX_BODY_BYTES: usize = 50 * 1024;

/// Control-Plane requests are answered within this deadline; Provision gets
/// the provisioning deadline instead because image pulls dominate it.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AppState<C: Clock> {
    pub engine: Arc<Engine<C>>,
}

impl<C: Clock> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self { engine: Arc::clone(&self.engine) }
    }
}

pub fn build_router<C: Clock>(engine: Arc<Engine<C>>) -> Router {
    let state = AppState { engine };

    let quick = Router::new()
        .route("/engine/match/start", post(start::<C>))
        .route("/engine/match/:match_id/status", get(status::<C>))
        .route("/engine/match/:match_id/infrastructure", get(infrastructure::<C>))
        .route("/engine/match/:match_id/stop", post(stop::<C>))
        .route("/engine/match/:match_id/cleanup", post(cleanup::<C>))
        .route("/engine/match/:match_id/result", get(result::<C>))
        .route("/engine/flag/submit", post(submit_flag::<C>))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    let slow = Router::new()
        .route("/engine/match/provision", post(provision::<C>))
        .layer(TimeoutLayer::new(arena_engine::provision::PROVISION_DEADLINE));

    let protected = quick
        .merge(slow)
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_auth::<C>));

    Router::new()
        .route("/health", get(health::<C>))
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}

/// Tag every request with a correlation id and log the outcome line.
async fn request_id(req: Request, next: Next) -> Response {
    let id = nanoid::nanoid!(12);
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = std::time::Instant::now();

    let mut response = next.run(req).await;

    tracing::info!(
        request_id = %id,
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    if let Ok(value) = axum::http::HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

// ---- bodies ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamBody {
    team_id: String,
    #[serde(default)]
    players: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionBody {
    match_id: String,
    difficulty: String,
    team_a: TeamBody,
    team_b: TeamBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartBody {
    match_id: String,
    difficulty: String,
    team_size: u32,
    #[serde(default)]
    team_a: Vec<String>,
    #[serde(default)]
    team_b: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody {
    match_id: String,
    team_id: String,
    flag: String,
}

// ---- handlers --------------------------------------------------------------

async fn health<C: Clock>(State(state): State<AppState<C>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "match-engine",
        "uptimeSeconds": state.engine.uptime_secs(),
        "activeMatches": state.engine.active_matches(),
    }))
}

async fn provision<C: Clock>(
    State(state): State<AppState<C>>,
    Json(body): Json<ProvisionBody>,
) -> Response {
    if let Err(rejection) = validate(&[
        (&body.match_id, "matchId"),
        (&body.difficulty, "difficulty"),
        (&body.team_a.team_id, "teamA.teamId"),
        (&body.team_b.team_id, "teamB.teamId"),
    ]) {
        return rejection;
    }

    let request = ProvisionRequest {
        match_id: MatchId::new(body.match_id),
        difficulty: body.difficulty,
        team_a: TeamSpec { team_id: TeamId::new(body.team_a.team_id), players: body.team_a.players },
        team_b: TeamSpec { team_id: TeamId::new(body.team_b.team_id), players: body.team_b.players },
    };
    match state.engine.provision(request).await {
        Ok(infra) => Json(json!({ "success": true, "infrastructure": infra })).into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn start<C: Clock>(
    State(state): State<AppState<C>>,
    Json(body): Json<StartBody>,
) -> Response {
    if let Err(rejection) =
        validate(&[(&body.match_id, "matchId"), (&body.difficulty, "difficulty")])
    {
        return rejection;
    }
    if body.team_size == 0 {
        return bad_request("teamSize must be a positive integer");
    }

    let request = StartRequest {
        match_id: MatchId::new(body.match_id),
        difficulty: body.difficulty,
        team_size: body.team_size,
        team_a_players: body.team_a,
        team_b_players: body.team_b,
    };
    match state.engine.start_match(request).await {
        Ok(_) => Json(json!({ "status": "accepted" })).into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn status<C: Clock>(
    State(state): State<AppState<C>>,
    Path(match_id): Path<String>,
) -> Response {
    let id = MatchId::new(match_id);
    match state.engine.match_state(&id) {
        Some(match_state) => {
            Json(json!({ "matchId": id, "state": match_state })).into_response()
        }
        None => engine_error_response(EngineError::UnknownMatch(id)),
    }
}

async fn infrastructure<C: Clock>(
    State(state): State<AppState<C>>,
    Path(match_id): Path<String>,
) -> Response {
    let id = MatchId::new(match_id);
    match state.engine.infrastructure(&id) {
        Some(infra) => Json(json!({ "success": true, "infrastructure": infra })).into_response(),
        None => engine_error_response(EngineError::NoInfrastructure(id)),
    }
}

async fn stop<C: Clock>(
    State(state): State<AppState<C>>,
    Path(match_id): Path<String>,
) -> Response {
    let id = MatchId::new(match_id);
    match state.engine.stop_match(&id, "control plane stop").await {
        Ok(_) => Json(json!({ "status": "stopped" })).into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn cleanup<C: Clock>(
    State(state): State<AppState<C>>,
    Path(match_id): Path<String>,
) -> Response {
    let id = MatchId::new(match_id);
    match state.engine.cleanup_rpc(&id).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn result<C: Clock>(
    State(state): State<AppState<C>>,
    Path(match_id): Path<String>,
) -> Response {
    let id = MatchId::new(match_id);
    match state.engine.result(&id) {
        Ok(result) => Json(json!({
            "matchId": result.match_id,
            "difficulty": result.difficulty,
            "teamA": result.team_a,
            "teamB": result.team_b,
            "winner": result.winner,
        }))
        .into_response(),
        Err(e) => engine_error_response(e),
    }
}

async fn submit_flag<C: Clock>(
    State(state): State<AppState<C>>,
    Json(body): Json<SubmitBody>,
) -> Response {
    if let Err(rejection) = validate(&[
        (&body.match_id, "matchId"),
        (&body.team_id, "teamId"),
        (&body.flag, "flag"),
    ]) {
        return rejection;
    }

    let match_id = MatchId::new(body.match_id);
    let team_id = TeamId::new(body.team_id);
    if !state.engine.allow_submission(&match_id, &team_id) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "status": "rejected", "reason": "rate limit exceeded" })),
        )
            .into_response();
    }

    match state.engine.submit_flag(&match_id, &team_id, &body.flag) {
        SubmitOutcome::Accepted { .. } => Json(json!({ "status": "accepted" })).into_response(),
        SubmitOutcome::Rejected(reason) => {
            Json(json!({ "status": "rejected", "reason": reason.to_string() })).into_response()
        }
    }
}

// ---- helpers ---------------------------------------------------------------

fn validate(fields: &[(&String, &str)]) -> Result<(), Response> {
    for (value, name) in fields {
        if value.trim().is_empty() {
            return Err(bad_request(&format!("{name} is required")));
        }
    }
    Ok(())
}

fn bad_request(reason: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
}

fn engine_error_response(e: EngineError) -> Response {
    use EngineError::*;
    let status = match &e {
        UnknownMatch(_) | NoInfrastructure(_) | NotEnded(_) => StatusCode::NOT_FOUND,
        AlreadyProvisioned(_) | AlreadyRegistered(_) | AlreadyEnded(_) => StatusCode::CONFLICT,
        CapacityExceeded { .. } | ControlPlane(_) | EmptyCollection(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        Invalid(_) | NotRunning(_) => StatusCode::BAD_REQUEST,
        ProvisionTimeout | Sandbox(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
