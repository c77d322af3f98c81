// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-Plane request authentication.
//!
//! Two accepted schemes: a Bearer token compared in constant time against
//! the process secret, or an HMAC of `"<timestamp>:<METHOD>:<PATH>"` carried
//! in `x-timestamp`/`x-signature` with a five-minute replay window. When an
//! IP allowlist is configured, unlisted peers are rejected before any token
//! is inspected. Failures carry no detail.

use crate::routes::AppState;
use arena_core::Clock;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::net::SocketAddr;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Replay window for HMAC-signed requests, in seconds.
pub const HMAC_WINDOW_SECS: u64 = 300;

enum AuthFailure {
    /// Peer address not on the allowlist.
    Forbidden,
    /// Missing or wrong credentials.
    Unauthorized,
}

pub async fn require_auth<C: Clock>(
    State(state): State<AppState<C>>,
    req: Request,
    next: Next,
) -> Response {
    match authorize(&state, &req) {
        Ok(()) => next.run(req).await,
        Err(AuthFailure::Forbidden) => {
            (StatusCode::FORBIDDEN, axum::Json(serde_json::json!({ "error": "forbidden" })))
                .into_response()
        }
        Err(AuthFailure::Unauthorized) => {
            (StatusCode::UNAUTHORIZED, axum::Json(serde_json::json!({ "error": "unauthorized" })))
                .into_response()
        }
    }
}

fn authorize<C: Clock>(state: &AppState<C>, req: &Request) -> Result<(), AuthFailure> {
    let config = state.engine.config();

    if let Some(allowed) = &config.allowed_backend_ips {
        let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip());
        match peer {
            Some(ip) if allowed.contains(&ip) => {}
            _ => return Err(AuthFailure::Forbidden),
        }
    }

    if let Some(token) = bearer_token(req) {
        if constant_time_eq(token.as_bytes(), config.engine_secret.as_bytes()) {
            return Ok(());
        }
        return Err(AuthFailure::Unauthorized);
    }

    if let (Some(ts), Some(sig)) = (header(req, "x-timestamp"), header(req, "x-signature")) {
        return verify_signature(state, req, ts, sig);
    }

    Err(AuthFailure::Unauthorized)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn header<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers().get(name)?.to_str().ok()
}

fn verify_signature<C: Clock>(
    state: &AppState<C>,
    req: &Request,
    ts: &str,
    sig: &str,
) -> Result<(), AuthFailure> {
    let Ok(ts_secs) = ts.parse::<i64>() else {
        return Err(AuthFailure::Unauthorized);
    };
    let now_secs = (state.engine.epoch_ms() / 1000) as i64;
    if now_secs.abs_diff(ts_secs) > HMAC_WINDOW_SECS {
        return Err(AuthFailure::Unauthorized);
    }

    let expected = signature(
        &state.engine.config().engine_secret,
        ts,
        req.method().as_str(),
        req.uri().path(),
    );
    if constant_time_eq(sig.to_ascii_lowercase().as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AuthFailure::Unauthorized)
    }
}

/// Hex HMAC-SHA256 over `"<timestamp>:<METHOD>:<PATH>"`.
pub fn signature(secret: &str, timestamp: &str, method: &str, path: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length.
        Err(_) => unreachable!("hmac key of invalid length"),
    };
    mac.update(format!("{timestamp}:{method}:{path}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).into()
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
