// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! arena-server: the engine's HTTP RPC surface.
//!
//! A thin axum layer over [`arena_engine::Engine`]: authentication, input
//! validation, rate limiting, and error-to-status mapping. The Control Plane
//! is the only client; the port binds to the private network.

pub mod auth;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use routes::{build_router, AppState};
