// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! arenad: the match-engine daemon.
//!
//! Startup order matters: configuration is validated first (refusing to run
//! on bad secrets), recovery reconciles the sandbox before the RPC port
//! opens, and only then does the listener bind. SIGTERM drains active
//! matches with bounded effort; whatever is left over is reconciled by
//! recovery on the next boot.

use arena_core::SystemClock;
use arena_engine::{Engine, EngineConfig, HttpControlPlane, NetProber};
use arena_sandbox::DockerRuntime;
use arena_server::build_router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration, refusing to start");
            std::process::exit(1);
        }
    };
    let port = config.port;

    let sandbox = Arc::new(DockerRuntime::new());
    let backend = Arc::new(HttpControlPlane::new(config.backend_url.clone()));
    let prober = Arc::new(NetProber::default());
    let engine = Engine::new(config, sandbox, backend, prober, SystemClock);

    // Reconcile leftover sandbox state before accepting any RPC.
    engine.reconcile_on_boot().await;

    let cron_cancel = CancellationToken::new();
    engine.spawn_safety_cron(cron_cancel.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "could not bind listener");
            std::process::exit(1);
        }
    };
    info!(%addr, "match engine listening");

    let app = build_router(Arc::clone(&engine))
        .into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "server error");
    }

    info!("shutting down");
    cron_cancel.cancel();
    engine.shutdown().await;
}

/// Resolves on SIGTERM or ctrl-c.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "could not install SIGTERM handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
