// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service health probes.
//!
//! Each tick probes every container once with a short deadline; there is no
//! retry within a tick. A TCP probe counts as UP iff the connection is
//! established before the deadline.

use arena_core::{Container, HealthCheck};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Probe seam so the tick loop can run against fakes in tests.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    /// True when the service answered its declared health check in time.
    async fn probe(&self, container: &Container) -> bool;
}

/// Real prober: HTTP GET with an expected status, or plain TCP connect.
pub struct NetProber {
    http: reqwest::Client,
    timeout: Duration,
}

impl NetProber {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { http, timeout }
    }
}

impl Default for NetProber {
    fn default() -> Self {
        Self::new(PROBE_TIMEOUT)
    }
}

#[async_trait]
impl Prober for NetProber {
    async fn probe(&self, container: &Container) -> bool {
        match &container.health_check {
            HealthCheck::Http { path, expected_status } => {
                let url = format!("http://{}:{}{}", container.address, container.port, path);
                match self.http.get(&url).send().await {
                    Ok(resp) => resp.status().as_u16() == *expected_status,
                    Err(_) => false,
                }
            }
            HealthCheck::Tcp => {
                let addr = (container.address.as_str(), container.port);
                matches!(
                    tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await,
                    Ok(Ok(_))
                )
            }
        }
    }
}

/// Scriptable prober for tests: services are UP unless marked DOWN.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeProber {
    down: parking_lot::Mutex<std::collections::HashSet<arena_core::ServiceId>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeProber {
    pub fn all_up() -> Self {
        Self { down: parking_lot::Mutex::new(std::collections::HashSet::new()) }
    }

    pub fn set_down(&self, service: &arena_core::ServiceId) {
        self.down.lock().insert(service.clone());
    }

    pub fn set_up(&self, service: &arena_core::ServiceId) {
        self.down.lock().remove(service);
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, container: &Container) -> bool {
        !self.down.lock().contains(&container.service_id)
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
