// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration, loaded once from the environment at startup.
//!
//! The process refuses to start on a missing auth secret or an invalid flag
//! secret; everything else falls back to documented defaults.

use arena_core::{FlagError, FlagSecret};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("FLAG_SECRET: {0}")]
    FlagSecret(#[from] FlagError),
}

/// Process-wide engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub port: u16,
    /// Shared secret authenticating Control-Plane requests.
    pub engine_secret: String,
    pub flag_secret: FlagSecret,
    pub backend_url: String,
    pub max_concurrent_matches: usize,
    pub flag_submit_rate_max: u32,
    pub max_container_age: Duration,
    pub max_match_duration: Duration,
    pub safety_cron_interval: Duration,
    pub shutdown_drain: Duration,
    /// When set, requests from other peers are rejected before token checks.
    pub allowed_backend_ips: Option<Vec<IpAddr>>,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let engine_secret = require("MATCH_ENGINE_SECRET")?;
        let flag_secret = FlagSecret::new(require("FLAG_SECRET")?.into_bytes())?;

        let allowed_backend_ips = match std::env::var("ALLOWED_BACKEND_IPS") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_ip_list(&raw)?),
            _ => None,
        };

        Ok(Self {
            port: parse_or("PORT", 7000)?,
            engine_secret,
            flag_secret,
            backend_url: std::env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            max_concurrent_matches: parse_or("MAX_CONCURRENT_MATCHES", 50)?,
            flag_submit_rate_max: parse_or("FLAG_SUBMIT_RATE_MAX", 30)?,
            max_container_age: Duration::from_secs(
                parse_or::<u64>("MAX_CONTAINER_AGE_HOURS", 4)? * 3600,
            ),
            max_match_duration: Duration::from_secs(
                parse_or::<u64>("MAX_MATCH_DURATION_HOURS", 3)? * 3600,
            ),
            safety_cron_interval: Duration::from_millis(parse_or(
                "SAFETY_CRON_INTERVAL_MS",
                45 * 60 * 1000,
            )?),
            shutdown_drain: Duration::from_millis(parse_or("SHUTDOWN_DRAIN_MS", 30_000)?),
            allowed_backend_ips,
        })
    }

    /// Fixed configuration for tests; secrets are long enough to validate.
    #[cfg(any(test, feature = "test-support"))]
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            engine_secret: "test-engine-secret".to_string(),
            flag_secret: match FlagSecret::new(*b"0123456789abcdef0123456789abcdef") {
                Ok(secret) => secret,
                Err(_) => unreachable!("test secret is long enough"),
            },
            backend_url: "http://localhost:0".to_string(),
            max_concurrent_matches: 50,
            flag_submit_rate_max: 30,
            max_container_age: Duration::from_secs(4 * 3600),
            max_match_duration: Duration::from_secs(3 * 3600),
            safety_cron_interval: Duration::from_secs(45 * 60),
            shutdown_drain: Duration::from_secs(5),
            allowed_backend_ips: None,
        }
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).ok().filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(name))
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

fn parse_ip_list(raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::Invalid {
                name: "ALLOWED_BACKEND_IPS",
                value: s.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
