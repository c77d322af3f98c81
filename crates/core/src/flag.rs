// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic, stateless flag generation and validation.
//!
//! A flag is `FLAG{base64(HMAC_SHA256(secret, "matchId|serviceId|tick"))}`.
//! Flags are never stored; validation recomputes candidate bodies and
//! compares them in constant time. Flag values must never reach logs.

use crate::id::{MatchId, ServiceId};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const FLAG_PREFIX: &str = "FLAG{";
pub const FLAG_SUFFIX: char = '}';

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("flag secret must be at least {MIN_SECRET_LEN} bytes")]
    SecretTooShort,
}

/// Process-wide flag HMAC key, validated at construction.
///
/// The `Debug` impl is redacted so the key cannot leak through error or
/// tracing output.
#[derive(Clone)]
pub struct FlagSecret(Vec<u8>);

impl FlagSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, FlagError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(FlagError::SecretTooShort);
        }
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for FlagSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FlagSecret(..)")
    }
}

/// Successful validation outcome: which service and tick the flag was bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagHit {
    pub service_id: ServiceId,
    pub tick: u64,
}

fn hmac_body(secret: &FlagSecret, match_id: &MatchId, service_id: &ServiceId, tick: u64) -> String {
    let mut mac = match HmacSha256::new_from_slice(&secret.0) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length.
        Err(_) => unreachable!("hmac key of invalid length"),
    };
    mac.update(format!("{}|{}|{}", match_id, service_id, tick).as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Generate the flag for (match, service, tick).
pub fn generate(
    secret: &FlagSecret,
    match_id: &MatchId,
    service_id: &ServiceId,
    tick: u64,
) -> String {
    format!("{}{}{}", FLAG_PREFIX, hmac_body(secret, match_id, service_id, tick), FLAG_SUFFIX)
}

/// Extract the base64 body from a submitted flag string, or `None` when the
/// shape is wrong.
pub fn parse_body(submitted: &str) -> Option<&str> {
    let body = submitted.strip_prefix(FLAG_PREFIX)?.strip_suffix(FLAG_SUFFIX)?;
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=')) {
        return None;
    }
    Some(body)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    // ct_eq on unequal lengths short-circuits, which is fine: the body length
    // is public (fixed by the digest size), only the content is secret.
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Validate a submitted flag against candidate services for the current tick
/// and its predecessor (grace window). The first match wins.
pub fn validate(
    secret: &FlagSecret,
    match_id: &MatchId,
    submitted: &str,
    current_tick: u64,
    candidates: &[ServiceId],
) -> Option<FlagHit> {
    let body = parse_body(submitted)?;
    for service_id in candidates {
        for tick in [Some(current_tick), current_tick.checked_sub(1)].into_iter().flatten() {
            let expected = hmac_body(secret, match_id, service_id, tick);
            if constant_time_eq(body, &expected) {
                return Some(FlagHit { service_id: service_id.clone(), tick });
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "flag_tests.rs"]
mod tests;
