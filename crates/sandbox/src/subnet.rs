// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide /24 subnet pool for match networks.
//!
//! Octets 1..=254 of `172.20.0.0/16` are handed out in ascending order, one
//! per network name. Allocating an owner that already holds an octet returns
//! the same octet, so duplicate network creation never burns a second slot.

use crate::SandboxError;
use parking_lot::Mutex;
use std::collections::BTreeMap;

pub const FIRST_OCTET: u8 = 1;
pub const LAST_OCTET: u8 = 254;

/// An allocated /24 slice of the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub octet: u8,
    pub cidr: String,
}

impl Subnet {
    fn new(octet: u8) -> Self {
        Self { octet, cidr: format!("172.20.{octet}.0/24") }
    }
}

/// Locked octet -> owner map.
#[derive(Debug, Default)]
pub struct SubnetPool {
    used: Mutex<BTreeMap<u8, String>>,
}

impl SubnetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the first free octet for `owner`, or return the octet the
    /// owner already holds.
    pub fn allocate(&self, owner: &str) -> Result<Subnet, SandboxError> {
        let mut used = self.used.lock();
        if let Some((octet, _)) = used.iter().find(|(_, o)| o.as_str() == owner) {
            return Ok(Subnet::new(*octet));
        }
        for octet in FIRST_OCTET..=LAST_OCTET {
            if !used.contains_key(&octet) {
                used.insert(octet, owner.to_string());
                return Ok(Subnet::new(octet));
            }
        }
        Err(SandboxError::SubnetExhausted)
    }

    /// Release whatever octet `owner` holds; no-op for unknown owners.
    pub fn release(&self, owner: &str) {
        self.used.lock().retain(|_, o| o.as_str() != owner);
    }

    /// Re-register an existing network's subnet after a restart so the pool
    /// does not double-allocate its octet.
    pub fn adopt(&self, owner: &str, cidr: &str) {
        if let Some(octet) = parse_octet(cidr) {
            self.used.lock().entry(octet).or_insert_with(|| owner.to_string());
        }
    }

    pub fn in_use(&self) -> usize {
        self.used.lock().len()
    }
}

/// Extract the third octet from a `172.20.X.0/24` CIDR.
fn parse_octet(cidr: &str) -> Option<u8> {
    cidr.strip_prefix("172.20.")?.split('.').next()?.parse().ok()
}

#[cfg(test)]
#[path = "subnet_tests.rs"]
mod tests;
