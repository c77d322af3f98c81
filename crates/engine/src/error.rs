// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Kinds, not wire codes: the HTTP surface maps these onto status codes.
//! Messages stay short and internal details stay in the logs.

use arena_core::MatchId;
use arena_sandbox::SandboxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown match: {0}")]
    UnknownMatch(MatchId),

    #[error("match {0} is not running")]
    NotRunning(MatchId),

    #[error("match {0} already provisioned")]
    AlreadyProvisioned(MatchId),

    #[error("match {0} already registered")]
    AlreadyRegistered(MatchId),

    #[error("match {0} already ended")]
    AlreadyEnded(MatchId),

    #[error("match {0} has no final result yet")]
    NotEnded(MatchId),

    #[error("match capacity reached ({active} active)")]
    CapacityExceeded { active: usize },

    #[error("no infrastructure for match {0}")]
    NoInfrastructure(MatchId),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("control plane request failed: {0}")]
    ControlPlane(String),

    #[error("empty service collection for difficulty {0}")]
    EmptyCollection(String),

    #[error("provisioning deadline exceeded")]
    ProvisionTimeout,

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}
