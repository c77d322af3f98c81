// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Infrastructure records: the sandbox resources allocated to one match.
//!
//! `ServiceTemplate` is consumed from the Control Plane collection and
//! deserializes its wire shape; `Container` and `Infrastructure` are produced
//! by provisioning and echoed back to the Control Plane verbatim.

use crate::id::{ContainerId, NetworkId, ServiceId, TeamId, TemplateId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category tag of a vulnerable service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Web,
    Ssh,
    Database,
    Api,
    Other,
}

crate::simple_display! {
    ServiceKind {
        Web => "web",
        Ssh => "ssh",
        Database => "database",
        Api => "api",
        Other => "other",
    }
}

impl ServiceKind {
    /// Parse a template's type tag; unknown tags fold into `Other`.
    pub fn parse(s: &str) -> Self {
        match s {
            "web" => ServiceKind::Web,
            "ssh" => ServiceKind::Ssh,
            "database" => ServiceKind::Database,
            "api" => ServiceKind::Api,
            _ => ServiceKind::Other,
        }
    }
}

/// Health probe declared by a service template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HealthCheck {
    /// HTTP GET against the service port; UP on the expected status.
    Http {
        #[serde(default = "default_http_path")]
        path: String,
        #[serde(rename = "expectedStatus", default = "default_http_status")]
        expected_status: u16,
    },
    /// Plain TCP connect; UP when the connection is established in time.
    Tcp,
}

fn default_http_path() -> String {
    "/".to_string()
}

fn default_http_status() -> u16 {
    200
}

impl Default for HealthCheck {
    fn default() -> Self {
        HealthCheck::Tcp
    }
}

/// Logical specification of one vulnerable service, fetched per difficulty
/// from the Control Plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTemplate {
    pub template_id: TemplateId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ServiceKind,
    pub docker_image: String,
    pub port: u16,
    #[serde(default)]
    pub environment_vars: HashMap<String, String>,
    pub flag_path: String,
    #[serde(default)]
    pub health_check: HealthCheck,
}

/// One provisioned container belonging to one team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub container_id: ContainerId,
    pub address: String,
    pub port: u16,
    #[serde(rename = "type")]
    pub kind: ServiceKind,
    pub template_id: TemplateId,
    pub team_id: TeamId,
    pub service_id: ServiceId,
    pub flag_path: String,
    pub health_check: HealthCheck,
}

/// The sandbox resources (network + containers) allocated to a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Infrastructure {
    pub network_id: NetworkId,
    pub network_name: String,
    pub subnet: String,
    pub team_a: Vec<Container>,
    pub team_b: Vec<Container>,
}

impl Infrastructure {
    /// All containers, team A first (creation and cleanup order both derive
    /// from this).
    pub fn all_containers(&self) -> impl Iterator<Item = &Container> {
        self.team_a.iter().chain(self.team_b.iter())
    }

    /// Service identifiers of every provisioned container.
    pub fn service_ids(&self) -> Vec<ServiceId> {
        self.all_containers().map(|c| c.service_id.clone()).collect()
    }

    pub fn container_for(&self, service_id: &ServiceId) -> Option<&Container> {
        self.all_containers().find(|c| &c.service_id == service_id)
    }
}

#[cfg(test)]
#[path = "infra_tests.rs"]
mod tests;
