// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture builders shared by this crate's tests and, via the
//! `test-support` feature, by other crates' tests.

use crate::id::{ContainerId, MatchId, NetworkId, ServiceId, TeamId, TemplateId};
use crate::infra::{Container, HealthCheck, Infrastructure, ServiceKind, ServiceTemplate};
use crate::matches::{Match, MatchMeta, MatchState};
use std::collections::HashMap;
use std::time::Instant;

/// Match metadata with one player per side and a fixed admission time.
pub fn meta(team_a: &str, team_b: &str) -> MatchMeta {
    MatchMeta {
        difficulty: "beginner".to_string(),
        team_size: 1,
        team_a_id: TeamId::new(team_a),
        team_b_id: TeamId::new(team_b),
        team_a_players: vec!["p1".to_string()],
        team_b_players: vec!["p2".to_string()],
        admitted_at: Instant::now(),
        admitted_at_ms: 1_000_000,
    }
}

/// A match already driven to RUNNING.
pub fn running_match(id: &str, team_a: &str, team_b: &str) -> Match {
    let mut m = Match::new(MatchId::new(id), meta(team_a, team_b));
    let _ = m.transition(MatchState::Initializing);
    let _ = m.transition(MatchState::Running);
    m
}

pub fn template(id: &str, kind: ServiceKind, port: u16, flag_path: &str) -> ServiceTemplate {
    ServiceTemplate {
        template_id: TemplateId::new(id),
        name: format!("svc-{id}"),
        kind,
        docker_image: format!("arena/{id}:latest"),
        port,
        environment_vars: HashMap::new(),
        flag_path: flag_path.to_string(),
        health_check: HealthCheck::Tcp,
    }
}

pub fn container(match_id: &str, team: &str, tpl: &ServiceTemplate, octet: u8, host: u8) -> Container {
    let team_id = TeamId::new(team);
    Container {
        container_id: ContainerId::new(format!("c-{match_id}-{team}-{}", tpl.template_id)),
        address: format!("172.20.{octet}.{host}"),
        port: tpl.port,
        kind: tpl.kind,
        template_id: tpl.template_id.clone(),
        team_id: team_id.clone(),
        service_id: ServiceId::compose(&team_id, &tpl.template_id),
        flag_path: tpl.flag_path.clone(),
        health_check: tpl.health_check.clone(),
    }
}

/// Two-template infrastructure for the given match: A_T1, A_T2, B_T1, B_T2.
pub fn two_service_infra(match_id: &str, team_a: &str, team_b: &str) -> Infrastructure {
    let t1 = template("T1", ServiceKind::Web, 80, "/flag.txt");
    let t2 = template("T2", ServiceKind::Ssh, 22, "/flag");
    Infrastructure {
        network_id: NetworkId::new(format!("net-{match_id}")),
        network_name: format!("match_{match_id}"),
        subnet: "172.20.1.0/24".to_string(),
        team_a: vec![
            container(match_id, team_a, &t1, 1, 2),
            container(match_id, team_a, &t2, 1, 3),
        ],
        team_b: vec![
            container(match_id, team_b, &t1, 1, 4),
            container(match_id, team_b, &t2, 1, 5),
        ],
    }
}
