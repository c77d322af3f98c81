// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn template_deserializes_wire_shape() {
    let json = r#"{
        "templateId": "T1",
        "name": "shop",
        "type": "web",
        "dockerImage": "arena/shop:1",
        "port": 80,
        "environmentVars": {"DEBUG": "0"},
        "flagPath": "/flag.txt",
        "healthCheck": {"type": "http", "path": "/", "expectedStatus": 200}
    }"#;
    let tpl: ServiceTemplate = serde_json::from_str(json).unwrap();
    assert_eq!(tpl.template_id, "T1");
    assert_eq!(tpl.kind, ServiceKind::Web);
    assert_eq!(tpl.port, 80);
    assert_eq!(
        tpl.health_check,
        HealthCheck::Http { path: "/".to_string(), expected_status: 200 }
    );
}

#[test]
fn template_defaults_health_check_to_tcp() {
    let json = r#"{
        "templateId": "T2",
        "name": "shell",
        "type": "ssh",
        "dockerImage": "arena/shell:1",
        "port": 22,
        "flagPath": "/flag"
    }"#;
    let tpl: ServiceTemplate = serde_json::from_str(json).unwrap();
    assert_eq!(tpl.health_check, HealthCheck::Tcp);
    assert!(tpl.environment_vars.is_empty());
}

#[test]
fn unknown_service_kind_folds_to_other() {
    assert_eq!(ServiceKind::parse("queue"), ServiceKind::Other);
    assert_eq!(ServiceKind::parse("database"), ServiceKind::Database);
}

fn container(team: &str, template: &str) -> Container {
    Container {
        container_id: ContainerId::new(format!("c-{team}-{template}")),
        address: "172.20.1.2".to_string(),
        port: 80,
        kind: ServiceKind::Web,
        template_id: TemplateId::new(template),
        team_id: TeamId::new(team),
        service_id: ServiceId::compose(&TeamId::new(team), &TemplateId::new(template)),
        flag_path: "/flag.txt".to_string(),
        health_check: HealthCheck::Tcp,
    }
}

#[test]
fn infrastructure_service_ids_cover_both_teams() {
    let infra = Infrastructure {
        network_id: NetworkId::new("n1"),
        network_name: "match_m1".to_string(),
        subnet: "172.20.1.0/24".to_string(),
        team_a: vec![container("A", "T1"), container("A", "T2")],
        team_b: vec![container("B", "T1"), container("B", "T2")],
    };
    let ids = infra.service_ids();
    assert_eq!(ids.len(), 4);
    assert!(ids.contains(&ServiceId::new("A_T1")));
    assert!(ids.contains(&ServiceId::new("B_T2")));
    assert!(infra.container_for(&ServiceId::new("B_T1")).is_some());
    assert!(infra.container_for(&ServiceId::new("C_T1")).is_none());
}
