// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arena_core::ServiceKind;

#[test]
fn collection_response_parses_wire_shape() {
    let json = r#"{
        "services": [
            {
                "templateId": "T1",
                "name": "shop",
                "type": "web",
                "dockerImage": "arena/shop:1",
                "port": 80,
                "environmentVars": {},
                "flagPath": "/flag.txt",
                "healthCheck": {"type": "http", "path": "/", "expectedStatus": 200}
            },
            {
                "templateId": "T2",
                "name": "shell",
                "type": "ssh",
                "dockerImage": "arena/shell:1",
                "port": 22,
                "flagPath": "/flag"
            }
        ]
    }"#;
    let parsed: CollectionResponse = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.services.len(), 2);
    assert_eq!(parsed.services[0].kind, ServiceKind::Web);
    assert_eq!(parsed.services[1].template_id, "T2");
}

#[tokio::test]
async fn fake_control_plane_scripts_fetch_and_push() {
    let cp = FakeControlPlane::empty();
    assert!(cp.fetch_collection("beginner").await.unwrap().is_empty());

    cp.fail_fetch();
    assert!(cp.fetch_collection("beginner").await.is_err());

    let infra = arena_core::test_support::two_service_infra("m1", "A", "B");
    cp.push_infrastructure(&MatchId::new("m1"), &infra).await.unwrap();
    assert_eq!(cp.pushed_matches(), vec![MatchId::new("m1")]);
}
