// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use arena_core::test_support::{container, template};
use arena_core::ServiceKind;
use tokio::net::TcpListener;

fn tcp_container(address: &str, port: u16) -> Container {
    let tpl = template("T1", ServiceKind::Ssh, port, "/flag");
    let mut c = container("m1", "A", &tpl, 1, 2);
    c.address = address.to_string();
    c
}

#[tokio::test]
async fn tcp_probe_up_when_listening() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let prober = NetProber::new(Duration::from_secs(1));
    assert!(prober.probe(&tcp_container("127.0.0.1", port)).await);
}

#[tokio::test]
async fn tcp_probe_down_when_refused() {
    // Bind then drop to get a port that refuses connections.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let prober = NetProber::new(Duration::from_secs(1));
    assert!(!prober.probe(&tcp_container("127.0.0.1", port)).await);
}

#[tokio::test]
async fn fake_prober_scripting() {
    let tpl = template("T1", ServiceKind::Web, 80, "/flag.txt");
    let c = container("m1", "A", &tpl, 1, 2);
    let prober = FakeProber::all_up();
    assert!(prober.probe(&c).await);
    prober.set_down(&c.service_id);
    assert!(!prober.probe(&c).await);
    prober.set_up(&c.service_id);
    assert!(prober.probe(&c).await);
}
