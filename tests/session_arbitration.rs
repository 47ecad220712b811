//! Integration tests for claim arbitration and connection status.

mod common;

use common::{ScriptedRendezvous, TestPeer};
use roomlink::config::SessionConfig;
use roomlink::{ClaimError, ConnectionState, MemoryRendezvous, Role, SessionError, StatusKind};
use std::sync::Arc;

#[tokio::test]
async fn concurrent_joins_elect_exactly_one_coordinator() {
    let rendezvous = Arc::new(MemoryRendezvous::new());
    let a = TestPeer::new("a", rendezvous.clone(), &[]);
    let b = TestPeer::new("b", rendezvous.clone(), &[]);

    let (ra, rb) = tokio::join!(a.session.connect("lobby"), b.session.connect("lobby"));
    let mut roles = vec![ra.unwrap(), rb.unwrap()];
    roles.sort_by_key(|r| *r == Role::Subordinate);
    assert_eq!(roles, vec![Role::Coordinator, Role::Subordinate]);

    let (coordinator, subordinate) = if a.session.role() == Role::Coordinator {
        (&a, &b)
    } else {
        (&b, &a)
    };
    assert_eq!(
        coordinator.status_kinds(),
        vec![StatusKind::Connecting, StatusKind::Host]
    );
    assert_eq!(
        subordinate.status_kinds(),
        vec![StatusKind::Connecting, StatusKind::Connecting, StatusKind::Client]
    );
    let labels: Vec<String> = subordinate.statuses().into_iter().map(|s| s.label).collect();
    assert_eq!(labels, vec!["resolving", "handshaking", "active"]);
}

#[tokio::test]
async fn equivalent_room_names_meet() {
    let rendezvous = Arc::new(MemoryRendezvous::new());
    let host = TestPeer::new("host", rendezvous.clone(), &["message"]);
    let guest = TestPeer::new("guest", rendezvous.clone(), &["message"]);

    assert_eq!(host.session.connect("Lobby").await.unwrap(), Role::Coordinator);
    assert_eq!(guest.session.connect("  lobby!!").await.unwrap(), Role::Subordinate);
    assert_eq!(host.session.room(), guest.session.room());

    assert!(common::wait_until(|| host.session.downstream_peers().len() == 1).await);
    guest.session.emit("message", serde_json::json!("hello")).unwrap();
    assert!(host.wait_for_events(1).await);
    assert_eq!(host.payloads("message"), vec![serde_json::json!("hello")]);
}

#[tokio::test]
async fn dial_failure_reports_error() {
    let peer = TestPeer::new(
        "lost",
        Arc::new(ScriptedRendezvous::unreachable_coordinator()),
        &[],
    );

    let result = peer.session.connect("lobby").await;
    assert!(matches!(result, Err(SessionError::Dial(_))));
    assert_eq!(peer.session.state(), ConnectionState::Error);
    assert_eq!(peer.session.role(), Role::Subordinate);

    let last = peer.statuses().pop().unwrap();
    assert_eq!(last.status, StatusKind::Error);
    assert_eq!(last.label, "dial failed");
}

#[tokio::test]
async fn claim_failure_reports_error() {
    let peer = TestPeer::new("lost", Arc::new(ScriptedRendezvous::broken()), &[]);

    let result = peer.session.connect("lobby").await;
    assert!(matches!(result, Err(SessionError::Claim(ClaimError::Transport(_)))));
    assert!(peer.wait_for_status(StatusKind::Error, "claim failed").await);
}

#[tokio::test]
async fn claim_is_bounded_by_connect_timeout() {
    let config = SessionConfig {
        connect_timeout_ms: 50,
        ..SessionConfig::default()
    };
    let peer = TestPeer::with_config("slow", Arc::new(ScriptedRendezvous::hanging()), &[], config);

    let result = peer.session.connect("lobby").await;
    assert!(matches!(result, Err(SessionError::Claim(ClaimError::Timeout))));
    assert_eq!(peer.session.state(), ConnectionState::Error);
}

#[tokio::test]
async fn connect_is_allowed_again_after_error() {
    let peer = TestPeer::new("retry", Arc::new(ScriptedRendezvous::broken()), &[]);
    assert!(peer.session.connect("lobby").await.is_err());
    assert!(peer.session.connect("lobby").await.is_err());
    assert_eq!(
        peer.status_kinds(),
        vec![
            StatusKind::Connecting,
            StatusKind::Error,
            StatusKind::Connecting,
            StatusKind::Error
        ]
    );
}
