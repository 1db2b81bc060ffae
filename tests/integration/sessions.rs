//! Session lifecycle: snapshots, reconnects, shutdown.

use serde_json::json;

use crate::*;

/// The PeerState snapshot sent on connect replaces everything known.
#[tokio::test]
async fn test_peer_state_snapshot_replaces_directory() {
    let node = MockNode::bind().await.unwrap();
    let (mut conn, _agent, _shutdown) = node.connect_agent().await.unwrap();

    conn.send(peer_encountered("node2", "10.0.0.2", json!([["tcp", 4556]])))
        .await
        .unwrap();
    conn.send(json!({
        "type": "PeerState",
        "peers": {
            "node3": {"eid": [1, "//node3/"], "addr": "10.0.0.3", "cla_list": [["mtcp", 16162]]}
        }
    }))
    .await
    .unwrap();
    conn.send(request_sender("b1", "node2", &["mtcp", "tcp"])).await.unwrap();
    conn.send(request_sender("b2", "node3", &["mtcp", "tcp"])).await.unwrap();

    let response = conn.recv().await.unwrap();
    assert_eq!(response_bundle(&response), "b2");
    assert_eq!(response["clas"][0]["remote"], "10.0.0.3");
    assert_eq!(response["clas"][0]["next_hop"], json!([1, "//node3/"]));
}

/// A snapshot mixing dtn and ipn peers still replaces the directory.
#[tokio::test]
async fn test_snapshot_with_ipn_peers_replaces_directory() {
    let node = MockNode::bind().await.unwrap();
    let (mut conn, agent, _shutdown) = node.connect_agent().await.unwrap();

    conn.send(peer_encountered("stale", "10.0.0.9", json!([["mtcp", 16162]])))
        .await
        .unwrap();
    conn.send(json!({
        "type": "PeerState",
        "peers": {
            "node3": {"eid": [1, "//node3/"], "addr": "10.0.0.3", "cla_list": [["mtcp", 16162]]},
            "5": {"eid": [2, [5, 0]], "addr": "10.0.0.5", "cla_list": [["mtcp", 16162]]}
        }
    }))
    .await
    .unwrap();
    conn.send(request_sender("b1", "stale", &["mtcp"])).await.unwrap();
    conn.send(json!({
        "type": "RequestSenderForBundle",
        "bp": {"id": "b2", "destination": [1, 0]},
        "clas": ["mtcp"]
    }))
    .await
    .unwrap();
    conn.send(json!({
        "type": "RequestSenderForBundle",
        "bp": {"id": "b3", "destination": [2, [5, 1]]},
        "clas": ["mtcp"]
    }))
    .await
    .unwrap();

    let response = conn.recv().await.unwrap();
    assert_eq!(response_bundle(&response), "b3");
    assert_eq!(response["bp"]["destination"], json!([2, [5, 1]]));
    assert_eq!(response["clas"][0]["remote"], "10.0.0.5");
    assert_eq!(response["clas"][0]["next_hop"], json!([2, [5, 0]]));

    conn.close().await.unwrap();
    let (_, stats) = join_agent(agent).await.unwrap();
    assert_eq!(stats.protocol_errors, 0);
    assert_eq!(stats.deferred, 2);
}

/// A close from the node is answered before the session ends.
#[tokio::test]
async fn test_node_close_is_acknowledged() {
    let node = MockNode::bind().await.unwrap();
    let (conn, agent, _shutdown) = node.connect_agent().await.unwrap();

    conn.close_handshake().await.unwrap();
    let (end, _) = join_agent(agent).await.unwrap();
    assert_eq!(end, SessionEnd::Closed);
}

/// Nothing learned on one connection survives into the next.
#[tokio::test]
async fn test_reconnect_starts_from_empty_state() {
    let node = MockNode::bind().await.unwrap();

    let (mut conn, agent, _shutdown) = node.connect_agent().await.unwrap();
    conn.send(peer_encountered("node2", "10.0.0.2", json!([["tcp", 4556]])))
        .await
        .unwrap();
    conn.send(request_sender("b1", "node2", &["tcp"])).await.unwrap();
    assert_eq!(response_bundle(&conn.recv().await.unwrap()), "b1");
    conn.close().await.unwrap();
    join_agent(agent).await.unwrap();

    let (mut conn, _agent, _shutdown) = node.connect_agent().await.unwrap();
    // node2 is unknown here, so b1 is not a duplicate but still undeliverable.
    conn.send(request_sender("b1", "node2", &["tcp"])).await.unwrap();
    conn.send(peer_encountered("node2", "10.0.0.2", json!([["tcp", 4556]])))
        .await
        .unwrap();
    // b1 was committed on the old connection; here it is free.
    conn.send(request_sender("b1", "node2", &["tcp"])).await.unwrap();
    assert_eq!(response_bundle(&conn.recv().await.unwrap()), "b1");
}

/// Local shutdown closes the channel and reports it.
#[tokio::test]
async fn test_shutdown_closes_channel() {
    let node = MockNode::bind().await.unwrap();
    let (mut conn, agent, shutdown) = node.connect_agent().await.unwrap();

    conn.send(peer_encountered("node2", "10.0.0.2", json!([["tcp", 4556]])))
        .await
        .unwrap();
    conn.send(request_sender("b1", "node2", &["tcp"])).await.unwrap();
    assert_eq!(response_bundle(&conn.recv().await.unwrap()), "b1");

    shutdown.send(()).unwrap();
    conn.expect_closed().await.unwrap();

    let (end, stats) = join_agent(agent).await.unwrap();
    assert_eq!(end, SessionEnd::Shutdown);
    assert_eq!(stats.decisions, 1);
}

/// Connecting to a port nobody serves is a connect error, not a panic.
#[tokio::test]
async fn test_connect_failure_is_reported() {
    let url = {
        let node = MockNode::bind().await.unwrap();
        node.url.clone()
    };
    let err = Session::connect(&url).await.err().expect("connect should fail");
    assert!(matches!(err, SessionError::Connect { .. }));
}
