//! Bad input never ends a session.

use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

use crate::*;

#[tokio::test]
async fn test_malformed_events_are_dropped() {
    let node = MockNode::bind().await.unwrap();
    let (mut conn, agent, _shutdown) = node.connect_agent().await.unwrap();

    conn.send_raw(Message::text("this is not json".to_string())).await.unwrap();
    conn.send(json!({"type": "NoSuchEvent", "x": 1})).await.unwrap();
    conn.send(json!({"name": "no discriminator"})).await.unwrap();
    conn.send(json!({"type": "RequestSenderForBundle", "clas": ["tcp"]})).await.unwrap();
    conn.send_raw(Message::binary(vec![0xde, 0xad, 0xbe, 0xef])).await.unwrap();

    conn.send(peer_encountered("node2", "10.0.0.2", json!([["tcp", 4556]])))
        .await
        .unwrap();
    conn.send(request_sender("b1", "node2", &["tcp"])).await.unwrap();
    assert_eq!(response_bundle(&conn.recv().await.unwrap()), "b1");

    conn.close().await.unwrap();
    let (end, stats) = join_agent(agent).await.unwrap();
    assert_eq!(end, SessionEnd::Closed);
    assert_eq!(stats.protocol_errors, 5);
    assert_eq!(stats.events, 2);
}

/// Retractions for bundles that were never committed are absorbed.
#[tokio::test]
async fn test_stray_retractions_are_noops() {
    let node = MockNode::bind().await.unwrap();
    let (mut conn, agent, _shutdown) = node.connect_agent().await.unwrap();

    conn.send(sending_failed("ghost")).await.unwrap();
    conn.send(timeout("ghost")).await.unwrap();
    conn.send(peer_encountered("node2", "10.0.0.2", json!([["tcp", 4556]])))
        .await
        .unwrap();
    conn.send(request_sender("b1", "node2", &["tcp"])).await.unwrap();
    assert_eq!(response_bundle(&conn.recv().await.unwrap()), "b1");

    conn.close().await.unwrap();
    let (_, stats) = join_agent(agent).await.unwrap();
    assert_eq!(stats.retractions, 0);
    assert_eq!(stats.protocol_errors, 0);
}

/// Event kinds the agent has no use for are accepted quietly.
#[tokio::test]
async fn test_unused_event_kinds_are_ignored() {
    let node = MockNode::bind().await.unwrap();
    let (mut conn, agent, _shutdown) = node.connect_agent().await.unwrap();

    conn.send(json!({"type": "IncomingBundle", "bndl": {"primary": {}, "canonicals": []}}))
        .await
        .unwrap();
    conn.send(json!({"type": "IncomingBundleWithoutPreviousNode", "bid": "b0", "node_name": "n"}))
        .await
        .unwrap();
    conn.send(json!({"type": "ServiceState", "service_list": {"7": "echo"}}))
        .await
        .unwrap();
    conn.send(json!({"type": "ServiceAdd", "tag": 8, "service": "ping"}))
        .await
        .unwrap();
    conn.send(peer_encountered("node2", "10.0.0.2", json!([["tcp", 4556]])))
        .await
        .unwrap();
    conn.send(request_sender("b1", "node2", &["tcp"])).await.unwrap();
    assert_eq!(response_bundle(&conn.recv().await.unwrap()), "b1");

    conn.close().await.unwrap();
    let (_, stats) = join_agent(agent).await.unwrap();
    assert_eq!(stats.protocol_errors, 0);
}
