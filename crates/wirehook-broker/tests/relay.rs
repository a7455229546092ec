//! End-to-end broker tests over real sockets.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use wirehook_broker::{start, BrokerConfig, BrokerHandle};

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn boot() -> BrokerHandle {
    start(BrokerConfig::default()).await.unwrap()
}

async fn connect(port: u16, token: &str) -> WsStream {
    let url = format!("ws://127.0.0.1:{port}/gateway?token={token}");
    let (ws, _) = connect_async(&url).await.unwrap();
    ws
}

/// Complete the init/ack handshake and return the assigned connection id.
async fn register(ws: &mut WsStream) -> String {
    ws.send(Message::Text(r#"{"action":"init"}"#.into()))
        .await
        .unwrap();
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("handshake reply in time")
            .expect("connection open")
            .expect("frame readable");
        if let Message::Text(text) = msg {
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            if let Some(id) = value.get("connectionId").and_then(|v| v.as_str()) {
                return id.to_owned();
            }
        }
    }
}

async fn next_text(ws: &mut WsStream) -> String {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("frame in time")
            .expect("connection open")
            .expect("frame readable");
        if let Message::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

async fn post_event(port: u16, connection_id: &str, body: &str) -> u16 {
    let url = format!("http://127.0.0.1:{port}/relay/{connection_id}");
    let resp = reqwest::Client::new()
        .post(&url)
        .header("content-type", "application/json")
        .body(body.to_owned())
        .send()
        .await
        .unwrap();
    resp.status().as_u16()
}

#[tokio::test]
async fn handshake_assigns_sequential_ids() {
    let broker = boot().await;

    let mut first = connect(broker.port(), "test-token").await;
    let mut second = connect(broker.port(), "test-token").await;

    assert_eq!(register(&mut first).await, "local-1");
    assert_eq!(register(&mut second).await, "local-2");

    broker.shutdown().await;
}

#[tokio::test]
async fn missing_token_closed_with_4001() {
    let broker = boot().await;

    let url = format!("ws://127.0.0.1:{}/gateway", broker.port());
    let (mut ws, _) = connect_async(&url).await.unwrap();

    let msg = timeout(TIMEOUT, ws.next())
        .await
        .expect("close frame in time")
        .expect("connection open")
        .expect("frame readable");

    match msg {
        Message::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), 4001);
            assert_eq!(frame.reason.as_str(), "Unauthorized");
        }
        other => panic!("expected close frame, got {other:?}"),
    }

    broker.shutdown().await;
}

#[tokio::test]
async fn empty_token_closed_with_4001() {
    let broker = boot().await;

    let mut ws = connect(broker.port(), "").await;
    let msg = timeout(TIMEOUT, ws.next())
        .await
        .expect("close frame in time")
        .expect("connection open")
        .expect("frame readable");

    match msg {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 4001),
        other => panic!("expected close frame, got {other:?}"),
    }

    broker.shutdown().await;
}

#[tokio::test]
async fn forwarding_is_byte_exact() {
    let broker = boot().await;

    let mut ws = connect(broker.port(), "test-token").await;
    let id = register(&mut ws).await;

    let body = r#"{"event_type":"message.received","message":{"id":"msg_1","body":"Hello!"}}"#;
    assert_eq!(post_event(broker.port(), &id, body).await, 200);

    let forwarded = next_text(&mut ws).await;
    assert_eq!(forwarded, body);

    broker.shutdown().await;
}

#[tokio::test]
async fn ingest_without_connection_is_a_noop() {
    let broker = boot().await;

    // Nothing registered at all.
    assert_eq!(
        post_event(broker.port(), "local-1", r#"{"event_type":"message.sent"}"#).await,
        200
    );

    broker.shutdown().await;
}

#[tokio::test]
async fn closed_connection_stops_receiving() {
    let broker = boot().await;

    let mut first = connect(broker.port(), "test-token").await;
    let stale_id = register(&mut first).await;
    first.close(None).await.unwrap();

    // Give the broker a moment to process the close and unregister.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut second = connect(broker.port(), "test-token").await;
    let live_id = register(&mut second).await;
    assert_ne!(stale_id, live_id);

    // The stale id answers 200 but delivers nowhere.
    assert_eq!(
        post_event(broker.port(), &stale_id, r#"{"event_type":"message.sent"}"#).await,
        200
    );
    // The live id still delivers.
    assert_eq!(
        post_event(broker.port(), &live_id, r#"{"event_type":"message.received"}"#).await,
        200
    );

    let forwarded = next_text(&mut second).await;
    assert!(forwarded.contains("message.received"));

    broker.shutdown().await;
}

#[tokio::test]
async fn brokers_do_not_share_registries() {
    let broker_a = boot().await;
    let broker_b = boot().await;

    let mut ws = connect(broker_a.port(), "test-token").await;
    let id = register(&mut ws).await;

    // The id registered on A routes nowhere on B (but still 200s).
    assert_eq!(
        post_event(broker_b.port(), &id, r#"{"event_type":"message.sent"}"#).await,
        200
    );

    // Nothing arrives on the connection registered with A.
    let nothing = timeout(Duration::from_millis(300), ws.next()).await;
    assert!(nothing.is_err(), "no event should cross broker instances");

    broker_a.shutdown().await;
    broker_b.shutdown().await;
}

#[tokio::test]
async fn frames_before_init_are_ignored() {
    let broker = boot().await;

    let mut ws = connect(broker.port(), "test-token").await;
    // Garbage and non-init frames should not kill the connection.
    ws.send(Message::Text("not json".into())).await.unwrap();
    ws.send(Message::Text(r#"{"action":"subscribe"}"#.into()))
        .await
        .unwrap();

    let id = register(&mut ws).await;
    assert_eq!(id, "local-1");

    broker.shutdown().await;
}
