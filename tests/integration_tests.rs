//! End-to-end integration tests: real WebSocket connections against a
//! running transport serving the demo services.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use remoting::services;
use remoting_server::RemotingServer;
use remoting_transport::{TransportConfig, TransportServer};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Client = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Start a server with the demo services on an OS-assigned port.
async fn start_test_server(max_connections: Option<usize>) -> (Arc<RemotingServer>, TransportServer) {
    let server = Arc::new(RemotingServer::new());
    services::register_all(&server);
    server.start();

    let config = TransportConfig {
        port: 0,
        max_connections,
        ..TransportConfig::default()
    };
    let transport = TransportServer::start(config, server.clone()).await.unwrap();
    (server, transport)
}

async fn connect(port: u16) -> Client {
    let url = format!("ws://127.0.0.1:{port}/ws");
    let (ws, _) = connect_async(&url).await.expect("Failed to connect");
    ws
}

async fn send_request(ws: &mut Client, request: Value) -> Value {
    ws.send(Message::Text(request.to_string().into())).await.unwrap();
    recv(ws).await
}

async fn recv(ws: &mut Client) -> Value {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timeout waiting for response")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn server_starts_and_accepts_connections() {
    let (server, mut transport) = start_test_server(Some(16)).await;
    assert!(transport.port() > 0);
    assert!(transport.is_running());

    let mut ws = connect(transport.port()).await;
    let resp = send_request(&mut ws, json!({"id": 0, "type": "services"})).await;
    assert_eq!(resp["result"], json!(["Greeter", "Auth", "Profile", "Counter"]));
    assert_eq!(server.connection_count(), 1);

    transport.stop().await;
    transport.stop().await;
    assert!(!transport.is_running());
}

#[tokio::test]
async fn instance_lifecycle_over_websocket() {
    let (_server, transport) = start_test_server(Some(16)).await;
    let mut ws = connect(transport.port()).await;

    let resp = send_request(&mut ws, json!({"id": 1, "type": "instance", "service": "Greeter"})).await;
    assert_eq!(resp, json!({"id": 1, "type": "instance", "result": {"instance": 0, "exports": ["hello"]}}));

    let resp = send_request(
        &mut ws,
        json!({"id": 2, "type": "invoke", "instance": 0, "method": "hello", "args": ["Ann"]}),
    )
    .await;
    assert_eq!(resp, json!({"id": 2, "type": "invoke", "result": "Hi Ann"}));

    let resp = send_request(&mut ws, json!({"id": 3, "type": "release", "instance": 0})).await;
    assert_eq!(resp, json!({"id": 3, "type": "release"}));

    let resp = send_request(&mut ws, json!({"id": 4, "type": "invoke", "instance": 0, "method": "hello", "args": ["Ann"]})).await;
    assert_eq!(resp["name"], "InstanceNotFound");
    assert_eq!(resp["id"], 4);
}

#[tokio::test]
async fn session_is_shared_across_instances() {
    let (_server, transport) = start_test_server(Some(16)).await;
    let mut ws = connect(transport.port()).await;

    send_request(&mut ws, json!({"id": 0, "type": "instance", "service": "Auth"})).await;
    send_request(&mut ws, json!({"id": 1, "type": "instance", "service": "Profile"})).await;
    send_request(
        &mut ws,
        json!({"id": 2, "type": "invoke", "instance": 0, "method": "login", "args": ["ann@example.com", "pw"]}),
    )
    .await;

    let resp = send_request(&mut ws, json!({"id": 3, "type": "invoke", "instance": 1, "method": "whoami"})).await;
    assert_eq!(resp["result"]["email"], "ann@example.com");

    // A second socket has its own session.
    let mut other = connect(transport.port()).await;
    send_request(&mut other, json!({"id": 0, "type": "instance", "service": "Profile"})).await;
    let resp = send_request(&mut other, json!({"id": 1, "type": "invoke", "instance": 0, "method": "whoami"})).await;
    assert_eq!(resp["name"], "NotLoggedIn");
}

#[tokio::test]
async fn sync_reply_arrives_before_pending_async_reply() {
    let (_server, transport) = start_test_server(Some(16)).await;
    let mut ws = connect(transport.port()).await;

    send_request(&mut ws, json!({"id": 0, "type": "instance", "service": "Profile"})).await;
    send_request(&mut ws, json!({"id": 1, "type": "instance", "service": "Counter"})).await;

    ws.send(Message::Text(json!({"id": "A", "type": "invoke", "instance": 0, "method": "whoami"}).to_string().into()))
        .await
        .unwrap();
    ws.send(Message::Text(json!({"id": "B", "type": "invoke", "instance": 1, "method": "value"}).to_string().into()))
        .await
        .unwrap();

    assert_eq!(recv(&mut ws).await["id"], "B");
    assert_eq!(recv(&mut ws).await["id"], "A");
}

#[tokio::test]
async fn malformed_json_returns_parse_error() {
    let (_server, transport) = start_test_server(Some(16)).await;
    let mut ws = connect(transport.port()).await;

    ws.send(Message::Text("{not json".into())).await.unwrap();
    let resp = recv(&mut ws).await;
    assert_eq!(resp["type"], "error");
    assert_eq!(resp["name"], "ParseError");
    assert!(resp.get("id").is_none());

    // The connection survives.
    let resp = send_request(&mut ws, json!({"id": 1, "type": "bogus"})).await;
    assert_eq!(resp["name"], "UnknownRequestType");
    assert_eq!(resp["id"], 1);
}

#[tokio::test]
async fn closing_socket_frees_connection_slot() {
    let (server, transport) = start_test_server(Some(16)).await;
    let mut ws = connect(transport.port()).await;
    send_request(&mut ws, json!({"id": 0, "type": "instance", "service": "Greeter"})).await;
    assert_eq!(server.connection_count(), 1);

    ws.close(None).await.unwrap();
    drop(ws);

    timeout(Duration::from_secs(5), async {
        while server.connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection was not removed");
}

#[tokio::test]
async fn counter_overflow_keeps_socket_open() {
    let (server, transport) = start_test_server(Some(16)).await;
    let mut ws = connect(transport.port()).await;
    send_request(&mut ws, json!({"id": 0, "type": "instance", "service": "Counter"})).await;
    send_request(&mut ws, json!({"id": 1, "type": "invoke", "instance": 0, "method": "increment", "args": [i64::MAX]})).await;

    let resp = send_request(&mut ws, json!({"id": 2, "type": "invoke", "instance": 0, "method": "increment", "args": [1]})).await;
    assert_eq!(resp["type"], "error");
    assert_eq!(resp["name"], "RangeError");
    assert_eq!(resp["id"], 2);

    let resp = send_request(&mut ws, json!({"id": 3, "type": "services"})).await;
    assert_eq!(resp["type"], "services");

    ws.close(None).await.unwrap();
    drop(ws);
    timeout(Duration::from_secs(5), async {
        while server.connection_count() > 0 || transport.client_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection slot leaked");
}

#[tokio::test]
async fn stopped_server_closes_new_sockets() {
    let (server, transport) = start_test_server(Some(16)).await;
    let mut open = connect(transport.port()).await;
    send_request(&mut open, json!({"id": 0, "type": "services"})).await;
    server.stop();

    let mut refused = connect(transport.port()).await;
    let next = timeout(Duration::from_secs(5), refused.next())
        .await
        .expect("Timeout waiting for close");
    assert!(matches!(next, Some(Ok(Message::Close(_))) | None | Some(Err(_))));

    let resp = send_request(&mut open, json!({"id": 0, "type": "services"})).await;
    assert_eq!(resp["type"], "services");
}

#[tokio::test]
async fn connection_limit_is_enforced() {
    let (_server, transport) = start_test_server(Some(1)).await;
    let mut first = connect(transport.port()).await;
    send_request(&mut first, json!({"id": 0, "type": "services"})).await;

    let url = format!("ws://127.0.0.1:{}/ws", transport.port());
    assert!(connect_async(&url).await.is_err());
}

#[tokio::test]
async fn health_endpoint_works() {
    let (_server, transport) = start_test_server(Some(16)).await;
    let _ws = connect(transport.port()).await;

    let url = format!("http://127.0.0.1:{}/health", transport.port());
    let resp = reqwest::get(&url).await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
