//! Shared fixtures for integration tests.
//!
//! Each test starts its own in-process server on an ephemeral port.

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use hiroba_server::{AppState, ServerConfig, build_router};
use serde_json::{Value, json};
use tokio::{net::TcpStream, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// How long a test waits for an expected event
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(3);

pub struct TestServer {
    addr: std::net::SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let app = build_router(Arc::new(AppState::new(config)));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self { addr, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, client_id: &str) -> String {
        format!("ws://{}/ws?client_id={}", self.addr, client_id)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Create a room as `host_id` and return the response body.
pub async fn create_room(server: &TestServer, host_id: &str, body: Value) -> Value {
    let response = reqwest::Client::new()
        .post(format!("{}/api/rooms", server.base_url()))
        .header("x-client-id", host_id)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201, "room creation should succeed");
    response.json().await.expect("Failed to parse JSON")
}

pub async fn create_buzzer_room(server: &TestServer, host_id: &str) -> Value {
    create_room(
        server,
        host_id,
        json!({"kind": "buzzer", "name": "Friday trivia", "hostDisplayName": "Host"}),
    )
    .await
}

pub async fn create_quiz_room(server: &TestServer, host_id: &str) -> Value {
    create_room(
        server,
        host_id,
        json!({
            "kind": "quiz",
            "name": "Capitals",
            "hostDisplayName": "Host",
            "questions": [
                {
                    "text": "Capital of France?",
                    "options": ["Paris", "Lyon"],
                    "correctAnswer": "Paris",
                    "points": 100,
                    "timeLimit": 20
                },
                {
                    "text": "Capital of Japan?",
                    "options": ["Osaka", "Tokyo"],
                    "correctAnswer": "Tokyo",
                    "points": 100,
                    "timeLimit": 20
                }
            ]
        }),
    )
    .await
}

/// POST a host or participant action with the caller header
pub async fn post_as(
    server: &TestServer,
    client_id: &str,
    path: &str,
    body: Value,
) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}{}", server.base_url(), path))
        .header("x-client-id", client_id)
        .json(&body)
        .send()
        .await
        .expect("Failed to send request")
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(server: &TestServer, client_id: &str) -> Self {
        let (stream, _) = connect_async(server.ws_url(client_id))
            .await
            .expect("Failed to connect WebSocket");
        Self { stream }
    }

    pub async fn send(&mut self, message: Value) {
        self.stream
            .send(Message::Text(message.to_string().into()))
            .await
            .expect("Failed to send message");
    }

    pub async fn join(&mut self, room_id: &str, display_name: &str) {
        self.send(json!({
            "type": "join_room",
            "roomId": room_id,
            "data": {"displayName": display_name}
        }))
        .await;
    }

    /// Next text event, or `None` on close or timeout
    pub async fn next_event(&mut self) -> Option<Value> {
        loop {
            let message = tokio::time::timeout(EVENT_TIMEOUT, self.stream.next())
                .await
                .ok()??
                .ok()?;
            match message {
                Message::Text(text) => {
                    return Some(serde_json::from_str(&text).expect("event should be JSON"));
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Skip events until one of type `event_type` arrives
    pub async fn expect_event(&mut self, event_type: &str) -> Value {
        loop {
            let event = self
                .next_event()
                .await
                .unwrap_or_else(|| panic!("connection ended before '{event_type}'"));
            if event["type"] == event_type {
                return event;
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
