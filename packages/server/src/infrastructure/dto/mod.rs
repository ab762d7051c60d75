//! Data transfer objects for HTTP, WebSocket and SSE payloads.

pub mod http;
pub mod websocket;
