//! Hiroba room server library.
//!
//! Real-time buzzer and quiz rooms over HTTP, WebSocket and server-sent events,
//! organised in domain, usecase, infrastructure and ui layers.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::{Args, ServerConfig};
pub use ui::{AppState, build_router, run as run_server};
