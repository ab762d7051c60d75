//! HTTP, WebSocket and SSE front of the room server.

mod handler;
mod runner;
mod signal;
pub mod state;

pub use handler::http::CLIENT_ID_HEADER;
pub use runner::{build_router, run};
pub use state::AppState;
