//! Router construction and the server loop.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

use super::{handler, signal::shutdown_signal, state::AppState};

/// Build the application router over the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handler::health_check))
        .route("/api/rooms", get(handler::get_rooms).post(handler::create_room))
        .route("/api/rooms/pin/{pin}", get(handler::get_room_by_pin))
        .route(
            "/api/rooms/{room_id}",
            get(handler::get_room_detail).delete(handler::delete_room),
        )
        .route("/api/rooms/{room_id}/status", post(handler::change_status))
        .route("/api/rooms/{room_id}/reset", post(handler::reset_room))
        .route("/api/quiz/{room_id}/questions/start", post(handler::start_question))
        .route("/api/quiz/{room_id}/questions/end", post(handler::end_question))
        .route("/api/quiz/{room_id}/questions/next", post(handler::next_question))
        .route("/api/quiz/{room_id}/finish", post(handler::finish_quiz))
        .route("/api/quiz/{room_id}/answers", post(handler::submit_answer))
        .route("/api/quiz/{room_id}/leaderboard", get(handler::leaderboard))
        .route("/api/quiz/{room_id}/events", get(handler::quiz_events_handler))
        .route("/ws", get(handler::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server until a shutdown signal arrives.
pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_address();
    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    tracing::info!("WebSocket endpoint: ws://{}/ws?client_id=<id>", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
