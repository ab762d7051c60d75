//! Handler modules for HTTP, WebSocket and SSE endpoints.

pub mod http;
pub mod sse;
pub mod websocket;

// Re-export HTTP handlers
pub use http::{
    change_status, create_room, delete_room, end_question, finish_quiz, get_room_by_pin,
    get_room_detail, get_rooms, health_check, leaderboard, next_question, reset_room,
    start_question, submit_answer,
};

// Re-export streaming handlers
pub use sse::quiz_events_handler;
pub use websocket::websocket_handler;
