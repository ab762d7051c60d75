//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::ParticipantId,
    infrastructure::dto::websocket::{ClientMessage, ProtocolError, ServerEvent},
    ui::state::{AppState, ConnectQuery},
    usecase::SessionContext,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> ParticipantId (Domain Model)
    let caller = match ParticipantId::try_from(query.client_id.clone()) {
        Ok(id) => id,
        Err(_) => {
            tracing::warn!("Invalid client_id format: '{}'", query.client_id);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    tracing::info!(client_id = %caller, "WebSocket session opened");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, caller)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, caller: ParticipantId) {
    let (mut sender, mut receiver) = socket.split();

    // Everything pushed to this client goes through the channel; the
    // registry holds the sending half while the session is joined.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client_id = caller.to_string();

    // Spawn a task to receive commands from this client
    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        let session = state_clone.session();
        let mut ctx = SessionContext::new(caller, tx);

        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(client_id = %ctx.caller, "WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let command = match ClientMessage::parse(text.as_str()) {
                        Ok(command) => command,
                        Err(e) => {
                            tracing::warn!(client_id = %ctx.caller, "Rejected message: {}", e);
                            let code = match e {
                                ProtocolError::Malformed(_) => "malformed_message",
                                ProtocolError::InvalidField(_) => "validation_error",
                            };
                            session
                                .reply(&ctx, &ServerEvent::error(None, code, e.to_string()))
                                .await;
                            continue;
                        }
                    };

                    let room_id = command.room_id().clone();
                    if let Err(e) = session.handle(&mut ctx, command).await {
                        tracing::debug!(
                            client_id = %ctx.caller,
                            room_id = %room_id,
                            code = e.code(),
                            "Command rejected: {}",
                            e
                        );
                        let event = ServerEvent::error(Some(&room_id), e.code(), e.to_string());
                        session.reply(&ctx, &event).await;
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!(client_id = %ctx.caller, "Client requested close");
                    break;
                }
                _ => {}
            }
        }

        // transport closed: same as leave_room
        session.close(&mut ctx).await;
    });

    // Forward pushed events to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => {
            // The writer sent a close frame (connection replaced, room deleted,
            // or the client is gone). The reader sees the close and runs the
            // leave cleanup itself.
            let _ = recv_task.await;
        },
    };

    tracing::info!(client_id = %client_id, "WebSocket session closed");
}
