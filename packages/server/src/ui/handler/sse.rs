//! Server-sent event stream for quiz participants.
//!
//! The stream is a receive-only connection: it joins the quiz on open and
//! leaves it when the client goes away. Answers are submitted over HTTP.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionTransport, DisplayName, Membership, ParticipantId, RoomId, RoomKind},
    ui::{handler::http::ApiError, state::AppState},
    usecase::{JoinRequest, UseCaseError},
};

use super::super::state::EventStreamQuery;

/// Interval of keep-alive comments on idle streams
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Leaves the room when the stream is dropped
struct StreamGuard {
    state: Arc<AppState>,
    membership: Membership,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let state = self.state.clone();
        let membership = self.membership.clone();
        // Drop cannot await; the leave runs on the runtime
        runtime.spawn(async move {
            state.leave_room().execute(&membership).await;
        });
    }
}

/// Turn one pushed payload into an SSE event named after its `type`.
fn to_event(payload: String) -> Event {
    let name = serde_json::from_str::<serde_json::Value>(&payload)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_string));
    let event = Event::default().data(payload);
    match name {
        Some(name) => event.event(name),
        None => event,
    }
}

pub async fn quiz_events_handler(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<EventStreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let room_id = RoomId::new(room_id)?;
    let participant_id = ParticipantId::new(query.client_id)?;
    let display_name = DisplayName::new(query.display_name)?;

    let room = state
        .rooms
        .get_room(&room_id)
        .await
        .ok_or_else(|| UseCaseError::RoomNotFound(room_id.clone()))?;
    if room.kind() != RoomKind::Quiz {
        return Err(UseCaseError::WrongRoomKind {
            expected: RoomKind::Quiz,
        }
        .into());
    }

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let joined = state
        .join_room()
        .execute(JoinRequest {
            room_id: room_id.clone(),
            participant_id: participant_id.clone(),
            display_name,
            transport: ConnectionTransport::Sse,
            sender: tx,
        })
        .await?;
    tracing::info!(
        room_id = %room_id,
        client_id = %participant_id,
        "Event stream opened"
    );

    let guard = StreamGuard {
        state: state.clone(),
        membership: joined.membership,
    };
    // ends when the registry drops the sender (replaced, pruned or room deleted)
    let stream = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let payload = rx.recv().await?;
        Some((Ok::<_, Infallible>(to_event(payload)), (rx, guard)))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_named_after_its_type() {
        // テスト項目: SSE イベント名はペイロードの type になる
        let event = to_event(r#"{"type":"score_update","roomId":"r","data":{}}"#.to_string());

        let rendered = format!("{event:?}");

        assert!(rendered.contains("score_update"));
    }
}
