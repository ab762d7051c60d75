//! UseCase: 早押し

use std::sync::Arc;

use crate::{
    domain::{BuzzOutcome, ParticipantId, RoomId, RoomRepository},
    infrastructure::{
        Broadcaster,
        dto::websocket::{EventPayload, ServerEvent},
    },
};

use super::{error::UseCaseError, join_room::room_update};

pub struct BuzzUseCase {
    rooms: Arc<dyn RoomRepository>,
    broadcaster: Broadcaster,
}

impl BuzzUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, broadcaster: Broadcaster) -> Self {
        Self { rooms, broadcaster }
    }

    /// 早押しを記録（`buzzed = false` で取り消し）し、`buzz` と `room_update` を配信する
    pub async fn execute(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        buzzed: bool,
    ) -> Result<BuzzOutcome, UseCaseError> {
        let outcome = self.rooms.set_buzz(room_id, participant_id, buzzed).await?;

        let display_name = outcome
            .room
            .get_participant(participant_id)
            .map(|p| p.display_name.to_string())
            .unwrap_or_default();
        tracing::info!(
            room_id = %room_id,
            participant_id = %participant_id,
            buzzed,
            order = ?outcome.order,
            "Buzz"
        );

        let buzz = ServerEvent::new(
            room_id,
            EventPayload::Buzz {
                participant_id: participant_id.to_string(),
                display_name,
                buzzed,
                order: outcome.order,
            },
        );
        self.broadcaster.broadcast(room_id, &buzz).await;

        let connection_count = self.broadcaster.registry().count_for_room(room_id).await;
        self.broadcaster
            .broadcast(room_id, &room_update(&outcome.room, connection_count))
            .await;

        Ok(outcome)
    }
}
