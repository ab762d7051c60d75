//! UseCase: ルーム退出
//!
//! 明示的な leave_room と、トランスポートの切断の両方で使われる。
//! 接続が既に登録解除されていても、同じ参加者の生きた接続が他になければ
//! （送信失敗で刈り取られた場合）参加者の後始末を行う。再接続で置き換え
//! られた場合は何もしない。

use std::sync::Arc;

use crate::{
    domain::{Connection, Membership, RemovalOutcome, RoomKind, RoomRepository, StoreError},
    infrastructure::{
        Broadcaster,
        dto::websocket::{EventPayload, ServerEvent},
    },
};

use super::join_room::room_update;

pub struct LeaveRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    broadcaster: Broadcaster,
}

impl LeaveRoomUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, broadcaster: Broadcaster) -> Self {
        Self { rooms, broadcaster }
    }

    /// 同じ参加者の生きた接続が、まだルームに登録されているか
    async fn replaced_by_live_connection(&self, membership: &Membership) -> bool {
        self.broadcaster
            .registry()
            .connections_for_room(&membership.room_id)
            .await
            .iter()
            .any(|c| c.participant_id == membership.participant_id && !c.is_closed())
    }

    /// 退出処理を実行
    ///
    /// # Returns
    ///
    /// 登録解除された接続。既に登録されていなければ `None`。
    pub async fn execute(&self, membership: &Membership) -> Option<Connection> {
        let registry = self.broadcaster.registry();
        let connection = registry.unregister(membership.connection_id).await;
        let room_id = &membership.room_id;

        if connection.is_none() && self.replaced_by_live_connection(membership).await {
            tracing::debug!(
                room_id = %room_id,
                participant_id = %membership.participant_id,
                "Connection was replaced, participant stays"
            );
            return None;
        }

        let Some(room) = self.rooms.get_room(room_id).await else {
            tracing::debug!(room_id = %room_id, "Left a room that no longer exists");
            return connection;
        };

        let left = ServerEvent::new(
            room_id,
            EventPayload::ParticipantLeft {
                participant_id: membership.participant_id.to_string(),
                display_name: membership.display_name.to_string(),
            },
        );

        match room.kind() {
            RoomKind::Buzzer => {
                match self
                    .rooms
                    .remove_participant(room_id, &membership.participant_id)
                    .await
                {
                    Ok(RemovalOutcome::Removed { room, .. }) => {
                        let connection_count = registry.count_for_room(room_id).await;
                        self.broadcaster.broadcast(room_id, &left).await;
                        self.broadcaster
                            .broadcast(room_id, &room_update(&room, connection_count))
                            .await;
                    }
                    Ok(RemovalOutcome::RoomDeleted { .. }) => {
                        // stray connections of participants that never joined the store
                        registry.unregister_room(room_id).await;
                    }
                    Err(StoreError::ParticipantNotFound { .. }) => {
                        tracing::debug!(
                            room_id = %room_id,
                            participant_id = %membership.participant_id,
                            "Participant already removed"
                        );
                        return connection;
                    }
                    Err(e) => {
                        tracing::warn!(room_id = %room_id, "Failed to remove participant: {}", e);
                    }
                }
            }
            RoomKind::Quiz => {
                // quiz scores outlive the connection
                if !membership.is_host {
                    self.broadcaster.broadcast(room_id, &left).await;
                }
            }
        }

        tracing::info!(
            room_id = %room_id,
            participant_id = %membership.participant_id,
            connection_id = %membership.connection_id,
            pruned = connection.is_none(),
            "Left room"
        );
        connection
    }
}
