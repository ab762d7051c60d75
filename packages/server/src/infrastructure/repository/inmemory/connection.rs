//! InMemory Connection Registry 実装
//!
//! 接続 ID による索引と、ルームごとの登録順リストの 2 つを同じロックで管理します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Connection, ConnectionId, ConnectionRegistry, RoomId};

#[derive(Default)]
struct Indices {
    by_id: HashMap<ConnectionId, Connection>,
    by_room: HashMap<RoomId, Vec<ConnectionId>>,
}

impl Indices {
    fn remove(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let connection = self.by_id.remove(&connection_id)?;
        if let Some(ids) = self.by_room.get_mut(&connection.room_id) {
            ids.retain(|id| *id != connection_id);
            if ids.is_empty() {
                self.by_room.remove(&connection.room_id);
            }
        }
        Some(connection)
    }
}

/// インメモリ接続レジストリ
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    indices: Mutex<Indices>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total connections across all rooms
    #[cfg(test)]
    pub async fn count_all(&self) -> usize {
        self.indices.lock().await.by_id.len()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(&self, connection: Connection) -> Option<Connection> {
        let mut indices = self.indices.lock().await;

        // one connection per (room, participant): a reconnect replaces the old one
        let previous_id = indices.by_room.get(&connection.room_id).and_then(|ids| {
            ids.iter().copied().find(|id| {
                indices
                    .by_id
                    .get(id)
                    .is_some_and(|c| c.participant_id == connection.participant_id)
            })
        });
        let previous = previous_id.and_then(|id| indices.remove(id));

        if let Some(previous) = &previous {
            tracing::info!(
                room_id = %connection.room_id,
                participant_id = %connection.participant_id,
                replaced = %previous.id,
                "Connection replaced by reconnect"
            );
        }

        indices
            .by_room
            .entry(connection.room_id.clone())
            .or_default()
            .push(connection.id);
        indices.by_id.insert(connection.id, connection);
        previous
    }

    async fn unregister(&self, connection_id: ConnectionId) -> Option<Connection> {
        self.indices.lock().await.remove(connection_id)
    }

    async fn find(&self, connection_id: ConnectionId) -> Option<Connection> {
        self.indices.lock().await.by_id.get(&connection_id).cloned()
    }

    async fn connections_for_room(&self, room_id: &RoomId) -> Vec<Connection> {
        let indices = self.indices.lock().await;
        indices
            .by_room
            .get(room_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| indices.by_id.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn count_for_room(&self, room_id: &RoomId) -> usize {
        let indices = self.indices.lock().await;
        indices.by_room.get(room_id).map_or(0, Vec::len)
    }

    async fn unregister_room(&self, room_id: &RoomId) -> Vec<Connection> {
        let mut indices = self.indices.lock().await;
        let ids = indices.by_room.remove(room_id).unwrap_or_default();
        ids.into_iter()
            .filter_map(|id| indices.by_id.remove(&id))
            .collect()
    }
}
