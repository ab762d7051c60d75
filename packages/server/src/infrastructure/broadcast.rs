//! Broadcast engine: best-effort fan-out of one event to a room's live connections.
//!
//! Each event is serialized once and pushed to every matching connection
//! without waiting. A failed push means the transport is gone; the
//! connection is unregistered on the spot and the round continues. Nothing
//! is retried or buffered: the next broadcast carries fresh state anyway.

use std::sync::Arc;

use crate::domain::{Connection, ConnectionRegistry, RoomId};

use super::dto::websocket::ServerEvent;

/// Which connections of a room receive an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Hosts,
    Participants,
}

impl Audience {
    fn includes(&self, connection: &Connection) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Hosts => connection.is_host,
            Audience::Participants => !connection.is_host,
        }
    }
}

/// Outcome of one fan-out round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

impl BroadcastReport {
    fn merge(self, other: BroadcastReport) -> Self {
        Self {
            delivered: self.delivered + other.delivered,
            pruned: self.pruned + other.pruned,
        }
    }
}

#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<dyn ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn ConnectionRegistry> {
        &self.registry
    }

    /// Push `event` to every connection of `room_id`.
    pub async fn broadcast(&self, room_id: &RoomId, event: &ServerEvent) -> BroadcastReport {
        self.broadcast_to(room_id, Audience::Everyone, event).await
    }

    /// Push `event` to the connections of `room_id` selected by `audience`.
    pub async fn broadcast_to(
        &self,
        room_id: &RoomId,
        audience: Audience,
        event: &ServerEvent,
    ) -> BroadcastReport {
        let targets: Vec<Connection> = self
            .registry
            .connections_for_room(room_id)
            .await
            .into_iter()
            .filter(|c| audience.includes(c))
            .collect();
        if targets.is_empty() {
            return BroadcastReport::default();
        }

        let payload = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(room_id = %room_id, "Failed to serialize event: {}", e);
                return BroadcastReport::default();
            }
        };

        let mut report = BroadcastReport::default();
        for connection in &targets {
            report = report.merge(self.push(connection, payload.clone()).await);
        }

        tracing::debug!(
            room_id = %room_id,
            event = event.payload.name(),
            delivered = report.delivered,
            pruned = report.pruned,
            "Broadcast finished"
        );
        report
    }

    /// Send one event to a single connection (replies, initial snapshots).
    pub async fn send_to(&self, connection: &Connection, event: &ServerEvent) -> BroadcastReport {
        match event.to_json() {
            Ok(payload) => self.push(connection, payload).await,
            Err(e) => {
                tracing::error!(connection_id = %connection.id, "Failed to serialize event: {}", e);
                BroadcastReport::default()
            }
        }
    }

    async fn push(&self, connection: &Connection, payload: String) -> BroadcastReport {
        if connection.push(payload).is_ok() {
            return BroadcastReport {
                delivered: 1,
                pruned: 0,
            };
        }

        tracing::info!(
            room_id = %connection.room_id,
            connection_id = %connection.id,
            participant_id = %connection.participant_id,
            "Dead connection pruned"
        );
        self.registry.unregister(connection.id).await;
        BroadcastReport {
            delivered: 0,
            pruned: 1,
        }
    }
}
