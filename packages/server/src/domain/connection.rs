//! Live transport sessions bound to a room.

use tokio::sync::mpsc::UnboundedSender;

use super::value_object::{ConnectionId, DisplayName, ParticipantId, RoomId, Timestamp};

/// Transport that carries a connection's pushes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTransport {
    /// Bidirectional socket (buzzer, quiz host control)
    WebSocket,
    /// Server-to-client event stream (quiz participant view)
    Sse,
}

/// One live transport session.
///
/// `sender` feeds the transport's writer task. Once that task ends the
/// receiver is dropped and every send fails, which is how dead connections
/// are detected.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub display_name: DisplayName,
    pub is_host: bool,
    pub transport: ConnectionTransport,
    pub sender: UnboundedSender<String>,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn new(
        room_id: RoomId,
        participant_id: ParticipantId,
        display_name: DisplayName,
        is_host: bool,
        transport: ConnectionTransport,
        sender: UnboundedSender<String>,
    ) -> Self {
        Self {
            id: ConnectionId::generate(),
            room_id,
            participant_id,
            display_name,
            is_host,
            transport,
            sender,
            connected_at: Timestamp::now(),
        }
    }

    /// Push a serialized event. Fails once the transport has gone away.
    pub fn push(&self, payload: String) -> Result<(), String> {
        self.sender.send(payload).map_err(|e| e.0)
    }

    /// Whether the transport behind this connection has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// A transport's binding to a room.
///
/// Held by the transport while it is joined, so that leaving still knows who
/// left which room after the registry has dropped the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub connection_id: ConnectionId,
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub display_name: DisplayName,
    pub is_host: bool,
}

impl From<&Connection> for Membership {
    fn from(connection: &Connection) -> Self {
        Self {
            connection_id: connection.id,
            room_id: connection.room_id.clone(),
            participant_id: connection.participant_id.clone(),
            display_name: connection.display_name.clone(),
            is_host: connection.is_host,
        }
    }
}
