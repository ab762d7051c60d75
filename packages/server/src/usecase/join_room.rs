//! UseCase: ルーム参加
//!
//! 接続をルームに結び付け、Connection Registry に登録する。
//!
//! - バザールーム: Room Store の参加者表に追加（waiting のときのみ新規参加可）
//! - クイズルーム: ホスト以外はクイズストアに参加者として登録
//!
//! 同じ (ルーム, 参加者) の既存接続は置き換えられ、古い送信チャネルは破棄される。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::{
    domain::{
        Connection, ConnectionId, ConnectionTransport, DisplayName, Membership, ParticipantId,
        QuizRecordStore, Room, RoomId, RoomKind, RoomRepository, StoreError,
    },
    infrastructure::{
        Broadcaster,
        dto::{
            http::RoomDetailDto,
            websocket::{EventPayload, ServerEvent},
        },
    },
};

use super::error::UseCaseError;

/// Everything needed to bind a transport to a room
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub display_name: DisplayName,
    pub transport: ConnectionTransport,
    pub sender: UnboundedSender<String>,
}

#[derive(Debug, Clone)]
pub struct Joined {
    pub connection_id: ConnectionId,
    pub is_host: bool,
    /// Handed back to `LeaveRoomUseCase` when the transport leaves
    pub membership: Membership,
    pub room: Room,
    /// An earlier connection of the same participant that was replaced
    pub replaced: Option<ConnectionId>,
}

pub struct JoinRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    quiz: Arc<dyn QuizRecordStore>,
    broadcaster: Broadcaster,
}

/// `room_update` snapshot of `room`
pub(crate) fn room_update(room: &Room, connection_count: usize) -> ServerEvent {
    let participant_count = match room.kind() {
        RoomKind::Buzzer => room.participants.len(),
        RoomKind::Quiz => connection_count,
    };
    ServerEvent::new(
        &room.id,
        EventPayload::RoomUpdate {
            room: RoomDetailDto::from(room),
            participant_count,
        },
    )
}

impl JoinRoomUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        quiz: Arc<dyn QuizRecordStore>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            rooms,
            quiz,
            broadcaster,
        }
    }

    /// 参加処理を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Joined)` - 登録された接続とルームのスナップショット
    /// * `Err(UseCaseError::RoomNotFound)` - ルームが存在しない
    /// * `Err(UseCaseError::NotAcceptingJoins)` - waiting 以外のバザールームへの新規参加
    pub async fn execute(&self, request: JoinRequest) -> Result<Joined, UseCaseError> {
        let JoinRequest {
            room_id,
            participant_id,
            display_name,
            transport,
            sender,
        } = request;

        let room = self
            .rooms
            .get_room(&room_id)
            .await
            .ok_or_else(|| UseCaseError::RoomNotFound(room_id.clone()))?;
        let is_host = room.is_host(&participant_id);

        let room = match room.kind() {
            RoomKind::Buzzer => self
                .rooms
                .add_participant(&room_id, participant_id.clone(), display_name.clone())
                .await
                .map_err(|e| match e {
                    StoreError::InvalidState { status, .. } => {
                        UseCaseError::NotAcceptingJoins(status)
                    }
                    other => other.into(),
                })?,
            RoomKind::Quiz => {
                if !is_host {
                    self.quiz
                        .upsert_participant(&room_id, participant_id.clone(), display_name.clone())
                        .await?;
                }
                room
            }
        };

        let connection = Connection::new(
            room_id.clone(),
            participant_id.clone(),
            display_name.clone(),
            is_host,
            transport,
            sender,
        );
        let connection_id = connection.id;
        let registry = self.broadcaster.registry();
        let replaced = registry.register(connection.clone()).await.map(|old| old.id);

        tracing::info!(
            room_id = %room_id,
            participant_id = %participant_id,
            connection_id = %connection_id,
            is_host,
            transport = ?transport,
            replaced = replaced.is_some(),
            "Joined room"
        );

        let connection_count = registry.count_for_room(&room_id).await;
        match room.kind() {
            RoomKind::Buzzer => {
                self.broadcaster
                    .broadcast(&room_id, &room_update(&room, connection_count))
                    .await;
            }
            RoomKind::Quiz => {
                self.broadcaster
                    .send_to(&connection, &room_update(&room, connection_count))
                    .await;
                if !is_host {
                    let joined = ServerEvent::new(
                        &room_id,
                        EventPayload::ParticipantJoined {
                            participant_id: participant_id.to_string(),
                            display_name: display_name.to_string(),
                        },
                    );
                    self.broadcaster.broadcast(&room_id, &joined).await;
                }
            }
        }

        Ok(Joined {
            connection_id,
            is_host,
            membership: Membership::from(&connection),
            room,
            replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionRegistry, NewRoom, NewRoomKind, Question, RoomName, RoomStatus},
        infrastructure::repository::{
            InMemoryConnectionRegistry, InMemoryQuizRecordStore, InMemoryRoomRepository,
        },
    };
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - バザールームへの参加と room_update のブロードキャスト
    // - waiting 以外のバザールームへの新規参加拒否
    // - 同じ参加者の再接続による接続の置き換え
    // - クイズルームではスナップショットが参加者本人に届くこと
    // ========================================

    struct Fixture {
        rooms: Arc<InMemoryRoomRepository>,
        registry: Arc<InMemoryConnectionRegistry>,
        quiz: Arc<InMemoryQuizRecordStore>,
        usecase: JoinRoomUseCase,
    }

    fn setup() -> Fixture {
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let quiz = Arc::new(InMemoryQuizRecordStore::new());
        let usecase = JoinRoomUseCase::new(
            rooms.clone(),
            quiz.clone(),
            Broadcaster::new(registry.clone()),
        );
        Fixture {
            rooms,
            registry,
            quiz,
            usecase,
        }
    }

    fn id(value: &str) -> ParticipantId {
        ParticipantId::new(value.to_string()).unwrap()
    }

    fn name(value: &str) -> DisplayName {
        DisplayName::new(value.to_string()).unwrap()
    }

    async fn create_room(fixture: &Fixture, kind: NewRoomKind) -> Room {
        fixture
            .rooms
            .create_room(NewRoom {
                name: RoomName::new("Room".to_string()).unwrap(),
                host_id: id("host"),
                host_display_name: name("Host"),
                kind,
            })
            .await
            .unwrap()
    }

    fn request(
        room_id: &RoomId,
        who: &str,
        transport: ConnectionTransport,
    ) -> (JoinRequest, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let request = JoinRequest {
            room_id: room_id.clone(),
            participant_id: id(who),
            display_name: name(who),
            transport,
            sender: tx,
        };
        (request, rx)
    }

    #[tokio::test]
    async fn test_join_buzzer_room_broadcasts_room_update() {
        // テスト項目: バザールームへの参加で参加者が追加され、room_update が全員に届く
        // given (前提条件):
        let fixture = setup();
        let room = create_room(&fixture, NewRoomKind::Buzzer).await;
        let (host_request, mut host_rx) = request(&room.id, "host", ConnectionTransport::WebSocket);
        fixture.usecase.execute(host_request).await.unwrap();
        host_rx.recv().await.unwrap();

        // when (操作):
        let (alice_request, mut alice_rx) =
            request(&room.id, "alice", ConnectionTransport::WebSocket);
        let joined = fixture.usecase.execute(alice_request).await.unwrap();

        // then (期待する結果):
        assert!(!joined.is_host);
        assert_eq!(joined.room.participants.len(), 2);
        let host_view: serde_json::Value =
            serde_json::from_str(&host_rx.recv().await.unwrap()).unwrap();
        assert_eq!(host_view["type"], "room_update");
        assert_eq!(host_view["data"]["participantCount"], 2);
        assert!(alice_rx.recv().await.unwrap().contains("room_update"));
    }

    #[tokio::test]
    async fn test_join_active_buzzer_room_is_rejected() {
        // テスト項目: active のバザールームには新規参加できず、接続も登録されない
        // given (前提条件):
        let fixture = setup();
        let room = create_room(&fixture, NewRoomKind::Buzzer).await;
        fixture
            .rooms
            .update_status(&room.id, RoomStatus::Active)
            .await
            .unwrap();

        // when (操作):
        let (alice_request, _rx) = request(&room.id, "alice", ConnectionTransport::WebSocket);
        let result = fixture.usecase.execute(alice_request).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(UseCaseError::NotAcceptingJoins(RoomStatus::Active))
        ));
        assert_eq!(fixture.registry.count_for_room(&room.id).await, 0);
    }

    #[tokio::test]
    async fn test_rejoin_replaces_previous_connection() {
        // テスト項目: 同じ参加者の再接続は以前の接続を置き換え、古い送信チャネルを閉じる
        // given (前提条件):
        let fixture = setup();
        let room = create_room(&fixture, NewRoomKind::Buzzer).await;
        let (first, mut first_rx) = request(&room.id, "alice", ConnectionTransport::WebSocket);
        let first = fixture.usecase.execute(first).await.unwrap();

        // when (操作):
        let (second, _second_rx) = request(&room.id, "alice", ConnectionTransport::WebSocket);
        let second = fixture.usecase.execute(second).await.unwrap();

        // then (期待する結果):
        assert_eq!(second.replaced, Some(first.connection_id));
        assert_eq!(fixture.registry.count_for_room(&room.id).await, 1);
        assert_eq!(second.room.participants.len(), 2);
        // 置き換えられた接続の送信側は全て破棄されている
        while first_rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_join_quiz_room_registers_participant() {
        // テスト項目: クイズ参加者はクイズストアに登録され、スナップショットは本人に届く
        // given (前提条件):
        let fixture = setup();
        let room = create_room(&fixture, NewRoomKind::Quiz { question_count: 1 }).await;
        fixture
            .quiz
            .save_questions(
                &room.id,
                vec![Question::new("Q".to_string(), vec![], "A".to_string(), 10, 10).unwrap()],
            )
            .await;

        // when (操作):
        let (alice_request, mut alice_rx) = request(&room.id, "alice", ConnectionTransport::Sse);
        let joined = fixture.usecase.execute(alice_request).await.unwrap();

        // then (期待する結果):
        assert!(joined.room.participants.is_empty());
        assert_eq!(
            fixture.quiz.participant(&room.id, &id("alice")).await.unwrap().score,
            0
        );
        assert!(alice_rx.recv().await.unwrap().contains("room_update"));
        assert!(alice_rx.recv().await.unwrap().contains("participant_joined"));
    }

    #[tokio::test]
    async fn test_join_missing_room() {
        // テスト項目: 存在しないルームへの参加は RoomNotFound
        let fixture = setup();
        let missing = crate::domain::RoomIdFactory::generate();

        let (alice_request, _rx) = request(&missing, "alice", ConnectionTransport::WebSocket);
        let result = fixture.usecase.execute(alice_request).await;

        assert_eq!(result.err(), Some(UseCaseError::RoomNotFound(missing)));
    }
}
