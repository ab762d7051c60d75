//! UseCase: 双方向セッションのコマンド処理
//!
//! 1 本の WebSocket 接続に届くコマンドを各ユースケースへ振り分ける。
//! セッションは同時に 1 つのルームにだけ参加できる。
//!
//! 未参加の間は送信チャネルをセッション自身が持ち、参加すると
//! Connection Registry に引き渡す。以降レジストリから外されると（置き換え・
//! ルーム削除）チャネルが閉じ、トランスポートも閉じる。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::{
    domain::{ConnectionId, ConnectionTransport, Membership, ParticipantId, RoomId, RoomRepository},
    infrastructure::{
        Broadcaster,
        dto::websocket::{InboundCommand, ServerEvent},
    },
};

use super::{
    buzz::BuzzUseCase,
    error::UseCaseError,
    host_control::HostControlUseCase,
    join_room::{JoinRequest, JoinRoomUseCase},
    leave_room::LeaveRoomUseCase,
};

/// Per-transport session state
#[derive(Debug)]
pub struct SessionContext {
    pub caller: ParticipantId,
    joined: Option<Membership>,
    /// Held while not joined; moved into the registry on join
    idle_sender: Option<UnboundedSender<String>>,
}

impl SessionContext {
    pub fn new(caller: ParticipantId, sender: UnboundedSender<String>) -> Self {
        Self {
            caller,
            joined: None,
            idle_sender: Some(sender),
        }
    }

    pub fn joined_room(&self) -> Option<&RoomId> {
        self.joined.as_ref().map(|m| &m.room_id)
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.joined.as_ref().map(|m| m.connection_id)
    }
}

pub struct SessionUseCase {
    rooms: Arc<dyn RoomRepository>,
    join: JoinRoomUseCase,
    leave: LeaveRoomUseCase,
    buzz: BuzzUseCase,
    host: HostControlUseCase,
    broadcaster: Broadcaster,
}

impl SessionUseCase {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        join: JoinRoomUseCase,
        leave: LeaveRoomUseCase,
        buzz: BuzzUseCase,
        host: HostControlUseCase,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            rooms,
            join,
            leave,
            buzz,
            host,
            broadcaster,
        }
    }

    /// 1 つのコマンドを処理する
    pub async fn handle(
        &self,
        ctx: &mut SessionContext,
        command: InboundCommand,
    ) -> Result<(), UseCaseError> {
        if !matches!(command, InboundCommand::JoinRoom { .. }) {
            self.require_joined(ctx, command.room_id()).await?;
        }
        match command {
            InboundCommand::JoinRoom {
                room_id,
                display_name,
            } => {
                if ctx.joined_room() == Some(&room_id) {
                    return Ok(());
                }
                if ctx.joined.is_some() {
                    self.close(ctx).await;
                }
                let Some(sender) = ctx.idle_sender.clone() else {
                    return Err(UseCaseError::InvalidState(
                        "session transport is closed".to_string(),
                    ));
                };
                let joined = self
                    .join
                    .execute(JoinRequest {
                        room_id,
                        participant_id: ctx.caller.clone(),
                        display_name,
                        transport: ConnectionTransport::WebSocket,
                        sender,
                    })
                    .await?;
                ctx.joined = Some(joined.membership);
                ctx.idle_sender = None;
                Ok(())
            }
            InboundCommand::LeaveRoom { .. } => {
                self.close(ctx).await;
                Ok(())
            }
            InboundCommand::Buzz { room_id, buzzed } => {
                self.buzz.execute(&room_id, &ctx.caller, buzzed).await?;
                Ok(())
            }
            InboundCommand::StatusChange { room_id, status } => {
                self.host.change_status(&ctx.caller, &room_id, status).await?;
                Ok(())
            }
            InboundCommand::ResetRoom { room_id } => {
                self.host.reset_buzzer_room(&ctx.caller, &room_id).await?;
                Ok(())
            }
            InboundCommand::QuestionStart {
                room_id,
                question_index,
                time_limit,
            } => {
                self.host
                    .start_question(&ctx.caller, &room_id, question_index, time_limit)
                    .await?;
                Ok(())
            }
            InboundCommand::QuestionEnd {
                room_id,
                question_index,
            } => {
                self.host
                    .end_question(&ctx.caller, &room_id, question_index)
                    .await?;
                Ok(())
            }
        }
    }

    /// join_room 以外のコマンドは、そのルームに参加済みであること
    async fn require_joined(
        &self,
        ctx: &SessionContext,
        room_id: &RoomId,
    ) -> Result<(), UseCaseError> {
        if ctx.joined_room() == Some(room_id) {
            return Ok(());
        }
        if self.rooms.get_room(room_id).await.is_none() {
            return Err(UseCaseError::RoomNotFound(room_id.clone()));
        }
        Err(UseCaseError::NotJoined)
    }

    /// セッションの送信元だけにイベントを送る
    pub async fn reply(&self, ctx: &SessionContext, event: &ServerEvent) {
        if let Some(connection_id) = ctx.connection_id() {
            if let Some(connection) = self.broadcaster.registry().find(connection_id).await {
                self.broadcaster.send_to(&connection, event).await;
            }
            return;
        }
        if let Some(sender) = &ctx.idle_sender {
            match event.to_json() {
                Ok(json) => {
                    let _ = sender.send(json);
                }
                Err(e) => tracing::error!("Failed to serialize reply: {}", e),
            }
        }
    }

    /// 参加中のルームから退出する（切断時は leave_room と同じ扱い）
    pub async fn close(&self, ctx: &mut SessionContext) {
        let Some(membership) = ctx.joined.take() else {
            return;
        };
        if let Some(connection) = self.leave.execute(&membership).await {
            ctx.idle_sender = Some(connection.sender);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ConnectionRegistry, DisplayName, NewRoom, NewRoomKind, Room, RoomName, RoomRepository,
            RoomStatus,
        },
        infrastructure::repository::{
            InMemoryConnectionRegistry, InMemoryQuizRecordStore, InMemoryRoomRepository,
        },
    };
    use std::sync::Arc;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - join_room で接続がレジストリに登録され、leave_room で送信チャネルが戻ること
    // - 別ルームへの join_room は元のルームから退出してから参加すること
    // - ホスト以外の status_change が拒否されること
    // - 参加前のコマンドが NotJoined で拒否されること
    // - 未参加でも返信が届くこと
    // ========================================

    struct Fixture {
        rooms: Arc<InMemoryRoomRepository>,
        registry: Arc<InMemoryConnectionRegistry>,
        session: SessionUseCase,
    }

    fn setup() -> Fixture {
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let quiz = Arc::new(InMemoryQuizRecordStore::new());
        let broadcaster = Broadcaster::new(registry.clone());
        let session = SessionUseCase::new(
            rooms.clone(),
            JoinRoomUseCase::new(rooms.clone(), quiz.clone(), broadcaster.clone()),
            LeaveRoomUseCase::new(rooms.clone(), broadcaster.clone()),
            BuzzUseCase::new(rooms.clone(), broadcaster.clone()),
            HostControlUseCase::new(rooms.clone(), quiz, broadcaster.clone()),
            broadcaster,
        );
        Fixture {
            rooms,
            registry,
            session,
        }
    }

    fn id(value: &str) -> ParticipantId {
        ParticipantId::new(value.to_string()).unwrap()
    }

    fn name(value: &str) -> DisplayName {
        DisplayName::new(value.to_string()).unwrap()
    }

    async fn buzzer_room(fixture: &Fixture, host: &str) -> Room {
        fixture
            .rooms
            .create_room(NewRoom {
                name: RoomName::new("Buzz".to_string()).unwrap(),
                host_id: id(host),
                host_display_name: name(host),
                kind: NewRoomKind::Buzzer,
            })
            .await
            .unwrap()
    }

    fn join(room: &Room, who: &str) -> InboundCommand {
        InboundCommand::JoinRoom {
            room_id: room.id.clone(),
            display_name: name(who),
        }
    }

    #[tokio::test]
    async fn test_join_then_leave_keeps_transport_open() {
        // テスト項目: 参加すると登録され、退出後も同じチャネルで返信できる
        // given (前提条件):
        let fixture = setup();
        let room = buzzer_room(&fixture, "host").await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ctx = SessionContext::new(id("alice"), tx);

        // when (操作):
        fixture.session.handle(&mut ctx, join(&room, "alice")).await.unwrap();
        let registered = fixture.registry.count_for_room(&room.id).await;
        fixture
            .session
            .handle(
                &mut ctx,
                InboundCommand::LeaveRoom {
                    room_id: room.id.clone(),
                },
            )
            .await
            .unwrap();
        fixture
            .session
            .reply(&ctx, &ServerEvent::error(None, "test", "still here"))
            .await;

        // then (期待する結果):
        assert_eq!(registered, 1);
        assert_eq!(fixture.registry.count_for_room(&room.id).await, 0);
        assert!(ctx.joined_room().is_none());
        assert!(rx.recv().await.unwrap().contains("room_update"));
        assert!(rx.recv().await.unwrap().contains("still here"));
    }

    #[tokio::test]
    async fn test_join_other_room_leaves_the_first() {
        // テスト項目: 別のルームに参加すると元のルームからは退出する
        // given (前提条件):
        let fixture = setup();
        let first = buzzer_room(&fixture, "host1").await;
        let second = buzzer_room(&fixture, "host2").await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ctx = SessionContext::new(id("alice"), tx);
        fixture.session.handle(&mut ctx, join(&first, "alice")).await.unwrap();

        // when (操作):
        fixture.session.handle(&mut ctx, join(&second, "alice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(ctx.joined_room(), Some(&second.id));
        let first_after = fixture.rooms.get_room(&first.id).await.unwrap();
        assert!(first_after.get_participant(&id("alice")).is_none());
        assert_eq!(fixture.registry.count_for_room(&first.id).await, 0);
        assert_eq!(fixture.registry.count_for_room(&second.id).await, 1);
    }

    #[tokio::test]
    async fn test_status_change_from_participant_is_rejected() {
        // テスト項目: ホスト以外の status_change は NotHost
        let fixture = setup();
        let room = buzzer_room(&fixture, "host").await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ctx = SessionContext::new(id("alice"), tx);
        fixture.session.handle(&mut ctx, join(&room, "alice")).await.unwrap();

        let result = fixture
            .session
            .handle(
                &mut ctx,
                InboundCommand::StatusChange {
                    room_id: room.id.clone(),
                    status: RoomStatus::Active,
                },
            )
            .await;

        assert!(matches!(result, Err(UseCaseError::NotHost { .. })));
        let room_after = fixture.rooms.get_room(&room.id).await.unwrap();
        assert_eq!(room_after.status, RoomStatus::Waiting);
    }

    #[tokio::test]
    async fn test_close_is_a_leave() {
        // テスト項目: 切断は退出と同じく参加者を削除する
        let fixture = setup();
        let room = buzzer_room(&fixture, "host").await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ctx = SessionContext::new(id("alice"), tx);
        fixture.session.handle(&mut ctx, join(&room, "alice")).await.unwrap();

        fixture.session.close(&mut ctx).await;
        fixture.session.close(&mut ctx).await;

        let room_after = fixture.rooms.get_room(&room.id).await.unwrap();
        assert!(room_after.get_participant(&id("alice")).is_none());
        assert_eq!(room_after.participants.len(), 1);
    }

    #[tokio::test]
    async fn test_command_before_join_is_rejected() {
        // テスト項目: 参加前のコマンドは NotJoined、存在しないルームは RoomNotFound
        // given (前提条件):
        let fixture = setup();
        let room = buzzer_room(&fixture, "host").await;
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut ctx = SessionContext::new(id("host"), tx);
        let missing = crate::domain::RoomIdFactory::generate();

        // when (操作):
        let before_join = fixture
            .session
            .handle(
                &mut ctx,
                InboundCommand::StatusChange {
                    room_id: room.id.clone(),
                    status: RoomStatus::Active,
                },
            )
            .await;
        let unknown_room = fixture
            .session
            .handle(
                &mut ctx,
                InboundCommand::ResetRoom {
                    room_id: missing.clone(),
                },
            )
            .await;

        // then (期待する結果):
        assert_eq!(before_join, Err(UseCaseError::NotJoined));
        assert_eq!(unknown_room, Err(UseCaseError::RoomNotFound(missing)));
        let room_after = fixture.rooms.get_room(&room.id).await.unwrap();
        assert_eq!(room_after.status, RoomStatus::Waiting);
    }
}
