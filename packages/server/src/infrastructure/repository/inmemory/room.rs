//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! 1 つの `Mutex` でテーブル全体を守り、各操作はロック中に await しないため、
//! 検査と更新の組は他の操作に対して原子的になります。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Advance, BuzzOutcome, DisplayName, NewRoom, NewRoomKind, Participant, ParticipantId,
    QuestionStarted, RemovalOutcome, Room, RoomId, RoomIdFactory, RoomKind, RoomPin,
    RoomPinFactory, RoomRepository, RoomStatus, StoreError, Timestamp,
};

/// Upper bound on pin draws before giving up on a create
pub const PIN_GENERATION_ATTEMPTS: usize = 32;

/// インメモリ Room Repository 実装
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<RoomId, Room>>,
    pin_source: fn() -> Option<RoomPin>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            pin_source: || RoomPinFactory::generate().ok(),
        }
    }

    /// Use a custom pin source. Lets tests force pin collisions.
    pub fn with_pin_source(pin_source: fn() -> Option<RoomPin>) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            pin_source,
        }
    }

    fn allocate_pin(&self, rooms: &HashMap<RoomId, Room>) -> Result<RoomPin, StoreError> {
        for _ in 0..PIN_GENERATION_ATTEMPTS {
            let Some(candidate) = (self.pin_source)() else {
                continue;
            };
            if !rooms.values().any(|room| room.pin == candidate) {
                return Ok(candidate);
            }
            tracing::debug!(pin = %candidate, "Room pin collision, drawing again");
        }
        Err(StoreError::PinExhausted {
            attempts: PIN_GENERATION_ATTEMPTS,
        })
    }
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `f` against the room with `room_id`, or fail with RoomNotFound.
fn with_room<T>(
    rooms: &mut HashMap<RoomId, Room>,
    room_id: &RoomId,
    f: impl FnOnce(&mut Room) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
    f(room)
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn create_room(&self, new_room: NewRoom) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.lock().await;
        let pin = self.allocate_pin(&rooms)?;
        let id = RoomIdFactory::generate();
        let now = Timestamp::now();

        let room = match new_room.kind {
            NewRoomKind::Buzzer => {
                let host = Participant::new(new_room.host_id, new_room.host_display_name, now);
                Room::new_buzzer(id.clone(), pin, new_room.name, host, now)
            }
            NewRoomKind::Quiz { question_count } => Room::new_quiz(
                id.clone(),
                pin,
                new_room.name,
                new_room.host_id,
                question_count,
                now,
            ),
        };

        rooms.insert(id, room.clone());
        tracing::info!(room_id = %room.id, pin = %room.pin, kind = ?room.kind(), "Room created");
        Ok(room)
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).cloned()
    }

    async fn get_room_by_pin(&self, pin: &RoomPin) -> Option<Room> {
        let rooms = self.rooms.lock().await;
        rooms.values().find(|room| &room.pin == pin).cloned()
    }

    async fn list_rooms(&self) -> Vec<Room> {
        let rooms = self.rooms.lock().await;
        let mut list: Vec<Room> = rooms.values().cloned().collect();
        list.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        list
    }

    async fn count_rooms(&self) -> usize {
        self.rooms.lock().await.len()
    }

    async fn update_status(
        &self,
        room_id: &RoomId,
        status: RoomStatus,
    ) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.lock().await;
        with_room(&mut rooms, room_id, |room| {
            room.update_status(status)?;
            Ok(room.clone())
        })
    }

    async fn add_participant(
        &self,
        room_id: &RoomId,
        participant_id: ParticipantId,
        display_name: DisplayName,
    ) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.lock().await;
        with_room(&mut rooms, room_id, |room| {
            let participant = Participant::new(participant_id, display_name, Timestamp::now());
            room.add_participant(participant)?;
            Ok(room.clone())
        })
    }

    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<RemovalOutcome, StoreError> {
        let mut rooms = self.rooms.lock().await;
        let (participant, now_empty) = with_room(&mut rooms, room_id, |room| {
            let participant = room.remove_participant(participant_id)?;
            Ok((participant, room.kind() == RoomKind::Buzzer && room.is_empty()))
        })?;

        if now_empty {
            rooms.remove(room_id);
            tracing::info!(room_id = %room_id, "Last participant left, buzzer room deleted");
            return Ok(RemovalOutcome::RoomDeleted { participant });
        }

        let room = rooms
            .get(room_id)
            .cloned()
            .ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))?;
        Ok(RemovalOutcome::Removed { participant, room })
    }

    async fn set_buzz(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        buzzed: bool,
    ) -> Result<BuzzOutcome, StoreError> {
        let mut rooms = self.rooms.lock().await;
        with_room(&mut rooms, room_id, |room| {
            let order = room.set_buzz(participant_id, buzzed)?;
            Ok(BuzzOutcome {
                order,
                room: room.clone(),
            })
        })
    }

    async fn reset_room(&self, room_id: &RoomId) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.lock().await;
        with_room(&mut rooms, room_id, |room| {
            room.reset()?;
            Ok(room.clone())
        })
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .remove(room_id)
            .ok_or_else(|| StoreError::RoomNotFound(room_id.clone()))
    }

    async fn start_question(
        &self,
        room_id: &RoomId,
        question_index: usize,
        time_limit_secs: u32,
    ) -> Result<QuestionStarted, StoreError> {
        let mut rooms = self.rooms.lock().await;
        with_room(&mut rooms, room_id, |room| {
            let activated = room.start_question(question_index, time_limit_secs, Timestamp::now())?;
            Ok(QuestionStarted {
                room: room.clone(),
                activated,
            })
        })
    }

    async fn end_question(
        &self,
        room_id: &RoomId,
        question_index: usize,
    ) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.lock().await;
        with_room(&mut rooms, room_id, |room| {
            room.end_question(question_index)?;
            Ok(room.clone())
        })
    }

    async fn advance_question(&self, room_id: &RoomId) -> Result<Advance, StoreError> {
        let mut rooms = self.rooms.lock().await;
        with_room(&mut rooms, room_id, |room| room.advance_question())
    }

    async fn finish_quiz(&self, room_id: &RoomId) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.lock().await;
        with_room(&mut rooms, room_id, |room| {
            room.finish_quiz()?;
            Ok(room.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoomName;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - InMemoryRoomRepository の作成・検索・更新・削除
    // - PIN の重複回避
    // - バザールームが空になったときの自動削除
    //
    // 【なぜこのテストが必要か】
    // - Room Store は全てのユースケースから呼ばれる正本テーブル
    // - 状態ガード（waiting / active）の結果が呼び出し側に正しく伝わる必要がある
    // ========================================

    fn id(value: &str) -> ParticipantId {
        ParticipantId::new(value.to_string()).unwrap()
    }

    fn name(value: &str) -> DisplayName {
        DisplayName::new(value.to_string()).unwrap()
    }

    fn new_buzzer_room() -> NewRoom {
        NewRoom {
            name: RoomName::new("Trivia Night".to_string()).unwrap(),
            host_id: id("host"),
            host_display_name: name("Host"),
            kind: NewRoomKind::Buzzer,
        }
    }

    #[tokio::test]
    async fn test_create_buzzer_room() {
        // テスト項目: バザールームはホストを参加者に含み、6 桁の PIN を持つ
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();

        // when (操作):
        let room = repo.create_room(new_buzzer_room()).await.unwrap();

        // then (期待する結果):
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.participants.len(), 1);
        assert_eq!(room.pin.as_str().len(), 6);
        assert_eq!(repo.get_room(&room.id).await, Some(room.clone()));
        assert_eq!(repo.get_room_by_pin(&room.pin).await, Some(room));
    }

    #[tokio::test]
    async fn test_create_room_skips_colliding_pin() {
        // テスト項目: 既存ルームと同じ PIN は払い出されない
        // given (前提条件): 最初の 2 回は同じ PIN を返すソース
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn source() -> Option<RoomPin> {
            let n = CALLS.fetch_add(1, Ordering::SeqCst);
            let value = if n < 2 { 111111 } else { 222222 };
            RoomPin::from_number(value).ok()
        }
        let repo = InMemoryRoomRepository::with_pin_source(source);

        // when (操作):
        let first = repo.create_room(new_buzzer_room()).await.unwrap();
        let second = repo.create_room(new_buzzer_room()).await.unwrap();

        // then (期待する結果):
        assert_eq!(first.pin.as_str(), "111111");
        assert_eq!(second.pin.as_str(), "222222");
    }

    #[tokio::test]
    async fn test_create_room_fails_when_pins_exhausted() {
        // テスト項目: PIN を確保できない場合は PinExhausted
        fn source() -> Option<RoomPin> {
            RoomPin::from_number(7).ok()
        }
        let repo = InMemoryRoomRepository::with_pin_source(source);
        repo.create_room(new_buzzer_room()).await.unwrap();

        let result = repo.create_room(new_buzzer_room()).await;

        assert_eq!(
            result.unwrap_err(),
            StoreError::PinExhausted {
                attempts: PIN_GENERATION_ATTEMPTS
            }
        );
        assert_eq!(repo.count_rooms().await, 1);
    }

    #[tokio::test]
    async fn test_add_participant_requires_waiting() {
        // テスト項目: active のルームには参加できず、参加者は増えない
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room(new_buzzer_room()).await.unwrap();
        repo.add_participant(&room.id, id("alice"), name("Alice"))
            .await
            .unwrap();
        repo.update_status(&room.id, RoomStatus::Active).await.unwrap();

        // when (操作):
        let result = repo.add_participant(&room.id, id("bob"), name("Bob")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(StoreError::InvalidState { .. })));
        assert_eq!(repo.get_room(&room.id).await.unwrap().participants.len(), 2);
    }

    #[tokio::test]
    async fn test_operations_on_missing_room() {
        // テスト項目: 存在しないルームへの操作は RoomNotFound
        let repo = InMemoryRoomRepository::new();
        let missing = RoomIdFactory::generate();

        assert_eq!(
            repo.update_status(&missing, RoomStatus::Active).await,
            Err(StoreError::RoomNotFound(missing.clone()))
        );
        assert_eq!(
            repo.set_buzz(&missing, &id("alice"), true).await,
            Err(StoreError::RoomNotFound(missing.clone()))
        );
        assert_eq!(
            repo.delete_room(&missing).await,
            Err(StoreError::RoomNotFound(missing))
        );
    }

    #[tokio::test]
    async fn test_removing_last_participant_deletes_buzzer_room() {
        // テスト項目: 最後の参加者が抜けるとバザールームは削除される
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room(new_buzzer_room()).await.unwrap();
        repo.add_participant(&room.id, id("alice"), name("Alice"))
            .await
            .unwrap();

        // when (操作):
        let first = repo.remove_participant(&room.id, &id("host")).await.unwrap();
        let second = repo.remove_participant(&room.id, &id("alice")).await.unwrap();

        // then (期待する結果):
        assert!(matches!(first, RemovalOutcome::Removed { .. }));
        assert!(matches!(second, RemovalOutcome::RoomDeleted { .. }));
        assert!(repo.get_room(&room.id).await.is_none());
    }

    #[tokio::test]
    async fn test_buzz_reset_round_trip() {
        // テスト項目: バズの順位付けとリセット
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room = repo.create_room(new_buzzer_room()).await.unwrap();
        repo.add_participant(&room.id, id("alice"), name("Alice"))
            .await
            .unwrap();
        repo.add_participant(&room.id, id("bob"), name("Bob"))
            .await
            .unwrap();
        repo.update_status(&room.id, RoomStatus::Active).await.unwrap();

        // when (操作):
        let alice = repo.set_buzz(&room.id, &id("alice"), true).await.unwrap();
        let bob = repo.set_buzz(&room.id, &id("bob"), true).await.unwrap();
        let reset = repo.reset_room(&room.id).await.unwrap();

        // then (期待する結果):
        assert_eq!(alice.order, Some(0));
        assert_eq!(bob.order, Some(1));
        assert_eq!(reset.status, RoomStatus::Waiting);
        assert!(reset.participants.iter().all(|p| p.buzz_order.is_none()));
    }

    #[tokio::test]
    async fn test_quiz_progress_operations() {
        // テスト項目: クイズの問題開始・終了・次へ・終了処理
        // given (前提条件):
        let repo = InMemoryRoomRepository::new();
        let room = repo
            .create_room(NewRoom {
                kind: NewRoomKind::Quiz { question_count: 2 },
                ..new_buzzer_room()
            })
            .await
            .unwrap();
        assert!(room.participants.is_empty());

        // when (操作) / then (期待する結果):
        let started = repo.start_question(&room.id, 0, 30).await.unwrap();
        assert!(started.activated);
        assert_eq!(started.room.status, RoomStatus::Active);

        repo.end_question(&room.id, 0).await.unwrap();
        assert_eq!(
            repo.advance_question(&room.id).await.unwrap(),
            Advance::Advanced(1)
        );
        assert_eq!(
            repo.advance_question(&room.id).await.unwrap(),
            Advance::AtLastQuestion
        );

        let finished = repo.finish_quiz(&room.id).await.unwrap();
        assert_eq!(finished.status, RoomStatus::Finished);
    }

    #[tokio::test]
    async fn test_list_rooms_in_creation_order() {
        // テスト項目: ルーム一覧は作成順
        let repo = InMemoryRoomRepository::new();
        let first = repo.create_room(new_buzzer_room()).await.unwrap();
        let second = repo.create_room(new_buzzer_room()).await.unwrap();

        let rooms = repo.list_rooms().await;

        assert_eq!(rooms.len(), 2);
        assert!(rooms[0].created_at <= rooms[1].created_at);
        assert!(rooms.iter().any(|r| r.id == first.id));
        assert!(rooms.iter().any(|r| r.id == second.id));
    }
}
