//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - [`RoomRepository`]: Room Store（ルームの正本テーブル）
//! - [`ConnectionRegistry`]: ライブ接続とルームの対応表
//! - [`QuizRecordStore`]: 外部ストア（問題・回答・スコア）の窓口

use async_trait::async_trait;

use super::{
    AnswerRecord, Connection, ConnectionId, DisplayName, Participant, ParticipantId,
    QuizRecordError, Question, Room, RoomId, RoomName, RoomPin, RoomStatus, ScoreEntry,
    StoreError, entity::Advance,
};

/// Variant specific input for a new room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRoomKind {
    Buzzer,
    Quiz { question_count: usize },
}

/// Everything the Room Store needs to allocate a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    pub name: RoomName,
    pub host_id: ParticipantId,
    pub host_display_name: DisplayName,
    pub kind: NewRoomKind,
}

/// Result of removing a participant from a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// Participant removed, room still alive
    Removed { participant: Participant, room: Room },
    /// Participant removed and the buzzer room became empty, so it was deleted
    RoomDeleted { participant: Participant },
}

/// Result of a buzz mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuzzOutcome {
    pub order: Option<u32>,
    pub room: Room,
}

/// Result of opening a quiz question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionStarted {
    pub room: Room,
    /// The room moved from `waiting` to `active` as part of this call
    pub activated: bool,
}

/// Room Store trait
///
/// 全ての操作はロックを保持したまま検査と更新を行うため、操作同士は原子的。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 新しいルームを作成（ID と重複しない PIN を払い出す）
    async fn create_room(&self, new_room: NewRoom) -> Result<Room, StoreError>;

    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;

    /// PIN でルームを検索（線形探索、最初の一致）
    async fn get_room_by_pin(&self, pin: &RoomPin) -> Option<Room>;

    /// 作成日時順の全ルーム
    async fn list_rooms(&self) -> Vec<Room>;

    async fn count_rooms(&self) -> usize;

    async fn update_status(
        &self,
        room_id: &RoomId,
        status: RoomStatus,
    ) -> Result<Room, StoreError>;

    /// バザールームに参加者を追加（waiting のときのみ）
    async fn add_participant(
        &self,
        room_id: &RoomId,
        participant_id: ParticipantId,
        display_name: DisplayName,
    ) -> Result<Room, StoreError>;

    /// 参加者を削除。バザールームが空になればルームごと削除
    async fn remove_participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<RemovalOutcome, StoreError>;

    async fn set_buzz(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        buzzed: bool,
    ) -> Result<BuzzOutcome, StoreError>;

    async fn reset_room(&self, room_id: &RoomId) -> Result<Room, StoreError>;

    async fn delete_room(&self, room_id: &RoomId) -> Result<Room, StoreError>;

    async fn start_question(
        &self,
        room_id: &RoomId,
        question_index: usize,
        time_limit_secs: u32,
    ) -> Result<QuestionStarted, StoreError>;

    async fn end_question(
        &self,
        room_id: &RoomId,
        question_index: usize,
    ) -> Result<Room, StoreError>;

    async fn advance_question(&self, room_id: &RoomId) -> Result<Advance, StoreError>;

    async fn finish_quiz(&self, room_id: &RoomId) -> Result<Room, StoreError>;
}

/// Connection Registry trait
///
/// Room Store の参加者表とは独立した、ファンアウト用の接続表。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// 接続を登録。同じ (room, participant) の既存接続は置き換えて返す
    async fn register(&self, connection: Connection) -> Option<Connection>;

    /// 接続を削除（冪等）
    async fn unregister(&self, connection_id: ConnectionId) -> Option<Connection>;

    async fn find(&self, connection_id: ConnectionId) -> Option<Connection>;

    /// ルームの接続一覧（登録順）
    async fn connections_for_room(&self, room_id: &RoomId) -> Vec<Connection>;

    async fn count_for_room(&self, room_id: &RoomId) -> usize;

    /// ルームの全接続を削除して返す
    async fn unregister_room(&self, room_id: &RoomId) -> Vec<Connection>;
}

/// Quiz record store trait
///
/// 問題・参加者・スコアの正本は外部ストアにある想定。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRecordStore: Send + Sync {
    async fn save_questions(&self, room_id: &RoomId, questions: Vec<Question>);

    async fn question(&self, room_id: &RoomId, index: usize) -> Result<Question, QuizRecordError>;

    /// 参加者を登録（既存なら表示名のみ更新）
    async fn upsert_participant(
        &self,
        room_id: &RoomId,
        participant_id: ParticipantId,
        display_name: DisplayName,
    ) -> Result<ScoreEntry, QuizRecordError>;

    async fn participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<ScoreEntry, QuizRecordError>;

    /// 回答を記録し、更新後のスコアを返す（同じ問題への二重回答は拒否）
    async fn record_answer(
        &self,
        room_id: &RoomId,
        record: AnswerRecord,
    ) -> Result<ScoreEntry, QuizRecordError>;

    /// スコア降順のリーダーボード
    async fn leaderboard(&self, room_id: &RoomId) -> Vec<ScoreEntry>;

    async fn remove_room(&self, room_id: &RoomId);
}
