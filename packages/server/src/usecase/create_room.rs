//! UseCase: ルーム作成
//!
//! バザールームはホストを最初の参加者として作成し、クイズルームは問題を
//! クイズストアへ保存してから問題数だけを Room Store に持たせる。

use std::sync::Arc;

use crate::domain::{
    DisplayName, NewRoom, NewRoomKind, ParticipantId, Question, QuizRecordStore, Room,
    RoomRepository, RoomName,
};

use super::error::UseCaseError;

/// What kind of room to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomBlueprint {
    Buzzer,
    Quiz { questions: Vec<Question> },
}

pub struct CreateRoomUseCase {
    rooms: Arc<dyn RoomRepository>,
    quiz: Arc<dyn QuizRecordStore>,
}

impl CreateRoomUseCase {
    pub fn new(rooms: Arc<dyn RoomRepository>, quiz: Arc<dyn QuizRecordStore>) -> Self {
        Self { rooms, quiz }
    }

    /// ルームを作成する
    ///
    /// # Returns
    ///
    /// * `Ok(Room)` - 作成されたルーム（PIN 払い出し済み）
    /// * `Err(UseCaseError::NoQuestions)` - 問題のないクイズ
    /// * `Err(UseCaseError::PinExhausted)` - PIN の払い出しに失敗
    pub async fn execute(
        &self,
        host_id: ParticipantId,
        host_display_name: DisplayName,
        name: RoomName,
        blueprint: RoomBlueprint,
    ) -> Result<Room, UseCaseError> {
        let (kind, questions) = match blueprint {
            RoomBlueprint::Buzzer => (NewRoomKind::Buzzer, None),
            RoomBlueprint::Quiz { questions } => {
                if questions.is_empty() {
                    return Err(UseCaseError::NoQuestions);
                }
                (
                    NewRoomKind::Quiz {
                        question_count: questions.len(),
                    },
                    Some(questions),
                )
            }
        };

        let room = self
            .rooms
            .create_room(NewRoom {
                name,
                host_id,
                host_display_name,
                kind,
            })
            .await?;

        if let Some(questions) = questions {
            self.quiz.save_questions(&room.id, questions).await;
        }

        tracing::info!(
            room_id = %room.id,
            pin = %room.pin,
            kind = ?room.kind(),
            host_id = %room.host_id,
            "Room created"
        );
        Ok(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{RoomKind, RoomStatus},
        infrastructure::repository::{InMemoryQuizRecordStore, InMemoryRoomRepository},
    };

    fn question(text: &str) -> Question {
        Question::new(text.to_string(), vec![], "yes".to_string(), 100, 20).unwrap()
    }

    fn setup() -> (
        Arc<InMemoryRoomRepository>,
        Arc<InMemoryQuizRecordStore>,
        CreateRoomUseCase,
    ) {
        let rooms = Arc::new(InMemoryRoomRepository::new());
        let quiz = Arc::new(InMemoryQuizRecordStore::new());
        let usecase = CreateRoomUseCase::new(rooms.clone(), quiz.clone());
        (rooms, quiz, usecase)
    }

    fn host() -> (ParticipantId, DisplayName) {
        (
            ParticipantId::new("host".to_string()).unwrap(),
            DisplayName::new("Host".to_string()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_buzzer_room() {
        // テスト項目: バザールームはホストを参加者に含めて waiting で作成される
        // given (前提条件):
        let (rooms, _quiz, usecase) = setup();
        let (host_id, host_name) = host();

        // when (操作):
        let room = usecase
            .execute(
                host_id.clone(),
                host_name,
                RoomName::new("Friday buzzer".to_string()).unwrap(),
                RoomBlueprint::Buzzer,
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(room.kind(), RoomKind::Buzzer);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert!(room.get_participant(&host_id).is_some());
        assert_eq!(rooms.get_room_by_pin(&room.pin).await.unwrap().id, room.id);
    }

    #[tokio::test]
    async fn test_create_quiz_room_saves_questions() {
        // テスト項目: クイズルームの問題はクイズストアに保存される
        // given (前提条件):
        let (_rooms, quiz, usecase) = setup();
        let (host_id, host_name) = host();

        // when (操作):
        let room = usecase
            .execute(
                host_id,
                host_name,
                RoomName::new("Trivia".to_string()).unwrap(),
                RoomBlueprint::Quiz {
                    questions: vec![question("one"), question("two")],
                },
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(room.quiz_progress().unwrap().question_count, 2);
        assert!(room.participants.is_empty());
        assert_eq!(quiz.question_count(&room.id).await, 2);
    }

    #[tokio::test]
    async fn test_create_quiz_without_questions_fails() {
        // テスト項目: 問題のないクイズは作成できない
        let (rooms, _quiz, usecase) = setup();
        let (host_id, host_name) = host();

        let result = usecase
            .execute(
                host_id,
                host_name,
                RoomName::new("Empty".to_string()).unwrap(),
                RoomBlueprint::Quiz { questions: vec![] },
            )
            .await;

        assert_eq!(result, Err(UseCaseError::NoQuestions));
        assert_eq!(rooms.count_rooms().await, 0);
    }
}
