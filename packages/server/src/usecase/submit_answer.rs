//! UseCase: 回答送信
//!
//! 回答は開いている問題に対してのみ受け付け、参加者ごと・問題ごとに一度だけ記録する。
//! 回答内容と正誤はホストにだけ配信し、全員には更新後のスコアを配信する。

use std::sync::Arc;

use crate::{
    domain::{
        AnswerRecord, AnswerText, ParticipantId, QuizRecordStore, RoomId, RoomKind,
        RoomRepository, RoomStatus, ScoreEntry, Timestamp,
    },
    infrastructure::{
        Audience, Broadcaster,
        dto::websocket::{EventPayload, ScoreDto, ServerEvent},
    },
};

use super::error::UseCaseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub is_correct: bool,
    pub points_earned: u32,
    pub score: ScoreEntry,
}

pub struct SubmitAnswerUseCase {
    rooms: Arc<dyn RoomRepository>,
    quiz: Arc<dyn QuizRecordStore>,
    broadcaster: Broadcaster,
}

impl SubmitAnswerUseCase {
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

    /// 回答を採点して記録する
    ///
    /// `time_taken_ms` が無ければ問題の開始時刻からの経過時間を使う。
    ///
    /// # Returns
    ///
    /// * `Ok(AnswerResult)` - 正誤、獲得点、更新後の累計スコア
    /// * `Err(UseCaseError::QuestionNotOpen)` - その問題が開いていない
    /// * `Err(UseCaseError::AlreadyAnswered)` - 同じ問題に回答済み
    pub async fn execute(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
        question_index: usize,
        answer: AnswerText,
        time_taken_ms: Option<u64>,
    ) -> Result<AnswerResult, UseCaseError> {
        let room = self
            .rooms
            .get_room(room_id)
            .await
            .ok_or_else(|| UseCaseError::RoomNotFound(room_id.clone()))?;
        if room.kind() != RoomKind::Quiz {
            return Err(UseCaseError::WrongRoomKind {
                expected: RoomKind::Quiz,
            });
        }
        let active = room
            .quiz_progress()
            .and_then(|p| p.active_question.clone())
            .filter(|q| room.status == RoomStatus::Active && q.index == question_index)
            .ok_or(UseCaseError::QuestionNotOpen(question_index))?;

        let participant = self.quiz.participant(room_id, participant_id).await?;
        let question = self.quiz.question(room_id, question_index).await?;

        let answered_at = Timestamp::now();
        let time_taken_ms = time_taken_ms.unwrap_or_else(|| {
            u64::try_from(answered_at.value() - active.started_at.value()).unwrap_or(0)
        });
        let (is_correct, points_earned) =
            question.score(&answer, time_taken_ms, active.time_limit_secs);

        let score = self
            .quiz
            .record_answer(
                room_id,
                AnswerRecord {
                    participant_id: participant_id.clone(),
                    question_index,
                    answer: answer.clone(),
                    is_correct,
                    points_earned,
                    time_taken_ms,
                    answered_at,
                },
            )
            .await?;

        tracing::info!(
            room_id = %room_id,
            participant_id = %participant_id,
            question_index,
            is_correct,
            points_earned,
            "Answer recorded"
        );

        let submitted = ServerEvent::new(
            room_id,
            EventPayload::AnswerSubmitted {
                participant_id: participant_id.to_string(),
                display_name: participant.display_name.to_string(),
                answer: answer.as_str().to_string(),
                is_correct,
                points_earned,
                time_taken_ms,
            },
        );
        self.broadcaster
            .broadcast_to(room_id, Audience::Hosts, &submitted)
            .await;

        let participants = self
            .quiz
            .leaderboard(room_id)
            .await
            .iter()
            .map(ScoreDto::from)
            .collect();
        self.broadcaster
            .broadcast(
                room_id,
                &ServerEvent::new(room_id, EventPayload::ScoreUpdate { participants }),
            )
            .await;

        Ok(AnswerResult {
            is_correct,
            points_earned,
            score,
        })
    }
}
