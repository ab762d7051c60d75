//! InMemory quiz record store.
//!
//! Stands in for the external database that owns quiz questions, joined
//! participants, answers and cumulative scores.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    AnswerRecord, DisplayName, ParticipantId, QuizRecordError, QuizRecordStore, Question, RoomId,
    ScoreEntry, Timestamp, rank_scores,
};

#[derive(Default)]
struct QuizRecords {
    questions: Vec<Question>,
    /// Join order is preserved for ties in display
    participants: Vec<ScoreEntry>,
    answers: Vec<AnswerRecord>,
}

#[derive(Default)]
pub struct InMemoryQuizRecordStore {
    records: Mutex<HashMap<RoomId, QuizRecords>>,
}

impl InMemoryQuizRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every answer recorded for a room, oldest first
    #[cfg(test)]
    pub async fn answers(&self, room_id: &RoomId) -> Vec<AnswerRecord> {
        let records = self.records.lock().await;
        records
            .get(room_id)
            .map(|r| r.answers.clone())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub async fn question_count(&self, room_id: &RoomId) -> usize {
        let records = self.records.lock().await;
        records.get(room_id).map_or(0, |r| r.questions.len())
    }
}

#[async_trait]
impl QuizRecordStore for InMemoryQuizRecordStore {
    async fn save_questions(&self, room_id: &RoomId, questions: Vec<Question>) {
        let mut records = self.records.lock().await;
        records.entry(room_id.clone()).or_default().questions = questions;
    }

    async fn question(&self, room_id: &RoomId, index: usize) -> Result<Question, QuizRecordError> {
        let records = self.records.lock().await;
        let quiz = records
            .get(room_id)
            .ok_or_else(|| QuizRecordError::RoomNotFound(room_id.clone()))?;
        quiz.questions
            .get(index)
            .cloned()
            .ok_or(QuizRecordError::QuestionNotFound { index })
    }

    async fn upsert_participant(
        &self,
        room_id: &RoomId,
        participant_id: ParticipantId,
        display_name: DisplayName,
    ) -> Result<ScoreEntry, QuizRecordError> {
        let mut records = self.records.lock().await;
        let quiz = records
            .get_mut(room_id)
            .ok_or_else(|| QuizRecordError::RoomNotFound(room_id.clone()))?;

        if let Some(existing) = quiz
            .participants
            .iter_mut()
            .find(|p| p.participant_id == participant_id)
        {
            existing.display_name = display_name;
            return Ok(existing.clone());
        }

        let entry = ScoreEntry {
            participant_id,
            display_name,
            score: 0,
            answers: 0,
            joined_at: Timestamp::now(),
        };
        quiz.participants.push(entry.clone());
        Ok(entry)
    }

    async fn participant(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<ScoreEntry, QuizRecordError> {
        let records = self.records.lock().await;
        let quiz = records
            .get(room_id)
            .ok_or_else(|| QuizRecordError::RoomNotFound(room_id.clone()))?;
        quiz.participants
            .iter()
            .find(|p| &p.participant_id == participant_id)
            .cloned()
            .ok_or_else(|| QuizRecordError::ParticipantNotFound(participant_id.to_string()))
    }

    async fn record_answer(
        &self,
        room_id: &RoomId,
        record: AnswerRecord,
    ) -> Result<ScoreEntry, QuizRecordError> {
        let mut records = self.records.lock().await;
        let quiz = records
            .get_mut(room_id)
            .ok_or_else(|| QuizRecordError::RoomNotFound(room_id.clone()))?;

        if quiz.answers.iter().any(|a| {
            a.participant_id == record.participant_id && a.question_index == record.question_index
        }) {
            return Err(QuizRecordError::AlreadyAnswered {
                participant_id: record.participant_id.to_string(),
                question_index: record.question_index,
            });
        }

        let entry = quiz
            .participants
            .iter_mut()
            .find(|p| p.participant_id == record.participant_id)
            .ok_or_else(|| {
                QuizRecordError::ParticipantNotFound(record.participant_id.to_string())
            })?;
        entry.score = entry.score.saturating_add(record.points_earned);
        entry.answers += 1;
        let updated = entry.clone();

        quiz.answers.push(record);
        Ok(updated)
    }

    async fn leaderboard(&self, room_id: &RoomId) -> Vec<ScoreEntry> {
        let records = self.records.lock().await;
        let mut entries = records
            .get(room_id)
            .map(|r| r.participants.clone())
            .unwrap_or_default();
        rank_scores(&mut entries);
        entries
    }

    async fn remove_room(&self, room_id: &RoomId) {
        self.records.lock().await.remove(room_id);
    }
}
