//! HTTP API request and response DTOs.

use hiroba_shared::time::timestamp_to_jst_rfc3339;
use serde::{Deserialize, Serialize};

use crate::domain::{Participant, QuizProgress, Room, RoomKind, RoomStatus};

/// Room summary for list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub pin: String,
    pub name: String,
    pub kind: RoomKind,
    pub status: RoomStatus,
    pub participant_count: usize,
    pub created_at: String, // ISO 8601
}

impl From<&Room> for RoomSummaryDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.to_string(),
            pin: room.pin.to_string(),
            name: room.name.to_string(),
            kind: room.kind(),
            status: room.status,
            participant_count: room.participants.len(),
            created_at: timestamp_to_jst_rfc3339(room.created_at.value()),
        }
    }
}

/// Full room snapshot, used by the detail endpoint and `room_update` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: String,
    pub pin: String,
    pub name: String,
    pub kind: RoomKind,
    pub host_id: String,
    pub status: RoomStatus,
    pub participants: Vec<ParticipantDetailDto>,
    /// Participant IDs that buzzed, earliest first
    #[serde(default)]
    pub buzz_queue: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<QuizProgressDto>,
    pub created_at: String, // ISO 8601
}

impl From<&Room> for RoomDetailDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.to_string(),
            pin: room.pin.to_string(),
            name: room.name.to_string(),
            kind: room.kind(),
            host_id: room.host_id.to_string(),
            status: room.status,
            participants: room.participants.iter().map(Into::into).collect(),
            buzz_queue: room.buzz_queue().iter().map(|p| p.id.to_string()).collect(),
            quiz: room.quiz_progress().map(Into::into),
            created_at: timestamp_to_jst_rfc3339(room.created_at.value()),
        }
    }
}

/// Participant detail for room detail endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetailDto {
    pub participant_id: String,
    pub display_name: String,
    pub buzzed: bool,
    pub order: Option<u32>,
    pub joined_at: String, // ISO 8601
}

impl From<&Participant> for ParticipantDetailDto {
    fn from(participant: &Participant) -> Self {
        Self {
            participant_id: participant.id.to_string(),
            display_name: participant.display_name.to_string(),
            buzzed: participant.buzzed(),
            order: participant.buzz_order,
            joined_at: timestamp_to_jst_rfc3339(participant.joined_at.value()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizProgressDto {
    pub question_count: usize,
    pub current_question_index: usize,
    pub active_question_index: Option<usize>,
    pub active_time_limit: Option<u32>,
}

impl From<&QuizProgress> for QuizProgressDto {
    fn from(progress: &QuizProgress) -> Self {
        Self {
            question_count: progress.question_count,
            current_question_index: progress.current_question_index,
            active_question_index: progress.active_question.as_ref().map(|q| q.index),
            active_time_limit: progress.active_question.as_ref().map(|q| q.time_limit_secs),
        }
    }
}

/// Room detail plus the number of live connections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateDto {
    #[serde(flatten)]
    pub room: RoomDetailDto,
    pub connection_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default = "default_points")]
    pub points: u32,
    pub time_limit: Option<u32>,
}

fn default_points() -> u32 {
    1000
}

/// `POST /api/rooms`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub kind: RoomKind,
    pub name: String,
    pub host_display_name: String,
    #[serde(default)]
    pub questions: Vec<QuestionDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: RoomStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuestionRequest {
    pub question_index: usize,
    pub time_limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndQuestionRequest {
    pub question_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceResponse {
    pub advanced: bool,
    pub current_question_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub question_index: usize,
    pub answer: String,
    pub time_taken_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResultDto {
    pub is_correct: bool,
    pub points_earned: u32,
    pub total_score: u32,
}

/// Rejection body for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
