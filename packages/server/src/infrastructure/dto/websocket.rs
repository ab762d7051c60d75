//! Push-channel message DTOs.
//!
//! Inbound commands and outbound events share the envelope
//! `{ "type": ..., "roomId": ..., "data": ... }`. WebSocket connections use
//! both directions; SSE streams carry the outbound events only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DisplayName, Question, RoomId, RoomStatus, ScoreEntry, ValueObjectError};

use super::http::RoomDetailDto;

/// Inbound command names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    JoinRoom,
    LeaveRoom,
    Buzz,
    StatusChange,
    ResetRoom,
    QuestionStart,
    QuestionEnd,
}

/// Raw inbound envelope before the payload is checked
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    pub r#type: CommandType,
    pub room_id: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRoomData {
    display_name: String,
}

fn default_buzzed() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct BuzzData {
    #[serde(default = "default_buzzed")]
    buzzed: bool,
}

#[derive(Debug, Deserialize)]
struct StatusChangeData {
    status: RoomStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionStartData {
    question_index: usize,
    time_limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionEndData {
    question_index: usize,
}

/// A validated inbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    JoinRoom {
        room_id: RoomId,
        display_name: DisplayName,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    Buzz {
        room_id: RoomId,
        buzzed: bool,
    },
    StatusChange {
        room_id: RoomId,
        status: RoomStatus,
    },
    ResetRoom {
        room_id: RoomId,
    },
    QuestionStart {
        room_id: RoomId,
        question_index: usize,
        time_limit: Option<u32>,
    },
    QuestionEnd {
        room_id: RoomId,
        question_index: usize,
    },
}

impl InboundCommand {
    pub fn room_id(&self) -> &RoomId {
        match self {
            InboundCommand::JoinRoom { room_id, .. }
            | InboundCommand::LeaveRoom { room_id }
            | InboundCommand::Buzz { room_id, .. }
            | InboundCommand::StatusChange { room_id, .. }
            | InboundCommand::ResetRoom { room_id }
            | InboundCommand::QuestionStart { room_id, .. }
            | InboundCommand::QuestionEnd { room_id, .. } => room_id,
        }
    }
}

/// Why an inbound message could not be turned into a command
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidField(#[from] ValueObjectError),
}

fn payload<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T, ProtocolError> {
    // a missing `data` field means "no arguments"
    let data = if data.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        data
    };
    Ok(serde_json::from_value(data)?)
}

impl ClientMessage {
    /// Parse and validate one text frame.
    pub fn parse(text: &str) -> Result<InboundCommand, ProtocolError> {
        let message: ClientMessage = serde_json::from_str(text)?;
        let room_id = RoomId::new(message.room_id)?;

        let command = match message.r#type {
            CommandType::JoinRoom => {
                let data: JoinRoomData = payload(message.data)?;
                InboundCommand::JoinRoom {
                    room_id,
                    display_name: DisplayName::new(data.display_name)?,
                }
            }
            CommandType::LeaveRoom => InboundCommand::LeaveRoom { room_id },
            CommandType::Buzz => {
                let data: BuzzData = payload(message.data)?;
                InboundCommand::Buzz {
                    room_id,
                    buzzed: data.buzzed,
                }
            }
            CommandType::StatusChange => {
                let data: StatusChangeData = payload(message.data)?;
                InboundCommand::StatusChange {
                    room_id,
                    status: data.status,
                }
            }
            CommandType::ResetRoom => InboundCommand::ResetRoom { room_id },
            CommandType::QuestionStart => {
                let data: QuestionStartData = payload(message.data)?;
                InboundCommand::QuestionStart {
                    room_id,
                    question_index: data.question_index,
                    time_limit: data.time_limit,
                }
            }
            CommandType::QuestionEnd => {
                let data: QuestionEndData = payload(message.data)?;
                InboundCommand::QuestionEnd {
                    room_id,
                    question_index: data.question_index,
                }
            }
        };
        Ok(command)
    }
}

/// Question as pushed to clients.
///
/// `correct_answer` is only filled in for host connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub text: String,
    pub options: Vec<String>,
    pub points: u32,
    pub time_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl QuestionView {
    /// Participant-safe view without the answer
    pub fn for_participants(question: &Question, time_limit: u32) -> Self {
        Self {
            text: question.text.clone(),
            options: question.options.clone(),
            points: question.points,
            time_limit,
            correct_answer: None,
        }
    }

    pub fn for_hosts(question: &Question, time_limit: u32) -> Self {
        Self {
            correct_answer: Some(question.correct_answer.clone()),
            ..Self::for_participants(question, time_limit)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDto {
    pub participant_id: String,
    pub display_name: String,
    pub score: u32,
    pub answers: usize,
}

impl From<&ScoreEntry> for ScoreDto {
    fn from(entry: &ScoreEntry) -> Self {
        Self {
            participant_id: entry.participant_id.to_string(),
            display_name: entry.display_name.to_string(),
            score: entry.score,
            answers: entry.answers,
        }
    }
}

/// Outbound event body, tagged by `type` with its fields under `data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    #[serde(rename_all = "camelCase")]
    RoomUpdate {
        room: RoomDetailDto,
        participant_count: usize,
    },
    StatusChange {
        status: RoomStatus,
    },
    #[serde(rename_all = "camelCase")]
    QuestionStart {
        question_index: usize,
        question: QuestionView,
        time_limit: u32,
    },
    #[serde(rename_all = "camelCase")]
    QuestionEnd {
        question_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    AnswerSubmitted {
        participant_id: String,
        display_name: String,
        answer: String,
        is_correct: bool,
        points_earned: u32,
        time_taken_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    ParticipantJoined {
        participant_id: String,
        display_name: String,
    },
    #[serde(rename_all = "camelCase")]
    ParticipantLeft {
        participant_id: String,
        display_name: String,
    },
    ScoreUpdate {
        participants: Vec<ScoreDto>,
    },
    #[serde(rename_all = "camelCase")]
    Buzz {
        participant_id: String,
        display_name: String,
        buzzed: bool,
        order: Option<u32>,
    },
    ResetRoom,
    RoomDeleted,
    /// Sent to the originating connection only
    Error {
        code: &'static str,
        message: String,
    },
}

impl EventPayload {
    /// Wire name of the event, also used as the SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::RoomUpdate { .. } => "room_update",
            EventPayload::StatusChange { .. } => "status_change",
            EventPayload::QuestionStart { .. } => "question_start",
            EventPayload::QuestionEnd { .. } => "question_end",
            EventPayload::AnswerSubmitted { .. } => "answer_submitted",
            EventPayload::ParticipantJoined { .. } => "participant_joined",
            EventPayload::ParticipantLeft { .. } => "participant_left",
            EventPayload::ScoreUpdate { .. } => "score_update",
            EventPayload::Buzz { .. } => "buzz",
            EventPayload::ResetRoom => "reset_room",
            EventPayload::RoomDeleted => "room_deleted",
            EventPayload::Error { .. } => "error",
        }
    }
}

/// One outbound event for a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEvent {
    pub room_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl ServerEvent {
    pub fn new(room_id: &RoomId, payload: EventPayload) -> Self {
        Self {
            room_id: room_id.to_string(),
            payload,
        }
    }

    /// Error reply for a message whose room could not be determined
    pub fn error(room_id: Option<&RoomId>, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            room_id: room_id.map(ToString::to_string).unwrap_or_default(),
            payload: EventPayload::Error {
                code,
                message: message.into(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: &str = "2f1b6f5e-9a8e-4c57-9f0e-3d2f4c1b7a10";

    #[test]
    fn test_parse_join_room() {
        // テスト項目: join_room コマンドを解析できる
        // given (前提条件):
        let text = format!(
            r#"{{"type":"join_room","roomId":"{ROOM}","data":{{"displayName":" Alice "}}}}"#
        );

        // when (操作):
        let command = ClientMessage::parse(&text).unwrap();

        // then (期待する結果):
        assert_eq!(
            command,
            InboundCommand::JoinRoom {
                room_id: RoomId::new(ROOM.to_string()).unwrap(),
                display_name: DisplayName::new("Alice".to_string()).unwrap(),
            }
        );
    }

    #[test]
    fn test_parse_buzz_without_data_defaults_to_buzzed() {
        // テスト項目: data のない buzz は buzzed=true として扱う
        let text = format!(r#"{{"type":"buzz","roomId":"{ROOM}"}}"#);

        let command = ClientMessage::parse(&text).unwrap();

        assert!(matches!(command, InboundCommand::Buzz { buzzed: true, .. }));
    }

    #[test]
    fn test_parse_status_change() {
        // テスト項目: status_change のステータスを解析できる
        let text =
            format!(r#"{{"type":"status_change","roomId":"{ROOM}","data":{{"status":"active"}}}}"#);

        let command = ClientMessage::parse(&text).unwrap();

        assert!(matches!(
            command,
            InboundCommand::StatusChange {
                status: RoomStatus::Active,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_messages() {
        // テスト項目: 不正なメッセージはエラーになる
        let unknown_type = format!(r#"{{"type":"dance","roomId":"{ROOM}"}}"#);
        let bad_room = r#"{"type":"leave_room","roomId":"default"}"#;
        let missing_field = format!(r#"{{"type":"question_end","roomId":"{ROOM}","data":{{}}}}"#);

        assert!(matches!(
            ClientMessage::parse("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::parse(&unknown_type),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::parse(bad_room),
            Err(ProtocolError::InvalidField(_))
        ));
        assert!(matches!(
            ClientMessage::parse(&missing_field),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_server_event_envelope() {
        // テスト項目: 送信イベントは { type, roomId, data } の形になる
        // given (前提条件):
        let room_id = RoomId::new(ROOM.to_string()).unwrap();
        let event = ServerEvent::new(
            &room_id,
            EventPayload::Buzz {
                participant_id: "alice".to_string(),
                display_name: "Alice".to_string(),
                buzzed: true,
                order: Some(0),
            },
        );

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "buzz");
        assert_eq!(value["roomId"], ROOM);
        assert_eq!(value["data"]["displayName"], "Alice");
        assert_eq!(value["data"]["order"], 0);
    }

    #[test]
    fn test_participant_question_view_hides_answer() {
        // テスト項目: 参加者向けの問題には正解が含まれない
        let question = Question::new(
            "Capital of France?".to_string(),
            vec!["Paris".to_string(), "Lyon".to_string()],
            "Paris".to_string(),
            100,
            30,
        )
        .unwrap();

        let participant =
            serde_json::to_value(QuestionView::for_participants(&question, 30)).unwrap();
        let host = serde_json::to_value(QuestionView::for_hosts(&question, 30)).unwrap();

        assert!(participant.get("correctAnswer").is_none());
        assert_eq!(host["correctAnswer"], "Paris");
    }
}
