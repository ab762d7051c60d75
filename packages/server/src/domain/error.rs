//! Domain layer error definitions.

use thiserror::Error;

use super::{entity::RoomStatus, value_object::RoomId};

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("ParticipantId cannot be empty")]
    ParticipantIdEmpty,

    #[error("ParticipantId cannot exceed {max} characters (got {actual})")]
    ParticipantIdTooLong { max: usize, actual: usize },

    #[error("RoomId cannot be empty")]
    RoomIdEmpty,

    /// RoomId invalid format error (not a valid UUID format)
    #[error("RoomId must be a valid UUID format (got: {0})")]
    RoomIdInvalidFormat(String),

    #[error("Room pin must be exactly 6 digits (got: {0})")]
    RoomPinInvalidFormat(String),

    #[error("Room name cannot be empty")]
    RoomNameEmpty,

    #[error("Room name cannot exceed {max} characters (got {actual})")]
    RoomNameTooLong { max: usize, actual: usize },

    #[error("Display name cannot be empty")]
    DisplayNameEmpty,

    #[error("Display name cannot exceed {max} characters (got {actual})")]
    DisplayNameTooLong { max: usize, actual: usize },

    #[error("Answer cannot be empty")]
    AnswerEmpty,

    #[error("Answer cannot exceed {max} characters (got {actual})")]
    AnswerTooLong { max: usize, actual: usize },

    #[error("Question text cannot be empty")]
    QuestionTextEmpty,

    #[error("Correct answer '{0}' is not one of the question options")]
    CorrectAnswerNotInOptions(String),

    #[error("Time limit must be between 1 and {max} seconds (got {actual})")]
    TimeLimitOutOfRange { max: u32, actual: u32 },

    #[error("Question points cannot exceed {max} (got {actual})")]
    PointsTooHigh { max: u32, actual: u32 },
}

/// Errors returned by Room Store mutations.
///
/// Distinguishes a missing room from a room whose current state forbids the
/// mutation so callers can pick the rejection message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("Participant {participant_id} is not in room {room_id}")]
    ParticipantNotFound {
        room_id: RoomId,
        participant_id: String,
    },

    #[error("Room is {status}: {reason}")]
    InvalidState {
        status: RoomStatus,
        reason: &'static str,
    },

    #[error("Could not allocate a unique room pin after {attempts} attempts")]
    PinExhausted { attempts: usize },
}

/// Errors raised by the quiz record store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuizRecordError {
    #[error("No quiz records for room {0}")]
    RoomNotFound(RoomId),

    #[error("Question {index} does not exist")]
    QuestionNotFound { index: usize },

    #[error("Participant {0} has not joined this quiz")]
    ParticipantNotFound(String),

    #[error("Participant {participant_id} already answered question {question_index}")]
    AlreadyAnswered {
        participant_id: String,
        question_index: usize,
    },
}
