//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{
    QuizRecordError, RoomId, RoomKind, RoomPin, RoomStatus, StoreError, ValueObjectError,
};

/// Rejection category, used by the UI layer to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    State,
    Unavailable,
}

/// Errors returned by every use case.
///
/// Each is a rejection of one request, reported to the caller only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UseCaseError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("No room uses pin {0}")]
    PinNotFound(RoomPin),

    #[error("Only the room host may {action}")]
    NotHost { action: &'static str },

    #[error("Join the room first")]
    NotJoined,

    #[error("Room is not accepting joins (status: {0})")]
    NotAcceptingJoins(RoomStatus),

    #[error("This operation needs a {expected:?} room")]
    WrongRoomKind { expected: RoomKind },

    #[error("Invalid room state: {0}")]
    InvalidState(String),

    #[error("Question {0} does not exist")]
    QuestionNotFound(usize),

    #[error("Question {0} is not open for answers")]
    QuestionNotOpen(usize),

    #[error("Question {0} was already answered")]
    AlreadyAnswered(usize),

    #[error("A quiz needs at least one question")]
    NoQuestions,

    #[error(transparent)]
    Validation(#[from] ValueObjectError),

    #[error("Could not allocate a room pin, try again")]
    PinExhausted,
}

impl UseCaseError {
    /// Stable machine-readable code sent in error replies
    pub fn code(&self) -> &'static str {
        match self {
            UseCaseError::RoomNotFound(_) => "room_not_found",
            UseCaseError::PinNotFound(_) => "pin_not_found",
            UseCaseError::NotHost { .. } => "not_host",
            UseCaseError::NotJoined => "not_joined",
            UseCaseError::NotAcceptingJoins(_) => "room_not_accepting_joins",
            UseCaseError::WrongRoomKind { .. } => "wrong_room_kind",
            UseCaseError::InvalidState(_) => "invalid_state",
            UseCaseError::QuestionNotFound(_) => "question_not_found",
            UseCaseError::QuestionNotOpen(_) => "question_not_open",
            UseCaseError::AlreadyAnswered(_) => "already_answered",
            UseCaseError::NoQuestions => "no_questions",
            UseCaseError::Validation(_) => "validation_error",
            UseCaseError::PinExhausted => "pin_exhausted",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            UseCaseError::Validation(_) | UseCaseError::NoQuestions => ErrorKind::Validation,
            UseCaseError::NotHost { .. } => ErrorKind::Authorization,
            UseCaseError::RoomNotFound(_)
            | UseCaseError::PinNotFound(_)
            | UseCaseError::QuestionNotFound(_) => ErrorKind::NotFound,
            UseCaseError::NotJoined
            | UseCaseError::NotAcceptingJoins(_)
            | UseCaseError::WrongRoomKind { .. }
            | UseCaseError::InvalidState(_)
            | UseCaseError::QuestionNotOpen(_)
            | UseCaseError::AlreadyAnswered(_) => ErrorKind::State,
            UseCaseError::PinExhausted => ErrorKind::Unavailable,
        }
    }
}

impl From<StoreError> for UseCaseError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RoomNotFound(room_id) => UseCaseError::RoomNotFound(room_id),
            StoreError::ParticipantNotFound { .. } => UseCaseError::NotJoined,
            StoreError::InvalidState { .. } => UseCaseError::InvalidState(error.to_string()),
            StoreError::PinExhausted { .. } => UseCaseError::PinExhausted,
        }
    }
}

impl From<QuizRecordError> for UseCaseError {
    fn from(error: QuizRecordError) -> Self {
        match error {
            QuizRecordError::RoomNotFound(room_id) => UseCaseError::RoomNotFound(room_id),
            QuizRecordError::QuestionNotFound { index } => UseCaseError::QuestionNotFound(index),
            QuizRecordError::ParticipantNotFound(_) => UseCaseError::NotJoined,
            QuizRecordError::AlreadyAnswered { question_index, .. } => {
                UseCaseError::AlreadyAnswered(question_index)
            }
        }
    }
}
