//! Domain layer for the room service.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod connection;
pub mod entity;
pub mod error;
pub mod factory;
pub mod quiz;
pub mod repository;
pub mod value_object;

pub use connection::{Connection, ConnectionTransport, Membership};
pub use entity::{
    ActiveQuestion, Advance, Participant, QuizProgress, Room, RoomKind, RoomMode, RoomStatus,
};
pub use error::{QuizRecordError, StoreError, ValueObjectError};
pub use factory::{RoomIdFactory, RoomPinFactory};
pub use quiz::{AnswerRecord, Question, ScoreEntry, rank_scores};
pub use repository::{
    BuzzOutcome, ConnectionRegistry, NewRoom, NewRoomKind, QuestionStarted, QuizRecordStore,
    RemovalOutcome, RoomRepository,
};
#[cfg(test)]
pub use repository::{MockConnectionRegistry, MockQuizRecordStore, MockRoomRepository};
pub use value_object::{
    AnswerText, ConnectionId, DisplayName, ParticipantId, RoomId, RoomName, RoomPin, Timestamp,
};
