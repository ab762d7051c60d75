//! Core domain models for quiz and buzzer rooms.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    error::StoreError,
    value_object::{DisplayName, ParticipantId, RoomId, RoomName, RoomPin, Timestamp},
};

/// Lifecycle of a room. Moves forward only, except for a buzzer reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Active,
    Finished,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Active => "active",
            RoomStatus::Finished => "finished",
        }
    }

    /// Whether `self -> next` is a legal forward transition.
    ///
    /// Staying in the same status is not a transition and is handled by the caller.
    pub fn can_transition_to(&self, next: RoomStatus) -> bool {
        matches!(
            (self, next),
            (RoomStatus::Waiting, RoomStatus::Active)
                | (RoomStatus::Waiting, RoomStatus::Finished)
                | (RoomStatus::Active, RoomStatus::Finished)
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which mini-tool a room belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Buzzer,
    Quiz,
}

/// The question currently open for answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveQuestion {
    pub index: usize,
    pub time_limit_secs: u32,
    pub started_at: Timestamp,
}

/// Quiz-only room state. Scores live in the quiz record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizProgress {
    pub question_count: usize,
    pub current_question_index: usize,
    pub active_question: Option<ActiveQuestion>,
}

impl QuizProgress {
    pub fn new(question_count: usize) -> Self {
        Self {
            question_count,
            current_question_index: 0,
            active_question: None,
        }
    }

    pub fn is_last_question(&self) -> bool {
        self.current_question_index + 1 >= self.question_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomMode {
    Buzzer,
    Quiz(QuizProgress),
}

/// Result of advancing a quiz to its next question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Advanced(usize),
    AtLastQuestion,
}

/// Represents a participant of a buzzer room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: DisplayName,
    pub joined_at: Timestamp,
    /// Arrival rank among buzzed participants; `None` when not buzzed
    pub buzz_order: Option<u32>,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: DisplayName, joined_at: Timestamp) -> Self {
        Self {
            id,
            display_name,
            joined_at,
            buzz_order: None,
        }
    }

    pub fn buzzed(&self) -> bool {
        self.buzz_order.is_some()
    }
}

/// A live quiz or buzzer session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub pin: RoomPin,
    pub name: RoomName,
    pub host_id: ParticipantId,
    pub status: RoomStatus,
    /// Insertion ordered. Always empty for quiz rooms.
    pub participants: Vec<Participant>,
    pub mode: RoomMode,
    pub created_at: Timestamp,
}

impl Room {
    /// Create a buzzer room. The host is its first participant.
    pub fn new_buzzer(
        id: RoomId,
        pin: RoomPin,
        name: RoomName,
        host: Participant,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            pin,
            name,
            host_id: host.id.clone(),
            status: RoomStatus::Waiting,
            participants: vec![host],
            mode: RoomMode::Buzzer,
            created_at,
        }
    }

    /// Create a quiz room with `question_count` questions and no in-memory participants.
    pub fn new_quiz(
        id: RoomId,
        pin: RoomPin,
        name: RoomName,
        host_id: ParticipantId,
        question_count: usize,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            pin,
            name,
            host_id,
            status: RoomStatus::Waiting,
            participants: Vec::new(),
            mode: RoomMode::Quiz(QuizProgress::new(question_count)),
            created_at,
        }
    }

    pub fn kind(&self) -> RoomKind {
        match self.mode {
            RoomMode::Buzzer => RoomKind::Buzzer,
            RoomMode::Quiz(_) => RoomKind::Quiz,
        }
    }

    pub fn is_host(&self, caller: &ParticipantId) -> bool {
        &self.host_id == caller
    }

    pub fn quiz_progress(&self) -> Option<&QuizProgress> {
        match &self.mode {
            RoomMode::Quiz(progress) => Some(progress),
            RoomMode::Buzzer => None,
        }
    }

    fn quiz_progress_mut(&mut self) -> Result<&mut QuizProgress, StoreError> {
        let status = self.status;
        match &mut self.mode {
            RoomMode::Quiz(progress) => Ok(progress),
            RoomMode::Buzzer => Err(StoreError::InvalidState {
                status,
                reason: "not a quiz room",
            }),
        }
    }

    fn require_buzzer(&self) -> Result<(), StoreError> {
        match self.mode {
            RoomMode::Buzzer => Ok(()),
            RoomMode::Quiz(_) => Err(StoreError::InvalidState {
                status: self.status,
                reason: "not a buzzer room",
            }),
        }
    }

    /// Apply a forward status transition. Same-status updates succeed without change.
    pub fn update_status(&mut self, next: RoomStatus) -> Result<(), StoreError> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(StoreError::InvalidState {
                status: self.status,
                reason: "status can only move forward",
            });
        }
        self.status = next;
        if next == RoomStatus::Finished
            && let RoomMode::Quiz(progress) = &mut self.mode
        {
            progress.active_question = None;
        }
        Ok(())
    }

    /// Add a buzzer participant.
    ///
    /// Only a `waiting` room admits new participants. Re-adding a present
    /// participant succeeds with `Ok(false)` regardless of status.
    pub fn add_participant(&mut self, participant: Participant) -> Result<bool, StoreError> {
        self.require_buzzer()?;
        if self.get_participant(&participant.id).is_some() {
            return Ok(false);
        }
        if self.status != RoomStatus::Waiting {
            return Err(StoreError::InvalidState {
                status: self.status,
                reason: "room is not accepting joins",
            });
        }
        self.participants.push(participant);
        Ok(true)
    }

    /// Remove a participant by ID
    pub fn remove_participant(
        &mut self,
        participant_id: &ParticipantId,
    ) -> Result<Participant, StoreError> {
        let position = self
            .participants
            .iter()
            .position(|p| &p.id == participant_id)
            .ok_or_else(|| StoreError::ParticipantNotFound {
                room_id: self.id.clone(),
                participant_id: participant_id.to_string(),
            })?;
        Ok(self.participants.remove(position))
    }

    /// Get a participant by ID
    pub fn get_participant(&self, participant_id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == participant_id)
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Set or clear a participant's buzz. The room must be `active`.
    ///
    /// A new buzz is ranked by the number of participants already buzzed.
    /// A participant who is already buzzed keeps their rank. Clearing a buzz
    /// leaves other ranks untouched.
    pub fn set_buzz(
        &mut self,
        participant_id: &ParticipantId,
        buzzed: bool,
    ) -> Result<Option<u32>, StoreError> {
        self.require_buzzer()?;
        if self.status != RoomStatus::Active {
            return Err(StoreError::InvalidState {
                status: self.status,
                reason: "buzzing is only possible while the room is active",
            });
        }
        let already_buzzed = self.participants.iter().filter(|p| p.buzzed()).count() as u32;
        let room_id = self.id.clone();
        let participant = self
            .participants
            .iter_mut()
            .find(|p| &p.id == participant_id)
            .ok_or_else(|| StoreError::ParticipantNotFound {
                room_id,
                participant_id: participant_id.to_string(),
            })?;

        if !buzzed {
            participant.buzz_order = None;
        } else if participant.buzz_order.is_none() {
            participant.buzz_order = Some(already_buzzed);
        }
        Ok(participant.buzz_order)
    }

    /// Clear every buzz and re-arm the room to `waiting`.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.require_buzzer()?;
        for participant in &mut self.participants {
            participant.buzz_order = None;
        }
        self.status = RoomStatus::Waiting;
        Ok(())
    }

    /// Buzzed participants in arrival order
    pub fn buzz_queue(&self) -> Vec<&Participant> {
        let mut queue: Vec<&Participant> =
            self.participants.iter().filter(|p| p.buzzed()).collect();
        queue.sort_by_key(|p| p.buzz_order);
        queue
    }

    /// Open `index` for answers. Returns `true` when this also activated a waiting room.
    pub fn start_question(
        &mut self,
        index: usize,
        time_limit_secs: u32,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let status = self.status;
        if status == RoomStatus::Finished {
            return Err(StoreError::InvalidState {
                status,
                reason: "quiz is finished",
            });
        }
        let progress = self.quiz_progress_mut()?;
        if index >= progress.question_count {
            return Err(StoreError::InvalidState {
                status,
                reason: "question index is out of range",
            });
        }
        progress.current_question_index = index;
        progress.active_question = Some(ActiveQuestion {
            index,
            time_limit_secs,
            started_at: now,
        });

        let activated = status == RoomStatus::Waiting;
        if activated {
            self.status = RoomStatus::Active;
        }
        Ok(activated)
    }

    /// Close `index`. Fails when that question is not the open one.
    pub fn end_question(&mut self, index: usize) -> Result<ActiveQuestion, StoreError> {
        let status = self.status;
        let progress = self.quiz_progress_mut()?;
        match progress.active_question.take() {
            Some(active) if active.index == index => Ok(active),
            other => {
                progress.active_question = other;
                Err(StoreError::InvalidState {
                    status,
                    reason: "question is not open",
                })
            }
        }
    }

    /// Move to the next question. Refuses at the last question.
    pub fn advance_question(&mut self) -> Result<Advance, StoreError> {
        let status = self.status;
        if status == RoomStatus::Finished {
            return Err(StoreError::InvalidState {
                status,
                reason: "quiz is finished",
            });
        }
        let progress = self.quiz_progress_mut()?;
        if progress.is_last_question() {
            return Ok(Advance::AtLastQuestion);
        }
        progress.current_question_index += 1;
        Ok(Advance::Advanced(progress.current_question_index))
    }

    /// Mark the quiz finished. Terminal.
    pub fn finish_quiz(&mut self) -> Result<(), StoreError> {
        self.quiz_progress_mut()?;
        self.update_status(RoomStatus::Finished)
    }
}
