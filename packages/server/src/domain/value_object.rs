//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

const PARTICIPANT_ID_MAX: usize = 100;
const DISPLAY_NAME_MAX: usize = 50;
const ROOM_NAME_MAX: usize = 100;
const ANSWER_TEXT_MAX: usize = 1000;

/// Number of digits in a room pin.
pub const ROOM_PIN_LENGTH: usize = 6;

/// Participant identifier value object.
///
/// The opaque caller identity supplied by the transport. Hosts and
/// participants share this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create a new ParticipantId.
    ///
    /// # Arguments
    ///
    /// * `id` - The caller identity string
    ///
    /// # Returns
    ///
    /// A Result containing the ParticipantId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::ParticipantIdEmpty);
        }
        let len = id.chars().count();
        if len > PARTICIPANT_ID_MAX {
            return Err(ValueObjectError::ParticipantIdTooLong {
                max: PARTICIPANT_ID_MAX,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier value object.
///
/// Always a UUID string. New ids come from [`RoomIdFactory`](super::RoomIdFactory).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    /// Create a RoomId from an existing UUID string (e.g. a path parameter).
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::RoomIdEmpty);
        }
        if uuid::Uuid::parse_str(&id).is_err() {
            return Err(ValueObjectError::RoomIdInvalidFormat(id));
        }
        Ok(Self(id))
    }

    /// Create a RoomId from a UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid.to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Six-digit join code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomPin(String);

impl RoomPin {
    /// Parse a human-entered pin. Surrounding whitespace is ignored.
    pub fn new(pin: String) -> Result<Self, ValueObjectError> {
        let trimmed = pin.trim();
        if trimmed.len() != ROOM_PIN_LENGTH || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValueObjectError::RoomPinInvalidFormat(pin));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Build a pin from a number below 1_000_000, zero padded.
    pub fn from_number(value: u32) -> Result<Self, ValueObjectError> {
        Self::new(format!("{:0width$}", value, width = ROOM_PIN_LENGTH))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomPin {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human readable room title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomName(String);

impl RoomName {
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ValueObjectError::RoomNameEmpty);
        }
        let len = name.chars().count();
        if len > ROOM_NAME_MAX {
            return Err(ValueObjectError::RoomNameTooLong {
                max: ROOM_NAME_MAX,
                actual: len,
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name shown to other people in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ValueObjectError::DisplayNameEmpty);
        }
        let len = name.chars().count();
        if len > DISPLAY_NAME_MAX {
            return Err(ValueObjectError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
                actual: len,
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A submitted quiz answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerText(String);

impl AnswerText {
    pub fn new(answer: String) -> Result<Self, ValueObjectError> {
        if answer.trim().is_empty() {
            return Err(ValueObjectError::AnswerEmpty);
        }
        let len = answer.chars().count();
        if len > ANSWER_TEXT_MAX {
            return Err(ValueObjectError::AnswerTooLong {
                max: ANSWER_TEXT_MAX,
                actual: len,
            });
        }
        Ok(Self(answer))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trimmed, case-insensitive comparison against the expected answer.
    pub fn matches(&self, expected: &str) -> bool {
        self.0.trim().to_lowercase() == expected.trim().to_lowercase()
    }
}

/// Identifier of one live transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds (JST).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp.
    ///
    /// # Arguments
    ///
    /// * `value` - Unix timestamp in milliseconds
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Current time.
    pub fn now() -> Self {
        Self(hiroba_shared::time::get_jst_timestamp())
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_new_success() {
        // テスト項目: 有効な参加者 ID を作成できる
        // given (前提条件):
        let id = "alice".to_string();

        // when (操作):
        let result = ParticipantId::new(id);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "alice");
    }

    #[test]
    fn test_participant_id_new_empty_fails() {
        // テスト項目: 空の参加者 ID は作成できない
        let result = ParticipantId::new(String::new());

        assert_eq!(result.unwrap_err(), ValueObjectError::ParticipantIdEmpty);
    }

    #[test]
    fn test_participant_id_new_too_long_fails() {
        // テスト項目: 101 文字以上の参加者 ID は作成できない
        // given (前提条件):
        let id = "a".repeat(101);

        // when (操作):
        let result = ParticipantId::new(id);

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::ParticipantIdTooLong {
                max: 100,
                actual: 101
            }
        );
    }

    #[test]
    fn test_room_id_requires_uuid() {
        // テスト項目: UUID 形式でないルーム ID は作成できない
        // when (操作):
        let invalid = RoomId::new("default".to_string());
        let valid = RoomId::new("2f1b6f5e-9a8e-4c57-9f0e-3d2f4c1b7a10".to_string());

        // then (期待する結果):
        assert_eq!(
            invalid.unwrap_err(),
            ValueObjectError::RoomIdInvalidFormat("default".to_string())
        );
        assert!(valid.is_ok());
    }

    #[test]
    fn test_room_pin_accepts_six_digits_only() {
        // テスト項目: ピンは 6 桁の数字のみ受け付ける
        assert_eq!(RoomPin::new(" 012345 ".to_string()).unwrap().as_str(), "012345");
        assert!(RoomPin::new("12345".to_string()).is_err());
        assert!(RoomPin::new("1234567".to_string()).is_err());
        assert!(RoomPin::new("12a456".to_string()).is_err());
    }

    #[test]
    fn test_room_pin_from_number_is_zero_padded() {
        // テスト項目: 数値から作るピンはゼロ埋めされる
        let pin = RoomPin::from_number(42).unwrap();

        assert_eq!(pin.as_str(), "000042");
    }

    #[test]
    fn test_display_name_is_trimmed() {
        // テスト項目: 表示名は前後の空白が取り除かれる
        let name = DisplayName::new("  Alice  ".to_string()).unwrap();

        assert_eq!(name.as_str(), "Alice");
        assert_eq!(
            DisplayName::new("   ".to_string()).unwrap_err(),
            ValueObjectError::DisplayNameEmpty
        );
    }

    #[test]
    fn test_answer_text_matches_ignoring_case_and_whitespace() {
        // テスト項目: 回答の比較は大文字小文字と前後の空白を無視する
        let answer = AnswerText::new(" Paris ".to_string()).unwrap();

        assert!(answer.matches("paris"));
        assert!(!answer.matches("London"));
    }

    #[test]
    fn test_timestamp_ordering() {
        // テスト項目: タイムスタンプは順序付けできる
        let ts1 = Timestamp::new(1000);
        let ts2 = Timestamp::new(2000);

        assert!(ts1 < ts2);
    }
}
