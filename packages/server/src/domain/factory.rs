//! Domain factories for creating domain entities and value objects.

use rand::Rng;

use super::{RoomId, RoomPin, error::ValueObjectError};

/// Factory for generating RoomId instances.
///
/// This factory encapsulates the logic for generating new room identifiers,
/// separating the generation concern from the validation logic in RoomId.
pub struct RoomIdFactory;

impl RoomIdFactory {
    /// Generate a new RoomId with a random UUID v4.
    pub fn generate() -> RoomId {
        RoomId::from_uuid(uuid::Uuid::new_v4())
    }
}

/// Factory for random six-digit room pins.
///
/// Uniqueness among active rooms is the Room Store's job; this only draws
/// a candidate.
pub struct RoomPinFactory;

impl RoomPinFactory {
    pub fn generate() -> Result<RoomPin, ValueObjectError> {
        let mut rng = rand::thread_rng();
        RoomPin::from_number(rng.gen_range(0..1_000_000))
    }
}
