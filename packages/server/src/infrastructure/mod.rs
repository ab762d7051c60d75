//! Infrastructure layer: storage implementations, the broadcast engine and wire DTOs.

pub mod broadcast;
pub mod dto;
pub mod repository;

pub use broadcast::{Audience, BroadcastReport, Broadcaster};
