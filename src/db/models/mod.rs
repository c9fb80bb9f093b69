//! Database request/response models, kept separate from the API DTOs.

pub mod events;
pub mod registrations;
pub mod sessions;
pub mod users;
