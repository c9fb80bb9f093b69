//! API request/response models, separate from the DB-facing types.

pub mod auth;
pub mod events;
pub mod pagination;
pub mod registrations;
pub mod users;
