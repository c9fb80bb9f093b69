//! Data access layer: one repository per table.

pub mod events;
pub mod registrations;
pub mod repository;
pub mod sessions;
pub mod users;
