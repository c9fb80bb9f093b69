//! Common type definitions shared across the crate.
//!
//! All entity identifiers are numeric (`BIGSERIAL` in Postgres), wrapped in
//! type aliases for readability at call sites:
//!
//! - [`UserId`]: user account identifier
//! - [`SessionId`]: login session identifier
//! - [`EventId`]: event identifier
//! - [`RegistrationId`]: event registration identifier
//!
//! Roles are free-form strings stored per user; [`ADMIN_ROLE`] is the one
//! role with platform-wide override semantics.

pub type UserId = i64;
pub type SessionId = i64;
pub type EventId = i64;
pub type RegistrationId = i64;

/// The administrative role. Users carrying this role bypass ownership checks
/// and may execute role-restricted operations.
pub const ADMIN_ROLE: &str = "admin";
