//! Authentication and authorization.
//!
//! - [`password`]: Argon2 hashing and verification
//! - [`session`]: login, token validation, logout
//! - [`identity`]: the authenticated-caller extractor
//! - [`guard`]: role requirements and the ownership predicate

pub mod guard;
pub mod identity;
pub mod password;
pub mod session;
