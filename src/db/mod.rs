//! Database layer: error categorization, repositories, and the DB-facing models.

pub mod errors;
pub mod handlers;
pub mod models;
