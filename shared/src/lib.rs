//! Shared record model, error types, and SQLite store for Fetchkeep.
pub mod db;
pub mod errors;
pub mod models;

pub use sqlx::sqlite::SqlitePool;
