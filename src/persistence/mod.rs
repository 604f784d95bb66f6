//! Persistence layer modules.

pub mod account_repo;
pub mod db;
pub mod leaderboard_repo;
pub mod schema;
pub mod song_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
