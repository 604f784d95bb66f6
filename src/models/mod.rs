//! Domain model module declarations.

pub mod account;
pub mod guess;
pub mod leaderboard;
pub mod song;
