//! Guess leaderboard model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One player's tally of correctly guessed songs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Slack user ID.
    pub user_id: String,
    /// Number of rounds won.
    pub score: i64,
    /// Time of the last increment.
    pub updated_at: DateTime<Utc>,
}
