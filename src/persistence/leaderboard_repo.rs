//! Guess leaderboard repository for `SQLite` persistence.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;

use crate::game::Leaderboard;
use crate::models::leaderboard::LeaderboardEntry;
use crate::{AppError, Result};

use super::db::Database;

/// Repository for per-user guess scores.
#[derive(Clone)]
pub struct LeaderboardRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct LeaderboardRow {
    user_id: String,
    score: i64,
    updated_at: String,
}

impl LeaderboardRow {
    fn into_entry(self) -> Result<LeaderboardEntry> {
        let updated_at = chrono::DateTime::parse_from_rfc3339(&self.updated_at)
            .map_err(|e| AppError::Db(format!("invalid updated_at: {e}")))?
            .with_timezone(&Utc);
        Ok(LeaderboardEntry {
            user_id: self.user_id,
            score: self.score,
            updated_at,
        })
    }
}

impl LeaderboardRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Add one point to `user_id`, creating the row on first win.
    ///
    /// Returns the new score.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the upsert fails.
    pub async fn increment(&self, user_id: &str) -> Result<i64> {
        let (score,): (i64,) = sqlx::query_as(
            "INSERT INTO guess_leaderboard (user_id, score, updated_at) VALUES (?1, 1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                score = score + 1,
                updated_at = excluded.updated_at
             RETURNING score",
        )
        .bind(user_id)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(self.db.as_ref())
        .await?;
        Ok(score)
    }

    /// Current score of `user_id`, zero if they never won.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn score_of(&self, user_id: &str) -> Result<i64> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT score FROM guess_leaderboard WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(self.db.as_ref())
                .await?;
        Ok(row.map_or(0, |(score,)| score))
    }

    /// Highest scores first; ties go to whoever reached the score earlier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn top(&self, limit: u32) -> Result<Vec<LeaderboardEntry>> {
        let rows: Vec<LeaderboardRow> = sqlx::query_as(
            "SELECT user_id, score, updated_at FROM guess_leaderboard
             ORDER BY score DESC, updated_at ASC
             LIMIT ?1",
        )
        .bind(i64::from(limit))
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(LeaderboardRow::into_entry).collect()
    }

    /// Delete every score. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn reset(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM guess_leaderboard")
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected())
    }
}

impl Leaderboard for LeaderboardRepo {
    fn record_win<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move { self.increment(user_id).await.map(|_| ()) })
    }
}
