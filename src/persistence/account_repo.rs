//! Account link repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::Utc;

use crate::models::account::AccountLink;
use crate::{AppError, Result};

use super::db::Database;

/// Repository for Slack user → game-service cookie links.
#[derive(Clone)]
pub struct AccountRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct AccountRow {
    user_id: String,
    clal: String,
    linked_at: String,
}

impl AccountRow {
    fn into_link(self) -> Result<AccountLink> {
        let linked_at = chrono::DateTime::parse_from_rfc3339(&self.linked_at)
            .map_err(|e| AppError::Db(format!("invalid linked_at: {e}")))?
            .with_timezone(&Utc);
        Ok(AccountLink {
            user_id: self.user_id,
            clal: self.clal,
            linked_at,
        })
    }
}

impl AccountRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a link, replacing any previous cookie for the same user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn upsert(&self, link: &AccountLink) -> Result<()> {
        sqlx::query(
            "INSERT INTO account_link (user_id, clal, linked_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                clal = excluded.clal,
                linked_at = excluded.linked_at",
        )
        .bind(&link.user_id)
        .bind(&link.clal)
        .bind(link.linked_at.to_rfc3339())
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Fetch the link for `user_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get(&self, user_id: &str) -> Result<Option<AccountLink>> {
        let row: Option<AccountRow> = sqlx::query_as(
            "SELECT user_id, clal, linked_at FROM account_link WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(self.db.as_ref())
        .await?;
        row.map(AccountRow::into_link).transpose()
    }

    /// Remove the link for `user_id`. Returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn delete(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM account_link WHERE user_id = ?1")
            .bind(user_id)
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
