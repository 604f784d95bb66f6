//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` so the bootstrap
//! can run on every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS song (
    id              TEXT PRIMARY KEY NOT NULL,
    title           TEXT NOT NULL,
    artist          TEXT NOT NULL,
    genre           TEXT NOT NULL,
    jacket          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS song_alias (
    alias           TEXT NOT NULL,
    song_id         TEXT NOT NULL REFERENCES song(id) ON DELETE CASCADE,
    scope           TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS guess_leaderboard (
    user_id         TEXT PRIMARY KEY NOT NULL,
    score           INTEGER NOT NULL DEFAULT 0,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS account_link (
    user_id         TEXT PRIMARY KEY NOT NULL,
    clal            TEXT NOT NULL,
    linked_at       TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_alias_scope ON song_alias(lower(alias), scope);
CREATE INDEX IF NOT EXISTS idx_alias_song ON song_alias(song_id);
CREATE INDEX IF NOT EXISTS idx_song_title ON song(lower(title));
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
