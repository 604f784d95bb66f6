//! Song catalog and alias repository for `SQLite` persistence.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;

use crate::game::matcher;
use crate::game::SongCatalog;
use crate::models::song::{AliasScope, Song, SongMatch, SongPick, GLOBAL_SCOPE, WORLDS_END_GENRE};
use crate::{AppError, Result};

use super::db::Database;

/// Repository for songs and their scoped aliases.
#[derive(Clone)]
pub struct SongRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SongRow {
    id: String,
    title: String,
    artist: String,
    genre: String,
    jacket: String,
}

impl From<SongRow> for Song {
    fn from(row: SongRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            artist: row.artist,
            genre: row.genre,
            jacket: row.jacket,
        }
    }
}

/// `SQLite`'s built-in `lower()` only folds ASCII, so match it exactly.
fn fold(text: &str) -> String {
    text.to_ascii_lowercase()
}

impl SongRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a song or overwrite the row with the same identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn upsert_song(&self, song: &Song) -> Result<()> {
        sqlx::query(
            "INSERT INTO song (id, title, artist, genre, jacket) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                genre = excluded.genre,
                jacket = excluded.jacket",
        )
        .bind(&song.id)
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.genre)
        .bind(&song.jacket)
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Upsert every song in a JSON array of catalog entries.
    ///
    /// Returns the number of songs written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if `raw` is not a song array, or
    /// `AppError::Db` if a write fails.
    pub async fn import_json(&self, raw: &str) -> Result<usize> {
        let songs: Vec<Song> = serde_json::from_str(raw)
            .map_err(|err| AppError::InvalidInput(format!("invalid song catalog: {err}")))?;
        for song in &songs {
            self.upsert_song(song).await?;
        }
        Ok(songs.len())
    }

    /// Retrieve a song by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the song does not exist.
    pub async fn get_by_id(&self, id: &str) -> Result<Song> {
        let row: Option<SongRow> =
            sqlx::query_as("SELECT id, title, artist, genre, jacket FROM song WHERE id = ?1")
                .bind(id)
                .fetch_optional(self.db.as_ref())
                .await?;
        row.map(Song::from)
            .ok_or_else(|| AppError::NotFound(format!("song {id} not found")))
    }

    /// Pick a uniformly random song, never one from the WORLD'S END genre.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the catalog has no eligible songs.
    pub async fn random_song(&self) -> Result<Song> {
        let row: Option<SongRow> = sqlx::query_as(
            "SELECT id, title, artist, genre, jacket FROM song
             WHERE genre != ?1
             ORDER BY RANDOM() LIMIT 1",
        )
        .bind(WORLDS_END_GENRE)
        .fetch_optional(self.db.as_ref())
        .await?;
        row.map(Song::from)
            .ok_or_else(|| AppError::NotFound("song catalog is empty".into()))
    }

    /// Aliases of a song visible in `scope`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn aliases_for(&self, song_id: &str, scope: &AliasScope) -> Result<Vec<String>> {
        let aliases: Vec<(String,)> = sqlx::query_as(
            "SELECT alias FROM song_alias
             WHERE song_id = ?1 AND (scope = ?2 OR scope = ?3)
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(song_id)
        .bind(GLOBAL_SCOPE)
        .bind(scope.as_column())
        .fetch_all(self.db.as_ref())
        .await?;
        Ok(aliases.into_iter().map(|(alias,)| alias).collect())
    }

    /// Resolve a song by exact title, falling back to a case-insensitive
    /// alias lookup within `scope`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if a query fails.
    pub async fn find_by_title_or_alias(
        &self,
        name: &str,
        scope: &AliasScope,
    ) -> Result<Option<Song>> {
        let by_title: Option<SongRow> = sqlx::query_as(
            "SELECT id, title, artist, genre, jacket FROM song WHERE title = ?1 LIMIT 1",
        )
        .bind(name)
        .fetch_optional(self.db.as_ref())
        .await?;
        if let Some(row) = by_title {
            return Ok(Some(row.into()));
        }

        let by_alias: Option<SongRow> = sqlx::query_as(
            "SELECT s.id, s.title, s.artist, s.genre, s.jacket
             FROM song_alias a JOIN song s ON s.id = a.song_id
             WHERE lower(a.alias) = ?1 AND (a.scope = ?2 OR a.scope = ?3)
             LIMIT 1",
        )
        .bind(fold(name))
        .bind(GLOBAL_SCOPE)
        .bind(scope.as_column())
        .fetch_optional(self.db.as_ref())
        .await?;
        Ok(by_alias.map(Song::from))
    }

    /// Find the catalog entry closest to `query`.
    ///
    /// An exact title or alias hit scores 1.0. Otherwise every title and
    /// every alias visible in `scope` is scored by case-insensitive
    /// Jaro-Winkler similarity and the best one wins; ties keep the
    /// earlier candidate, titles before aliases. Returns `None` only for
    /// an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if a query fails.
    pub async fn search(&self, query: &str, scope: &AliasScope) -> Result<Option<SongMatch>> {
        let query = query.trim();
        if let Some(song) = self.find_by_title_or_alias(query, scope).await? {
            return Ok(Some(SongMatch {
                song,
                matched: query.to_owned(),
                similarity: 1.0,
            }));
        }

        let songs: Vec<SongRow> =
            sqlx::query_as("SELECT id, title, artist, genre, jacket FROM song ORDER BY id ASC")
                .fetch_all(self.db.as_ref())
                .await?;
        let aliases: Vec<(String, String)> = sqlx::query_as(
            "SELECT alias, song_id FROM song_alias
             WHERE scope = ?1 OR scope = ?2
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(GLOBAL_SCOPE)
        .bind(scope.as_column())
        .fetch_all(self.db.as_ref())
        .await?;

        let songs: Vec<Song> = songs.into_iter().map(Song::from).collect();
        let by_id: HashMap<&str, &Song> = songs.iter().map(|s| (s.id.as_str(), s)).collect();

        let candidates = songs
            .iter()
            .map(|song| (song.title.as_str(), song))
            .chain(aliases.iter().filter_map(|(alias, song_id)| {
                by_id
                    .get(song_id.as_str())
                    .map(|song| (alias.as_str(), *song))
            }));

        let mut best: Option<SongMatch> = None;
        for (candidate, song) in candidates {
            let score = matcher::similarity(query, candidate);
            if best.as_ref().is_none_or(|b| score > b.similarity) {
                best = Some(SongMatch {
                    song: song.clone(),
                    matched: candidate.to_owned(),
                    similarity: score,
                });
            }
        }
        Ok(best)
    }

    /// Register `alias` for the song named by `target` (title or alias) in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if `target` does not name a song,
    /// `AppError::AlreadyExists` if the alias is already taken in the
    /// global or requesting scope or equals a song title, and
    /// `AppError::InvalidInput` for a blank alias.
    pub async fn add_alias(&self, target: &str, alias: &str, scope: &AliasScope) -> Result<Song> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(AppError::InvalidInput("alias must not be empty".into()));
        }

        let song = self
            .find_by_title_or_alias(target, scope)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{target} does not exist")))?;

        let taken: Option<(String,)> = sqlx::query_as(
            "SELECT alias FROM song_alias
             WHERE lower(alias) = ?1 AND (scope = ?2 OR scope = ?3)
             LIMIT 1",
        )
        .bind(fold(alias))
        .bind(GLOBAL_SCOPE)
        .bind(scope.as_column())
        .fetch_optional(self.db.as_ref())
        .await?;
        if taken.is_some() {
            return Err(AppError::AlreadyExists(format!("{alias} already exists")));
        }

        let title_clash: Option<(String,)> =
            sqlx::query_as("SELECT id FROM song WHERE lower(title) = ?1 LIMIT 1")
                .bind(fold(alias))
                .fetch_optional(self.db.as_ref())
                .await?;
        if title_clash.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "{alias} is already a song title"
            )));
        }

        let inserted = sqlx::query(
            "INSERT INTO song_alias (alias, song_id, scope, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(alias)
        .bind(&song.id)
        .bind(scope.as_column())
        .bind(Utc::now().to_rfc3339())
        .execute(self.db.as_ref())
        .await;

        match inserted {
            Ok(_) => Ok(song),
            // A concurrent add of the same alias won between check and insert.
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(
                AppError::AlreadyExists(format!("{alias} already exists")),
            ),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove an alias registered in exactly `scope`; global aliases
    /// cannot be removed through a workspace scope.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no such alias exists in `scope`.
    pub async fn remove_alias(&self, alias: &str, scope: &AliasScope) -> Result<()> {
        let result = sqlx::query("DELETE FROM song_alias WHERE lower(alias) = ?1 AND scope = ?2")
            .bind(fold(alias.trim()))
            .bind(scope.as_column())
            .execute(self.db.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{alias} does not exist")));
        }
        Ok(())
    }
}

impl SongCatalog for SongRepo {
    fn pick_random(
        &self,
        scope: &AliasScope,
    ) -> Pin<Box<dyn Future<Output = Result<SongPick>> + Send + '_>> {
        let scope = scope.clone();
        Box::pin(async move {
            let song = self.random_song().await?;
            let aliases = self.aliases_for(&song.id, &scope).await?;
            Ok(SongPick::new(song, aliases))
        })
    }
}
