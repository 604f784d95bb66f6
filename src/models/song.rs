//! Song catalog models.

use serde::{Deserialize, Serialize};

/// Genre whose charts are never used for guessing rounds.
pub const WORLDS_END_GENRE: &str = "WORLD'S END";

/// Scope value stored for aliases visible everywhere.
pub const GLOBAL_SCOPE: &str = "*";

/// A song row from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Song {
    /// Catalog identifier.
    pub id: String,
    /// Canonical title.
    pub title: String,
    /// Credited artist.
    pub artist: String,
    /// Genre / category.
    pub genre: String,
    /// Jacket image file name, relative to the jacket base URL.
    pub jacket: String,
}

/// Visibility domain of song aliases.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AliasScope {
    /// Only global aliases.
    Global,
    /// Global aliases plus those registered by one Slack workspace.
    Team(String),
}

impl AliasScope {
    /// Build a scope from an optional workspace id.
    #[must_use]
    pub fn from_team(team_id: Option<&str>) -> Self {
        match team_id {
            Some(id) if !id.is_empty() => Self::Team(id.to_owned()),
            _ => Self::Global,
        }
    }

    /// Value written to the `scope` column for aliases created in this scope.
    #[must_use]
    pub fn as_column(&self) -> &str {
        match self {
            Self::Global => GLOBAL_SCOPE,
            Self::Team(id) => id,
        }
    }
}

/// A song picked for a round together with every accepted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongPick {
    /// The chosen song.
    pub song: Song,
    /// Title followed by every alias visible in the requesting scope.
    pub answers: Vec<String>,
}

impl SongPick {
    /// Combine a song with its aliases; the title always comes first.
    #[must_use]
    pub fn new(song: Song, aliases: Vec<String>) -> Self {
        let mut answers = Vec::with_capacity(aliases.len() + 1);
        answers.push(song.title.clone());
        for alias in aliases {
            if !answers.contains(&alias) {
                answers.push(alias);
            }
        }
        Self { song, answers }
    }
}

/// Best catalog entry for a free-text lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SongMatch {
    /// The song the best candidate belongs to.
    pub song: Song,
    /// The title or alias that scored best.
    pub matched: String,
    /// Case-insensitive Jaro-Winkler similarity of `matched` to the query.
    pub similarity: f64,
}
