//! Shared application state handed to Slack callbacks.

use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::game::round::GuessGame;
use crate::persistence::account_repo::AccountRepo;
use crate::persistence::db::Database;
use crate::persistence::leaderboard_repo::LeaderboardRepo;
use crate::persistence::song_repo::SongRepo;
use crate::slack::client::SlackService;
use crate::web::relay::LoginRelay;

/// Shared application state accessible by all command and event handlers.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// `SQLite` connection pool.
    pub db: Arc<Database>,
    /// Slack client service (absent in tests).
    pub slack: Option<Arc<SlackService>>,
    /// Guess-the-song game and its session registry.
    pub game: GuessGame,
    /// Pending `/login` flows keyed by passcode.
    pub relay: LoginRelay,
}

impl AppState {
    /// Song and alias repository over the shared pool.
    #[must_use]
    pub fn songs(&self) -> SongRepo {
        SongRepo::new(Arc::clone(&self.db))
    }

    /// Leaderboard repository over the shared pool.
    #[must_use]
    pub fn leaderboard(&self) -> LeaderboardRepo {
        LeaderboardRepo::new(Arc::clone(&self.db))
    }

    /// Account link repository over the shared pool.
    #[must_use]
    pub fn accounts(&self) -> AccountRepo {
        AccountRepo::new(Arc::clone(&self.db))
    }
}
