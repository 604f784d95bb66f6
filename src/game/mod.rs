//! Guess-the-song minigame.
//!
//! The [`session_manager`] owns the per-channel round lifecycle; [`round`]
//! strings a full round together from the collaborator traits below so the
//! Slack and `SQLite` implementations can be swapped for fakes in tests.

pub mod jacket;
pub mod matcher;
pub mod round;
pub mod session_manager;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::models::guess::{IncomingMessage, Outcome};
use crate::models::song::{AliasScope, SongPick};
use crate::Result;

/// Source of random songs and their accepted answers.
pub trait SongCatalog: Send + Sync {
    /// Pick a random eligible song with every answer visible in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`](crate::AppError::NotFound) when the
    /// catalog is empty, or a persistence error.
    fn pick_random(
        &self,
        scope: &AliasScope,
    ) -> Pin<Box<dyn Future<Output = Result<SongPick>> + Send + '_>>;
}

/// Fetches full-size jacket images.
pub trait JacketSource: Send + Sync {
    /// Download the jacket named `jacket`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`](crate::AppError::Http) on transport or
    /// status failures.
    fn fetch<'a>(&'a self, jacket: &'a str)
        -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + 'a>>;

    /// Public URL of the jacket, shown with the answer.
    fn url(&self, jacket: &str) -> String;
}

/// Per-user tally of won rounds.
pub trait Leaderboard: Send + Sync {
    /// Add one win for `user_id`, creating the row if absent.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the write fails.
    fn record_win<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// The question posted when a round starts.
#[derive(Debug, Clone)]
pub struct Question {
    /// Channel the round runs in.
    pub channel_id: String,
    /// PNG crop of the jacket.
    pub preview_png: Vec<u8>,
    /// Seconds players have to answer.
    pub timeout_seconds: u64,
}

/// The answer card posted when a round ends.
#[derive(Debug, Clone)]
pub struct RoundResult {
    /// Channel the round ran in.
    pub channel_id: String,
    /// How the round ended.
    pub outcome: Outcome,
    /// The song and all accepted answers.
    pub pick: SongPick,
    /// Full jacket URL.
    pub jacket_url: String,
}

/// Chat-side output of a round.
pub trait RoundNotifier: Send + Sync {
    /// Post the cropped jacket and instructions.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the question cannot be posted.
    fn post_question<'a>(
        &'a self,
        question: &'a Question,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Mark the winning message as correct.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the reaction fails.
    fn acknowledge<'a>(
        &'a self,
        message: &'a IncomingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Post the outcome and the answer card.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the result cannot be posted.
    fn post_result<'a>(
        &'a self,
        result: &'a RoundResult,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
