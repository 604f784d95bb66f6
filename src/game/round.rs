//! One complete guessing round, from song pick to answer card.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::game::jacket;
use crate::game::session_manager::SessionManager;
use crate::game::{JacketSource, Leaderboard, Question, RoundNotifier, RoundResult, SongCatalog};
use crate::models::guess::{MatchMode, Outcome};
use crate::models::song::AliasScope;
use crate::{AppError, Result};

/// Default edge length of the jacket crop, in pixels.
pub const DEFAULT_CROP_SIZE: u32 = 90;

/// Wires the session registry to its collaborators.
#[derive(Clone)]
pub struct GuessGame {
    sessions: SessionManager,
    catalog: Arc<dyn SongCatalog>,
    jackets: Arc<dyn JacketSource>,
    leaderboard: Arc<dyn Leaderboard>,
    notifier: Arc<dyn RoundNotifier>,
    crop_size: u32,
}

impl GuessGame {
    /// Assemble a game from its collaborators.
    #[must_use]
    pub fn new(
        sessions: SessionManager,
        catalog: Arc<dyn SongCatalog>,
        jackets: Arc<dyn JacketSource>,
        leaderboard: Arc<dyn Leaderboard>,
        notifier: Arc<dyn RoundNotifier>,
    ) -> Self {
        Self {
            sessions,
            catalog,
            jackets,
            leaderboard,
            notifier,
            crop_size: DEFAULT_CROP_SIZE,
        }
    }

    /// Override the jacket crop size.
    #[must_use]
    pub fn with_crop_size(mut self, crop_size: u32) -> Self {
        self.crop_size = crop_size;
        self
    }

    /// Session registry shared with the skip command and message router.
    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Play one round in `channel_id`.
    ///
    /// Returns `Ok(None)` without side effects when the channel already has
    /// a round. Catalog, download and crop failures propagate before the
    /// session is registered.
    ///
    /// # Errors
    ///
    /// Returns the first upstream failure (catalog, jacket, Slack).
    pub async fn play(
        &self,
        channel_id: &str,
        scope: &AliasScope,
        mode: MatchMode,
    ) -> Result<Option<Outcome>> {
        let span = info_span!("guess_round", channel_id, %mode);
        async move {
            if self.sessions.is_active(channel_id) {
                debug!("round already running; request ignored");
                return Ok(None);
            }

            let pick = self.catalog.pick_random(scope).await?;
            let encoded = self.jackets.fetch(&pick.song.jacket).await?;
            let preview_png = jacket::crop_random(&encoded, self.crop_size)?;

            let handle = match self.sessions.start(channel_id, pick.answers.clone(), mode) {
                Ok(handle) => handle,
                Err(AppError::AlreadyActive(_)) => {
                    debug!("lost the race for the channel; request ignored");
                    return Ok(None);
                }
                Err(err) => return Err(err),
            };
            info!(round_id = %handle.round_id(), song_id = %pick.song.id, "round started");

            let question = Question {
                channel_id: channel_id.to_owned(),
                preview_png,
                timeout_seconds: self.sessions.timeout().as_secs(),
            };
            // On failure the handle drops here and frees the channel.
            self.notifier.post_question(&question).await?;

            let outcome = handle.resolve().await;

            if let Outcome::Answered { author_id, message } = &outcome {
                if let Err(err) = self.leaderboard.record_win(author_id).await {
                    warn!(%err, author_id, "failed to record guess win");
                }
                if let Err(err) = self.notifier.acknowledge(message).await {
                    warn!(%err, author_id, "failed to acknowledge winning message");
                }
            }

            let result = RoundResult {
                channel_id: channel_id.to_owned(),
                outcome: outcome.clone(),
                jacket_url: self.jackets.url(&pick.song.jacket),
                pick,
            };
            self.notifier.post_result(&result).await?;

            Ok(Some(outcome))
        }
        .instrument(span)
        .await
    }
}
