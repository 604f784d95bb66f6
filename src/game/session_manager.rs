//! Per-channel guessing session registry.
//!
//! A channel holds at most one session. [`SessionManager::start`] registers
//! it and returns a [`SessionHandle`]; [`SessionHandle::resolve`] then races
//! three triggers until exactly one wins:
//!
//! - the first delivered message that satisfies the [`AnswerMatcher`],
//! - the round deadline,
//! - a [`SessionManager::skip`] for the channel.
//!
//! The registry entry is removed before `resolve` returns, so a new round
//! can start in the same channel as soon as the caller sees the outcome.
//! Dropping an unresolved handle removes the entry as well.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::game::matcher::AnswerMatcher;
use crate::models::guess::{IncomingMessage, MatchMode, Outcome};
use crate::{AppError, Result};

/// Default round length.
pub const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(20);

/// Registry-side half of a session: how to reach the waiting round.
struct SessionEntry {
    round_id: Uuid,
    message_tx: mpsc::UnboundedSender<IncomingMessage>,
    cancel: CancellationToken,
}

type Registry = Arc<Mutex<HashMap<String, SessionEntry>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide owner of every active guessing session.
///
/// Cheap to clone; clones share the same registry. The lock is never held
/// across an `.await`.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Registry,
    timeout: Duration,
    similarity_threshold: f64,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(
            DEFAULT_ROUND_TIMEOUT,
            crate::game::matcher::DEFAULT_SIMILARITY_THRESHOLD,
        )
    }
}

impl SessionManager {
    /// Create an empty registry whose rounds last `timeout`.
    #[must_use]
    pub fn new(timeout: Duration, similarity_threshold: f64) -> Self {
        Self {
            sessions: Arc::default(),
            timeout,
            similarity_threshold,
        }
    }

    /// Round length applied to new sessions.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a new session for `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyActive` if the channel already has a
    /// session (nothing else happens; callers are expected to ignore it),
    /// or `AppError::InvalidInput` if `candidate_answers` is empty.
    pub fn start(
        &self,
        channel_id: &str,
        candidate_answers: Vec<String>,
        match_mode: MatchMode,
    ) -> Result<SessionHandle> {
        if candidate_answers.is_empty() {
            return Err(AppError::InvalidInput(
                "a session needs at least one accepted answer".into(),
            ));
        }

        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let round_id = Uuid::new_v4();

        {
            let mut sessions = lock(&self.sessions);
            if sessions.contains_key(channel_id) {
                debug!(channel_id, "guess session already active; start ignored");
                return Err(AppError::AlreadyActive(format!(
                    "channel {channel_id} already has a guessing session"
                )));
            }
            sessions.insert(
                channel_id.to_owned(),
                SessionEntry {
                    round_id,
                    message_tx,
                    cancel: cancel.clone(),
                },
            );
        }

        info!(channel_id, %round_id, mode = %match_mode, "guess session started");

        Ok(SessionHandle {
            channel_id: channel_id.to_owned(),
            round_id,
            matcher: AnswerMatcher::new(candidate_answers, match_mode, self.similarity_threshold),
            deadline: Instant::now() + self.timeout,
            messages: message_rx,
            cancel,
            registry: Arc::clone(&self.sessions),
            registered: true,
        })
    }

    /// Ask the session in `channel_id` to end as [`Outcome::Skipped`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::NoActiveSession` if the channel has no session.
    pub fn skip(&self, channel_id: &str) -> Result<()> {
        let sessions = lock(&self.sessions);
        let entry = sessions.get(channel_id).ok_or_else(|| {
            AppError::NoActiveSession(format!("channel {channel_id} has no guessing session"))
        })?;
        entry.cancel.cancel();
        info!(channel_id, round_id = %entry.round_id, "guess session skip requested");
        Ok(())
    }

    /// Hand an incoming chat message to the channel's session, if any.
    ///
    /// Returns `true` when a session received the message. Messages keep
    /// their arrival order.
    pub fn deliver(&self, message: IncomingMessage) -> bool {
        let sessions = lock(&self.sessions);
        match sessions.get(&message.channel_id) {
            Some(entry) => entry.message_tx.send(message).is_ok(),
            None => false,
        }
    }

    /// Whether `channel_id` currently has a session.
    #[must_use]
    pub fn is_active(&self, channel_id: &str) -> bool {
        lock(&self.sessions).contains_key(channel_id)
    }

    /// Channels with a session, in no particular order.
    #[must_use]
    pub fn active_channels(&self) -> Vec<String> {
        lock(&self.sessions).keys().cloned().collect()
    }
}

/// The waiting side of a registered session.
pub struct SessionHandle {
    channel_id: String,
    round_id: Uuid,
    matcher: AnswerMatcher,
    deadline: Instant,
    messages: mpsc::UnboundedReceiver<IncomingMessage>,
    cancel: CancellationToken,
    registry: Registry,
    registered: bool,
}

impl SessionHandle {
    /// Channel this session belongs to.
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Unique identifier of this round.
    #[must_use]
    pub fn round_id(&self) -> Uuid {
        self.round_id
    }

    /// Accepted answers for this round.
    #[must_use]
    pub fn answers(&self) -> &[String] {
        self.matcher.answers()
    }

    /// Wait for the first of: a matching message, the deadline, a skip.
    ///
    /// The session is deregistered before this returns.
    pub async fn resolve(mut self) -> Outcome {
        let sleep = tokio::time::sleep_until(self.deadline);
        tokio::pin!(sleep);

        let outcome = loop {
            tokio::select! {
                () = self.cancel.cancelled() => break Outcome::Skipped,
                () = &mut sleep => break Outcome::TimedOut,
                received = self.messages.recv() => match received {
                    Some(message) if self.matcher.matches(&message.content) => {
                        break Outcome::Answered {
                            author_id: message.author_id.clone(),
                            message,
                        };
                    }
                    Some(message) => {
                        debug!(
                            channel_id = %self.channel_id,
                            author_id = %message.author_id,
                            "guess did not match"
                        );
                    }
                    // The sender lives in the registry entry, which only this
                    // handle removes; treat a vanished entry as a skip.
                    None => break Outcome::Skipped,
                },
            }
        };

        self.deregister();
        info!(
            channel_id = %self.channel_id,
            round_id = %self.round_id,
            state = ?outcome.state(),
            winner = outcome.winner(),
            "guess session resolved"
        );
        outcome
    }

    /// Remove this round's registry entry, leaving any newer round alone.
    fn deregister(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        let mut sessions = lock(&self.registry);
        if sessions
            .get(&self.channel_id)
            .is_some_and(|entry| entry.round_id == self.round_id)
        {
            sessions.remove(&self.channel_id);
        }
    }
}

impl Drop for SessionHandle {
    /// Release the channel if the handle is dropped before resolving.
    fn drop(&mut self) {
        if self.registered {
            debug!(channel_id = %self.channel_id, round_id = %self.round_id, "unresolved session dropped");
        }
        self.deregister();
    }
}
